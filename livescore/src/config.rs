//! Environment-derived configuration (section 4.8), loaded the same way this codebase's other
//! services load theirs: `.env` support via `dotenvy`, required variables via `anyhow::Context`.

use std::time::Duration;

use anyhow::{Context, Result};
use pollqueue::{QueueConfig, RetryPolicy};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub match_ids: Vec<String>,
    pub queue: QueueConfig,
    pub orchestrator_check_interval: Duration,
    pub retry: RetryPolicy,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let match_ids = env_var("LIVESCORE_MATCH_IDS")
            .context("LIVESCORE_MATCH_IDS must be set (comma-separated match identifiers)")?
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect::<Vec<_>>();

        let concurrency = env_var_or("LIVESCORE_CONCURRENCY", "4")
            .parse()
            .context("LIVESCORE_CONCURRENCY must be a positive integer")?;

        let poll_interval = Duration::from_millis(
            env_var_or("LIVESCORE_POLL_INTERVAL_MS", "100")
                .parse()
                .context("LIVESCORE_POLL_INTERVAL_MS must be a non-negative integer")?,
        );

        let orchestrator_check_interval = Duration::from_millis(
            env_var_or("LIVESCORE_ORCHESTRATOR_CHECK_MS", "500")
                .parse()
                .context("LIVESCORE_ORCHESTRATOR_CHECK_MS must be a non-negative integer")?,
        );

        let max_retries = env_var_or("LIVESCORE_MAX_RETRIES", "3")
            .parse()
            .context("LIVESCORE_MAX_RETRIES must be a non-negative integer")?;

        let backoff_base = env_var_or("LIVESCORE_BACKOFF_BASE", "1.6")
            .parse()
            .context("LIVESCORE_BACKOFF_BASE must be a float")?;

        let backoff_min = Duration::from_millis(
            env_var_or("LIVESCORE_BACKOFF_MIN_MS", "1000")
                .parse()
                .context("LIVESCORE_BACKOFF_MIN_MS must be a non-negative integer")?,
        );

        let backoff_max = Duration::from_millis(
            env_var_or("LIVESCORE_BACKOFF_MAX_MS", "60000")
                .parse()
                .context("LIVESCORE_BACKOFF_MAX_MS must be a non-negative integer")?,
        );

        let jitter = env_var_or("LIVESCORE_JITTER", "0.15")
            .parse()
            .context("LIVESCORE_JITTER must be a float in [0, 1]")?;

        Ok(Self {
            match_ids,
            queue: QueueConfig {
                concurrency,
                poll_interval,
            },
            orchestrator_check_interval,
            retry: RetryPolicy {
                max_retries,
                backoff_base,
                backoff_min,
                backoff_max,
                jitter,
            },
        })
    }
}

fn env_var(name: &str) -> Result<String> {
    std::env::var(name).with_context(|| format!("{name} must be set"))
}

fn env_var_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}
