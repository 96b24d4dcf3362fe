//! Process entry point. Deliberately thin: the engineering weight of this system is the
//! scheduler (`pollqueue`) and the poll driver/policy (`livescore::{driver, policy}`), not this
//! binary. A real deployment would swap `DemoScoreProvider` for an HTTP-backed `ScoreProvider`.

use std::sync::{Arc, Mutex};

use anyhow::Result;
use async_trait::async_trait;
use livescore::{
    AppConfig, InMemoryMatchStore, MatchObserver, MatchState, MatchStatus, Orchestrator,
    ScoreProvider,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// An illustrative provider standing in for a real live-score API. Advances each match by one
/// simulated minute per call, deterministically, so the binary is runnable without network
/// access. Not part of the system's contract surface — see `ScoreProvider`.
struct DemoScoreProvider {
    minutes_elapsed: Mutex<std::collections::HashMap<String, u32>>,
}

impl DemoScoreProvider {
    fn new() -> Self {
        Self {
            minutes_elapsed: Mutex::new(std::collections::HashMap::new()),
        }
    }
}

#[async_trait]
impl ScoreProvider for DemoScoreProvider {
    async fn get_live_score(&self, match_id: &str) -> Result<Option<MatchState>> {
        let mut elapsed = self.minutes_elapsed.lock().unwrap();
        let minute = elapsed.entry(match_id.to_string()).or_insert(0);
        *minute += 1;

        let status = if *minute >= 90 {
            MatchStatus::Ft
        } else if *minute == 45 {
            MatchStatus::Ht
        } else {
            MatchStatus::Live
        };
        let minute = (*minute).min(90);

        Ok(Some(MatchState::new(
            match_id,
            "Home",
            "Away",
            minute / 15,
            minute / 20,
            status,
            minute,
        )))
    }
}

struct LoggingObserver;
impl MatchObserver for LoggingObserver {
    fn on_update(&self, state: &MatchState) {
        tracing::info!(
            match_id = %state.match_id,
            minute = state.minute,
            home_score = state.home_score,
            away_score = state.away_score,
            status = ?state.status,
            "match updated"
        );
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,livescore=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = AppConfig::from_env()?;
    tracing::info!(matches = ?config.match_ids, "starting livescore poller");

    let provider: Arc<dyn ScoreProvider> = Arc::new(DemoScoreProvider::new());
    let store = Arc::new(InMemoryMatchStore::new());
    let observer: Arc<dyn MatchObserver> = Arc::new(LoggingObserver);

    let orchestrator = Orchestrator::new(
        config.queue,
        provider,
        store,
        Some(observer),
        config.match_ids,
        config.retry,
    );

    orchestrator
        .run_to_completion(config.orchestrator_check_interval)
        .await;

    tracing::info!("all matches finished");
    Ok(())
}
