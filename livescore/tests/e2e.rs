//! End-to-end scenarios from section 8 of the specification that exercise the full stack
//! (provider -> driver -> store -> policy -> queue -> re-enqueue), as opposed to the unit tests
//! living next to each module.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use livescore::{
    InMemoryMatchStore, MatchObserver, MatchState, MatchStatus, Orchestrator, ScoreProvider,
};
use pollqueue::{QueueConfig, RetryPolicy};

/// Advances one simulated minute per call, starting at minute 0. Home scoring flattens after
/// half-time so the worked example in the spec (`home_score = floor(45/7)`, independent of the
/// final minute) is reproducible.
struct MinuteAdvancingProvider {
    minutes: Mutex<HashMap<String, u32>>,
}

impl MinuteAdvancingProvider {
    fn new() -> Self {
        Self {
            minutes: Mutex::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl ScoreProvider for MinuteAdvancingProvider {
    async fn get_live_score(&self, match_id: &str) -> anyhow::Result<Option<MatchState>> {
        let mut minutes = self.minutes.lock().unwrap();
        let minute = minutes.entry(match_id.to_string()).or_insert(0);
        let current = *minute;
        *minute += 1;

        let status = if current >= 90 {
            MatchStatus::Ft
        } else if current == 0 {
            MatchStatus::NotStarted
        } else if current == 45 {
            MatchStatus::Ht
        } else {
            MatchStatus::Live
        };

        let home_score = current.min(45) / 7;
        let away_score = current / 11;

        Ok(Some(MatchState::new(
            match_id,
            "Home",
            "Away",
            home_score,
            away_score,
            status,
            current,
        )))
    }
}

struct CollectingObserver {
    updates: Mutex<Vec<MatchState>>,
}

impl CollectingObserver {
    fn new() -> Self {
        Self {
            updates: Mutex::new(Vec::new()),
        }
    }

    fn count(&self) -> usize {
        self.updates.lock().unwrap().len()
    }
}

impl MatchObserver for CollectingObserver {
    fn on_update(&self, state: &MatchState) {
        self.updates.lock().unwrap().push(state.clone());
    }
}

/// Advances the paused virtual clock in small steps, flushing the executor between each, until
/// `predicate` is satisfied or `budget` is exhausted.
async fn drive_until(mut budget: Duration, mut predicate: impl FnMut() -> bool) {
    let step = Duration::from_millis(500);
    while !predicate() && budget > Duration::ZERO {
        tokio::time::advance(step).await;
        for _ in 0..5 {
            tokio::task::yield_now().await;
        }
        budget = budget.saturating_sub(step);
    }
}

/// Once the store reports every seeded match finished, the orchestrator still needs a final
/// `check_interval` tick to notice and a dispatcher tick to drain. Advance past both so
/// `run.await` below observes a completed task rather than racing it.
async fn settle() {
    tokio::time::advance(Duration::from_millis(500)).await;
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

#[tokio::test(start_paused = true)]
async fn single_match_happy_path_reaches_full_time() {
    let provider: Arc<dyn ScoreProvider> = Arc::new(MinuteAdvancingProvider::new());
    let store = Arc::new(InMemoryMatchStore::new());
    let observer = Arc::new(CollectingObserver::new());

    let orchestrator = Orchestrator::new(
        QueueConfig {
            concurrency: 1,
            poll_interval: Duration::from_millis(50),
        },
        provider,
        store.clone(),
        Some(observer.clone()),
        vec!["m1".to_string()],
        RetryPolicy::default(),
    );

    let run = tokio::spawn({
        let orchestrator_check = Duration::from_millis(50);
        async move { orchestrator.run_to_completion(orchestrator_check).await }
    });

    drive_until(Duration::from_secs(400), || store.is_finished("m1")).await;
    settle().await;
    run.await.expect("orchestrator task panicked");

    assert!(
        observer.count() >= 91,
        "expected at least 91 observed updates, got {}",
        observer.count()
    );

    let final_state = store.get("m1").expect("match must have an observation");
    assert_eq!(final_state.status, MatchStatus::Ft);
    assert_eq!(final_state.minute, 90);
    assert_eq!(final_state.home_score, 6, "floor(45/7)");
    assert_eq!(final_state.away_score, 8, "floor(90/11)");
}

#[tokio::test(start_paused = true)]
async fn orchestrator_waits_for_every_seeded_match() {
    let provider: Arc<dyn ScoreProvider> = Arc::new(MinuteAdvancingProvider::new());
    let store = Arc::new(InMemoryMatchStore::new());

    let orchestrator = Orchestrator::new(
        QueueConfig {
            concurrency: 4,
            poll_interval: Duration::from_millis(50),
        },
        provider,
        store.clone(),
        None,
        vec!["m1".to_string(), "m2".to_string()],
        RetryPolicy::default(),
    );

    let run = tokio::spawn({
        let orchestrator_check = Duration::from_millis(50);
        async move { orchestrator.run_to_completion(orchestrator_check).await }
    });

    drive_until(Duration::from_secs(400), || {
        store.is_finished("m1") && store.is_finished("m2")
    })
    .await;
    settle().await;
    run.await.expect("orchestrator task panicked");

    assert!(store.is_finished("m1"));
    assert!(store.is_finished("m2"));
}
