//! The poll driver (section 4.4): the job body that ties the provider, store, observer, and
//! policy together, and decides how — or whether — to re-enqueue itself.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use pollqueue::{EnqueueOptions, JobFn, RetryPolicy, WorkerQueue};
use tracing::{debug, warn};

use crate::errors::DriverError;
use crate::model::MatchState;
use crate::policy::next_poll_delay;
use crate::provider::ScoreProvider;
use crate::store::MatchStore;

/// Invoked after every successful upsert, on the worker that performed it, at most once per
/// poll. Synchronous by contract; panics are caught and logged, never propagated.
pub trait MatchObserver: Send + Sync {
    fn on_update(&self, state: &MatchState);
}

fn notify_observer(observer: &dyn MatchObserver, state: &MatchState) {
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| observer.on_update(state)));
    if let Err(panic) = result {
        let message = extract_panic_message(&panic);
        warn!(match_id = %state.match_id, %message, "observer panicked, swallowing");
    }
}

fn extract_panic_message(panic: &Box<dyn std::any::Any + Send>) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

pub fn poll_key(match_id: &str) -> String {
    format!("poll:{match_id}")
}

/// Builds the job factory for polling `match_id` once. On success, if the match is not yet
/// terminal, the returned future re-enqueues a fresh instance of itself via `queue`.
pub fn make_poll_job(
    queue: WorkerQueue,
    provider: Arc<dyn ScoreProvider>,
    store: Arc<dyn MatchStore>,
    observer: Option<Arc<dyn MatchObserver>>,
    match_id: String,
    retry: RetryPolicy,
) -> JobFn {
    Arc::new(move || {
        let queue = queue.clone();
        let provider = provider.clone();
        let store = store.clone();
        let observer = observer.clone();
        let match_id = match_id.clone();
        Box::pin(run_poll(queue, provider, store, observer, match_id, retry))
    })
}

async fn run_poll(
    queue: WorkerQueue,
    provider: Arc<dyn ScoreProvider>,
    store: Arc<dyn MatchStore>,
    observer: Option<Arc<dyn MatchObserver>>,
    match_id: String,
    retry: RetryPolicy,
) -> anyhow::Result<()> {
    let fresh = provider
        .get_live_score(&match_id)
        .await
        .map_err(|source| DriverError::TransientProvider {
            match_id: match_id.clone(),
            source,
        })?;

    let state = match fresh {
        Some(fresh) => {
            let stored = store.upsert(
                &match_id,
                &fresh.home,
                &fresh.away,
                fresh.home_score,
                fresh.away_score,
                fresh.status,
                fresh.minute,
            );
            if let Some(observer) = &observer {
                notify_observer(observer.as_ref(), &stored);
            }
            stored
        }
        None => store.get(&match_id).ok_or_else(|| DriverError::NoData {
            match_id: match_id.clone(),
        })?,
    };

    let delay = next_poll_delay(&state);
    if delay < 0.0 {
        debug!(match_id = %match_id, "match is terminal, not re-enqueueing");
        return Ok(());
    }

    let next_job = make_poll_job(
        queue.clone(),
        provider,
        store,
        observer,
        match_id.clone(),
        retry,
    );
    let opts = EnqueueOptions::default()
        .with_key(poll_key(&match_id))
        .with_delay(Duration::from_secs_f64(delay))
        .with_priority(1)
        .with_max_retries(retry.max_retries)
        .with_backoff(
            retry.backoff_base,
            retry.backoff_min,
            retry.backoff_max,
            retry.jitter,
        );
    let admitted = queue.enqueue(next_job, opts);
    debug!(match_id = %match_id, delay_s = delay, admitted, "re-enqueued next poll");
    Ok(())
}
