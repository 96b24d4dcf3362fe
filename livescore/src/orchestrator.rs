//! Seeds one poll job per configured match and exits once every seeded match reaches `Ft`
//! (section 4.7).

use std::sync::Arc;
use std::time::Duration;

use pollqueue::{EnqueueOptions, QueueConfig, RetryPolicy, WorkerQueue};
use tracing::info;

use crate::driver::{make_poll_job, poll_key, MatchObserver};
use crate::provider::ScoreProvider;
use crate::store::MatchStore;

pub struct Orchestrator {
    queue: WorkerQueue,
    provider: Arc<dyn ScoreProvider>,
    store: Arc<dyn MatchStore>,
    observer: Option<Arc<dyn MatchObserver>>,
    match_ids: Vec<String>,
    retry: RetryPolicy,
}

impl Orchestrator {
    pub fn new(
        queue_config: QueueConfig,
        provider: Arc<dyn ScoreProvider>,
        store: Arc<dyn MatchStore>,
        observer: Option<Arc<dyn MatchObserver>>,
        match_ids: Vec<String>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            queue: WorkerQueue::new(queue_config),
            provider,
            store,
            observer,
            match_ids,
            retry,
        }
    }

    pub fn queue(&self) -> WorkerQueue {
        self.queue.clone()
    }

    fn seed(&self) {
        for match_id in &self.match_ids {
            let job = make_poll_job(
                self.queue.clone(),
                self.provider.clone(),
                self.store.clone(),
                self.observer.clone(),
                match_id.clone(),
                self.retry,
            );
            let admitted = self.queue.enqueue(
                job,
                EnqueueOptions::default()
                    .with_key(poll_key(match_id))
                    .with_delay(Duration::ZERO)
                    .with_priority(1)
                    .with_max_retries(self.retry.max_retries)
                    .with_backoff(
                        self.retry.backoff_base,
                        self.retry.backoff_min,
                        self.retry.backoff_max,
                        self.retry.jitter,
                    ),
            );
            info!(match_id, admitted, "seeded initial poll");
        }
    }

    /// Starts the queue, seeds every configured match, and blocks until every match reports
    /// `Ft`, polling the store every `check_interval`. Stops the queue and awaits drain before
    /// returning.
    pub async fn run_to_completion(&self, check_interval: Duration) {
        self.queue.start();
        self.seed();

        loop {
            if self.all_finished() {
                break;
            }
            tokio::time::sleep(check_interval).await;
        }

        info!("all seeded matches finished, shutting down queue");
        self.queue.stop();
        self.queue.wait_stopped().await;
    }

    fn all_finished(&self) -> bool {
        self.match_ids
            .iter()
            .all(|match_id| self.store.is_finished(match_id))
    }
}
