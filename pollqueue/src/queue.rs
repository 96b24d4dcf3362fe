//! The dispatcher: a single logical loop that promotes due jobs to inflight under a concurrency
//! bound, coalesces duplicate keyed work, and retries failures with exponential backoff.

use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::invariant;
use crate::job::{backoff_delay, JobFn, RetryPolicy, ScheduledJob};

/// Construction-time queue settings: `concurrency` bounds inflight jobs, `poll_interval` bounds
/// how long the dispatcher can go without re-checking the heap when nothing wakes it early.
#[derive(Debug, Clone, Copy)]
pub struct QueueConfig {
    pub concurrency: usize,
    pub poll_interval: Duration,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            concurrency: 4,
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Per-`enqueue` options (section 6 of the spec).
#[derive(Debug, Clone)]
pub struct EnqueueOptions {
    pub key: Option<String>,
    pub delay: Duration,
    pub priority: i32,
    pub coalesce: bool,
    pub retry: RetryPolicy,
}

impl Default for EnqueueOptions {
    fn default() -> Self {
        Self {
            key: None,
            delay: Duration::ZERO,
            priority: 0,
            coalesce: true,
            retry: RetryPolicy::default(),
        }
    }
}

impl EnqueueOptions {
    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_coalesce(mut self, coalesce: bool) -> Self {
        self.coalesce = coalesce;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.retry.max_retries = max_retries;
        self
    }

    pub fn with_backoff(
        mut self,
        base: f64,
        min: Duration,
        max: Duration,
        jitter: f64,
    ) -> Self {
        self.retry.backoff_base = base;
        self.retry.backoff_min = min;
        self.retry.backoff_max = max;
        self.retry.jitter = jitter;
        self
    }
}

struct Inner {
    heap: BinaryHeap<ScheduledJob>,
    pending_keys: HashMap<String, usize>,
    inflight_keys: HashSet<String>,
    inflight_total: usize,
    next_seq: u64,
}

impl Inner {
    fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            pending_keys: HashMap::new(),
            inflight_keys: HashSet::new(),
            inflight_total: 0,
            next_seq: 0,
        }
    }

    fn is_pending_or_inflight(&self, key: &str) -> bool {
        self.pending_keys.get(key).copied().unwrap_or(0) > 0 || self.inflight_keys.contains(key)
    }

    fn mark_pending(&mut self, key: &str) {
        *self.pending_keys.entry(key.to_string()).or_insert(0) += 1;
    }

    fn unmark_pending(&mut self, key: &str) {
        match self.pending_keys.get_mut(key) {
            Some(count) => {
                invariant(*count > 0, format!("pending_keys[{key}] underflow"));
                *count -= 1;
                if *count == 0 {
                    self.pending_keys.remove(key);
                }
            }
            None => invariant(false, format!("pending_keys[{key}] missing on pop")),
        }
    }
}

struct Core {
    inner: Mutex<Inner>,
    semaphore: Arc<Semaphore>,
    poll_interval: Duration,
    wake: Notify,
    stopping: AtomicBool,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
}

/// A cheaply cloneable handle to the worker queue. Job bodies hold a clone of this to re-enqueue
/// their own successor (see `pollqueue` design notes on self-requeueing jobs).
#[derive(Clone)]
pub struct WorkerQueue {
    core: Arc<Core>,
}

impl WorkerQueue {
    pub fn new(config: QueueConfig) -> Self {
        Self {
            core: Arc::new(Core {
                inner: Mutex::new(Inner::new()),
                semaphore: Arc::new(Semaphore::new(config.concurrency.max(1))),
                poll_interval: config.poll_interval,
                wake: Notify::new(),
                stopping: AtomicBool::new(false),
                dispatcher: Mutex::new(None),
            }),
        }
    }

    /// Idempotent: spawns the dispatcher loop if it is not already running.
    pub fn start(&self) {
        let mut guard = self.core.dispatcher.lock().unwrap();
        if guard.is_some() {
            return;
        }
        self.core.stopping.store(false, Ordering::SeqCst);
        let queue = self.clone();
        *guard = Some(tokio::spawn(async move { queue.dispatch_loop().await }));
    }

    /// Requests cooperative shutdown and returns immediately. Already-admitted jobs keep running.
    pub fn stop(&self) {
        self.core.stopping.store(true, Ordering::SeqCst);
        self.core.wake.notify_one();
    }

    /// Awaits dispatcher termination, which only happens once every inflight job has drained.
    pub async fn wait_stopped(&self) {
        let handle = self.core.dispatcher.lock().unwrap().take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }

    /// `(pending, inflight)`.
    pub fn size(&self) -> (usize, usize) {
        let inner = self.core.inner.lock().unwrap();
        (inner.heap.len(), inner.inflight_total)
    }

    /// Enqueues `job_fn`. Returns `false` without admitting anything if `opts.key` is set,
    /// `opts.coalesce` is true, and the key is already pending or inflight.
    pub fn enqueue(&self, job_fn: JobFn, opts: EnqueueOptions) -> bool {
        opts.retry.assert_valid();
        let mut inner = self.core.inner.lock().unwrap();

        if let Some(key) = &opts.key {
            if opts.coalesce && inner.is_pending_or_inflight(key) {
                return false;
            }
        }

        let seq = inner.next_seq;
        inner.next_seq += 1;
        let run_at = Instant::now() + opts.delay;
        let job = ScheduledJob {
            run_at,
            priority: opts.priority,
            seq,
            key: opts.key.clone(),
            attempt: 0,
            retry: opts.retry,
            job_fn,
        };
        if let Some(key) = &opts.key {
            inner.mark_pending(key);
        }
        inner.heap.push(job);
        drop(inner);
        self.core.wake.notify_one();
        true
    }

    async fn dispatch_loop(self) {
        loop {
            if self.core.stopping.load(Ordering::SeqCst) {
                let drained = { self.core.inner.lock().unwrap().inflight_total == 0 };
                if drained {
                    debug!("dispatcher drained, exiting");
                    return;
                }
                self.wait_for_wake().await;
                continue;
            }

            let mut dispatched_any = false;
            loop {
                let popped = {
                    let mut inner = self.core.inner.lock().unwrap();
                    self.pop_due(&mut inner)
                };
                let job = match popped {
                    PopOutcome::None => break,
                    PopOutcome::Discarded => continue,
                    PopOutcome::Job(job) => job,
                };
                dispatched_any = true;
                let permit = self
                    .core
                    .semaphore
                    .clone()
                    .acquire_owned()
                    .await
                    .expect("semaphore never closed");
                let queue = self.clone();
                tokio::spawn(async move { queue.run_job(job, permit).await });
            }

            if !dispatched_any {
                self.wait_for_wake().await;
            }
        }
    }

    fn pop_due(&self, inner: &mut Inner) -> PopOutcome {
        let now = Instant::now();
        match inner.heap.peek() {
            Some(job) if job.run_at <= now => {}
            _ => return PopOutcome::None,
        }
        let job = inner.heap.pop().expect("peek confirmed head exists");
        if let Some(key) = &job.key {
            inner.unmark_pending(key);
            if inner.inflight_keys.contains(key) {
                // Rare race: a retry re-insertion and this admission overlapped. Discard rather
                // than running two instances of the same key concurrently.
                warn!(key, "discarding duplicate admission for inflight key");
                return PopOutcome::Discarded;
            }
            inner.inflight_keys.insert(key.clone());
        }
        inner.inflight_total += 1;
        PopOutcome::Job(job)
    }

    async fn wait_for_wake(&self) {
        tokio::select! {
            _ = tokio::time::sleep(self.core.poll_interval) => {}
            _ = self.core.wake.notified() => {}
        }
    }

    async fn run_job(self, job: ScheduledJob, permit: OwnedSemaphorePermit) {
        let ScheduledJob {
            key,
            seq,
            attempt,
            retry,
            job_fn,
            priority,
            ..
        } = job;

        let result = (job_fn)().await;
        match result {
            Ok(()) => {
                self.finish(key.as_deref());
            }
            Err(err) => {
                if attempt < retry.max_retries {
                    let next_attempt = attempt + 1;
                    let delay = backoff_delay(&retry, seq, next_attempt);
                    warn!(
                        key = key.as_deref().unwrap_or(""),
                        attempt = next_attempt,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "job failed, scheduling retry"
                    );
                    self.requeue_retry(ScheduledJob {
                        run_at: Instant::now() + delay,
                        priority,
                        seq,
                        key,
                        attempt: next_attempt,
                        retry,
                        job_fn,
                    });
                } else {
                    warn!(
                        key = key.as_deref().unwrap_or(""),
                        attempt, error = %err, "retries exhausted, dropping job"
                    );
                    self.finish(key.as_deref());
                }
            }
        }
        drop(permit);
        self.core.wake.notify_one();
    }

    fn finish(&self, key: Option<&str>) {
        let mut inner = self.core.inner.lock().unwrap();
        if let Some(key) = key {
            inner.inflight_keys.remove(key);
        }
        invariant(inner.inflight_total > 0, "inflight_total underflow on finish");
        inner.inflight_total -= 1;
    }

    /// Moves a failed job back to pending. Reinsertion, the `pending_keys` increment, and the
    /// `inflight_keys` release happen under one lock so the handoff is atomic to observers.
    fn requeue_retry(&self, job: ScheduledJob) {
        let mut inner = self.core.inner.lock().unwrap();
        if let Some(key) = &job.key {
            inner.mark_pending(key);
            inner.inflight_keys.remove(key);
        }
        invariant(inner.inflight_total > 0, "inflight_total underflow on retry");
        inner.inflight_total -= 1;
        inner.heap.push(job);
    }
}

enum PopOutcome {
    None,
    Discarded,
    Job(ScheduledJob),
}
