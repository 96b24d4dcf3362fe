//! Scheduled job representation, admission ordering, and retry backoff math.

use std::cmp::Ordering;
use std::cmp::Reverse;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::time::Instant;

/// The work a job performs.
///
/// Modeled as a factory rather than a stored `Future`: a `Future` can only be polled to
/// completion once, but a retried job must run its body again from scratch.
pub type JobFn = Arc<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Per-job retry parameters (section 4.5 / 6 of the spec: `max_retries`, `backoff_base`,
/// `backoff_min`, `backoff_max`, `jitter`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff_base: f64,
    pub backoff_min: Duration,
    pub backoff_max: Duration,
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_base: 1.6,
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            jitter: 0.15,
        }
    }
}

impl RetryPolicy {
    /// `0 ≤ jitter ≤ 1` and `backoff_min ≤ backoff_max` per the job invariants.
    pub(crate) fn assert_valid(&self) {
        crate::error::invariant(
            (0.0..=1.0).contains(&self.jitter),
            format!("jitter {} outside [0, 1]", self.jitter),
        );
        crate::error::invariant(
            self.backoff_min <= self.backoff_max,
            format!(
                "backoff_min {:?} exceeds backoff_max {:?}",
                self.backoff_min, self.backoff_max
            ),
        );
    }
}

/// A value admitted into the worker queue's ordered structure.
pub struct ScheduledJob {
    pub run_at: Instant,
    pub priority: i32,
    pub seq: u64,
    pub key: Option<String>,
    pub attempt: u32,
    pub retry: RetryPolicy,
    pub job_fn: JobFn,
}

impl ScheduledJob {
    pub(crate) fn ordering_key(&self) -> (Reverse<Instant>, i32, Reverse<u64>) {
        (Reverse(self.run_at), self.priority, Reverse(self.seq))
    }
}

/// Ordering relation from the spec: `(run_at asc, priority desc, seq asc)`, expressed as the
/// reverse so a max-`BinaryHeap` pops the most-due job first.
impl Ord for ScheduledJob {
    fn cmp(&self, other: &Self) -> Ordering {
        self.ordering_key().cmp(&other.ordering_key())
    }
}

impl PartialOrd for ScheduledJob {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ScheduledJob {
    fn eq(&self, other: &Self) -> bool {
        self.ordering_key() == other.ordering_key()
    }
}

impl Eq for ScheduledJob {}

/// `((seq + 101*attempt) mod 1000) / 1000` — a pure, deterministic stand-in for jitter so retry
/// timing is reproducible in tests.
pub fn deterministic_fraction(seq: u64, attempt: u32) -> f64 {
    let combined = seq.wrapping_add(101u64.wrapping_mul(attempt as u64));
    (combined % 1000) as f64 / 1000.0
}

/// `raw = backoff_min * backoff_base^attempt`, clamped to `[backoff_min, backoff_max]`, then
/// widened by `jitter` and resolved with `deterministic_fraction`.
pub fn backoff_delay(retry: &RetryPolicy, seq: u64, attempt: u32) -> Duration {
    let min = retry.backoff_min.as_secs_f64();
    let max = retry.backoff_max.as_secs_f64();
    let raw = min * retry.backoff_base.powi(attempt as i32);
    let base = raw.clamp(min, max);
    let low = base * (1.0 - retry.jitter);
    let high = base * (1.0 + retry.jitter);
    let frac = deterministic_fraction(seq, attempt);
    Duration::from_secs_f64(low + (high - low) * frac)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job_at(run_at: Instant, priority: i32, seq: u64) -> ScheduledJob {
        ScheduledJob {
            run_at,
            priority,
            seq,
            key: None,
            attempt: 0,
            retry: RetryPolicy::default(),
            job_fn: Arc::new(|| Box::pin(async { Ok(()) })),
        }
    }

    #[test]
    fn orders_by_run_at_then_priority_then_seq() {
        let now = Instant::now();
        let earlier = job_at(now, 0, 5);
        let later = job_at(now + Duration::from_secs(1), 0, 0);
        assert!(earlier > later, "earlier run_at must sort first (greater in the max-heap)");

        let low_pri = job_at(now, 1, 0);
        let high_pri = job_at(now, 5, 1);
        assert!(high_pri > low_pri, "higher priority must win a run_at tie");

        let first_seq = job_at(now, 0, 0);
        let second_seq = job_at(now, 0, 1);
        assert!(first_seq > second_seq, "lower seq must win a full tie (FIFO)");
    }

    #[test]
    fn deterministic_fraction_is_pure_and_bounded() {
        for seq in [0u64, 1, 99, 1000, 123456] {
            for attempt in 0u32..10 {
                let f = deterministic_fraction(seq, attempt);
                assert!((0.0..1.0).contains(&f));
                assert_eq!(f, deterministic_fraction(seq, attempt));
            }
        }
    }

    #[test]
    fn backoff_matches_worked_example() {
        let retry = RetryPolicy {
            max_retries: 3,
            backoff_base: 2.0,
            backoff_min: Duration::from_millis(100),
            backoff_max: Duration::from_secs(60),
            jitter: 0.0,
        };
        let first = backoff_delay(&retry, 42, 1);
        let second = backoff_delay(&retry, 42, 2);
        assert!((first.as_secs_f64() - 0.2).abs() < 1e-9);
        assert!((second.as_secs_f64() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn backoff_respects_jitter_bounds() {
        let retry = RetryPolicy {
            max_retries: 5,
            backoff_base: 1.6,
            backoff_min: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
            jitter: 0.15,
        };
        for attempt in 1..=5u32 {
            for seq in 0..50u64 {
                let delay = backoff_delay(&retry, seq, attempt).as_secs_f64();
                let min_bound = retry.backoff_min.as_secs_f64() * (1.0 - retry.jitter);
                let max_bound = retry.backoff_max.as_secs_f64() * (1.0 + retry.jitter);
                assert!(delay >= min_bound - 1e-9 && delay <= max_bound + 1e-9);
            }
        }
    }
}
