//! `pollqueue` — a delay-aware, priority-ordered, key-coalescing, retrying task scheduler.
//!
//! This crate owns exactly one concern: running many long-lived, self-requeueing jobs
//! concurrently, without duplicating work, with bounded parallelism, with exponential backoff on
//! failure, and with cooperative shutdown. It knows nothing about football, HTTP, or any other
//! business domain — callers bring their own job bodies as `JobFn` factories.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use pollqueue::{EnqueueOptions, QueueConfig, WorkerQueue};
//!
//! # async fn example() {
//! let queue = WorkerQueue::new(QueueConfig::default());
//! queue.start();
//!
//! queue.enqueue(
//!     std::sync::Arc::new(|| Box::pin(async { Ok(()) })),
//!     EnqueueOptions::default().with_key("poll:match-1").with_priority(1),
//! );
//!
//! queue.stop();
//! queue.wait_stopped().await;
//! # }
//! ```

mod error;
mod job;
mod queue;

pub use error::QueueError;
pub use job::{backoff_delay, deterministic_fraction, JobFn, RetryPolicy, ScheduledJob};
pub use queue::{EnqueueOptions, QueueConfig, WorkerQueue};
