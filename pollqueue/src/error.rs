//! Structured error types for the worker queue.
//!
//! Job failures are reported to the queue as plain `anyhow::Result<()>` — the dispatcher does
//! not need to distinguish failure kinds, only success vs. retry-or-drop. `QueueError` exists
//! for the one kind of failure the queue itself can raise: an invariant violation, which
//! indicates an implementation bug rather than a business error and is never recoverable.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}

/// Fail fast on a broken invariant (e.g. a negative `pending_keys` count). This is deliberately a
/// panic, not a `Result`, per the spec's "fail fast; not recoverable" treatment of
/// `InvariantViolation`.
pub(crate) fn invariant(cond: bool, msg: impl Into<String>) {
    if !cond {
        panic!("{}", QueueError::InvariantViolation(msg.into()));
    }
}
