//! Structured error kinds for the poll driver (section 7 of the spec).
//!
//! The queue itself only distinguishes success from failure; these variants exist so the driver
//! can log a precise reason and so callers matching on `DriverError` (rather than the opaque
//! `anyhow::Error` the queue sees) get a stable contract.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum DriverError {
    /// The provider call itself failed (network error, non-2xx, deserialization failure, ...).
    /// Treated as a job failure; subject to the queue's retry/backoff.
    #[error("provider call failed for match {match_id}: {source}")]
    TransientProvider {
        match_id: String,
        #[source]
        source: anyhow::Error,
    },

    /// The provider returned no data and the store has no prior observation to fall back on.
    /// Also treated as a job failure; after retries are exhausted the match silently stops
    /// progressing (logged, not fatal).
    #[error("no data available for match {match_id} and no prior state to fall back on")]
    NoData { match_id: String },
}
