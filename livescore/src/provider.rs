//! The score provider contract (section 4.1 of the spec). Only the contract is in scope here —
//! a real implementation (an HTTP client against some live-score API) is an external collaborator.

use async_trait::async_trait;

use crate::model::MatchState;

/// An asynchronous producer of the latest `MatchState` for a given match identifier.
///
/// Returning `Ok(None)` signals transient unavailability, not a terminal condition — callers must
/// not treat it as "the match is over". No ordering is guaranteed across concurrent calls.
#[async_trait]
pub trait ScoreProvider: Send + Sync {
    async fn get_live_score(&self, match_id: &str) -> anyhow::Result<Option<MatchState>>;
}
