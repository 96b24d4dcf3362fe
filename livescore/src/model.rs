//! The canonical match observation snapshot.

use serde::{Deserialize, Serialize};

/// One of the four statuses a match can hold. Transitions follow
/// `NotStarted -> Live -> {Ht -> Live}* -> Ft`; `Ft` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    NotStarted,
    Live,
    Ht,
    Ft,
}

impl MatchStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, MatchStatus::Ft)
    }
}

/// The latest observed state for one match. Scores and `minute` are monotonically
/// non-decreasing within a match's lifetime; once `status == Ft`, the record is never mutated
/// again (enforced by the store, see `MatchStore::upsert`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchState {
    pub match_id: String,
    pub home: String,
    pub away: String,
    pub home_score: u32,
    pub away_score: u32,
    pub status: MatchStatus,
    pub minute: u32,
}

impl MatchState {
    pub fn new(
        match_id: impl Into<String>,
        home: impl Into<String>,
        away: impl Into<String>,
        home_score: u32,
        away_score: u32,
        status: MatchStatus,
        minute: u32,
    ) -> Self {
        Self {
            match_id: match_id.into(),
            home: home.into(),
            away: away.into(),
            home_score,
            away_score,
            status,
            minute,
        }
    }
}
