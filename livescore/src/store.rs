//! The in-memory match-state repository (section 4.2 of the spec).
//!
//! All operations are synchronous and safe under concurrent invocation: a single mutex guards
//! the map, so readers never observe a torn record.

use std::collections::HashMap;
use std::sync::Mutex;

use crate::model::{MatchState, MatchStatus};

pub trait MatchStore: Send + Sync {
    fn get(&self, match_id: &str) -> Option<MatchState>;

    #[allow(clippy::too_many_arguments)]
    fn upsert(
        &self,
        match_id: &str,
        home: &str,
        away: &str,
        home_score: u32,
        away_score: u32,
        status: MatchStatus,
        minute: u32,
    ) -> MatchState;

    fn is_finished(&self, match_id: &str) -> bool;
}

/// The reference `MatchStore`: a mutex-guarded `HashMap`. Once a match reaches `Ft`, further
/// `upsert` calls for that `match_id` are ignored and the stored `Ft` record is returned
/// unchanged, matching the "no further mutation once finished" invariant in section 3.
#[derive(Default)]
pub struct InMemoryMatchStore {
    matches: Mutex<HashMap<String, MatchState>>,
}

impl InMemoryMatchStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl MatchStore for InMemoryMatchStore {
    fn get(&self, match_id: &str) -> Option<MatchState> {
        self.matches.lock().unwrap().get(match_id).cloned()
    }

    fn upsert(
        &self,
        match_id: &str,
        home: &str,
        away: &str,
        home_score: u32,
        away_score: u32,
        status: MatchStatus,
        minute: u32,
    ) -> MatchState {
        let mut matches = self.matches.lock().unwrap();
        if let Some(existing) = matches.get(match_id) {
            if existing.status.is_terminal() {
                return existing.clone();
            }
        }
        let state = MatchState::new(match_id, home, away, home_score, away_score, status, minute);
        matches.insert(match_id.to_string(), state.clone());
        state
    }

    fn is_finished(&self, match_id: &str) -> bool {
        self.matches
            .lock()
            .unwrap()
            .get(match_id)
            .map(|state| state.status.is_terminal())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upsert_replaces_and_returns_canonical_value() {
        let store = InMemoryMatchStore::new();
        assert!(store.get("m1").is_none());

        let stored = store.upsert("m1", "Home", "Away", 0, 0, MatchStatus::Live, 1);
        assert_eq!(stored.minute, 1);
        assert_eq!(store.get("m1").unwrap().minute, 1);

        let stored = store.upsert("m1", "Home", "Away", 1, 0, MatchStatus::Live, 2);
        assert_eq!(stored.minute, 2);
        assert_eq!(stored.home_score, 1);
    }

    #[test]
    fn finished_matches_are_immutable() {
        let store = InMemoryMatchStore::new();
        store.upsert("m1", "Home", "Away", 2, 1, MatchStatus::Ft, 90);
        assert!(store.is_finished("m1"));

        let unchanged = store.upsert("m1", "Home", "Away", 99, 99, MatchStatus::Live, 1);
        assert_eq!(unchanged.status, MatchStatus::Ft);
        assert_eq!(unchanged.home_score, 2);
        assert_eq!(store.get("m1").unwrap().minute, 90);
    }

    #[test]
    fn is_finished_false_when_absent() {
        let store = InMemoryMatchStore::new();
        assert!(!store.is_finished("unknown"));
    }
}
