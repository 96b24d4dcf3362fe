//! The poll-cadence policy (section 4.3 of the spec): a pure function from match state to the
//! next poll delay, in seconds. A negative result is the "never again" sentinel.

use crate::model::{MatchState, MatchStatus};

/// Returned by `next_poll_delay` for a finished match. The caller must not re-enqueue.
pub const TERMINAL: f64 = -1.0;

const LIVE_LATE_MINUTE_THRESHOLD: u32 = 85;

pub fn next_poll_delay(state: &MatchState) -> f64 {
    match state.status {
        MatchStatus::Ft => TERMINAL,
        MatchStatus::NotStarted => 15.0,
        MatchStatus::Ht => 10.0,
        MatchStatus::Live if state.minute >= LIVE_LATE_MINUTE_THRESHOLD => 1.0,
        MatchStatus::Live => 2.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(status: MatchStatus, minute: u32) -> MatchState {
        MatchState::new("m1", "Home", "Away", 0, 0, status, minute)
    }

    #[test]
    fn matches_the_specified_table() {
        assert_eq!(next_poll_delay(&state(MatchStatus::Ft, 90)), TERMINAL);
        assert_eq!(next_poll_delay(&state(MatchStatus::NotStarted, 0)), 15.0);
        assert_eq!(next_poll_delay(&state(MatchStatus::Ht, 45)), 10.0);
        assert_eq!(next_poll_delay(&state(MatchStatus::Live, 84)), 2.0);
        assert_eq!(next_poll_delay(&state(MatchStatus::Live, 85)), 1.0);
        assert_eq!(next_poll_delay(&state(MatchStatus::Live, 90)), 1.0);
    }
}
