//! `livescore` — adaptive live-score polling on top of `pollqueue`.
//!
//! Wires a pluggable [`ScoreProvider`] and [`MatchStore`] through the [`policy`] module's
//! poll-cadence decision and the [`pollqueue`] scheduler, orchestrated by [`Orchestrator`] until
//! every seeded match reaches `Ft`.

pub mod config;
pub mod driver;
pub mod errors;
pub mod model;
pub mod orchestrator;
pub mod policy;
pub mod provider;
pub mod store;

pub use config::AppConfig;
pub use driver::{make_poll_job, poll_key, MatchObserver};
pub use errors::DriverError;
pub use model::{MatchState, MatchStatus};
pub use orchestrator::Orchestrator;
pub use policy::next_poll_delay;
pub use provider::ScoreProvider;
pub use store::{InMemoryMatchStore, MatchStore};
