//! Cup referee: tournament management for a one-day amateur football cup.
//! Library with models, business logic, the admin command orchestrator and persistence.

pub mod config;
pub mod events;
pub mod logic;
pub mod models;
pub mod orchestrator;
pub mod store;

pub use config::AppConfig;
pub use events::{
    BroadcastSink, EventBatch, EventSink, MatchEvent, RecordingSink, SequencedEvent,
};
pub use logic::{
    analyze, clock_reading, compute_table, generate_fixtures, generate_knockout,
    generate_penalty_shootouts, generate_swiss_round, recommended_swiss_rounds, FixtureSet,
    FormatAnalysis, SwissRound,
};
pub use models::{
    ClockAction, ClockDisplay, ClockReading, ClockState, Format, Group, KnockoutOptions,
    LiveMatchState, Match, MatchId, Phase, Seeding, Slot, Standing, Team, TeamId, Tournament,
    TournamentConfig, TournamentError, TournamentStatus,
};
pub use orchestrator::{LiveClock, Orchestrator};
pub use store::{JsonFileStore, MemoryStore, SnapshotStore, StoreError};
