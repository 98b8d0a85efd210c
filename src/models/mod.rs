//! Data structures for the tournament: teams, matches, configuration, tables, live state.

mod config;
mod game;
mod live;
mod standing;
mod team;
mod tournament;

pub use config::{Format, KnockoutOptions, Seeding, TournamentConfig, DEFAULT_HALF_TIME_MINUTES};
pub use game::{Match, MatchId, Phase, Referee, Schedule, Side, Slot};
pub use live::{ClockAction, ClockDisplay, ClockReading, ClockState, LiveMatchState};
pub use standing::{Standing, POINTS_DRAW, POINTS_WIN};
pub use team::{Team, TeamId};
pub use tournament::{Group, SwissBye, Tournament, TournamentError, TournamentStatus};
