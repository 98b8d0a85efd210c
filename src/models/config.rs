//! Tournament format configuration.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default half length in minutes when neither config nor command specifies one.
pub const DEFAULT_HALF_TIME_MINUTES: u32 = 10;

/// Preliminary-round format with its parameters.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "snake_case")]
pub enum Format {
    /// Teams split into groups of `group_size` playing round-robin inside the group.
    Groups {
        group_size: u32,
        #[serde(default)]
        max_games_per_team: Option<u32>,
    },
    /// Swiss pairing over `rounds` rounds (None = recommended count).
    Swiss {
        #[serde(default)]
        rounds: Option<u32>,
    },
    /// One table with every team.
    League {
        #[serde(default)]
        max_games_per_team: Option<u32>,
    },
}

impl fmt::Display for Format {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Format::Groups {
                group_size,
                max_games_per_team: Some(k),
            } => write!(f, "groups of {} ({} games per team)", group_size, k),
            Format::Groups { group_size, .. } => write!(f, "groups of {}", group_size),
            Format::Swiss { rounds: Some(r) } => write!(f, "swiss ({} rounds)", r),
            Format::Swiss { rounds: None } => write!(f, "swiss"),
            Format::League {
                max_games_per_team: Some(k),
            } => write!(f, "league ({} games per team)", k),
            Format::League { .. } => write!(f, "league"),
        }
    }
}

/// Knockout toggles. Toggles whose team-count precondition fails are ignored.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct KnockoutOptions {
    #[serde(default)]
    pub quarterfinals: bool,
    #[serde(default)]
    pub third_place: bool,
    #[serde(default)]
    pub fifth_place: bool,
    #[serde(default)]
    pub seventh_place: bool,
}

/// How teams are ordered before they are split into groups.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "snake_case")]
pub enum Seeding {
    /// Registration order.
    #[default]
    Registration,
    /// Reproducible shuffle.
    Shuffled { seed: u64 },
}

/// Full tournament configuration, fixed once fixtures exist (until reconfigured).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TournamentConfig {
    #[serde(flatten)]
    pub format: Format,
    #[serde(default)]
    pub seeding: Seeding,
    #[serde(default)]
    pub knockout: KnockoutOptions,
    #[serde(default = "default_half_time_minutes")]
    pub half_time_minutes: u32,
}

fn default_half_time_minutes() -> u32 {
    DEFAULT_HALF_TIME_MINUTES
}

impl TournamentConfig {
    pub fn new(format: Format) -> Self {
        Self {
            format,
            seeding: Seeding::default(),
            knockout: KnockoutOptions::default(),
            half_time_minutes: DEFAULT_HALF_TIME_MINUTES,
        }
    }
}

impl Default for TournamentConfig {
    fn default() -> Self {
        Self::new(Format::Groups {
            group_size: 4,
            max_games_per_team: None,
        })
    }
}
