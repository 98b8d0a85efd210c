//! Tournament, Group, TournamentStatus and the error type shared by all operations.

use crate::logic::FormatAnalysis;
use crate::models::config::TournamentConfig;
use crate::models::game::{Match, MatchId, Slot};
use crate::models::live::{ClockAction, ClockState};
use crate::models::standing::Standing;
use crate::models::team::Team;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Errors that can occur during tournament operations. None of them leave the
/// tournament partially modified.
#[derive(Clone, Debug, Eq, PartialEq, Error)]
pub enum TournamentError {
    /// The requested format cannot be built for the registered teams.
    #[error("configuration is not feasible: {}", .0.recommendations.join("; "))]
    Infeasible(Box<FormatAnalysis>),
    /// Clock command issued in a state that forbids it.
    #[error("cannot {action} a match in {state} (paused: {paused})")]
    InvalidTransition {
        action: ClockAction,
        state: ClockState,
        paused: bool,
    },
    /// Another match is live.
    #[error("match {live} is already live; finish or abort it first")]
    ConcurrentLiveMatch { live: MatchId },
    #[error("match {0} not found")]
    MatchNotFound(MatchId),
    #[error("team {0} not found")]
    TeamNotFound(String),
    /// Tournament status does not allow this action.
    #[error("cannot {action} while the tournament is {status}")]
    WrongStatus {
        action: &'static str,
        status: TournamentStatus,
    },
    #[error("a team with this name already exists")]
    DuplicateTeamName,
    #[error("team name must not be empty")]
    EmptyTeamName,
    #[error("need at least {required} teams (have {available})")]
    NotEnoughTeams { required: usize, available: usize },
    /// A bracket side still waits on an undecided match.
    #[error("both teams of match {0} must be known before it is played")]
    UnresolvedTeams(MatchId),
    #[error("match {0} is live; use the live clock commands")]
    MatchIsLive(MatchId),
    /// Command is well-formed but cannot be applied now (details in the message).
    #[error("{0}")]
    Rejected(String),
}

/// Tournament lifecycle. Moves forward in normal operation; admins may force it back.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    /// Teams can register.
    #[default]
    Registration,
    /// Fixtures generated, no match played yet.
    Closed,
    /// Matches are being played.
    Active,
    /// Final decided.
    Finished,
}

impl fmt::Display for TournamentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TournamentStatus::Registration => "in registration",
            TournamentStatus::Closed => "closed",
            TournamentStatus::Active => "active",
            TournamentStatus::Finished => "finished",
        };
        write!(f, "{}", s)
    }
}

/// A group (or the single Swiss/league table) and its derived table.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Group {
    pub name: String,
    pub teams: Vec<String>,
    /// Derived from completed matches; refreshed after every result.
    #[serde(default)]
    pub table: Vec<Standing>,
}

impl Group {
    pub fn new(name: impl Into<String>, teams: Vec<String>) -> Self {
        Self {
            name: name.into(),
            teams,
            table: Vec::new(),
        }
    }

    pub fn contains(&self, team: &str) -> bool {
        self.teams.iter().any(|t| t == team)
    }
}

/// A Swiss round in which a team sat out.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SwissBye {
    pub round: u32,
    pub team: String,
}

/// Full tournament state for one year: teams, fixtures, groups, live match.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tournament {
    /// One tournament per calendar year.
    pub year: i32,
    pub status: TournamentStatus,
    /// Set when registration is closed.
    pub config: Option<TournamentConfig>,
    /// Registration order.
    pub teams: Vec<Team>,
    pub groups: Vec<Group>,
    pub matches: Vec<Match>,
    pub live_match: Option<MatchId>,
    #[serde(default)]
    pub swiss_byes: Vec<SwissBye>,
}

impl Tournament {
    /// Create a new tournament in Registration with no teams.
    pub fn new(year: i32) -> Self {
        Self {
            year,
            status: TournamentStatus::Registration,
            config: None,
            teams: Vec::new(),
            groups: Vec::new(),
            matches: Vec::new(),
            live_match: None,
            swiss_byes: Vec::new(),
        }
    }

    /// Look up a team by name (case-insensitive).
    pub fn find_team(&self, name: &str) -> Result<&Team, TournamentError> {
        self.teams
            .iter()
            .find(|t| t.is_named(name))
            .ok_or_else(|| TournamentError::TeamNotFound(name.trim().to_string()))
    }

    /// Team names in registration order.
    pub fn team_names(&self) -> Vec<String> {
        self.teams.iter().map(|t| t.name.clone()).collect()
    }

    pub fn find_match(&self, id: MatchId) -> Result<&Match, TournamentError> {
        self.matches
            .iter()
            .find(|m| m.id == id)
            .ok_or(TournamentError::MatchNotFound(id))
    }

    pub fn find_match_mut(&mut self, id: MatchId) -> Result<&mut Match, TournamentError> {
        self.matches
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or(TournamentError::MatchNotFound(id))
    }

    /// The match currently on the clock, if any.
    pub fn live(&self) -> Option<&Match> {
        self.live_match
            .and_then(|id| self.matches.iter().find(|m| m.id == id))
    }

    /// Resolve a bracket slot to a team name. Winner/loser references resolve once the
    /// referenced match has a decided result.
    pub fn resolve_slot(&self, slot: &Slot) -> Option<String> {
        self.resolve_slot_depth(slot, self.matches.len())
    }

    fn resolve_slot_depth(&self, slot: &Slot, depth: usize) -> Option<String> {
        let (id, winner) = match slot {
            Slot::Team(name) => return Some(name.clone()),
            Slot::Winner(id) => (*id, true),
            Slot::Loser(id) => (*id, false),
        };
        // Guards against reference cycles in hand-edited snapshots.
        if depth == 0 {
            return None;
        }
        let m = self.matches.iter().find(|m| m.id == id)?;
        let side = m.winning_side()?;
        let side = if winner { side } else { side.other() };
        self.resolve_slot_depth(m.slot(side), depth - 1)
    }

    /// Both team names of a match, once resolved.
    pub fn resolved_teams(&self, m: &Match) -> Option<(String, String)> {
        Some((self.resolve_slot(&m.team1)?, self.resolve_slot(&m.team2)?))
    }

    /// Team name on the winning side of a decided match.
    pub fn winner_of(&self, m: &Match) -> Option<String> {
        m.winning_side()
            .and_then(|side| self.resolve_slot(m.slot(side)))
    }

    /// Number of teams wearing each jersey color (case-insensitive, lowercased key).
    pub fn color_usage(&self) -> BTreeMap<String, usize> {
        let mut usage = BTreeMap::new();
        for team in &self.teams {
            *usage.entry(team.color.to_lowercase()).or_insert(0) += 1;
        }
        usage
    }
}
