//! Match, bracket slots and phase labels.

use crate::models::live::LiveMatchState;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Namespace for fixture ids derived from their content.
const FIXTURE_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2b7e_93d4_4a0f_8e55_0c3a_71d2_9b84);

/// Which side of a match (team 1 or team 2).
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    One,
    Two,
}

/// Phase of the tournament this match belongs to.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Group,
    Knockout,
    Placement,
    Penalty,
}

/// One side of a fixture. Bracket games refer to earlier games until those are decided.
#[derive(Clone, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "ref", rename_all = "snake_case")]
pub enum Slot {
    Team(String),
    Winner(MatchId),
    Loser(MatchId),
}

impl Slot {
    pub fn team(name: impl Into<String>) -> Self {
        Slot::Team(name.into())
    }

    /// The fixed team name, if this slot is not a bracket reference.
    pub fn team_name(&self) -> Option<&str> {
        match self {
            Slot::Team(name) => Some(name),
            Slot::Winner(_) | Slot::Loser(_) => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Slot::Team(name) => write!(f, "{}", name),
            Slot::Winner(id) => write!(f, "winner of {}", id),
            Slot::Loser(id) => write!(f, "loser of {}", id),
        }
    }
}

/// Team assigned to referee a match, and the group it was drawn from.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Referee {
    pub team: String,
    pub group: String,
}

/// Kick-off time and pitch.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Schedule {
    pub at: DateTime<Utc>,
    pub field: String,
}

/// A single match between two sides.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub team1: Slot,
    pub team2: Slot,
    /// Group name or bracket label ("Group A", "Semifinal 2", "Final").
    pub label: String,
    pub phase: Phase,
    /// Swiss round number; None outside Swiss play.
    pub round: Option<u32>,
    pub scheduled: Option<Schedule>,
    pub completed: bool,
    pub score1: Option<u32>,
    pub score2: Option<u32>,
    /// Shootout score deciding a knockout game that ended level.
    pub penalties: Option<(u32, u32)>,
    pub is_penalty_shootout: bool,
    pub referee: Option<Referee>,
    /// Present only while this is the tournament's live match.
    pub live: Option<LiveMatchState>,
}

impl Match {
    /// Manually added match with a random id.
    pub fn new(team1: Slot, team2: Slot, label: impl Into<String>, phase: Phase) -> Self {
        Self::with_id(Uuid::new_v4(), team1, team2, label.into(), phase)
    }

    /// Generated fixture. The id is derived from phase, label and sides, so generating
    /// the same fixture twice yields the same id.
    pub fn fixture(team1: Slot, team2: Slot, label: impl Into<String>, phase: Phase) -> Self {
        let label = label.into();
        let key = format!("{:?}|{}|{}|{}", phase, label, team1, team2);
        let id = Uuid::new_v5(&FIXTURE_NAMESPACE, key.as_bytes());
        Self::with_id(id, team1, team2, label, phase)
    }

    fn with_id(id: MatchId, team1: Slot, team2: Slot, label: String, phase: Phase) -> Self {
        let is_penalty_shootout = phase == Phase::Penalty;
        Self {
            id,
            team1,
            team2,
            label,
            phase,
            round: None,
            scheduled: None,
            completed: false,
            score1: None,
            score2: None,
            penalties: None,
            is_penalty_shootout,
            referee: None,
            live: None,
        }
    }

    pub fn in_round(mut self, round: u32) -> Self {
        self.round = Some(round);
        self
    }

    pub fn slot(&self, side: Side) -> &Slot {
        match side {
            Side::One => &self.team1,
            Side::Two => &self.team2,
        }
    }

    /// Both team names, if neither side is a bracket reference.
    pub fn fixed_teams(&self) -> Option<(&str, &str)> {
        Some((self.team1.team_name()?, self.team2.team_name()?))
    }

    /// True if `team` is fixed on either side.
    pub fn involves(&self, team: &str) -> bool {
        self.team1.team_name() == Some(team) || self.team2.team_name() == Some(team)
    }

    pub fn is_live(&self) -> bool {
        self.live.is_some()
    }

    /// Final score, if the match is completed with both scores entered.
    pub fn final_score(&self) -> Option<(u32, u32)> {
        if !self.completed {
            return None;
        }
        Some((self.score1?, self.score2?))
    }

    /// Winning side of a completed match. A level score is decided by `penalties`;
    /// without them a draw has no winner.
    pub fn winning_side(&self) -> Option<Side> {
        let (s1, s2) = self.final_score()?;
        let (p1, p2) = match s1.cmp(&s2) {
            std::cmp::Ordering::Greater => return Some(Side::One),
            std::cmp::Ordering::Less => return Some(Side::Two),
            std::cmp::Ordering::Equal => self.penalties?,
        };
        match p1.cmp(&p2) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }
}

impl Side {
    pub fn other(self) -> Side {
        match self {
            Side::One => Side::Two,
            Side::Two => Side::One,
        }
    }
}
