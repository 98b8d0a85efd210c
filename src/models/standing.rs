//! Standing: one row of a group table.

use serde::{Deserialize, Serialize};

/// Points for a win and for a draw.
pub const POINTS_WIN: u32 = 3;
pub const POINTS_DRAW: u32 = 1;

/// A team's record in one table. Always derived from completed matches.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct Standing {
    pub team: String,
    pub games: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_diff: i64,
    pub points: u32,
}

impl Standing {
    pub fn new(team: impl Into<String>) -> Self {
        Self {
            team: team.into(),
            ..Self::default()
        }
    }

    /// Record one game with the given goals for and against.
    pub fn add_game(&mut self, scored: u32, conceded: u32) {
        self.games += 1;
        self.goals_for += scored;
        self.goals_against += conceded;
        self.goal_diff = i64::from(self.goals_for) - i64::from(self.goals_against);
        match scored.cmp(&conceded) {
            std::cmp::Ordering::Greater => {
                self.wins += 1;
                self.points += POINTS_WIN;
            }
            std::cmp::Ordering::Equal => {
                self.draws += 1;
                self.points += POINTS_DRAW;
            }
            std::cmp::Ordering::Less => self.losses += 1,
        }
    }

    /// The numeric ranking key: points, goal difference, goals for.
    pub fn rank_key(&self) -> (u32, i64, u32) {
        (self.points, self.goal_diff, self.goals_for)
    }
}
