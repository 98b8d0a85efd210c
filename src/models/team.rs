//! Team data structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a team.
pub type TeamId = Uuid;

/// A registered team. Matches and groups refer to teams by `name`, which is unique
/// (case-insensitive) within a tournament.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub name: String,
    /// Jersey color as entered at registration (several teams may share one).
    pub color: String,
    pub contact: Option<String>,
    pub registered_at: DateTime<Utc>,
}

impl Team {
    /// Create a new team registered at `registered_at`. Name and color are trimmed.
    pub fn new(
        name: impl Into<String>,
        color: impl Into<String>,
        contact: Option<String>,
        registered_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into().trim().to_string(),
            color: color.into().trim().to_string(),
            contact: contact
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
            registered_at,
        }
    }

    /// Case-insensitive name comparison used for lookups and duplicate checks.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name.trim())
    }
}
