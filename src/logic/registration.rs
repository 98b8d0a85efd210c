//! Registration phase: adding, removing and importing teams.

use crate::models::{Team, Tournament, TournamentError, TournamentStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// Add a team (Registration only). Names are unique, case-insensitive.
pub fn register_team(
    tournament: &mut Tournament,
    name: &str,
    color: &str,
    contact: Option<String>,
    now: DateTime<Utc>,
) -> Result<Team, TournamentError> {
    if tournament.status != TournamentStatus::Registration {
        return Err(TournamentError::WrongStatus {
            action: "register a team",
            status: tournament.status,
        });
    }
    let name = name.trim();
    if name.is_empty() {
        return Err(TournamentError::EmptyTeamName);
    }
    if tournament.teams.iter().any(|t| t.is_named(name)) {
        return Err(TournamentError::DuplicateTeamName);
    }
    let team = Team::new(name, color, contact, now);
    tournament.teams.push(team.clone());
    Ok(team)
}

/// Remove a team. It leaves its group, and every open match it is fixed in is dropped;
/// completed matches stay as history. Rejected while the team is playing live.
pub fn remove_team(tournament: &mut Tournament, name: &str) -> Result<Team, TournamentError> {
    let team = tournament.find_team(name)?.clone();
    if let Some(live) = tournament.live() {
        if live.involves(&team.name) {
            return Err(TournamentError::MatchIsLive(live.id));
        }
    }
    tournament.teams.retain(|t| t.id != team.id);
    for group in &mut tournament.groups {
        group.teams.retain(|t| t != &team.name);
    }
    tournament
        .matches
        .retain(|m| m.completed || !m.involves(&team.name));
    for m in tournament.matches.iter_mut().filter(|m| !m.completed) {
        if m.referee.as_ref().is_some_and(|r| r.team == team.name) {
            m.referee = None;
        }
    }
    tournament.swiss_byes.retain(|b| b.team != team.name);
    Ok(team)
}

#[derive(Deserialize)]
struct TeamRow {
    name: String,
    #[serde(default)]
    color: String,
    #[serde(default)]
    contact: Option<String>,
}

/// Outcome of a CSV import: registered team names and rejected rows (1-based data line).
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct CsvImport {
    pub registered: Vec<String>,
    pub rejected: Vec<(usize, String)>,
}

/// Register teams from CSV with header `name,color,contact`. Rows that cannot be read or
/// registered are reported; the others are registered.
pub fn import_teams_csv<R: Read>(
    tournament: &mut Tournament,
    reader: R,
    now: DateTime<Utc>,
) -> Result<CsvImport, TournamentError> {
    if tournament.status != TournamentStatus::Registration {
        return Err(TournamentError::WrongStatus {
            action: "import teams",
            status: tournament.status,
        });
    }
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);
    let mut report = CsvImport::default();
    for (i, row) in rdr.deserialize::<TeamRow>().enumerate() {
        let line = i + 1;
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                report.rejected.push((line, e.to_string()));
                continue;
            }
        };
        match register_team(tournament, &row.name, &row.color, row.contact, now) {
            Ok(team) => report.registered.push(team.name),
            Err(e) => report.rejected.push((line, e.to_string())),
        }
    }
    log::info!(
        "csv import: {} registered, {} rejected",
        report.registered.len(),
        report.rejected.len()
    );
    Ok(report)
}
