//! Admin command handling for the one tournament this process serves.
//!
//! Every mutating command validates fully before it changes anything. After a change
//! the group tables are recomputed, the snapshot is persisted and, for match commands,
//! exactly one event is published. Callers serialize commands by holding the
//! orchestrator behind a lock; the loser of a race sees the state the winner left and
//! gets a normal rejection.

use crate::events::{EventSink, MatchEvent};
use crate::logic::{self, clock, CsvImport, FixtureSet, FormatAnalysis, SwissRound};
use crate::models::{
    ClockAction, ClockReading, ClockState, Format, KnockoutOptions, Match, MatchId, Phase, Slot,
    Standing, Team, Tournament, TournamentConfig, TournamentError, TournamentStatus,
    DEFAULT_HALF_TIME_MINUTES,
};
use crate::store::{SnapshotStore, StoreError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::Read;

/// What scoreboards need for the live match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LiveClock {
    pub match_id: MatchId,
    pub team1: String,
    pub team2: String,
    pub score1: u32,
    pub score2: u32,
    pub reading: ClockReading,
}

/// Owns the tournament and its persistence/publication hooks.
#[derive(Debug)]
pub struct Orchestrator<S, P> {
    tournament: Tournament,
    store: S,
    sink: P,
    default_half_time_minutes: u32,
}

impl<S: SnapshotStore, P: EventSink> Orchestrator<S, P> {
    pub fn new(tournament: Tournament, store: S, sink: P) -> Self {
        Self {
            tournament,
            store,
            sink,
            default_half_time_minutes: DEFAULT_HALF_TIME_MINUTES,
        }
    }

    /// Load the snapshot for `year` from `store`, or start a fresh tournament.
    pub fn load(year: i32, store: S, sink: P) -> Result<Self, StoreError> {
        let tournament = match store.load(year)? {
            Some(t) => {
                log::info!(
                    "loaded tournament {} ({} teams, {} matches)",
                    year,
                    t.teams.len(),
                    t.matches.len()
                );
                t
            }
            None => {
                log::info!("no snapshot for {}; starting registration", year);
                Tournament::new(year)
            }
        };
        Ok(Self::new(tournament, store, sink))
    }

    /// Half length used when neither the command nor the tournament config gives one.
    pub fn with_default_half_time(mut self, minutes: u32) -> Self {
        if minutes > 0 {
            self.default_half_time_minutes = minutes;
        }
        self
    }

    pub fn tournament(&self) -> &Tournament {
        &self.tournament
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn sink(&self) -> &P {
        &self.sink
    }

    /// Persist the current state outside of a command (e.g. on shutdown).
    pub fn save(&self) -> Result<(), StoreError> {
        self.store.persist(&self.tournament)
    }

    /// Refresh derived tables and persist. A failed write is logged; the in-memory state
    /// stays authoritative and the next commit retries the whole snapshot.
    fn commit(&mut self) {
        let matches = &self.tournament.matches;
        for group in &mut self.tournament.groups {
            group.table = logic::compute_table(&group.teams, matches);
        }
        if let Err(e) = self.store.persist(&self.tournament) {
            log::error!("failed to persist tournament {}: {}", self.tournament.year, e);
        }
    }

    fn require_status(
        &self,
        action: &'static str,
        allowed: &[TournamentStatus],
    ) -> Result<(), TournamentError> {
        if allowed.contains(&self.tournament.status) {
            Ok(())
        } else {
            Err(TournamentError::WrongStatus {
                action,
                status: self.tournament.status,
            })
        }
    }

    fn require_no_live_match(&self) -> Result<(), TournamentError> {
        match self.tournament.live_match {
            Some(live) => Err(TournamentError::ConcurrentLiveMatch { live }),
            None => Ok(()),
        }
    }

    fn rejected<T>(&self, what: &str, err: TournamentError) -> Result<T, TournamentError> {
        log::warn!("rejected {}: {}", what, err);
        Err(err)
    }

    // Registration

    pub fn register_team(
        &mut self,
        name: &str,
        color: &str,
        contact: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Team, TournamentError> {
        let team = match logic::register_team(&mut self.tournament, name, color, contact, now) {
            Ok(team) => team,
            Err(e) => return self.rejected("team registration", e),
        };
        log::info!("registered team {} ({})", team.name, team.color);
        self.commit();
        Ok(team)
    }

    pub fn remove_team(&mut self, name: &str) -> Result<Team, TournamentError> {
        let team = match logic::remove_team(&mut self.tournament, name) {
            Ok(team) => team,
            Err(e) => return self.rejected("team removal", e),
        };
        log::info!("removed team {}", team.name);
        self.commit();
        Ok(team)
    }

    pub fn import_teams_csv<R: Read>(
        &mut self,
        reader: R,
        now: DateTime<Utc>,
    ) -> Result<CsvImport, TournamentError> {
        let report = logic::import_teams_csv(&mut self.tournament, reader, now)?;
        if !report.registered.is_empty() {
            self.commit();
        }
        Ok(report)
    }

    // Format and fixtures

    /// Feasibility of `format` for the currently registered teams.
    pub fn analyze_config(&self, format: &Format) -> FormatAnalysis {
        logic::analyze(self.tournament.teams.len(), format)
    }

    /// Registration -> Closed: validate `config` and generate the preliminary fixtures.
    pub fn close_registration(
        &mut self,
        config: TournamentConfig,
    ) -> Result<FixtureSet, TournamentError> {
        self.require_status("close registration", &[TournamentStatus::Registration])?;
        let fixtures = match self.install_fixtures(config) {
            Ok(fixtures) => fixtures,
            Err(e) => return self.rejected("closing registration", e),
        };
        log::info!(
            "registration closed: {} with {} teams, {} matches",
            config.format,
            self.tournament.teams.len(),
            fixtures.matches.len()
        );
        Ok(fixtures)
    }

    /// Discard every fixture and regenerate them for `config`.
    pub fn reconfigure(&mut self, config: TournamentConfig) -> Result<FixtureSet, TournamentError> {
        self.require_status(
            "reconfigure",
            &[
                TournamentStatus::Closed,
                TournamentStatus::Active,
                TournamentStatus::Finished,
            ],
        )?;
        self.require_no_live_match()?;
        let fixtures = match self.install_fixtures(config) {
            Ok(fixtures) => fixtures,
            Err(e) => return self.rejected("reconfiguration", e),
        };
        log::info!(
            "reconfigured to {}: {} matches regenerated",
            config.format,
            fixtures.matches.len()
        );
        Ok(fixtures)
    }

    fn install_fixtures(&mut self, config: TournamentConfig) -> Result<FixtureSet, TournamentError> {
        let fixtures = logic::generate_fixtures(&self.tournament.team_names(), &config)?;
        self.tournament.config = Some(config);
        self.tournament.groups = fixtures.groups.clone();
        self.tournament.matches = fixtures.matches.clone();
        self.tournament.swiss_byes = fixtures.byes.clone();
        self.tournament.live_match = None;
        self.tournament.status = TournamentStatus::Closed;
        self.commit();
        Ok(fixtures)
    }

    /// Generate the next Swiss round once the current one is complete.
    pub fn next_swiss_round(&mut self) -> Result<SwissRound, TournamentError> {
        self.require_status(
            "pair a swiss round",
            &[TournamentStatus::Closed, TournamentStatus::Active],
        )?;
        let planned = match self.tournament.config.map(|c| c.format) {
            Some(Format::Swiss { rounds }) => {
                rounds.unwrap_or_else(|| logic::recommended_swiss_rounds(self.tournament.teams.len()))
            }
            _ => {
                return self.rejected(
                    "swiss pairing",
                    TournamentError::Rejected("the tournament is not played in swiss format".to_string()),
                )
            }
        };
        let current = self
            .tournament
            .matches
            .iter()
            .filter_map(|m| m.round)
            .max()
            .unwrap_or(0);
        if self
            .tournament
            .matches
            .iter()
            .any(|m| m.round == Some(current) && !m.completed)
        {
            return self.rejected(
                "swiss pairing",
                TournamentError::Rejected(format!("swiss round {} is not complete", current)),
            );
        }
        if current >= planned {
            return self.rejected(
                "swiss pairing",
                TournamentError::Rejected(format!("all {} swiss rounds have been paired", planned)),
            );
        }
        let Some(group) = self.tournament.groups.first() else {
            return Err(TournamentError::Rejected("no swiss table".to_string()));
        };
        let standings = logic::compute_table(&group.teams, &self.tournament.matches);
        let round = logic::generate_swiss_round(
            &group.teams,
            &standings,
            current + 1,
            &self.tournament.matches,
            &self.tournament.swiss_byes,
        );
        self.tournament.matches.extend(round.matches.iter().cloned());
        if let Some(team) = &round.bye {
            self.tournament.swiss_byes.push(crate::models::SwissBye {
                round: round.round,
                team: team.clone(),
            });
        }
        log::info!(
            "paired swiss round {}: {} matches, bye: {}",
            round.round,
            round.matches.len(),
            round.bye.as_deref().unwrap_or("none")
        );
        self.commit();
        Ok(round)
    }

    fn group_stage_open(&self) -> bool {
        self.tournament
            .matches
            .iter()
            .any(|m| matches!(m.phase, Phase::Group | Phase::Penalty) && !m.completed)
    }

    /// Ranking used to seed the knockout bracket.
    pub fn final_table(&self) -> Vec<String> {
        logic::final_table(&self.tournament.groups, &self.tournament.matches)
    }

    /// Replace the (unplayed) knockout bracket.
    ///
    /// Without an explicit `table` the bracket is seeded from the group tables, which
    /// requires every group match and shootout to be complete. Options default to the
    /// tournament config.
    pub fn generate_knockout(
        &mut self,
        table: Option<Vec<String>>,
        options: Option<KnockoutOptions>,
    ) -> Result<Vec<Match>, TournamentError> {
        self.require_status(
            "generate the knockout stage",
            &[TournamentStatus::Closed, TournamentStatus::Active],
        )?;
        if self
            .tournament
            .matches
            .iter()
            .any(|m| matches!(m.phase, Phase::Knockout | Phase::Placement) && (m.completed || m.is_live()))
        {
            return self.rejected(
                "knockout generation",
                TournamentError::Rejected("the knockout stage is already under way".to_string()),
            );
        }
        let table = match table {
            Some(names) => {
                let mut canonical: Vec<String> = Vec::with_capacity(names.len());
                for name in &names {
                    let team = self.tournament.find_team(name)?.name.clone();
                    if canonical.contains(&team) {
                        let err = TournamentError::Rejected(format!(
                            "{} appears twice in the table",
                            team
                        ));
                        return self.rejected("knockout generation", err);
                    }
                    canonical.push(team);
                }
                canonical
            }
            None => {
                if self.group_stage_open() {
                    return self.rejected(
                        "knockout generation",
                        TournamentError::Rejected("the group stage is not complete".to_string()),
                    );
                }
                self.final_table()
            }
        };
        let options = options
            .or_else(|| self.tournament.config.map(|c| c.knockout))
            .unwrap_or_default();
        let bracket = match logic::generate_knockout(&table, &options) {
            Ok(bracket) => bracket,
            Err(e) => return self.rejected("knockout generation", e),
        };
        self.tournament
            .matches
            .retain(|m| !matches!(m.phase, Phase::Knockout | Phase::Placement));
        self.tournament.matches.extend(bracket.iter().cloned());
        log::info!("knockout stage generated: {} matches", bracket.len());
        self.commit();
        Ok(bracket)
    }

    /// Add shootouts for teams level after the group stage. Shootouts that already exist
    /// are kept; only missing ones are added and returned.
    pub fn generate_penalty_shootouts(&mut self) -> Result<Vec<Match>, TournamentError> {
        self.require_status(
            "generate penalty shootouts",
            &[TournamentStatus::Closed, TournamentStatus::Active],
        )?;
        if self
            .tournament
            .matches
            .iter()
            .any(|m| m.phase == Phase::Group && !m.completed)
        {
            return self.rejected(
                "shootout generation",
                TournamentError::Rejected("the group stage is not complete".to_string()),
            );
        }
        let added: Vec<Match> =
            logic::generate_penalty_shootouts(&self.tournament.groups, &self.tournament.matches)
                .into_iter()
                .filter(|s| self.tournament.matches.iter().all(|m| m.id != s.id))
                .collect();
        if !added.is_empty() {
            self.tournament.matches.extend(added.iter().cloned());
            log::info!("added {} penalty shootout(s)", added.len());
            self.commit();
        }
        Ok(added)
    }

    /// Current tables, recomputed from the match history.
    pub fn standings(&self) -> Vec<(String, Vec<Standing>)> {
        self.tournament
            .groups
            .iter()
            .map(|g| (g.name.clone(), logic::compute_table(&g.teams, &self.tournament.matches)))
            .collect()
    }

    // Results and manual fixtures

    /// Enter or correct the result of a match that is not live. Level knockout and
    /// placement games need `penalties` with a winner; shootouts need a winner.
    pub fn record_result(
        &mut self,
        id: MatchId,
        score1: u32,
        score2: u32,
        penalties: Option<(u32, u32)>,
    ) -> Result<Match, TournamentError> {
        self.require_status(
            "enter a result",
            &[
                TournamentStatus::Closed,
                TournamentStatus::Active,
                TournamentStatus::Finished,
            ],
        )?;
        let m = self.tournament.find_match(id)?;
        if m.is_live() {
            return self.rejected("result entry", TournamentError::MatchIsLive(id));
        }
        if self.tournament.resolved_teams(m).is_none() {
            return self.rejected("result entry", TournamentError::UnresolvedTeams(id));
        }
        let penalties = match settle(m, score1, score2, penalties) {
            Ok(penalties) => penalties,
            Err(e) => return self.rejected("result entry", e),
        };

        let m = self.tournament.find_match_mut(id)?;
        m.score1 = Some(score1);
        m.score2 = Some(score2);
        m.penalties = penalties;
        m.completed = true;
        let updated = m.clone();
        self.after_result(&updated);
        log::info!("result {} {}:{} ({})", updated.label, score1, score2, id);
        self.commit();
        self.sink.publish(&MatchEvent::MatchResultAdded(updated.clone()));
        Ok(updated)
    }

    /// Status bookkeeping after a match got a result.
    fn after_result(&mut self, m: &Match) {
        if self.tournament.status == TournamentStatus::Closed {
            self.tournament.status = TournamentStatus::Active;
        }
        if m.phase == Phase::Knockout && m.label == logic::FINAL_LABEL {
            if let Some(champion) = self.tournament.winner_of(m) {
                log::info!("{} wins the tournament {}", champion, self.tournament.year);
                self.tournament.status = TournamentStatus::Finished;
            }
        }
    }

    /// Add a match by hand between two registered teams.
    pub fn add_match(
        &mut self,
        team1: &str,
        team2: &str,
        label: &str,
        phase: Phase,
    ) -> Result<Match, TournamentError> {
        let t1 = self.tournament.find_team(team1)?.name.clone();
        let t2 = self.tournament.find_team(team2)?.name.clone();
        if t1 == t2 {
            return self.rejected(
                "manual match",
                TournamentError::Rejected("a team cannot play itself".to_string()),
            );
        }
        let m = Match::new(Slot::team(t1), Slot::team(t2), label.trim(), phase);
        self.tournament.matches.push(m.clone());
        log::info!("added match {} ({})", m.label, m.id);
        self.commit();
        Ok(m)
    }

    pub fn delete_match(&mut self, id: MatchId) -> Result<Match, TournamentError> {
        let m = self.tournament.find_match(id)?;
        if m.is_live() {
            return self.rejected("match deletion", TournamentError::MatchIsLive(id));
        }
        let refers = |slot: &Slot| matches!(slot, Slot::Winner(r) | Slot::Loser(r) if *r == id);
        if let Some(dependant) = self
            .tournament
            .matches
            .iter()
            .find(|d| refers(&d.team1) || refers(&d.team2))
        {
            let reason = format!("{} is referenced by {}", m.label, dependant.label);
            return self.rejected("match deletion", TournamentError::Rejected(reason));
        }
        let removed = m.clone();
        self.tournament.matches.retain(|m| m.id != id);
        log::info!("deleted match {} ({})", removed.label, id);
        self.commit();
        Ok(removed)
    }

    /// Schedule every open, unscheduled match from `start` on.
    pub fn schedule_matches(
        &mut self,
        start: DateTime<Utc>,
        slot_minutes: u32,
        fields: &[String],
    ) -> Result<usize, TournamentError> {
        if fields.is_empty() || slot_minutes == 0 {
            return self.rejected(
                "scheduling",
                TournamentError::Rejected("need at least one field and a slot length".to_string()),
            );
        }
        let count = logic::schedule_matches(&mut self.tournament.matches, start, slot_minutes, fields);
        log::info!("scheduled {} match(es) on {} field(s)", count, fields.len());
        self.commit();
        Ok(count)
    }

    /// Admin override; may move the status backwards.
    pub fn set_status(&mut self, status: TournamentStatus) {
        if status != self.tournament.status {
            log::warn!("status forced from {} to {}", self.tournament.status, status);
            self.tournament.status = status;
            self.commit();
        }
    }

    /// Back to registration with the same teams; fixtures, groups and live state go.
    pub fn reset(&mut self) {
        let year = self.tournament.year;
        let teams = std::mem::take(&mut self.tournament.teams);
        self.tournament = Tournament {
            teams,
            ..Tournament::new(year)
        };
        log::warn!("tournament {} reset to registration", year);
        self.commit();
    }

    // Live clock

    fn clock_command(
        &mut self,
        id: MatchId,
        action: ClockAction,
        event: fn(Match) -> MatchEvent,
        op: impl FnOnce(&mut Tournament) -> Result<(), TournamentError>,
    ) -> Result<Match, TournamentError> {
        if let Err(e) = op(&mut self.tournament) {
            log::warn!("rejected {} on match {}: {}", action, id, e);
            return Err(e);
        }
        let updated = self.tournament.find_match(id)?.clone();
        log::info!("{}: {} ({})", action, updated.label, id);
        self.commit();
        self.sink.publish(&event(updated.clone()));
        Ok(updated)
    }

    /// Kick off `id`. Fails with `ConcurrentLiveMatch` while another match is live.
    pub fn start_match(
        &mut self,
        id: MatchId,
        half_time_minutes: Option<u32>,
        now: DateTime<Utc>,
    ) -> Result<Match, TournamentError> {
        let half = half_time_minutes
            .or_else(|| self.tournament.config.map(|c| c.half_time_minutes))
            .unwrap_or(self.default_half_time_minutes);
        self.clock_command(id, ClockAction::Start, MatchEvent::MatchStarted, |t| {
            if !matches!(t.status, TournamentStatus::Closed | TournamentStatus::Active) {
                return Err(TournamentError::WrongStatus {
                    action: "start a match",
                    status: t.status,
                });
            }
            if let Some(live) = t.live_match.filter(|&live| live != id) {
                return Err(TournamentError::ConcurrentLiveMatch { live });
            }
            if half == 0 {
                return Err(TournamentError::Rejected(
                    "half length must be at least one minute".to_string(),
                ));
            }
            if t.resolved_teams(t.find_match(id)?).is_none() {
                return Err(TournamentError::UnresolvedTeams(id));
            }
            clock::start(t.find_match_mut(id)?, half, now)?;
            t.live_match = Some(id);
            t.status = TournamentStatus::Active;
            Ok(())
        })
    }

    pub fn pause_match(&mut self, id: MatchId, now: DateTime<Utc>) -> Result<Match, TournamentError> {
        self.clock_command(id, ClockAction::Pause, MatchEvent::MatchPaused, |t| {
            clock::pause(t.find_match_mut(id)?, now)
        })
    }

    pub fn resume_match(&mut self, id: MatchId, now: DateTime<Utc>) -> Result<Match, TournamentError> {
        self.clock_command(id, ClockAction::Resume, MatchEvent::MatchResumed, |t| {
            clock::resume(t.find_match_mut(id)?, now)
        })
    }

    pub fn start_halftime(&mut self, id: MatchId, now: DateTime<Utc>) -> Result<Match, TournamentError> {
        self.clock_command(id, ClockAction::StartHalftime, MatchEvent::HalftimeStarted, |t| {
            clock::start_halftime(t.find_match_mut(id)?, now)
        })
    }

    pub fn start_second_half(
        &mut self,
        id: MatchId,
        now: DateTime<Utc>,
    ) -> Result<Match, TournamentError> {
        self.clock_command(
            id,
            ClockAction::StartSecondHalf,
            MatchEvent::SecondHalfStarted,
            |t| clock::start_second_half(t.find_match_mut(id)?, now),
        )
    }

    /// Fold the live score into the result and free the live slot.
    ///
    /// A match that needs a winner and is level at the final whistle must be
    /// given decisive `penalties`; otherwise nothing changes.
    pub fn finish_match(
        &mut self,
        id: MatchId,
        penalties: Option<(u32, u32)>,
    ) -> Result<Match, TournamentError> {
        let updated = self.clock_command(id, ClockAction::Finish, MatchEvent::MatchFinished, |t| {
            let m = t.find_match_mut(id)?;
            let penalties = match (&m.live, clock::clock_state(m)) {
                (Some(live), ClockState::SecondHalf) if !live.is_paused => {
                    settle(m, live.score1, live.score2, penalties)?
                }
                _ => None,
            };
            clock::finish(m)?;
            m.penalties = penalties;
            t.live_match = None;
            Ok(())
        })?;
        let status = self.tournament.status;
        self.after_result(&updated);
        if status != self.tournament.status {
            self.commit();
        }
        Ok(updated)
    }

    /// Emergency stop: no result, the match can be started again.
    pub fn abort_match(&mut self, id: MatchId) -> Result<Match, TournamentError> {
        self.clock_command(id, ClockAction::Abort, MatchEvent::MatchAborted, |t| {
            clock::abort(t.find_match_mut(id)?)?;
            t.live_match = None;
            Ok(())
        })
    }

    /// Set the live score of the match on the clock.
    pub fn update_live_score(
        &mut self,
        id: MatchId,
        score1: u32,
        score2: u32,
    ) -> Result<Match, TournamentError> {
        if !self.tournament.find_match(id)?.is_live() {
            return self.rejected(
                "live score update",
                TournamentError::Rejected(format!("match {} is not live", id)),
            );
        }
        let m = self.tournament.find_match_mut(id)?;
        if let Some(live) = m.live.as_mut() {
            live.score1 = score1;
            live.score2 = score2;
        }
        let updated = m.clone();
        log::info!("live score {} {}:{}", updated.label, score1, score2);
        self.commit();
        self.sink.publish(&MatchEvent::LiveScoreUpdate(updated.clone()));
        Ok(updated)
    }

    /// Clock of the live match at `now`, if a match is live.
    pub fn clock_reading(&self, now: DateTime<Utc>) -> Option<LiveClock> {
        let m = self.tournament.live()?;
        let live = m.live.as_ref()?;
        let (team1, team2) = self.tournament.resolved_teams(m)?;
        Some(LiveClock {
            match_id: m.id,
            team1,
            team2,
            score1: live.score1,
            score2: live.score2,
            reading: logic::clock_reading(live, now),
        })
    }
}

/// The penalties to keep for a final score, or why the score cannot stand.
///
/// Knockout, placement and shootout matches need a winner; penalties only count
/// on a level score outside a shootout.
fn settle(
    m: &Match,
    score1: u32,
    score2: u32,
    penalties: Option<(u32, u32)>,
) -> Result<Option<(u32, u32)>, TournamentError> {
    let penalties = penalties.filter(|_| score1 == score2 && m.phase != Phase::Penalty);
    let decided = score1 != score2 || penalties.is_some_and(|(p1, p2)| p1 != p2);
    let needs_winner = matches!(m.phase, Phase::Knockout | Phase::Placement | Phase::Penalty);
    if needs_winner && !decided {
        return Err(TournamentError::Rejected(format!("{} needs a winner", m.label)));
    }
    Ok(penalties)
}
