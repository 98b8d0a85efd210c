//! Integration tests for admin commands: lifecycle, live clock, events and persistence.

use chrono::{DateTime, Duration, TimeZone, Utc};
use cup_referee::{
    AppConfig, Format, JsonFileStore, KnockoutOptions, Match, MatchEvent, MatchId, MemoryStore,
    Orchestrator, Phase, RecordingSink, SnapshotStore, Tournament, TournamentConfig,
    TournamentError, TournamentStatus,
};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

const YEAR: i32 = 2026;

type TestOrchestrator = Orchestrator<MemoryStore, RecordingSink>;

fn at(secs: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 6, 13, 10, 0, 0).unwrap() + Duration::seconds(secs)
}

fn with_teams(n: usize) -> TestOrchestrator {
    let mut o = Orchestrator::new(Tournament::new(YEAR), MemoryStore::new(), RecordingSink::new());
    for i in 1..=n {
        o.register_team(&format!("T{i}"), "red", None, at(0)).unwrap();
    }
    o
}

fn groups_of(size: u32) -> TournamentConfig {
    TournamentConfig::new(Format::Groups {
        group_size: size,
        max_games_per_team: None,
    })
}

fn open_group_matches(o: &TestOrchestrator) -> Vec<MatchId> {
    o.tournament()
        .matches
        .iter()
        .filter(|m| m.phase == Phase::Group && !m.completed)
        .map(|m| m.id)
        .collect()
}

/// Start a match and play it to the second half.
fn into_second_half(o: &mut TestOrchestrator, id: MatchId) {
    o.start_match(id, Some(10), at(0)).unwrap();
    o.start_halftime(id, at(600)).unwrap();
    o.start_second_half(id, at(900)).unwrap();
}

/// Eight teams through the group stage into semifinals, 3rd place match and final.
fn bracket() -> (TestOrchestrator, Vec<Match>) {
    let mut o = with_teams(8);
    o.close_registration(groups_of(4)).unwrap();
    for id in open_group_matches(&o) {
        o.record_result(id, 1, 0, None).unwrap();
    }
    let options = KnockoutOptions {
        third_place: true,
        ..KnockoutOptions::default()
    };
    let bracket = o.generate_knockout(None, Some(options)).unwrap();
    (o, bracket)
}

#[test]
fn registration_rules() {
    let mut o = with_teams(2);
    assert_eq!(
        o.register_team(" t1 ", "blue", None, at(1)).unwrap_err(),
        TournamentError::DuplicateTeamName
    );
    assert_eq!(
        o.register_team("   ", "blue", None, at(1)).unwrap_err(),
        TournamentError::EmptyTeamName
    );
    assert_eq!(o.tournament().color_usage().get("red"), Some(&2));

    o.remove_team("T2").unwrap();
    assert_eq!(o.tournament().team_names(), vec!["T1"]);
    assert!(matches!(
        o.remove_team("T9"),
        Err(TournamentError::TeamNotFound(_))
    ));
}

#[test]
fn csv_import_reports_rejected_rows() {
    let mut o = with_teams(0);
    let csv = "name,color,contact\nLions,red,\nTigers, blue ,coach@example.org\n,green,\nlions,yellow,\n";
    let report = o.import_teams_csv(csv.as_bytes(), at(0)).unwrap();
    assert_eq!(report.registered, vec!["Lions", "Tigers"]);
    let rejected: Vec<usize> = report.rejected.iter().map(|(line, _)| *line).collect();
    assert_eq!(rejected, vec![3, 4]);
    let tigers = o.tournament().find_team("tigers").unwrap();
    assert_eq!(tigers.color, "blue");
    assert_eq!(tigers.contact.as_deref(), Some("coach@example.org"));
}

#[test]
fn close_registration_generates_fixtures() {
    let mut o = with_teams(8);
    let writes = o.store().writes();
    let fixtures = o.close_registration(groups_of(4)).unwrap();
    assert_eq!(fixtures.matches.len(), 12);
    let t = o.tournament();
    assert_eq!(t.status, TournamentStatus::Closed);
    assert_eq!(t.groups.len(), 2);
    assert_eq!(t.matches, fixtures.matches);
    assert!(o.store().writes() > writes);

    assert!(matches!(
        o.register_team("Late", "green", None, at(5)),
        Err(TournamentError::WrongStatus { .. })
    ));
}

#[test]
fn infeasible_close_changes_nothing() {
    let mut o = with_teams(5);
    let before = o.tournament().clone();
    let config = TournamentConfig::new(Format::Groups {
        group_size: 5,
        max_games_per_team: Some(3),
    });
    match o.close_registration(config) {
        Err(TournamentError::Infeasible(analysis)) => {
            assert!(analysis
                .recommendations
                .contains(&"reduce maxGamesPerTeam to 2".to_string()));
        }
        other => panic!("expected infeasible, got {:?}", other),
    }
    assert_eq!(o.tournament(), &before);
    assert!(o.analyze_config(&Format::League {
        max_games_per_team: None
    })
    .feasible);
}

#[test]
fn live_match_lifecycle_publishes_each_transition() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let id = open_group_matches(&o)[0];

    o.start_match(id, None, at(0)).unwrap();
    assert_eq!(o.tournament().status, TournamentStatus::Active);
    assert_eq!(o.tournament().live_match, Some(id));
    o.pause_match(id, at(60)).unwrap();
    o.resume_match(id, at(90)).unwrap();
    o.start_halftime(id, at(630)).unwrap();
    o.start_second_half(id, at(900)).unwrap();
    o.update_live_score(id, 2, 1).unwrap();
    let finished = o.finish_match(id, None).unwrap();

    assert_eq!(
        o.sink().names(),
        vec![
            "match-started",
            "match-paused",
            "match-resumed",
            "halftime-started",
            "second-half-started",
            "live-score-update",
            "match-finished",
        ]
    );
    assert!(o.sink().events().iter().all(|e| e.game().id == id));
    assert_eq!(finished.final_score(), Some((2, 1)));
    assert_eq!(o.tournament().live_match, None);

    let (team1, _) = finished.fixed_teams().unwrap();
    let table = &o.tournament().groups[0].table;
    assert_eq!(table[0].team, team1);
    assert_eq!(table[0].points, 3);
}

#[test]
fn second_match_cannot_start_while_one_is_live() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let ids = open_group_matches(&o);

    o.start_match(ids[0], Some(10), at(0)).unwrap();
    let before = o.tournament().clone();
    assert_eq!(
        o.start_match(ids[1], Some(10), at(5)).unwrap_err(),
        TournamentError::ConcurrentLiveMatch { live: ids[0] }
    );
    assert_eq!(o.tournament(), &before);
    assert_eq!(o.sink().names(), vec!["match-started"]);

    assert!(matches!(
        o.delete_match(ids[0]),
        Err(TournamentError::MatchIsLive(_))
    ));
    assert!(matches!(
        o.record_result(ids[0], 1, 0, None),
        Err(TournamentError::MatchIsLive(_))
    ));
    assert!(matches!(
        o.reconfigure(groups_of(4)),
        Err(TournamentError::ConcurrentLiveMatch { .. })
    ));
}

#[test]
fn rejected_transition_publishes_nothing() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let id = open_group_matches(&o)[0];
    o.start_match(id, Some(10), at(0)).unwrap();
    o.pause_match(id, at(10)).unwrap();
    assert!(matches!(
        o.pause_match(id, at(20)),
        Err(TournamentError::InvalidTransition { paused: true, .. })
    ));
    assert!(o.finish_match(id, None).is_err());
    assert_eq!(o.sink().names(), vec!["match-started", "match-paused"]);
}

#[test]
fn abort_allows_a_fresh_start() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let id = open_group_matches(&o)[0];
    o.start_match(id, Some(10), at(0)).unwrap();
    o.pause_match(id, at(30)).unwrap();
    o.update_live_score(id, 1, 0).unwrap();

    let aborted = o.abort_match(id).unwrap();
    assert!(!aborted.completed);
    assert!(aborted.live.is_none());
    assert_eq!(o.tournament().live_match, None);
    assert_eq!(o.sink().names().last(), Some(&"match-aborted"));

    let restarted = o.start_match(id, Some(10), at(500)).unwrap();
    let live = restarted.live.unwrap();
    assert_eq!(live.start_time, at(500));
    assert_eq!((live.score1, live.score2, live.paused_ms), (0, 0, 0));
}

#[test]
fn clock_reading_for_scoreboards() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    assert!(o.clock_reading(at(0)).is_none());
    let id = open_group_matches(&o)[0];
    o.start_match(id, Some(10), at(0)).unwrap();
    o.update_live_score(id, 0, 1).unwrap();

    let clock = o.clock_reading(at(65)).unwrap();
    assert_eq!(clock.match_id, id);
    assert_eq!(clock.reading.label, "01:05");
    assert_eq!((clock.score1, clock.score2), (0, 1));
    assert!(matches!(
        o.update_live_score(open_group_matches(&o)[1], 1, 1),
        Err(TournamentError::Rejected(_))
    ));
}

#[test]
fn recorded_result_updates_table_and_publishes() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let id = open_group_matches(&o)[0];
    let m = o.record_result(id, 3, 0, None).unwrap();
    assert!(m.completed);
    assert_eq!(o.tournament().status, TournamentStatus::Active);
    assert_eq!(o.sink().names(), vec!["match-result-added"]);
    assert_eq!(o.tournament().groups[0].table[0].points, 3);

    // Correction replaces the result.
    o.record_result(id, 0, 0, None).unwrap();
    let table = &o.tournament().groups[0].table;
    assert_eq!(table.iter().map(|s| s.points).sum::<u32>(), 2);
}

#[test]
fn knockout_flow_to_champion() {
    let mut o = with_teams(8);
    o.close_registration(groups_of(4)).unwrap();
    let options = KnockoutOptions {
        third_place: true,
        ..KnockoutOptions::default()
    };
    assert!(matches!(
        o.generate_knockout(None, Some(options)),
        Err(TournamentError::Rejected(_))
    ));

    for id in open_group_matches(&o) {
        o.record_result(id, 1, 0, None).unwrap();
    }
    let table = o.final_table();
    let bracket = o.generate_knockout(None, Some(options)).unwrap();
    let labels: Vec<&str> = bracket.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Semifinal 1", "Semifinal 2", "Match for 3rd place", "Final"]
    );
    let (sf1, sf2, third, final_id) = (bracket[0].id, bracket[1].id, bracket[2].id, bracket[3].id);

    assert_eq!(
        o.start_match(final_id, None, at(0)).unwrap_err(),
        TournamentError::UnresolvedTeams(final_id)
    );
    assert_eq!(o.tournament().live_match, None);

    assert!(matches!(
        o.record_result(sf1, 1, 1, None),
        Err(TournamentError::Rejected(_))
    ));
    o.record_result(sf1, 1, 1, Some((4, 3))).unwrap();
    o.record_result(sf2, 2, 0, None).unwrap();

    // Regenerating is refused once the bracket has results.
    assert!(o.generate_knockout(None, Some(options)).is_err());

    o.record_result(third, 1, 0, None).unwrap();
    assert_eq!(o.tournament().status, TournamentStatus::Active);
    let final_match = o.record_result(final_id, 3, 2, None).unwrap();
    assert_eq!(o.tournament().status, TournamentStatus::Finished);
    assert_eq!(o.tournament().winner_of(&final_match), Some(table[0].clone()));
}

#[test]
fn level_knockout_match_needs_penalties_at_the_whistle() {
    let (mut o, bracket) = bracket();
    let (sf1, sf2, final_id) = (bracket[0].id, bracket[1].id, bracket[3].id);
    into_second_half(&mut o, sf1);
    o.update_live_score(sf1, 1, 1).unwrap();
    let before = o.tournament().clone();
    let published = o.sink().names().len();

    match o.finish_match(sf1, None) {
        Err(TournamentError::Rejected(reason)) => assert_eq!(reason, "Semifinal 1 needs a winner"),
        other => panic!("expected a rejection, got {:?}", other),
    }
    assert!(o.finish_match(sf1, Some((3, 3))).is_err());
    assert_eq!(o.tournament(), &before);
    assert_eq!(o.sink().names().len(), published);
    assert_eq!(o.tournament().live_match, Some(sf1));

    let finished = o.finish_match(sf1, Some((4, 3))).unwrap();
    assert!(finished.completed);
    assert_eq!(finished.final_score(), Some((1, 1)));
    assert_eq!(finished.penalties, Some((4, 3)));
    assert_eq!(o.tournament().live_match, None);
    assert_eq!(o.sink().names().last(), Some(&"match-finished"));

    o.record_result(sf2, 2, 0, None).unwrap();
    let (sf1_team1, _) = finished.fixed_teams().unwrap();
    let (finalist, _) = o
        .tournament()
        .resolved_teams(o.tournament().find_match(final_id).unwrap())
        .unwrap();
    assert_eq!(finalist, sf1_team1);
}

#[test]
fn decisive_live_score_ignores_penalties() {
    let (mut o, bracket) = bracket();
    let sf1 = bracket[0].id;
    into_second_half(&mut o, sf1);
    o.update_live_score(sf1, 2, 0).unwrap();
    let finished = o.finish_match(sf1, Some((5, 4))).unwrap();
    assert_eq!(finished.final_score(), Some((2, 0)));
    assert_eq!(finished.penalties, None);
}

#[test]
fn knockout_table_naming_a_team_twice_is_rejected() {
    let mut o = with_teams(8);
    o.close_registration(groups_of(4)).unwrap();
    let before = o.tournament().clone();
    let table = vec!["T1", "T2", "t1", "T3"]
        .into_iter()
        .map(String::from)
        .collect();
    match o.generate_knockout(Some(table), None) {
        Err(TournamentError::Rejected(reason)) => {
            assert_eq!(reason, "T1 appears twice in the table")
        }
        other => panic!("expected a rejection, got {:?}", other),
    }
    assert_eq!(o.tournament(), &before);
}

#[test]
fn bracket_match_with_dependants_cannot_be_deleted() {
    let (mut o, bracket) = bracket();
    let count = o.tournament().matches.len();
    match o.delete_match(bracket[0].id) {
        Err(TournamentError::Rejected(reason)) => {
            assert!(reason.starts_with("Semifinal 1 is referenced by"), "{}", reason)
        }
        other => panic!("expected a rejection, got {:?}", other),
    }
    assert_eq!(o.tournament().matches.len(), count);

    // Once nothing feeds from it, the semifinal can go.
    o.delete_match(bracket[3].id).unwrap();
    o.delete_match(bracket[2].id).unwrap();
    o.delete_match(bracket[0].id).unwrap();
    assert_eq!(o.tournament().matches.len(), count - 3);
}

#[test]
fn swiss_rounds_on_demand() {
    let mut o = with_teams(4);
    o.close_registration(TournamentConfig::new(Format::Swiss { rounds: Some(3) }))
        .unwrap();
    assert!(matches!(
        o.next_swiss_round(),
        Err(TournamentError::Rejected(_))
    ));

    for round in 2..=3 {
        for id in open_group_matches(&o) {
            o.record_result(id, 2, 0, None).unwrap();
        }
        let next = o.next_swiss_round().unwrap();
        assert_eq!(next.round, round);
        assert_eq!(next.matches.len(), 2);
    }
    for id in open_group_matches(&o) {
        o.record_result(id, 2, 0, None).unwrap();
    }
    assert!(o.next_swiss_round().is_err());

    let pairs: HashSet<(String, String)> = o
        .tournament()
        .matches
        .iter()
        .map(|m| {
            let (a, b) = m.fixed_teams().unwrap();
            (a.min(b).to_string(), a.max(b).to_string())
        })
        .collect();
    assert_eq!(pairs.len(), 6);
}

#[test]
fn shootouts_decide_a_level_league() {
    let mut o = with_teams(3);
    o.close_registration(TournamentConfig::new(Format::League {
        max_games_per_team: None,
    }))
    .unwrap();
    for id in open_group_matches(&o) {
        o.record_result(id, 1, 1, None).unwrap();
    }
    let shootouts = o.generate_penalty_shootouts().unwrap();
    assert_eq!(shootouts.len(), 3);
    assert!(o.generate_penalty_shootouts().unwrap().is_empty());

    assert!(matches!(
        o.record_result(shootouts[0].id, 4, 4, None),
        Err(TournamentError::Rejected(_))
    ));
    for s in &shootouts {
        o.record_result(s.id, 2, 3, None).unwrap();
    }
    let order: Vec<&str> = o.tournament().groups[0]
        .table
        .iter()
        .map(|s| s.team.as_str())
        .collect();
    assert_eq!(order, vec!["T3", "T2", "T1"]);
}

#[test]
fn manual_matches_and_admin_overrides() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let friendly = o.add_match("t1", "T2", "Friendly", Phase::Placement).unwrap();
    assert_eq!(friendly.fixed_teams(), Some(("T1", "T2")));
    assert!(o.add_match("T1", "t1", "Solo", Phase::Group).is_err());
    o.delete_match(friendly.id).unwrap();
    assert!(matches!(
        o.delete_match(friendly.id),
        Err(TournamentError::MatchNotFound(_))
    ));

    let fields = vec!["Pitch 1".to_string()];
    assert_eq!(o.schedule_matches(at(0), 20, &fields).unwrap(), 6);
    assert!(o.schedule_matches(at(0), 20, &[]).is_err());

    o.set_status(TournamentStatus::Registration);
    assert_eq!(o.tournament().status, TournamentStatus::Registration);

    o.reset();
    let t = o.tournament();
    assert_eq!(t.status, TournamentStatus::Registration);
    assert_eq!(t.teams.len(), 4);
    assert!(t.matches.is_empty() && t.groups.is_empty() && t.config.is_none());
}

#[test]
fn reconfigure_replaces_fixtures() {
    let mut o = with_teams(8);
    o.close_registration(groups_of(4)).unwrap();
    let id = open_group_matches(&o)[0];
    o.record_result(id, 1, 0, None).unwrap();

    let fixtures = o
        .reconfigure(TournamentConfig::new(Format::League {
            max_games_per_team: Some(3),
        }))
        .unwrap();
    assert_eq!(fixtures.matches.len(), 12);
    let t = o.tournament();
    assert_eq!(t.status, TournamentStatus::Closed);
    assert_eq!(t.groups.len(), 1);
    assert!(t.matches.iter().all(|m| !m.completed));
}

#[test]
fn concurrent_commands_apply_in_order() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let id = open_group_matches(&o)[0];
    into_second_half(&mut o, id);
    let shared = Mutex::new(o);

    let outcomes: Vec<bool> = std::thread::scope(|s| {
        let pause = s.spawn(|| shared.lock().unwrap().pause_match(id, at(1000)).is_ok());
        let finish = s.spawn(|| shared.lock().unwrap().finish_match(id, None).is_ok());
        vec![pause.join().unwrap(), finish.join().unwrap()]
    });

    // Either order is fine, but exactly one command wins.
    assert_eq!(outcomes.iter().filter(|ok| **ok).count(), 1);
    let o = shared.into_inner().unwrap();
    let m = o.tournament().find_match(id).unwrap();
    if outcomes[0] {
        assert!(m.live.as_ref().unwrap().is_paused);
        assert_eq!(o.tournament().live_match, Some(id));
    } else {
        assert!(m.completed);
        assert_eq!(o.tournament().live_match, None);
    }
}

#[test]
fn snapshot_round_trip_in_memory() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let id = open_group_matches(&o)[0];
    o.start_match(id, Some(10), at(0)).unwrap();
    o.pause_match(id, at(42)).unwrap();

    let saved = o.store().load(YEAR).unwrap().unwrap();
    assert_eq!(&saved, o.tournament());
    assert!(o.store().load(YEAR + 1).unwrap().is_none());
}

#[test]
fn snapshot_round_trip_on_disk() {
    let dir = std::env::temp_dir().join(format!("cup_referee_{}", uuid::Uuid::new_v4()));
    let store = JsonFileStore::new(&dir);
    let mut o = Orchestrator::load(YEAR, store, RecordingSink::new()).unwrap();
    assert_eq!(o.tournament(), &Tournament::new(YEAR));
    for name in ["Lions", "Tigers", "Bears", "Wolves"] {
        o.register_team(name, "green", Some("captain".to_string()), at(0))
            .unwrap();
    }
    o.close_registration(groups_of(4)).unwrap();
    let id = open_ids(o.tournament())[0];
    o.record_result(id, 2, 2, None).unwrap();

    assert!(o.store().path_for(YEAR).exists());
    let reloaded = Orchestrator::load(YEAR, JsonFileStore::new(&dir), RecordingSink::new()).unwrap();
    assert_eq!(reloaded.tournament(), o.tournament());
    std::fs::remove_dir_all(&dir).unwrap();
}

fn open_ids(t: &Tournament) -> Vec<MatchId> {
    t.matches.iter().filter(|m| !m.completed).map(|m| m.id).collect()
}

#[test]
fn events_serialize_with_kebab_case_names() {
    let mut o = with_teams(4);
    o.close_registration(groups_of(4)).unwrap();
    let id = open_group_matches(&o)[0];
    o.start_match(id, Some(10), at(0)).unwrap();
    let event = &o.sink().events()[0];
    let json = serde_json::to_value(event).unwrap();
    assert_eq!(json["event"], "match-started");
    assert_eq!(json["match"]["id"], id.to_string());
    let back: MatchEvent = serde_json::from_value(json).unwrap();
    assert_eq!(&back, event);
}

#[test]
fn app_config_from_lookup() {
    let env: HashMap<&str, &str> = [
        ("PORT", "9000"),
        ("DATA_DIR", "/var/lib/cup"),
        ("TOURNAMENT_YEAR", "2025"),
        ("HALF_TIME_MINUTES", "0"),
    ]
    .into_iter()
    .collect();
    let config = AppConfig::from_lookup(|key| env.get(key).map(|v| v.to_string()));
    assert_eq!(config.port, 9000);
    assert_eq!(config.year, 2025);
    assert_eq!(config.data_dir, std::path::PathBuf::from("/var/lib/cup"));
    assert_eq!(config.host, "0.0.0.0");
    // Zero minutes is not a valid half; the default applies.
    assert_eq!(config.half_time_minutes, 10);
}
