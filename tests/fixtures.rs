//! Integration tests for fixture generation: group stage, Swiss, knockout, shootouts,
//! referees and scheduling.

use chrono::{Duration, TimeZone, Utc};
use cup_referee::logic::{
    compute_table, generate_fixtures, generate_knockout, generate_penalty_shootouts,
    generate_swiss_round, schedule_matches, FINAL_LABEL,
};
use cup_referee::models::SwissBye;
use cup_referee::{
    Format, Group, KnockoutOptions, Match, Phase, Seeding, Slot, TournamentConfig,
    TournamentError,
};
use std::collections::{HashMap, HashSet};

fn teams(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("T{i}")).collect()
}

fn games_per_team(matches: &[Match]) -> HashMap<String, usize> {
    let mut games = HashMap::new();
    for m in matches {
        let (a, b) = m.fixed_teams().unwrap();
        *games.entry(a.to_string()).or_insert(0) += 1;
        *games.entry(b.to_string()).or_insert(0) += 1;
    }
    games
}

fn pair(m: &Match) -> (String, String) {
    let (a, b) = m.fixed_teams().unwrap();
    if a < b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

fn won_by_team1(mut m: Match) -> Match {
    m.completed = true;
    m.score1 = Some(1);
    m.score2 = Some(0);
    m
}

#[test]
fn groups_of_four_play_full_round_robin() {
    let config = TournamentConfig::new(Format::Groups {
        group_size: 4,
        max_games_per_team: None,
    });
    let set = generate_fixtures(&teams(8), &config).unwrap();
    assert_eq!(set.groups.len(), 2);
    assert_eq!(set.groups[0].name, "Group A");
    assert_eq!(set.groups[1].teams, vec!["T5", "T6", "T7", "T8"]);
    assert_eq!(set.matches.len(), 12);
    assert!(set.matches.iter().all(|m| m.phase == Phase::Group));
    assert!(games_per_team(&set.matches).values().all(|&g| g == 3));
    // Interleaved by round: round 1 of group A, then round 1 of group B.
    let labels: Vec<&str> = set.matches[..4].iter().map(|m| m.label.as_str()).collect();
    assert_eq!(labels, vec!["Group A", "Group A", "Group B", "Group B"]);
}

#[test]
fn fixtures_are_reproducible() {
    let config = TournamentConfig {
        seeding: Seeding::Shuffled { seed: 42 },
        ..TournamentConfig::default()
    };
    let a = generate_fixtures(&teams(12), &config).unwrap();
    let b = generate_fixtures(&teams(12), &config).unwrap();
    assert_eq!(a, b);
    let mut seeded: Vec<String> = a.groups.iter().flat_map(|g| g.teams.clone()).collect();
    seeded.sort();
    let mut all = teams(12);
    all.sort();
    assert_eq!(seeded, all);
}

#[test]
fn capped_games_give_regular_schedule() {
    let config = TournamentConfig::new(Format::Groups {
        group_size: 5,
        max_games_per_team: Some(2),
    });
    let set = generate_fixtures(&teams(5), &config).unwrap();
    assert_eq!(set.matches.len(), 5);
    assert!(games_per_team(&set.matches).values().all(|&g| g == 2));
    let pairs: HashSet<_> = set.matches.iter().map(pair).collect();
    assert_eq!(pairs.len(), 5);
}

#[test]
fn odd_cap_in_even_group() {
    let config = TournamentConfig::new(Format::League {
        max_games_per_team: Some(3),
    });
    let set = generate_fixtures(&teams(6), &config).unwrap();
    assert_eq!(set.matches.len(), 9);
    assert!(games_per_team(&set.matches).values().all(|&g| g == 3));
}

#[test]
fn infeasible_config_generates_nothing() {
    let config = TournamentConfig::new(Format::Groups {
        group_size: 5,
        max_games_per_team: Some(3),
    });
    match generate_fixtures(&teams(5), &config) {
        Err(TournamentError::Infeasible(analysis)) => {
            assert!(!analysis.recommendations.is_empty())
        }
        other => panic!("expected infeasible, got {:?}", other),
    }
}

#[test]
fn league_is_one_table() {
    let config = TournamentConfig::new(Format::League {
        max_games_per_team: None,
    });
    let set = generate_fixtures(&teams(6), &config).unwrap();
    assert_eq!(set.groups.len(), 1);
    assert_eq!(set.groups[0].name, "League");
    assert_eq!(set.matches.len(), 15);
}

#[test]
fn referees_come_from_the_group_and_do_not_play() {
    let config = TournamentConfig::new(Format::Groups {
        group_size: 3,
        max_games_per_team: None,
    });
    let set = generate_fixtures(&teams(6), &config).unwrap();
    for m in &set.matches {
        let referee = m.referee.as_ref().expect("group match without referee");
        assert!(!m.involves(&referee.team));
        assert_eq!(referee.group, m.label);
        let group = set.groups.iter().find(|g| g.name == m.label).unwrap();
        assert!(group.contains(&referee.team));
    }
}

#[test]
fn swiss_first_round_pairs_neighbours() {
    let config = TournamentConfig::new(Format::Swiss { rounds: None });
    let set = generate_fixtures(&teams(8), &config).unwrap();
    assert_eq!(set.matches.len(), 4);
    assert!(set.byes.is_empty());
    assert!(set.matches.iter().all(|m| m.round == Some(1)));
    assert_eq!(pair(&set.matches[0]), ("T1".to_string(), "T2".to_string()));
}

#[test]
fn swiss_odd_field_gives_bye_to_lowest_without_one() {
    let round = generate_swiss_round(&teams(7), &[], 1, &[], &[]);
    assert_eq!(round.matches.len(), 3);
    assert_eq!(round.bye.as_deref(), Some("T7"));

    let byes = vec![SwissBye {
        round: 1,
        team: "T7".to_string(),
    }];
    let history: Vec<Match> = round.matches.into_iter().map(won_by_team1).collect();
    let table = compute_table(&teams(7), &history);
    let second = generate_swiss_round(&teams(7), &table, 2, &history, &byes);
    assert!(second.bye.is_some());
    assert_ne!(second.bye.as_deref(), Some("T7"));
}

#[test]
fn swiss_avoids_rematches_while_possible() {
    let field = teams(4);
    let mut history: Vec<Match> = Vec::new();
    for round in 1..=3 {
        let table = compute_table(&field, &history);
        let next = generate_swiss_round(&field, &table, round, &history, &[]);
        assert_eq!(next.matches.len(), 2);
        history.extend(next.matches.into_iter().map(won_by_team1));
    }
    let pairs: HashSet<_> = history.iter().map(pair).collect();
    assert_eq!(pairs.len(), 6, "every pairing exactly once over three rounds");
}

#[test]
fn knockout_with_quarterfinals() {
    let options = KnockoutOptions {
        quarterfinals: true,
        ..KnockoutOptions::default()
    };
    let ko = generate_knockout(&teams(8), &options).unwrap();
    assert_eq!(ko.len(), 7);
    assert_eq!(ko[0].team1, Slot::team("T1"));
    assert_eq!(ko[0].team2, Slot::team("T8"));
    let sf1 = ko.iter().find(|m| m.label == "Semifinal 1").unwrap();
    assert_eq!(sf1.team1, Slot::Winner(ko[0].id));
    assert_eq!(sf1.team2, Slot::Winner(ko[3].id));
    assert_eq!(ko.last().unwrap().label, FINAL_LABEL);
}

#[test]
fn knockout_with_every_placement_game() {
    let options = KnockoutOptions {
        quarterfinals: true,
        third_place: true,
        fifth_place: true,
        seventh_place: true,
    };
    let ko = generate_knockout(&teams(8), &options).unwrap();
    assert_eq!(ko.len(), 10);
    let fifth = ko.iter().find(|m| m.label == "Match for 5th place").unwrap();
    assert_eq!(fifth.phase, Phase::Placement);
    assert_eq!(fifth.team1, Slot::Loser(ko[0].id));
    assert_eq!(fifth.team2, Slot::Loser(ko[1].id));
    let third = ko.iter().find(|m| m.label == "Match for 3rd place").unwrap();
    assert!(matches!(third.team1, Slot::Loser(_)));
}

#[test]
fn semifinals_without_quarterfinals() {
    let options = KnockoutOptions {
        third_place: true,
        ..KnockoutOptions::default()
    };
    let ko = generate_knockout(&teams(4), &options).unwrap();
    let labels: Vec<&str> = ko.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Semifinal 1", "Semifinal 2", "Match for 3rd place", "Final"]
    );
    assert_eq!(ko[0].fixed_teams(), Some(("T1", "T4")));
    assert_eq!(ko[1].fixed_teams(), Some(("T2", "T3")));
}

#[test]
fn toggles_without_enough_teams_are_ignored() {
    let options = KnockoutOptions {
        quarterfinals: true,
        fifth_place: true,
        seventh_place: true,
        ..KnockoutOptions::default()
    };
    let ko = generate_knockout(&teams(6), &options).unwrap();
    let labels: Vec<&str> = ko.iter().map(|m| m.label.as_str()).collect();
    assert_eq!(
        labels,
        vec!["Semifinal 1", "Semifinal 2", "Match for 5th place", "Final"]
    );
    assert_eq!(ko[2].fixed_teams(), Some(("T5", "T6")));
}

#[test]
fn knockout_needs_four_teams() {
    assert!(matches!(
        generate_knockout(&teams(3), &KnockoutOptions::default()),
        Err(TournamentError::NotEnoughTeams {
            required: 4,
            available: 3
        })
    ));
}

#[test]
fn shootouts_for_exactly_tied_teams() {
    let group = Group::new("Group A", teams(3));
    let draws: Vec<Match> = [("T1", "T2"), ("T1", "T3"), ("T2", "T3")]
        .iter()
        .map(|&(a, b)| {
            let mut m = Match::fixture(Slot::team(a), Slot::team(b), "Group A", Phase::Group);
            m.completed = true;
            m.score1 = Some(1);
            m.score2 = Some(1);
            m
        })
        .collect();
    let shootouts = generate_penalty_shootouts(&[group.clone()], &draws);
    assert_eq!(shootouts.len(), 3);
    assert!(shootouts
        .iter()
        .all(|m| m.is_penalty_shootout && m.phase == Phase::Penalty && m.label == "Group A"));

    let decided: Vec<Match> = draws
        .into_iter()
        .map(|mut m| {
            m.score1 = Some(2);
            m
        })
        .collect();
    assert!(generate_penalty_shootouts(&[group], &decided).is_empty());
}

#[test]
fn scheduling_keeps_teams_out_of_parallel_matches() {
    let set = generate_fixtures(&teams(8), &TournamentConfig::default()).unwrap();
    let mut matches = set.matches;
    let start = Utc.with_ymd_and_hms(2026, 6, 13, 10, 0, 0).unwrap();
    let fields = vec!["Pitch 1".to_string(), "Pitch 2".to_string()];
    assert_eq!(schedule_matches(&mut matches, start, 15, &fields), 12);

    let mut busy: HashMap<_, HashSet<String>> = HashMap::new();
    for m in &matches {
        let slot = m.scheduled.as_ref().unwrap();
        assert!(slot.at >= start);
        assert_eq!((slot.at - start).num_minutes() % 15, 0);
        let taken = busy.entry(slot.at).or_default();
        let (a, b) = m.fixed_teams().unwrap();
        let referee = m.referee.as_ref().unwrap().team.clone();
        for team in [a.to_string(), b.to_string(), referee] {
            assert!(taken.insert(team), "double booking at {}", slot.at);
        }
    }
    // Already scheduled matches are left alone.
    assert_eq!(
        schedule_matches(&mut matches, start + Duration::hours(3), 15, &fields),
        0
    );
}
