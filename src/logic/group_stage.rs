//! Preliminary round: group partitioning, round-robin fixtures, referee assignment.

use crate::logic::format_analysis::{self, group_letter};
use crate::logic::swiss::{self, SwissRound};
use crate::models::{
    Format, Group, Match, Phase, Referee, Seeding, Slot, SwissBye, TournamentConfig,
    TournamentError,
};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::{HashMap, HashSet};

/// Groups and matches produced when registration closes (or on reconfiguration).
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct FixtureSet {
    pub groups: Vec<Group>,
    pub matches: Vec<Match>,
    pub byes: Vec<SwissBye>,
}

/// Table name used for the single Swiss standings table.
pub const SWISS_GROUP: &str = "Swiss";
/// Table name used for the single league table.
pub const LEAGUE_GROUP: &str = "League";

/// Validate `config` for `teams` and generate the preliminary fixtures.
///
/// Groups and league produce the whole round-robin; Swiss produces round 1 only.
/// The same inputs always produce the same fixture set.
pub fn generate_fixtures(
    teams: &[String],
    config: &TournamentConfig,
) -> Result<FixtureSet, TournamentError> {
    let analysis = format_analysis::analyze(teams.len(), &config.format);
    if !analysis.feasible {
        return Err(TournamentError::Infeasible(Box::new(analysis)));
    }
    match config.format {
        Format::Groups { .. } | Format::League { .. } => {
            let (groups, matches) = generate_group_stage(teams, config);
            Ok(FixtureSet {
                groups,
                matches,
                byes: Vec::new(),
            })
        }
        Format::Swiss { .. } => {
            let ordered = seed_order(teams, config.seeding);
            let group = Group::new(SWISS_GROUP, ordered.clone());
            let SwissRound { round, matches, bye } =
                swiss::generate_swiss_round(&ordered, &[], 1, &[], &[]);
            Ok(FixtureSet {
                groups: vec![group],
                matches,
                byes: bye
                    .map(|team| vec![SwissBye { round, team }])
                    .unwrap_or_default(),
            })
        }
    }
}

/// Order teams for partitioning: registration order or a reproducible shuffle.
pub fn seed_order(teams: &[String], seeding: Seeding) -> Vec<String> {
    let mut ordered = teams.to_vec();
    if let Seeding::Shuffled { seed } = seeding {
        ordered.shuffle(&mut StdRng::seed_from_u64(seed));
    }
    ordered
}

/// Partition teams and generate round-robin matches for every group, interleaved by
/// round so consecutive matches spread over the groups. Assumes an accepted config.
pub fn generate_group_stage(teams: &[String], config: &TournamentConfig) -> (Vec<Group>, Vec<Match>) {
    let ordered = seed_order(teams, config.seeding);
    let (groups, max_games) = match config.format {
        Format::Groups {
            group_size,
            max_games_per_team,
        } => {
            let mut groups = Vec::new();
            let mut rest = ordered.as_slice();
            for (i, size) in format_analysis::group_sizes(ordered.len(), group_size as usize)
                .into_iter()
                .enumerate()
            {
                let (members, tail) = rest.split_at(size);
                groups.push(Group::new(format!("Group {}", group_letter(i)), members.to_vec()));
                rest = tail;
            }
            (groups, max_games_per_team)
        }
        Format::League { max_games_per_team } => {
            (vec![Group::new(LEAGUE_GROUP, ordered)], max_games_per_team)
        }
        Format::Swiss { .. } => (vec![Group::new(SWISS_GROUP, ordered)], None),
    };

    let per_group: Vec<Vec<Vec<Match>>> = groups
        .iter()
        .map(|g| {
            round_robin_rounds(g.teams.len(), max_games)
                .into_iter()
                .map(|round| {
                    round
                        .into_iter()
                        .map(|(a, b)| {
                            Match::fixture(
                                Slot::team(g.teams[a].clone()),
                                Slot::team(g.teams[b].clone()),
                                g.name.clone(),
                                Phase::Group,
                            )
                        })
                        .collect()
                })
                .collect()
        })
        .collect();

    let rounds = per_group.iter().map(Vec::len).max().unwrap_or(0);
    let mut matches = Vec::new();
    for r in 0..rounds {
        for group_rounds in &per_group {
            if let Some(round) = group_rounds.get(r) {
                matches.extend(round.iter().cloned());
            }
        }
    }
    log::debug!(
        "generated {} group matches in {} groups",
        matches.len(),
        groups.len()
    );

    assign_referees(&groups, &mut matches);
    (groups, matches)
}

/// Round-robin rounds for `n` teams (indices) by the circle method. With `max_games`
/// set, only the edges of a circulant k-regular graph are kept, so every team plays
/// exactly `games_per_team(n, max_games)` games. Empty rounds are dropped.
pub fn round_robin_rounds(n: usize, max_games: Option<u32>) -> Vec<Vec<(usize, usize)>> {
    if n < 2 {
        return Vec::new();
    }
    let keep = regular_edges(n, format_analysis::games_per_team(n, max_games));

    let mut slots: Vec<Option<usize>> = (0..n).map(Some).collect();
    if n % 2 == 1 {
        slots.push(None);
    }
    let m = slots.len();
    let mut rounds = Vec::new();
    for _ in 0..m - 1 {
        let round: Vec<(usize, usize)> = (0..m / 2)
            .filter_map(|i| match (slots[i], slots[m - 1 - i]) {
                (Some(a), Some(b)) if keep.contains(&(a.min(b), a.max(b))) => Some((a, b)),
                _ => None,
            })
            .collect();
        if !round.is_empty() {
            rounds.push(round);
        }
        slots[1..].rotate_right(1);
    }
    rounds
}

/// Edge set (i < j) of a k-regular circulant graph on n vertices: offsets 1..=k/2,
/// plus the diameter n/2 when k is odd (n is then even). Complete graph when k >= n-1.
fn regular_edges(n: usize, k: usize) -> HashSet<(usize, usize)> {
    let mut edges = HashSet::new();
    if k + 1 >= n {
        for i in 0..n {
            for j in i + 1..n {
                edges.insert((i, j));
            }
        }
        return edges;
    }
    let mut offsets: Vec<usize> = (1..=k / 2).collect();
    if k % 2 == 1 {
        offsets.push(n / 2);
    }
    for i in 0..n {
        for &d in &offsets {
            let j = (i + d) % n;
            edges.insert((i.min(j), i.max(j)));
        }
    }
    edges
}

/// Give each group match a referee team from its own group that is not playing,
/// preferring teams with fewer assignments. Groups of two borrow from the next group.
pub fn assign_referees(groups: &[Group], matches: &mut [Match]) {
    let mut duties: HashMap<String, usize> = HashMap::new();
    for m in matches.iter_mut().filter(|m| m.phase == Phase::Group) {
        let Some((t1, t2)) = m.fixed_teams() else {
            continue;
        };
        let Some(gi) = groups.iter().position(|g| g.contains(t1) && g.contains(t2)) else {
            continue;
        };
        let own: Vec<&String> = groups[gi]
            .teams
            .iter()
            .filter(|t| t.as_str() != t1 && t.as_str() != t2)
            .collect();
        let (source, candidates) = if own.is_empty() && groups.len() > 1 {
            let next = &groups[(gi + 1) % groups.len()];
            (next, next.teams.iter().collect::<Vec<_>>())
        } else {
            (&groups[gi], own)
        };
        let Some(pick) = candidates
            .into_iter()
            .min_by_key(|t| duties.get(t.as_str()).copied().unwrap_or(0))
        else {
            continue;
        };
        *duties.entry(pick.clone()).or_insert(0) += 1;
        m.referee = Some(Referee {
            team: pick.clone(),
            group: source.name.clone(),
        });
    }
}
