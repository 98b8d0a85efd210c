//! Swiss pairing: rank by current standings, pair neighbours, avoid rematches.

use crate::logic::standings::compare_standings;
use crate::models::{Match, Phase, Slot, Standing, SwissBye};
use std::collections::HashSet;

/// One generated Swiss round.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SwissRound {
    pub round: u32,
    pub matches: Vec<Match>,
    /// Team sitting out this round (odd team count). A bye adds no game and no points.
    pub bye: Option<String>,
}

/// Label of the matches of a Swiss round.
pub fn round_label(round: u32) -> String {
    format!("Swiss round {}", round)
}

/// Pair `teams` for `round`.
///
/// Teams are ranked by `standings` (points, goal difference, goals for; teams without a
/// row follow in `teams` order). Pairing walks the ranking top-down, giving each team
/// the highest-ranked opponent it has not met in `history`, and backtracks when that
/// leaves someone unpairable, so a rematch only happens when no rematch-free pairing
/// exists. With an odd count the bye goes to the lowest-ranked team that has not had
/// one yet. No randomness: equal inputs give equal rounds.
pub fn generate_swiss_round(
    teams: &[String],
    standings: &[Standing],
    round: u32,
    history: &[Match],
    byes: &[SwissBye],
) -> SwissRound {
    let ranking = rank(teams, standings);
    let played = played_pairs(history);

    let bye_candidates: Vec<Option<usize>> = if ranking.len() % 2 == 1 {
        let had_bye: HashSet<&str> = byes.iter().map(|b| b.team.as_str()).collect();
        let (fresh, repeat): (Vec<usize>, Vec<usize>) = (0..ranking.len())
            .rev()
            .partition(|&i| !had_bye.contains(ranking[i].as_str()));
        fresh.into_iter().chain(repeat).map(Some).collect()
    } else {
        vec![None]
    };

    let attempt = |allow_rematch: bool| {
        bye_candidates.iter().find_map(|&bye| {
            let pool: Vec<&String> = ranking
                .iter()
                .enumerate()
                .filter(|&(i, _)| Some(i) != bye)
                .map(|(_, t)| t)
                .collect();
            pair_up(&pool, &played, allow_rematch).map(|pairs| (bye, pairs))
        })
    };
    let (bye, pairs) = match attempt(false) {
        Some(found) => found,
        None => {
            log::warn!("swiss round {}: no rematch-free pairing exists", round);
            attempt(true).unwrap_or((None, Vec::new()))
        }
    };

    let matches = pairs
        .into_iter()
        .map(|(a, b)| {
            Match::fixture(Slot::team(a), Slot::team(b), round_label(round), Phase::Group)
                .in_round(round)
        })
        .collect();
    SwissRound {
        round,
        matches,
        bye: bye.map(|i| ranking[i].clone()),
    }
}

/// Teams ordered by standings; stable so equal rows keep `teams` order.
fn rank(teams: &[String], standings: &[Standing]) -> Vec<String> {
    let mut rows: Vec<Standing> = teams
        .iter()
        .map(|t| {
            standings
                .iter()
                .find(|s| &s.team == t)
                .cloned()
                .unwrap_or_else(|| Standing::new(t.clone()))
        })
        .collect();
    rows.sort_by(compare_standings);
    rows.into_iter().map(|r| r.team).collect()
}

fn pair_key(a: &str, b: &str) -> (String, String) {
    if a <= b {
        (a.to_string(), b.to_string())
    } else {
        (b.to_string(), a.to_string())
    }
}

/// Every pairing that already has a fixture, played or not.
fn played_pairs(history: &[Match]) -> HashSet<(String, String)> {
    history
        .iter()
        .filter(|m| !m.is_penalty_shootout)
        .filter_map(|m| m.fixed_teams())
        .map(|(a, b)| pair_key(a, b))
        .collect()
}

fn pair_up(
    pool: &[&String],
    played: &HashSet<(String, String)>,
    allow_rematch: bool,
) -> Option<Vec<(String, String)>> {
    let mut used = vec![false; pool.len()];
    let mut pairs = Vec::with_capacity(pool.len() / 2);
    if search(pool, played, allow_rematch, &mut used, &mut pairs) {
        Some(
            pairs
                .into_iter()
                .map(|(a, b)| (pool[a].clone(), pool[b].clone()))
                .collect(),
        )
    } else {
        None
    }
}

fn search(
    pool: &[&String],
    played: &HashSet<(String, String)>,
    allow_rematch: bool,
    used: &mut [bool],
    pairs: &mut Vec<(usize, usize)>,
) -> bool {
    let Some(first) = used.iter().position(|u| !u) else {
        return true;
    };
    used[first] = true;
    let is_rematch = |j: usize| played.contains(&pair_key(pool[first], pool[j]));
    let mut candidates: Vec<usize> = (first + 1..pool.len()).filter(|&j| !used[j]).collect();
    if allow_rematch {
        candidates.sort_by_key(|&j| is_rematch(j));
    } else {
        candidates.retain(|&j| !is_rematch(j));
    }
    for j in candidates {
        used[j] = true;
        pairs.push((first, j));
        if search(pool, played, allow_rematch, used, pairs) {
            return true;
        }
        pairs.pop();
        used[j] = false;
    }
    used[first] = false;
    false
}
