//! Group tables: points, goal difference, goals for, then shootout tiebreaks.

use crate::models::{Match, Phase, Side, Standing};
use std::cmp::Ordering;
use std::collections::HashMap;

/// Order two rows by points, goal difference and goals for (best first).
pub fn compare_standings(a: &Standing, b: &Standing) -> Ordering {
    b.rank_key().cmp(&a.rank_key())
}

/// Compute the table for `teams` from `matches`.
///
/// Only completed group-phase matches between two listed teams count. Rows are sorted
/// with [`compare_standings`]; rows that stay level keep the order of `teams`, unless
/// penalty shootouts were played among exactly those teams, in which case shootout wins
/// decide the order inside that tied subset only.
pub fn compute_table(teams: &[String], matches: &[Match]) -> Vec<Standing> {
    let mut rows: Vec<Standing> = teams.iter().map(Standing::new).collect();
    let index: HashMap<&str, usize> = teams
        .iter()
        .enumerate()
        .map(|(i, t)| (t.as_str(), i))
        .collect();

    for m in matches.iter().filter(|m| m.phase == Phase::Group) {
        let Some((s1, s2)) = m.final_score() else {
            continue;
        };
        let Some((t1, t2)) = m.fixed_teams() else {
            continue;
        };
        let (Some(&i1), Some(&i2)) = (index.get(t1), index.get(t2)) else {
            continue;
        };
        rows[i1].add_game(s1, s2);
        rows[i2].add_game(s2, s1);
    }

    rows.sort_by(compare_standings);
    apply_shootout_tiebreaks(&mut rows, matches);
    rows
}

/// Teams sharing identical (points, goal difference, goals for), in table order.
/// Only clusters of two or more teams are returned.
pub fn tied_clusters(table: &[Standing]) -> Vec<Vec<String>> {
    let mut clusters = Vec::new();
    let mut start = 0;
    while start < table.len() {
        let key = table[start].rank_key();
        let end = table[start..]
            .iter()
            .position(|row| row.rank_key() != key)
            .map_or(table.len(), |offset| start + offset);
        if end - start >= 2 {
            clusters.push(table[start..end].iter().map(|r| r.team.clone()).collect());
        }
        start = end;
    }
    clusters
}

/// Reorder each tied run by shootout wins among its own members.
fn apply_shootout_tiebreaks(rows: &mut [Standing], matches: &[Match]) {
    let mut start = 0;
    while start < rows.len() {
        let key = rows[start].rank_key();
        let end = rows[start..]
            .iter()
            .position(|row| row.rank_key() != key)
            .map_or(rows.len(), |offset| start + offset);
        if end - start >= 2 {
            let cluster = &mut rows[start..end];
            if let Some(wins) = shootout_wins(cluster, matches) {
                cluster.sort_by(|a, b| wins[&b.team].cmp(&wins[&a.team]));
            }
        }
        start = end;
    }
}

/// Shootout wins per team counting only shootouts between two members of `cluster`.
/// None if no such shootout has been decided.
fn shootout_wins(cluster: &[Standing], matches: &[Match]) -> Option<HashMap<String, u32>> {
    let mut wins: HashMap<String, u32> = cluster.iter().map(|r| (r.team.clone(), 0)).collect();
    let mut decided = false;
    for m in matches.iter().filter(|m| m.is_penalty_shootout) {
        let Some((t1, t2)) = m.fixed_teams() else {
            continue;
        };
        if !wins.contains_key(t1) || !wins.contains_key(t2) {
            continue;
        }
        let winner = match m.winning_side() {
            Some(Side::One) => t1,
            Some(Side::Two) => t2,
            None => continue,
        };
        decided = true;
        if let Some(count) = wins.get_mut(winner) {
            *count += 1;
        }
    }
    decided.then_some(wins)
}
