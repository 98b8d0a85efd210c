//! Knockout bracket: seeding from the final table, placement games, final.

use crate::logic::standings::{compare_standings, compute_table};
use crate::models::{Group, KnockoutOptions, Match, Phase, Slot, Standing, TournamentError};

/// Smallest final table that can be seeded into semifinals.
pub const MIN_KNOCKOUT_TEAMS: usize = 4;

pub const FINAL_LABEL: &str = "Final";

/// Merge group tables into one ranking: all group winners, then all runners-up, and so
/// on. Within a tier teams are ordered by points, goal difference, goals for.
pub fn final_table(groups: &[Group], matches: &[Match]) -> Vec<String> {
    let tables: Vec<Vec<Standing>> = groups
        .iter()
        .map(|g| compute_table(&g.teams, matches))
        .collect();
    let depth = tables.iter().map(Vec::len).max().unwrap_or(0);
    let mut ranking = Vec::new();
    for position in 0..depth {
        let mut tier: Vec<&Standing> = tables.iter().filter_map(|t| t.get(position)).collect();
        tier.sort_by(|a, b| compare_standings(a, b));
        ranking.extend(tier.into_iter().map(|s| s.team.clone()));
    }
    ranking
}

/// Drop toggles whose team-count precondition is not met.
pub fn effective_options(team_count: usize, options: &KnockoutOptions) -> KnockoutOptions {
    KnockoutOptions {
        quarterfinals: options.quarterfinals && team_count >= 8,
        third_place: options.third_place && team_count >= 3,
        fifth_place: options.fifth_place && team_count >= 6,
        seventh_place: options.seventh_place && team_count >= 8,
    }
}

/// Generate the bracket for `final_table` (best team first).
///
/// With quarterfinals (N >= 8): 1v8, 2v7, 3v6, 4v5; semifinals pair the winners of
/// 1v8/4v5 and 2v7/3v6. Otherwise semifinals are 1v4 and 2v3. Fifth and seventh place
/// use table places 5-8 without quarterfinals, and the quarterfinal losers (1v8/2v7
/// losers for fifth, 3v6/4v5 losers for seventh) with them. Matches are returned in
/// playing order, the Final last.
pub fn generate_knockout(
    final_table: &[String],
    options: &KnockoutOptions,
) -> Result<Vec<Match>, TournamentError> {
    let n = final_table.len();
    if n < MIN_KNOCKOUT_TEAMS {
        return Err(TournamentError::NotEnoughTeams {
            required: MIN_KNOCKOUT_TEAMS,
            available: n,
        });
    }
    let options = effective_options(n, options);
    let seed = |place: usize| Slot::team(final_table[place - 1].clone());
    let mut matches = Vec::new();

    let (semi1, semi2, fifth, seventh) = if options.quarterfinals {
        let quarters: Vec<Match> = [(1, 8), (2, 7), (3, 6), (4, 5)]
            .iter()
            .enumerate()
            .map(|(i, &(a, b))| {
                Match::fixture(seed(a), seed(b), format!("Quarterfinal {}", i + 1), Phase::Knockout)
            })
            .collect();
        let ids: Vec<_> = quarters.iter().map(|m| m.id).collect();
        matches.extend(quarters);
        (
            (Slot::Winner(ids[0]), Slot::Winner(ids[3])),
            (Slot::Winner(ids[1]), Slot::Winner(ids[2])),
            Some((Slot::Loser(ids[0]), Slot::Loser(ids[1]))),
            Some((Slot::Loser(ids[2]), Slot::Loser(ids[3]))),
        )
    } else {
        (
            (seed(1), seed(4)),
            (seed(2), seed(3)),
            (n >= 6).then(|| (seed(5), seed(6))),
            (n >= 8).then(|| (seed(7), seed(8))),
        )
    };

    let sf1 = Match::fixture(semi1.0, semi1.1, "Semifinal 1", Phase::Knockout);
    let sf2 = Match::fixture(semi2.0, semi2.1, "Semifinal 2", Phase::Knockout);
    let (sf1_id, sf2_id) = (sf1.id, sf2.id);
    matches.push(sf1);
    matches.push(sf2);

    if let Some((a, b)) = seventh.filter(|_| options.seventh_place) {
        matches.push(Match::fixture(a, b, "Match for 7th place", Phase::Placement));
    }
    if let Some((a, b)) = fifth.filter(|_| options.fifth_place) {
        matches.push(Match::fixture(a, b, "Match for 5th place", Phase::Placement));
    }
    if options.third_place {
        matches.push(Match::fixture(
            Slot::Loser(sf1_id),
            Slot::Loser(sf2_id),
            "Match for 3rd place",
            Phase::Placement,
        ));
    }
    matches.push(Match::fixture(
        Slot::Winner(sf1_id),
        Slot::Winner(sf2_id),
        FINAL_LABEL,
        Phase::Knockout,
    ));
    log::debug!("generated knockout bracket: {} matches for {} teams", matches.len(), n);
    Ok(matches)
}
