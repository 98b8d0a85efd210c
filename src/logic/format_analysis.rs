//! Feasibility checks for a requested format, with warnings, recommendations and
//! alternative configurations.
//!
//! A group of `n` teams where every team plays `k` games is a k-regular graph on n
//! vertices, which exists exactly when `k <= n - 1` and `n * k` is even.

use crate::models::Format;
use serde::{Deserialize, Serialize};

/// Smallest and largest supported group size.
pub const MIN_GROUP_SIZE: u32 = 3;
pub const MAX_GROUP_SIZE: u32 = 5;

/// A fully specified configuration the admin could pick instead.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AlternativeFormat {
    pub format: Format,
    pub advantages: Vec<String>,
}

/// Outcome of analysing a format for a given number of teams.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct FormatAnalysis {
    pub team_count: usize,
    pub format: Format,
    pub feasible: bool,
    pub warnings: Vec<String>,
    pub recommendations: Vec<String>,
    pub alternatives: Vec<AlternativeFormat>,
    /// Group sizes the format produces (one entry for Swiss/league).
    pub group_sizes: Vec<usize>,
}

impl FormatAnalysis {
    fn new(team_count: usize, format: Format) -> Self {
        Self {
            team_count,
            format,
            feasible: true,
            warnings: Vec::new(),
            recommendations: Vec::new(),
            alternatives: Vec::new(),
            group_sizes: Vec::new(),
        }
    }

    fn reject(&mut self, recommendation: String) {
        self.feasible = false;
        if !self.recommendations.contains(&recommendation) {
            self.recommendations.push(recommendation);
        }
    }
}

/// `min(ceil(log2(n)) + 1, n - 1)`; 0 for fewer than two teams.
pub fn recommended_swiss_rounds(team_count: usize) -> u32 {
    if team_count < 2 {
        return 0;
    }
    let ceil_log2 = usize::BITS - (team_count - 1).leading_zeros();
    (ceil_log2 + 1).min(team_count as u32 - 1)
}

/// Split `team_count` teams into chunks of `group_size`. The last group may be smaller;
/// a single leftover team joins the last full group instead of forming a group alone.
pub fn group_sizes(team_count: usize, group_size: usize) -> Vec<usize> {
    if team_count == 0 || group_size == 0 {
        return Vec::new();
    }
    let mut sizes = vec![group_size; team_count / group_size];
    match team_count % group_size {
        0 => {}
        1 if !sizes.is_empty() => {
            if let Some(last) = sizes.last_mut() {
                *last += 1;
            }
        }
        rest => sizes.push(rest),
    }
    sizes
}

/// Games each team of an `n`-team group actually plays when capped at `max_games`.
pub fn games_per_team(n: usize, max_games: Option<u32>) -> usize {
    let all = n.saturating_sub(1);
    max_games.map_or(all, |k| (k as usize).min(all))
}

/// Parity rule for a `max_games`-regular schedule on `n` teams: `n * k` must be even.
/// The configured k counts, not the cap of `n - 1`. Without a cap every team plays
/// everyone else, which always fits.
pub fn is_regular_feasible(n: usize, max_games: Option<u32>) -> bool {
    max_games.map_or(true, |k| n * k as usize % 2 == 0)
}

/// Total matches a set of groups produces.
pub fn total_matches(sizes: &[usize], max_games: Option<u32>) -> usize {
    sizes
        .iter()
        .map(|&n| n * games_per_team(n, max_games) / 2)
        .sum()
}

/// Analyse `format` for `team_count` teams.
pub fn analyze(team_count: usize, format: &Format) -> FormatAnalysis {
    let mut analysis = FormatAnalysis::new(team_count, *format);
    if team_count < 2 {
        analysis.reject("register at least 2 teams".to_string());
        return analysis;
    }
    match *format {
        Format::Groups {
            group_size,
            max_games_per_team,
        } => analyze_groups(&mut analysis, group_size, max_games_per_team),
        Format::Swiss { rounds } => analyze_swiss(&mut analysis, rounds),
        Format::League { max_games_per_team } => analyze_league(&mut analysis, max_games_per_team),
    }
    analysis
}

fn analyze_groups(analysis: &mut FormatAnalysis, group_size: u32, max_games: Option<u32>) {
    let team_count = analysis.team_count;
    if !(MIN_GROUP_SIZE..=MAX_GROUP_SIZE).contains(&group_size) {
        analysis.reject(format!(
            "use a group size between {} and {} (e.g. groupSize=4)",
            MIN_GROUP_SIZE, MAX_GROUP_SIZE
        ));
        push_group_alternatives(analysis, max_games, None);
        return;
    }
    let sizes = group_sizes(team_count, group_size as usize);
    analysis.group_sizes = sizes.clone();

    for (i, &n) in sizes.iter().enumerate() {
        if n < MIN_GROUP_SIZE as usize {
            analysis.warnings.push(format!(
                "group {} has only {} teams",
                group_letter(i),
                n
            ));
        } else if n > group_size as usize {
            analysis.warnings.push(format!(
                "group {} has {} teams to absorb a leftover team",
                group_letter(i),
                n
            ));
        }
    }

    if let Some(k) = max_games {
        check_max_games(analysis, &sizes, k, group_size as usize - 1);
    }

    if !analysis.feasible || !analysis.warnings.is_empty() {
        push_group_alternatives(analysis, max_games, Some(group_size));
    }
}

fn analyze_league(analysis: &mut FormatAnalysis, max_games: Option<u32>) {
    let team_count = analysis.team_count;
    analysis.group_sizes = vec![team_count];
    if let Some(k) = max_games {
        check_max_games(analysis, &[team_count], k, team_count - 1);
    }
    let games = games_per_team(team_count, max_games);
    if analysis.feasible && max_games.is_none() && team_count >= 10 {
        analysis.warnings.push(format!(
            "a full league means {} games per team and {} matches",
            games,
            total_matches(&[team_count], None)
        ));
        push_group_alternatives(analysis, None, None);
    }
}

/// Shared check of `maxGamesPerTeam` against group sizes. `limit` is the largest
/// allowed value (configured group size minus one).
fn check_max_games(analysis: &mut FormatAnalysis, sizes: &[usize], k: u32, limit: usize) {
    if k == 0 {
        analysis.reject("set maxGamesPerTeam to at least 1, or leave it empty".to_string());
        return;
    }
    if k as usize > limit {
        analysis.reject(format!("reduce maxGamesPerTeam to {}", limit));
        return;
    }
    let odd: Vec<usize> = sizes
        .iter()
        .copied()
        .filter(|&n| !is_regular_feasible(n, Some(k)))
        .collect();
    if odd.is_empty() {
        return;
    }
    for n in &odd {
        analysis.warnings.push(format!(
            "a group of {} teams cannot give every team exactly {} games ({} x {} is odd)",
            n, k, n, k
        ));
    }
    let fits = |k: u32| {
        k >= 1 && (k as usize) <= limit && sizes.iter().all(|&n| is_regular_feasible(n, Some(k)))
    };
    if fits(k - 1) {
        analysis.reject(format!("reduce maxGamesPerTeam to {}", k - 1));
    }
    if fits(k + 1) {
        analysis.reject(format!("increase maxGamesPerTeam to {}", k + 1));
    }
    analysis.reject("leave maxGamesPerTeam empty so every team plays everyone in its group".to_string());
}

fn analyze_swiss(analysis: &mut FormatAnalysis, rounds: Option<u32>) {
    let team_count = analysis.team_count;
    analysis.group_sizes = vec![team_count];
    let recommended = recommended_swiss_rounds(team_count);
    let rounds = rounds.unwrap_or(recommended);
    let max_rounds = team_count as u32 - 1;
    if rounds < 1 {
        analysis.reject(format!("play at least 1 round (recommended: {})", recommended));
    } else if rounds > max_rounds {
        analysis.reject(format!(
            "use at most {} rounds; more would force rematches (recommended: {})",
            max_rounds, recommended
        ));
    }
    if team_count % 2 == 1 {
        analysis
            .warnings
            .push("odd number of teams: one team gets a bye each round".to_string());
    }
    if rounds != recommended {
        analysis.warnings.push(format!(
            "{} rounds differs from the recommended {} for {} teams",
            rounds, recommended, team_count
        ));
        analysis.alternatives.push(AlternativeFormat {
            format: Format::Swiss {
                rounds: Some(recommended),
            },
            advantages: vec![
                format!("{} rounds are enough to separate {} teams", recommended, team_count),
                "keeps rematches avoidable in every round".to_string(),
            ],
        });
    }
}

/// Suggest group sizes that avoid undersized groups and satisfy the parity rule.
fn push_group_alternatives(analysis: &mut FormatAnalysis, max_games: Option<u32>, current: Option<u32>) {
    let team_count = analysis.team_count;
    for size in MIN_GROUP_SIZE..=MAX_GROUP_SIZE {
        if Some(size) == current {
            continue;
        }
        let sizes = group_sizes(team_count, size as usize);
        if sizes.iter().any(|&n| n < MIN_GROUP_SIZE as usize) {
            continue;
        }
        let k = max_games.filter(|&k| k <= size - 1);
        if !sizes.iter().all(|&n| is_regular_feasible(n, k)) {
            continue;
        }
        let mut advantages = vec![format!(
            "{} groups, all with at least {} teams",
            sizes.len(),
            MIN_GROUP_SIZE
        )];
        if sizes.iter().all(|&n| n == size as usize) {
            advantages.push("all groups the same size".to_string());
        }
        advantages.push(format!("{} group matches in total", total_matches(&sizes, k)));
        analysis.alternatives.push(AlternativeFormat {
            format: Format::Groups {
                group_size: size,
                max_games_per_team: k,
            },
            advantages,
        });
        if !analysis.feasible && current.is_some() {
            let rec = format!("use groupSize={}", size);
            if !analysis.recommendations.contains(&rec) {
                analysis.recommendations.push(rec);
            }
        }
    }
}

/// "A", "B", ... for group indices.
pub fn group_letter(index: usize) -> String {
    let mut n = index;
    let mut letters = Vec::new();
    loop {
        letters.push((b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    letters.iter().rev().collect()
}
