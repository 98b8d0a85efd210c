//! Penalty shootouts between teams that finish a group exactly level.

use crate::logic::standings::{compute_table, tied_clusters};
use crate::models::{Group, Match, Phase, Slot};

/// For every group, find teams level on points, goal difference and goals for, and
/// pair each tied cluster round-robin with single shootout matches.
///
/// The result depends only on the group-phase results in `matches`; already played
/// shootouts do not change it (they break ties in the table, not in these numbers).
pub fn generate_penalty_shootouts(groups: &[Group], matches: &[Match]) -> Vec<Match> {
    let mut shootouts = Vec::new();
    for group in groups {
        let table = compute_table(&group.teams, matches);
        for cluster in tied_clusters(&table) {
            log::debug!("{}: tied cluster {:?}", group.name, cluster);
            for (i, a) in cluster.iter().enumerate() {
                for b in &cluster[i + 1..] {
                    shootouts.push(Match::fixture(
                        Slot::team(a.clone()),
                        Slot::team(b.clone()),
                        group.name.clone(),
                        Phase::Penalty,
                    ));
                }
            }
        }
    }
    shootouts
}
