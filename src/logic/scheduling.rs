//! Kick-off times and fields for unscheduled matches.

use crate::models::{Match, Schedule};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashSet;

/// Assign a time slot and field to every open, unscheduled match, in fixture order.
///
/// Each slot fills up to one match per field. A match waits for a later slot if one of
/// its teams (or its referee) is already busy in the current one. Returns the number of
/// matches scheduled.
pub fn schedule_matches(
    matches: &mut [Match],
    start: DateTime<Utc>,
    slot_minutes: u32,
    fields: &[String],
) -> usize {
    if fields.is_empty() {
        return 0;
    }
    let mut pending: Vec<usize> = matches
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.completed && !m.is_live() && m.scheduled.is_none())
        .map(|(i, _)| i)
        .collect();
    let total = pending.len();
    let mut slot = 0i64;

    while !pending.is_empty() {
        let at = start + Duration::minutes(slot * i64::from(slot_minutes));
        let mut busy: HashSet<String> = HashSet::new();
        let mut field = 0;
        pending.retain(|&i| {
            if field == fields.len() {
                return true;
            }
            let m = &mut matches[i];
            let involved = participants(m);
            // An empty slot always takes the next match, so the loop always progresses.
            if field > 0 && involved.iter().any(|t| busy.contains(t)) {
                return true;
            }
            busy.extend(involved);
            m.scheduled = Some(Schedule {
                at,
                field: fields[field].clone(),
            });
            field += 1;
            false
        });
        slot += 1;
    }
    total
}

fn participants(m: &Match) -> Vec<String> {
    [m.team1.team_name(), m.team2.team_name()]
        .into_iter()
        .flatten()
        .chain(m.referee.as_ref().map(|r| r.team.as_str()))
        .map(str::to_string)
        .collect()
}
