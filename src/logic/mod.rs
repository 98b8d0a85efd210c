//! Tournament business logic: format analysis, fixtures, standings, live clock.

pub mod clock;
mod format_analysis;
mod group_stage;
mod knockout;
mod penalties;
mod registration;
mod scheduling;
mod standings;
mod swiss;

pub use clock::{clock_reading, clock_state, elapsed_ms};
pub use format_analysis::{
    analyze, games_per_team, group_letter, group_sizes, is_regular_feasible,
    recommended_swiss_rounds, AlternativeFormat, FormatAnalysis, MAX_GROUP_SIZE, MIN_GROUP_SIZE,
};
pub use group_stage::{
    assign_referees, generate_fixtures, generate_group_stage, round_robin_rounds, seed_order,
    FixtureSet, LEAGUE_GROUP, SWISS_GROUP,
};
pub use knockout::{effective_options, final_table, generate_knockout, FINAL_LABEL, MIN_KNOCKOUT_TEAMS};
pub use penalties::generate_penalty_shootouts;
pub use registration::{import_teams_csv, register_team, remove_team, CsvImport};
pub use scheduling::schedule_matches;
pub use standings::{compare_standings, compute_table, tied_clusters};
pub use swiss::{generate_swiss_round, round_label, SwissRound};
