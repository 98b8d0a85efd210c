//! Live match state and the clock readings derived from it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Timing block of the match currently being played. All times are absolute, so any
/// client holding a copy can derive the same clock without asking the server.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct LiveMatchState {
    /// 1 or 2.
    pub current_half: u8,
    pub start_time: DateTime<Utc>,
    pub second_half_start_time: Option<DateTime<Utc>>,
    pub half_time_break: bool,
    pub first_half_end_time: Option<DateTime<Utc>>,
    pub is_paused: bool,
    pub pause_start_time: Option<DateTime<Utc>>,
    /// Paused milliseconds accumulated in the current half.
    pub paused_ms: i64,
    pub half_time_minutes: u32,
    pub score1: u32,
    pub score2: u32,
}

impl LiveMatchState {
    /// Fresh state for a match kicking off at `now`.
    pub fn kick_off(half_time_minutes: u32, now: DateTime<Utc>) -> Self {
        Self {
            current_half: 1,
            start_time: now,
            second_half_start_time: None,
            half_time_break: false,
            first_half_end_time: None,
            is_paused: false,
            pause_start_time: None,
            paused_ms: 0,
            half_time_minutes,
            score1: 0,
            score2: 0,
        }
    }
}

/// Where a match stands in the clock state machine. `Paused` is a flag on top of the
/// two halves, not a state of its own.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockState {
    NotStarted,
    FirstHalf,
    HalftimeBreak,
    SecondHalf,
    Finished,
}

impl fmt::Display for ClockState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClockState::NotStarted => "not started",
            ClockState::FirstHalf => "first half",
            ClockState::HalftimeBreak => "halftime break",
            ClockState::SecondHalf => "second half",
            ClockState::Finished => "finished",
        };
        write!(f, "{}", s)
    }
}

/// Admin command on the live clock.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockAction {
    Start,
    Pause,
    Resume,
    StartHalftime,
    StartSecondHalf,
    Finish,
    Abort,
}

impl fmt::Display for ClockAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ClockAction::Start => "start",
            ClockAction::Pause => "pause",
            ClockAction::Resume => "resume",
            ClockAction::StartHalftime => "start halftime",
            ClockAction::StartSecondHalf => "start second half",
            ClockAction::Finish => "finish",
            ClockAction::Abort => "abort",
        };
        write!(f, "{}", s)
    }
}

/// What a scoreboard should show.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClockDisplay {
    Running,
    Paused,
    /// The half reached its nominal length; the clock stays at the cap until the admin acts.
    HalfEnded,
    Halftime,
}

/// Result of evaluating a [`LiveMatchState`] at a point in time.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ClockReading {
    pub half: u8,
    pub elapsed_ms: i64,
    pub display: ClockDisplay,
    /// "mm:ss", "half ended" or "halftime".
    pub label: String,
}
