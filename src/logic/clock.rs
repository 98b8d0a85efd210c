//! Live match clock: state transitions and the one function every view uses to turn
//! the stored timestamps into a displayed time.
//!
//! Transitions only record absolute timestamps; nothing ticks. The single-live-match
//! rule is enforced by the orchestrator, which owns the tournament's live pointer.

use crate::models::{
    ClockAction, ClockDisplay, ClockReading, ClockState, LiveMatchState, Match, TournamentError,
};
use chrono::{DateTime, Utc};

/// Where `m` stands in the clock state machine.
pub fn clock_state(m: &Match) -> ClockState {
    match &m.live {
        _ if m.completed => ClockState::Finished,
        None => ClockState::NotStarted,
        Some(live) if live.half_time_break => ClockState::HalftimeBreak,
        Some(live) if live.current_half == 1 => ClockState::FirstHalf,
        Some(_) => ClockState::SecondHalf,
    }
}

fn rejected(action: ClockAction, m: &Match) -> TournamentError {
    TournamentError::InvalidTransition {
        action,
        state: clock_state(m),
        paused: m.live.as_ref().is_some_and(|l| l.is_paused),
    }
}

/// The live block of a match that is in `expected`, or the matching rejection.
fn live_in<'a>(
    m: &'a mut Match,
    action: ClockAction,
    expected: &[ClockState],
    paused: Option<bool>,
) -> Result<&'a mut LiveMatchState, TournamentError> {
    let state = clock_state(m);
    let paused_ok = paused.map_or(true, |p| m.live.as_ref().is_some_and(|l| l.is_paused == p));
    if !expected.contains(&state) || !paused_ok {
        return Err(rejected(action, m));
    }
    m.live.as_mut().ok_or_else(|| TournamentError::InvalidTransition {
        action,
        state,
        paused: false,
    })
}

/// NotStarted -> FirstHalf.
pub fn start(m: &mut Match, half_time_minutes: u32, now: DateTime<Utc>) -> Result<(), TournamentError> {
    if clock_state(m) != ClockState::NotStarted {
        return Err(rejected(ClockAction::Start, m));
    }
    m.live = Some(LiveMatchState::kick_off(half_time_minutes, now));
    Ok(())
}

/// Freeze the clock during a half.
pub fn pause(m: &mut Match, now: DateTime<Utc>) -> Result<(), TournamentError> {
    let live = live_in(
        m,
        ClockAction::Pause,
        &[ClockState::FirstHalf, ClockState::SecondHalf],
        Some(false),
    )?;
    live.is_paused = true;
    live.pause_start_time = Some(now);
    Ok(())
}

/// Continue after a pause; the paused span is added to `paused_ms`.
pub fn resume(m: &mut Match, now: DateTime<Utc>) -> Result<(), TournamentError> {
    let live = live_in(
        m,
        ClockAction::Resume,
        &[ClockState::FirstHalf, ClockState::SecondHalf],
        Some(true),
    )?;
    if let Some(paused_at) = live.pause_start_time.take() {
        live.paused_ms += (now - paused_at).num_milliseconds().max(0);
    }
    live.is_paused = false;
    Ok(())
}

/// FirstHalf -> HalftimeBreak.
pub fn start_halftime(m: &mut Match, now: DateTime<Utc>) -> Result<(), TournamentError> {
    let live = live_in(m, ClockAction::StartHalftime, &[ClockState::FirstHalf], Some(false))?;
    live.half_time_break = true;
    live.first_half_end_time = Some(now);
    Ok(())
}

/// HalftimeBreak -> SecondHalf. Pauses of the first half do not carry over.
pub fn start_second_half(m: &mut Match, now: DateTime<Utc>) -> Result<(), TournamentError> {
    let live = live_in(m, ClockAction::StartSecondHalf, &[ClockState::HalftimeBreak], None)?;
    live.half_time_break = false;
    live.current_half = 2;
    live.second_half_start_time = Some(now);
    live.paused_ms = 0;
    Ok(())
}

/// SecondHalf -> Finished: the live score becomes the final score.
pub fn finish(m: &mut Match) -> Result<(), TournamentError> {
    let live = live_in(m, ClockAction::Finish, &[ClockState::SecondHalf], Some(false))?;
    let (score1, score2) = (live.score1, live.score2);
    m.live = None;
    m.score1 = Some(score1);
    m.score2 = Some(score2);
    m.completed = true;
    Ok(())
}

/// Drop the live state without a result; the match can be started again.
pub fn abort(m: &mut Match) -> Result<(), TournamentError> {
    live_in(
        m,
        ClockAction::Abort,
        &[ClockState::FirstHalf, ClockState::HalftimeBreak, ClockState::SecondHalf],
        None,
    )?;
    m.live = None;
    Ok(())
}

/// Playing time of the current half at `now`, in milliseconds.
///
/// Measured from kick-off of the half minus paused time, clamped to
/// `[0, half_time_minutes]`. While paused, `now` is replaced by the pause start, so
/// the value freezes and resuming continues from the same value.
pub fn elapsed_ms(live: &LiveMatchState, now: DateTime<Utc>) -> i64 {
    let (raw, cap) = raw_elapsed_ms(live, now);
    raw.clamp(0, cap)
}

fn raw_elapsed_ms(live: &LiveMatchState, now: DateTime<Utc>) -> (i64, i64) {
    let origin = match (live.current_half, live.second_half_start_time) {
        (2, Some(second_half)) => second_half,
        _ => live.start_time,
    };
    let reference = if live.half_time_break {
        live.first_half_end_time.unwrap_or(now)
    } else if live.is_paused {
        live.pause_start_time.unwrap_or(now)
    } else {
        now
    };
    let raw = (reference - origin).num_milliseconds() - live.paused_ms;
    (raw, i64::from(live.half_time_minutes) * 60_000)
}

/// What every scoreboard shows for `live` at `now`.
pub fn clock_reading(live: &LiveMatchState, now: DateTime<Utc>) -> ClockReading {
    let (raw, cap) = raw_elapsed_ms(live, now);
    let elapsed = raw.clamp(0, cap);
    let display = if live.half_time_break {
        ClockDisplay::Halftime
    } else if raw >= cap {
        ClockDisplay::HalfEnded
    } else if live.is_paused {
        ClockDisplay::Paused
    } else {
        ClockDisplay::Running
    };
    let label = match display {
        ClockDisplay::Halftime => "halftime".to_string(),
        ClockDisplay::HalfEnded => "half ended".to_string(),
        ClockDisplay::Running | ClockDisplay::Paused => {
            format!("{:02}:{:02}", elapsed / 60_000, (elapsed / 1_000) % 60)
        }
    };
    ClockReading {
        half: live.current_half,
        elapsed_ms: elapsed,
        display,
        label,
    }
}
