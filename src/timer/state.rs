use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{error::TimerError, models::PauseWindow};

pub const DEFAULT_SESSION_SECS: u64 = 25 * 60;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "kebab-case")]
pub enum TimerPhase {
    #[default]
    Idle,
    Running,
    PausedRunning,
    Break,
    Completed,
}

impl TimerPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimerPhase::Idle => "idle",
            TimerPhase::Running => "running",
            TimerPhase::PausedRunning => "paused-running",
            TimerPhase::Break => "break",
            TimerPhase::Completed => "completed",
        }
    }
}

impl fmt::Display for TimerPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum TimerEvent {
    /// The reading countdown hit zero. Page data arrives later through the ledger.
    SessionFinished { paused_ms: u64 },
    /// The rest countdown expired or was skipped; reading resumed.
    BreakFinished,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimerState {
    pub phase: TimerPhase,
    pub remaining_secs: u64,
    pub configured_length_secs: u64,
    pub break_configured_secs: u64,
    pub break_remaining_secs: u64,
    /// Only drives the Start / Resume button label.
    pub has_started: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub pauses: Vec<PauseWindow>,
    /// Baseline `reset()` restores.
    #[serde(skip)]
    pub default_length_secs: u64,
}

impl Default for TimerState {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_SECS)
    }
}

impl TimerState {
    pub fn new(default_length_secs: u64) -> Self {
        Self {
            phase: TimerPhase::Idle,
            remaining_secs: default_length_secs,
            configured_length_secs: default_length_secs,
            break_configured_secs: 0,
            break_remaining_secs: 0,
            has_started: false,
            started_at: None,
            pauses: Vec::new(),
            default_length_secs,
        }
    }

    pub fn is_ticking(&self) -> bool {
        matches!(self.phase, TimerPhase::Running | TimerPhase::Break)
    }

    pub fn configure(&mut self, length_secs: i64) -> Result<(), TimerError> {
        self.expect_phase("configure", TimerPhase::Idle)?;
        if length_secs < 0 {
            return Err(TimerError::NegativeLength(length_secs));
        }
        self.configured_length_secs = length_secs as u64;
        self.remaining_secs = self.configured_length_secs;
        Ok(())
    }

    /// Minute-based input, fractional values allowed (0.5 → 30s).
    pub fn configure_minutes(&mut self, minutes: f64) -> Result<(), TimerError> {
        if !minutes.is_finite() || minutes < 0.0 {
            return Err(TimerError::InvalidLength(minutes));
        }
        self.configure((minutes * 60.0).round() as i64)
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.expect_phase("start", TimerPhase::Idle)?;
        self.begin_running(now);
        Ok(())
    }

    /// Flips between running and paused. Returns whether anything changed.
    pub fn toggle(&mut self, now: DateTime<Utc>) -> bool {
        match self.phase {
            TimerPhase::Running => {
                self.phase = TimerPhase::PausedRunning;
                self.pauses.push(PauseWindow::open(now));
                true
            }
            TimerPhase::PausedRunning => {
                self.phase = TimerPhase::Running;
                if let Some(window) = self.pauses.last_mut() {
                    window.close(now);
                }
                true
            }
            _ => false,
        }
    }

    pub fn tick(&mut self, now: DateTime<Utc>) -> Option<TimerEvent> {
        match self.phase {
            TimerPhase::Running => {
                self.remaining_secs = self.remaining_secs.saturating_sub(1);
                if self.remaining_secs == 0 {
                    let paused_ms = self.paused_ms(now);
                    self.phase = TimerPhase::Completed;
                    self.has_started = false;
                    return Some(TimerEvent::SessionFinished { paused_ms });
                }
                None
            }
            TimerPhase::Break => {
                self.break_remaining_secs = self.break_remaining_secs.saturating_sub(1);
                if self.break_remaining_secs == 0 {
                    self.begin_running(now);
                    return Some(TimerEvent::BreakFinished);
                }
                None
            }
            _ => None,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new(self.default_length_secs);
    }

    /// Changes the baseline `reset()` restores. An untouched idle timer adopts it at once.
    pub fn set_baseline(&mut self, length_secs: u64) {
        let untouched = self.phase == TimerPhase::Idle
            && self.configured_length_secs == self.default_length_secs
            && self.remaining_secs == self.default_length_secs;
        self.default_length_secs = length_secs;
        if untouched {
            self.reset();
        }
    }

    pub fn request_break(&mut self, break_length_secs: i64) -> Result<(), TimerError> {
        self.expect_phase("start a break", TimerPhase::Completed)?;
        if break_length_secs <= 0 {
            return Err(TimerError::NonPositiveBreak(break_length_secs));
        }
        self.phase = TimerPhase::Break;
        self.break_configured_secs = break_length_secs as u64;
        self.break_remaining_secs = self.break_configured_secs;
        Ok(())
    }

    pub fn skip_break(&mut self, now: DateTime<Utc>) -> Result<TimerEvent, TimerError> {
        self.expect_phase("skip the break", TimerPhase::Break)?;
        self.break_remaining_secs = 0;
        self.begin_running(now);
        Ok(TimerEvent::BreakFinished)
    }

    /// Straight from a finished session into another one, no break.
    pub fn continue_reading(&mut self, now: DateTime<Utc>) -> Result<(), TimerError> {
        self.expect_phase("continue reading", TimerPhase::Completed)?;
        self.begin_running(now);
        Ok(())
    }

    /// Total frozen time in the current session, an open pause counted up to `now`.
    pub fn paused_ms(&self, now: DateTime<Utc>) -> u64 {
        self.pauses
            .iter()
            .map(|window| window.duration_until(now))
            .sum()
    }

    pub fn button_label(&self) -> &'static str {
        if !self.has_started {
            return "Start";
        }
        match self.phase {
            TimerPhase::Running | TimerPhase::Break => "Pause",
            _ => "Resume",
        }
    }

    /// Seconds on the visible clock: the break countdown while resting.
    pub fn displayed_secs(&self) -> u64 {
        match self.phase {
            TimerPhase::Break => self.break_remaining_secs,
            _ => self.remaining_secs,
        }
    }

    pub fn display(&self) -> String {
        let secs = self.displayed_secs();
        format!("{}:{:02}", secs / 60, secs % 60)
    }

    pub fn progress_ratio(&self) -> f64 {
        if self.configured_length_secs == 0 {
            return 0.0;
        }
        self.remaining_secs as f64 / self.configured_length_secs as f64
    }

    fn begin_running(&mut self, now: DateTime<Utc>) {
        self.phase = TimerPhase::Running;
        self.remaining_secs = self.configured_length_secs;
        self.has_started = true;
        self.started_at = Some(now);
        self.pauses.clear();
    }

    fn expect_phase(&self, op: &'static str, expected: TimerPhase) -> Result<(), TimerError> {
        if self.phase != expected {
            return Err(TimerError::InvalidTransition {
                op,
                phase: self.phase,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn ticks(state: &mut TimerState, count: usize) -> Vec<TimerEvent> {
        let now = Utc::now();
        (0..count).filter_map(|_| state.tick(now)).collect()
    }

    #[test]
    fn configure_only_in_idle() {
        let mut state = TimerState::default();
        state.configure(90).unwrap();
        assert_eq!(state.remaining_secs, 90);
        assert_eq!(state.configured_length_secs, 90);

        assert!(matches!(state.configure(-1), Err(TimerError::NegativeLength(-1))));

        state.start(Utc::now()).unwrap();
        assert!(matches!(
            state.configure(30),
            Err(TimerError::InvalidTransition { phase: TimerPhase::Running, .. })
        ));
    }

    #[test]
    fn configure_minutes_accepts_fractions() {
        let mut state = TimerState::default();
        state.configure_minutes(0.5).unwrap();
        assert_eq!(state.remaining_secs, 30);
        assert!(state.configure_minutes(f64::NAN).is_err());
        assert!(state.configure_minutes(-2.0).is_err());
    }

    #[test]
    fn new_baseline_applies_to_later_resets() {
        let mut state = TimerState::default();
        state.set_baseline(600);
        assert_eq!(state.remaining_secs, 600);
        assert_eq!(state.configured_length_secs, 600);

        state.start(Utc::now()).unwrap();
        state.set_baseline(900);
        assert_eq!(state.phase, TimerPhase::Running);
        assert_eq!(state.configured_length_secs, 600);

        state.reset();
        assert_eq!(state.remaining_secs, 900);
        assert_eq!(state.configured_length_secs, 900);

        state.configure(120).unwrap();
        state.set_baseline(300);
        assert_eq!(state.remaining_secs, 120);
    }

    #[test]
    fn zero_length_completes_on_first_tick() {
        let mut state = TimerState::default();
        state.configure(0).unwrap();
        state.start(Utc::now()).unwrap();
        assert!(state.has_started);

        let events = ticks(&mut state, 1);
        assert_eq!(state.phase, TimerPhase::Completed);
        assert_eq!(events, vec![TimerEvent::SessionFinished { paused_ms: 0 }]);
    }

    #[test]
    fn completion_fires_once() {
        let mut state = TimerState::default();
        state.configure(3).unwrap();
        state.start(Utc::now()).unwrap();

        let events = ticks(&mut state, 10);
        assert_eq!(events.len(), 1);
        assert_eq!(state.remaining_secs, 0);
        assert_eq!(state.phase, TimerPhase::Completed);
    }

    #[test]
    fn toggle_freezes_the_clock() {
        let mut state = TimerState::default();
        state.configure(10).unwrap();
        state.start(Utc::now()).unwrap();
        ticks(&mut state, 2);

        assert!(state.toggle(Utc::now()));
        assert_eq!(state.phase, TimerPhase::PausedRunning);
        assert_eq!(state.button_label(), "Resume");
        ticks(&mut state, 5);
        assert_eq!(state.remaining_secs, 8);

        assert!(state.toggle(Utc::now()));
        assert_eq!(state.phase, TimerPhase::Running);
        assert_eq!(state.button_label(), "Pause");
    }

    #[test]
    fn toggle_is_noop_outside_running() {
        let mut state = TimerState::default();
        assert!(!state.toggle(Utc::now()));
        assert_eq!(state.phase, TimerPhase::Idle);
        assert_eq!(state.button_label(), "Start");
    }

    #[test]
    fn paused_time_is_reported_on_finish() {
        let mut state = TimerState::default();
        state.configure(2).unwrap();
        let t0 = Utc::now();
        state.start(t0).unwrap();
        state.toggle(t0);
        state.toggle(t0 + Duration::seconds(4));
        state.toggle(t0 + Duration::seconds(5));
        state.toggle(t0 + Duration::seconds(6));

        let now = t0 + Duration::seconds(8);
        state.tick(now);
        assert_eq!(
            state.tick(now),
            Some(TimerEvent::SessionFinished { paused_ms: 5_000 })
        );
    }

    #[test]
    fn reset_restores_baseline_from_any_phase() {
        let mut state = TimerState::new(1500);
        state.configure(600).unwrap();
        state.start(Utc::now()).unwrap();
        state.toggle(Utc::now());
        state.reset();
        assert_eq!(state.phase, TimerPhase::Idle);
        assert_eq!(state.configured_length_secs, 1500);
        assert_eq!(state.remaining_secs, state.configured_length_secs);
        assert!(!state.has_started);

        state.configure(0).unwrap();
        state.start(Utc::now()).unwrap();
        ticks(&mut state, 1);
        state.request_break(5).unwrap();
        state.reset();
        assert_eq!(state.phase, TimerPhase::Idle);
        assert_eq!(state.remaining_secs, 1500);
        assert_eq!(state.break_remaining_secs, 0);
    }

    #[test]
    fn break_expiry_returns_to_running() {
        let mut state = TimerState::default();
        state.configure(120).unwrap();
        state.start(Utc::now()).unwrap();
        ticks(&mut state, 120);
        assert_eq!(state.phase, TimerPhase::Completed);

        state.request_break(10).unwrap();
        assert_eq!(state.phase, TimerPhase::Break);
        assert_eq!(state.display(), "0:10");

        let events = ticks(&mut state, 10);
        assert_eq!(events, vec![TimerEvent::BreakFinished]);
        assert_eq!(state.phase, TimerPhase::Running);
        assert_eq!(state.remaining_secs, 120);
        assert!(state.has_started);
    }

    #[test]
    fn break_needs_completed_session_and_positive_length() {
        let mut state = TimerState::default();
        assert!(matches!(
            state.request_break(10),
            Err(TimerError::InvalidTransition { .. })
        ));

        state.configure(0).unwrap();
        state.start(Utc::now()).unwrap();
        ticks(&mut state, 1);
        assert!(matches!(
            state.request_break(0),
            Err(TimerError::NonPositiveBreak(0))
        ));
        assert_eq!(state.phase, TimerPhase::Completed);
    }

    #[test]
    fn skip_break_behaves_like_expiry() {
        let mut state = TimerState::default();
        state.configure(1).unwrap();
        state.start(Utc::now()).unwrap();
        ticks(&mut state, 1);
        state.request_break(300).unwrap();

        let event = state.skip_break(Utc::now()).unwrap();
        assert_eq!(event, TimerEvent::BreakFinished);
        assert_eq!(state.phase, TimerPhase::Running);
        assert_eq!(state.remaining_secs, 1);
        assert!(state.skip_break(Utc::now()).is_err());
    }

    #[test]
    fn continue_reading_restarts_the_countdown() {
        let mut state = TimerState::default();
        state.configure(2).unwrap();
        state.start(Utc::now()).unwrap();
        ticks(&mut state, 2);

        state.continue_reading(Utc::now()).unwrap();
        assert_eq!(state.phase, TimerPhase::Running);
        assert_eq!(state.remaining_secs, 2);
        assert!(state.continue_reading(Utc::now()).is_err());
    }

    #[test]
    fn display_formats_minutes_and_seconds() {
        let mut state = TimerState::default();
        assert_eq!(state.display(), "25:00");
        state.configure(65).unwrap();
        assert_eq!(state.display(), "1:05");
        assert_eq!(state.progress_ratio(), 1.0);
        state.configure(0).unwrap();
        assert_eq!(state.progress_ratio(), 0.0);
    }
}
