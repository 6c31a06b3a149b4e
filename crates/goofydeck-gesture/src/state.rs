//! Per-button press state and thresholds

use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub const HOLD_THRESHOLD: Duration = Duration::from_millis(750);
pub const LONGHOLD_THRESHOLD: Duration = Duration::from_secs(5);

/// Timing thresholds for hold detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureThresholds {
    /// Presses released before this are taps; past it an idle tick emits `HOLD`.
    pub hold: Duration,
    /// Past this an idle tick emits `LONGHOLD`.
    pub longhold: Duration,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            hold: HOLD_THRESHOLD,
            longhold: LONGHOLD_THRESHOLD,
        }
    }
}

/// State of one button between press and release.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ButtonState {
    pub down_since: Option<Instant>,
    pub hold_emitted: bool,
    pub longhold_emitted: bool,
}

impl ButtonState {
    #[must_use]
    pub fn is_down(&self) -> bool {
        self.down_since.is_some()
    }

    /// Held time at `now`, zero when the button is up.
    #[must_use]
    pub fn held(&self, now: Instant) -> Duration {
        self.down_since
            .map(|since| now.saturating_duration_since(since))
            .unwrap_or_default()
    }

    pub fn press(&mut self, now: Instant) {
        *self = Self {
            down_since: Some(now),
            hold_emitted: false,
            longhold_emitted: false,
        };
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// How a raw report affects a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Press,
    Release,
    Ignore,
}

impl Transition {
    /// Maps a raw press byte to a transition. Grid buttons report `1` for
    /// press and anything else for release; the wide tile reports `1` for
    /// both edges and toggles on it.
    #[must_use]
    pub fn classify(wide: bool, raw_press: u8, is_down: bool) -> Self {
        match (wide, raw_press == 0x01, is_down) {
            (true, true, false) => Transition::Press,
            (true, true, true) => Transition::Release,
            (true, false, _) => Transition::Ignore,
            (false, true, _) => Transition::Press,
            (false, false, _) => Transition::Release,
        }
    }
}
