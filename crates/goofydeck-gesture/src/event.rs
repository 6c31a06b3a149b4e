//! Gesture events and their wire form

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// What happened to a button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GestureKind {
    /// Short press.
    Tap,
    /// Still down past the hold threshold; carries the held time.
    Hold(Duration),
    /// Still down past the long-hold threshold; carries the held time.
    LongHold(Duration),
    /// Button came up. Always the last event of a press.
    Released,
}

/// A gesture on a zero-based button index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GestureEvent {
    pub button: usize,
    pub kind: GestureKind,
}

impl GestureEvent {
    pub fn new(button: usize, kind: GestureKind) -> Self {
        Self { button, kind }
    }

    /// One-based number used on the wire.
    #[must_use]
    pub fn button_number(&self) -> usize {
        self.button.saturating_add(1)
    }
}

/// `button N TAP`, `button N HOLD (1.23s)`, `button N LONGHOLD (5.01s)`,
/// `button N RELEASED`.
impl fmt::Display for GestureEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let n = self.button_number();
        match self.kind {
            GestureKind::Tap => write!(f, "button {n} TAP"),
            GestureKind::Hold(held) => write!(f, "button {n} HOLD ({:.2}s)", held.as_secs_f64()),
            GestureKind::LongHold(held) => {
                write!(f, "button {n} LONGHOLD ({:.2}s)", held.as_secs_f64())
            }
            GestureKind::Released => write!(f, "button {n} RELEASED"),
        }
    }
}
