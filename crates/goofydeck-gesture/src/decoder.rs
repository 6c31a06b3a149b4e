//! Gesture state machine

use crate::{ButtonState, GestureEvent, GestureKind, GestureThresholds, Transition};
use goofydeck_hid_ulanzi_protocol::{BUTTON_COUNT, ButtonReport, WIDE_BUTTON_INDEX};
use std::time::Instant;
use tracing::{debug, trace};

/// Decodes raw press telemetry into gestures.
///
/// Per button the emitted order is always press-derived events, then at most
/// one `HOLD`, then at most one `LONGHOLD`, then `RELEASED`.
#[derive(Debug, Clone, Default)]
pub struct GestureDecoder {
    buttons: [ButtonState; BUTTON_COUNT],
    thresholds: GestureThresholds,
}

impl GestureDecoder {
    pub fn new(thresholds: GestureThresholds) -> Self {
        Self {
            buttons: [ButtonState::default(); BUTTON_COUNT],
            thresholds,
        }
    }

    pub fn button(&self, index: usize) -> Option<&ButtonState> {
        self.buttons.get(index)
    }

    pub fn any_down(&self) -> bool {
        self.buttons.iter().any(ButtonState::is_down)
    }

    /// Drops all press state, as on disconnect.
    pub fn reset(&mut self) {
        self.buttons.iter_mut().for_each(ButtonState::reset);
    }

    pub fn on_report(&mut self, report: &ButtonReport, now: Instant) -> Vec<GestureEvent> {
        match report.button() {
            Some(index) => self.on_input(index, report.raw_press, now),
            None => {
                trace!(index = report.index, "ignoring out of range button");
                Vec::new()
            }
        }
    }

    pub fn on_input(&mut self, index: usize, raw_press: u8, now: Instant) -> Vec<GestureEvent> {
        let wide = index == WIDE_BUTTON_INDEX;
        let hold = self.thresholds.hold;
        let Some(state) = self.buttons.get_mut(index) else {
            return Vec::new();
        };

        let transition = Transition::classify(wide, raw_press, state.is_down());
        debug!(button = index + 1, raw_press, ?transition, "button input");

        match transition {
            Transition::Press if state.is_down() => Vec::new(),
            Transition::Press => {
                state.press(now);
                if wide {
                    vec![GestureEvent::new(index, GestureKind::Tap)]
                } else {
                    Vec::new()
                }
            }
            Transition::Release if !state.is_down() => Vec::new(),
            Transition::Release => {
                let held = state.held(now);
                state.reset();
                debug!(button = index + 1, held_ms = held.as_millis() as u64, "release");
                if !wide && held < hold {
                    vec![
                        GestureEvent::new(index, GestureKind::Tap),
                        GestureEvent::new(index, GestureKind::Released),
                    ]
                } else {
                    vec![GestureEvent::new(index, GestureKind::Released)]
                }
            }
            Transition::Ignore => Vec::new(),
        }
    }

    /// Timer pass run when a read returned nothing. Emits at most one event
    /// per button.
    pub fn poll_idle(&mut self, now: Instant) -> Vec<GestureEvent> {
        let GestureThresholds { hold, longhold } = self.thresholds;
        let mut events = Vec::new();
        for (index, state) in self.buttons.iter_mut().enumerate() {
            if !state.is_down() {
                continue;
            }
            let held = state.held(now);
            if !state.hold_emitted {
                if held >= hold {
                    state.hold_emitted = true;
                    events.push(GestureEvent::new(index, GestureKind::Hold(held)));
                }
            } else if !state.longhold_emitted && held >= longhold {
                state.longhold_emitted = true;
                events.push(GestureEvent::new(index, GestureKind::LongHold(held)));
            }
        }
        events
    }
}
