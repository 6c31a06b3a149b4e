//! Button gesture decoding for the Ulanzi D200
//!
//! Raw telemetry carries only "something happened to button N". This crate
//! turns it into `TAP`, `HOLD`, `LONGHOLD` and `RELEASED` events using a
//! per-button state machine driven by caller supplied [`std::time::Instant`]s.
//!
//! The wide tile (index 13) differs from the grid: its hardware sends the
//! same raw value for press and release, so alternate reports toggle it and
//! `TAP` is emitted on the press edge.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod decoder;
pub mod event;
pub mod state;

pub use decoder::*;
pub use event::*;
pub use state::*;

pub use goofydeck_hid_ulanzi_protocol::{BUTTON_COUNT, WIDE_BUTTON_INDEX};
