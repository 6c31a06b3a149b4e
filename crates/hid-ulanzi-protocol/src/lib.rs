//! HID protocol implementation for the Ulanzi D200 stream deck
//!
//! The device speaks a vendor framed protocol over 1024-byte HID reports.
//! Button images travel as a store-only ZIP container split across frames;
//! the firmware mangles `0x00`/`0x7C` bytes landing on certain frame offsets,
//! so [`container`] provides the padding search and patch fallback that keep
//! archives clear of those positions.
//!
//! ## Layout
//! - [`frame`]: frame encoding and reassembly
//! - [`commands`]: command identifiers
//! - [`input`]: device to host reports
//! - [`payload`]: short command payloads
//! - [`container`]: ZIP writer/reader, quirk workaround, icon manifest

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod commands;
pub mod container;
pub mod frame;
pub mod input;
pub mod payload;

pub use commands::*;
pub use container::{
    IconItem, PaddingPolicy, PreparedArchive, ZipError, find_valid_padding, has_quirk_bytes,
    patch_quirk_bytes, prepare_external_archive, prepare_icon_archive,
};
pub use frame::*;
pub use input::*;
pub use payload::*;

use goofydeck_hid_common::HidCommonError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum UlanziError {
    #[error("Invalid report size: expected at least {expected}, got {actual}")]
    InvalidReportSize { expected: usize, actual: usize },

    #[error("Invalid frame header: {0:02x?}")]
    InvalidHeader([u8; 2]),

    #[error("Invalid button index: {0}")]
    InvalidButtonIndex(usize),

    #[error("Payload too large: {actual} bytes exceeds {limit}")]
    PayloadTooLarge { limit: usize, actual: usize },

    #[error("Empty payload")]
    EmptyPayload,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Incomplete frame sequence: need {needed} more byte(s)")]
    IncompleteFrames { needed: usize },

    #[error("ZIP error: {0}")]
    Zip(#[from] ZipError),

    #[error("Manifest encoding failed: {0}")]
    Manifest(#[from] serde_json::Error),

    #[error("HID error: {0}")]
    HidError(String),
}

pub type UlanziResult<T> = Result<T, UlanziError>;

impl From<HidCommonError> for UlanziError {
    fn from(e: HidCommonError) -> Self {
        UlanziError::HidError(e.to_string())
    }
}

pub const VENDOR_ID: u16 = 0x2207;
pub const PRODUCT_ID: u16 = 0x0019;

pub const PACKET_SIZE: usize = 1024;
pub const HEADER_SIZE: usize = 8;
/// Payload capacity of the first frame of a command.
pub const FIRST_PAYLOAD_SIZE: usize = PACKET_SIZE - HEADER_SIZE;
pub const MAGIC: [u8; 2] = [0x7c, 0x7c];
/// Prepended to every frame on write.
pub const REPORT_ID: u8 = 0x00;

pub const BUTTON_COUNT: usize = 14;
/// Index of the wide tile, which never carries a label.
pub const WIDE_BUTTON_INDEX: usize = 13;
pub const GRID_COLUMNS: usize = 5;

pub const LABEL_STYLE_MAX_BYTES: usize = 4096;
pub const DEFAULT_MAX_PADDING: usize = 1024;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert_eq!(FIRST_PAYLOAD_SIZE, 1016);
        assert_eq!(WIDE_BUTTON_INDEX, BUTTON_COUNT - 1);
    }

    #[test]
    fn test_hid_error_conversion() {
        let err: UlanziError = HidCommonError::Disconnected.into();
        assert_eq!(err.to_string(), "HID error: Device disconnected");
    }
}
