//! Common HID utilities for GoofyDeck device protocols
//!
//! This crate provides the device/port abstraction shared by the protocol
//! crates and the daemon, byte-level report helpers, an in-memory mock used
//! by tests, and the `hidapi` backed production port.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod backend;
pub mod device_info;
pub mod hid_traits;
pub mod report_parser;

pub use device_info::*;
pub use hid_traits::*;
pub use report_parser::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum HidCommonError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Failed to open device: {0}")]
    OpenError(String),

    #[error("Failed to read from device: {0}")]
    ReadError(String),

    #[error("Failed to write to device: {0}")]
    WriteError(String),

    #[error("Invalid report format: {0}")]
    InvalidReport(String),

    #[error("Device disconnected")]
    Disconnected,

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl HidCommonError {
    /// Errors after which the handle must be considered dead.
    pub fn is_transport_loss(&self) -> bool {
        matches!(
            self,
            HidCommonError::ReadError(_)
                | HidCommonError::WriteError(_)
                | HidCommonError::Disconnected
                | HidCommonError::IoError(_)
        )
    }
}

pub type HidCommonResult<T> = Result<T, HidCommonError>;
