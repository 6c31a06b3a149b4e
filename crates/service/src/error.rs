//! Service error types

use std::path::PathBuf;

use goofydeck_hid_common::HidCommonError;
use goofydeck_hid_ulanzi_protocol::{UlanziError, ZipError};
use thiserror::Error;

/// Failure of a device session operation
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("no device connected")]
    NoDevice,

    #[error("HID error: {0}")]
    Hid(#[from] HidCommonError),

    #[error("protocol error: {0}")]
    Protocol(#[from] UlanziError),

    #[error("archive error: {0}")]
    Archive(#[from] ZipError),

    #[error("cannot read {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl SessionError {
    /// Whether the device should be treated as gone
    pub fn is_disconnect(&self) -> bool {
        match self {
            SessionError::NoDevice => true,
            SessionError::Hid(e) => e.is_transport_loss(),
            _ => false,
        }
    }

    pub(crate) fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SessionError::File {
            path: path.into(),
            source,
        }
    }
}

pub type SessionResult<T> = Result<T, SessionError>;

/// Invalid daemon configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disconnect_classification() {
        assert!(SessionError::NoDevice.is_disconnect());
        assert!(SessionError::Hid(HidCommonError::Disconnected).is_disconnect());
        assert!(!SessionError::Archive(ZipError::Empty).is_disconnect());
        assert!(
            !SessionError::file("/x.png", std::io::Error::from(std::io::ErrorKind::NotFound))
                .is_disconnect()
        );
    }

    #[test]
    fn test_file_error_names_path() {
        let err = SessionError::file(
            "/icons/a.png",
            std::io::Error::from(std::io::ErrorKind::NotFound),
        );
        assert!(err.to_string().starts_with("cannot read /icons/a.png"));
    }
}
