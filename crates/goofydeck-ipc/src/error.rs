//! Control socket errors

use std::io;
use thiserror::Error;

/// Errors raised by the control socket
#[derive(Debug, Error)]
pub enum IpcError {
    /// Socket file could not be prepared or bound
    #[error("cannot bind control socket: {0}")]
    Bind(String),

    /// Accepting a client failed
    #[error("accept failed: {0}")]
    Accept(String),

    /// Client sent more than the line limit without a newline
    #[error("request longer than {max} bytes")]
    RequestTooLarge {
        /// Line limit in bytes
        max: usize,
    },

    /// Request bytes were not UTF-8
    #[error("request is not UTF-8: {0}")]
    InvalidUtf8(String),

    /// Client connected but sent nothing within the read timeout
    #[error("no request within {timeout_ms}ms")]
    Timeout {
        /// Read timeout in milliseconds
        timeout_ms: u64,
    },

    /// Socket read or write failed
    #[error(transparent)]
    Io(#[from] io::Error),

    /// Server settings rejected at bind time
    #[error("invalid control socket config: {0}")]
    InvalidConfig(String),
}

impl IpcError {
    /// Errors confined to a single client connection
    pub fn is_per_connection(&self) -> bool {
        matches!(
            self,
            IpcError::RequestTooLarge { .. }
                | IpcError::InvalidUtf8(_)
                | IpcError::Timeout { .. }
                | IpcError::Io(_)
        )
    }

    /// Errors that prevent the server from starting
    pub fn is_fatal(&self) -> bool {
        matches!(self, IpcError::Bind(_) | IpcError::InvalidConfig(_))
    }

    /// Read timeout error for a client that sent nothing
    pub fn timeout(timeout_ms: u64) -> Self {
        IpcError::Timeout { timeout_ms }
    }
}

pub type IpcResult<T> = std::result::Result<T, IpcError>;
