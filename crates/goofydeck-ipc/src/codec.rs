//! Line framing for the control socket

use std::fmt::Display;
use std::io::{ErrorKind, Read};

use crate::MAX_REQUEST_LEN;
use crate::error::{IpcError, IpcResult};

/// Line codec: requests end at the first `\n` (or EOF), replies and events
/// are written as one `\n`-terminated line each.
#[derive(Debug, Clone, Copy)]
pub struct LineCodec {
    /// Maximum request size in bytes
    max_line_len: usize,
}

impl LineCodec {
    /// Create a codec with the default request limit
    pub fn new() -> Self {
        Self {
            max_line_len: MAX_REQUEST_LEN,
        }
    }

    /// Create a codec with a custom request limit
    pub fn with_max_len(max_line_len: usize) -> Self {
        Self { max_line_len }
    }

    /// Get the request limit
    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    /// Extract the request from raw bytes: cut at the first newline and strip
    /// trailing CR/LF. Blank input yields `None`.
    pub fn decode(&self, raw: &[u8]) -> IpcResult<Option<String>> {
        let line = raw
            .iter()
            .position(|&b| b == b'\n')
            .and_then(|end| raw.get(..end))
            .unwrap_or(raw);
        if line.len() > self.max_line_len {
            return Err(IpcError::RequestTooLarge {
                max: self.max_line_len,
            });
        }
        let text =
            std::str::from_utf8(line).map_err(|e| IpcError::InvalidUtf8(e.to_string()))?;
        let text = text.trim_end_matches(['\r', '\n']);
        if text.trim().is_empty() {
            return Ok(None);
        }
        Ok(Some(text.to_string()))
    }

    /// Read one request line. Stops at newline, EOF, or the limit. A read
    /// timeout after partial data still yields that data; without data the
    /// timeout error is returned as is.
    pub fn read_request<R: Read>(&self, reader: &mut R) -> IpcResult<Option<String>> {
        let mut buf = Vec::with_capacity(128);
        let mut chunk = [0u8; 512];
        loop {
            match reader.read(&mut chunk) {
                Ok(0) => break,
                Ok(n) => {
                    buf.extend_from_slice(chunk.get(..n).unwrap_or_default());
                    if buf.contains(&b'\n') {
                        break;
                    }
                    if buf.len() > self.max_line_len {
                        return Err(IpcError::RequestTooLarge {
                            max: self.max_line_len,
                        });
                    }
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    if buf.is_empty() {
                        return Err(IpcError::Io(e));
                    }
                    break;
                }
                Err(e) => return Err(IpcError::Io(e)),
            }
        }
        self.decode(&buf)
    }

    /// Encode one outgoing line
    pub fn encode_line(&self, line: &dyn Display) -> Vec<u8> {
        format!("{line}\n").into_bytes()
    }
}

impl Default for LineCodec {
    fn default() -> Self {
        Self::new()
    }
}
