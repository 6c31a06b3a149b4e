//! Control server: one request per connection, one event subscriber

use std::fmt::Display;
use std::io::{self, ErrorKind, Read, Write};
use std::os::unix::net::UnixStream;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::codec::LineCodec;
use crate::command::{Command, CommandError, Reply};
use crate::error::{IpcError, IpcResult};
use crate::transport::UnixSocketTransport;
use crate::{DEFAULT_SOCKET_PATH, MAX_REQUEST_LEN};

/// Waits up to the read timeout for the first chunk of a request only.
/// Once data has arrived the stream is non-blocking, so a request without a
/// trailing newline ends at whatever the client has already sent.
struct RequestReader<'a> {
    stream: &'a UnixStream,
    waiting: bool,
}

impl Read for RequestReader<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut stream = self.stream;
        let n = stream.read(buf)?;
        if self.waiting && n > 0 {
            self.waiting = false;
            self.stream.set_nonblocking(true)?;
        }
        Ok(n)
    }
}

/// Control server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlServerConfig {
    /// Socket file path
    pub socket_path: PathBuf,
    /// How long a client may take to send its request line
    pub read_timeout: Duration,
    /// Write timeout for replies and pushed events
    pub write_timeout: Duration,
    /// Longest request accepted
    pub max_line_len: usize,
}

impl Default for ControlServerConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            read_timeout: Duration::from_millis(500),
            write_timeout: Duration::from_millis(200),
            max_line_len: MAX_REQUEST_LEN,
        }
    }
}

impl ControlServerConfig {
    /// Configuration for a specific socket path
    pub fn with_socket_path(path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: path.into(),
            ..Self::default()
        }
    }

    /// Set the request read timeout
    pub fn read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    /// Set the write timeout
    pub fn write_timeout(mut self, timeout: Duration) -> Self {
        self.write_timeout = timeout;
        self
    }

    fn validate(&self) -> IpcResult<()> {
        if self.read_timeout.is_zero() || self.write_timeout.is_zero() {
            return Err(IpcError::InvalidConfig("timeouts must be non-zero".into()));
        }
        if self.max_line_len == 0 {
            return Err(IpcError::InvalidConfig("max_line_len must be non-zero".into()));
        }
        Ok(())
    }
}

/// A received request awaiting its reply
#[derive(Debug)]
pub struct Request {
    stream: UnixStream,
    line: String,
    codec: LineCodec,
}

impl Request {
    /// Raw request line
    pub fn line(&self) -> &str {
        &self.line
    }

    /// Parse the request line
    pub fn parse(&self) -> Result<Command, CommandError> {
        Command::parse(&self.line)
    }

    /// Send the reply and close the connection
    pub fn reply(mut self, reply: Reply) -> IpcResult<()> {
        self.stream.write_all(&self.codec.encode_line(&reply))?;
        Ok(())
    }
}

/// Control socket server driven by the daemon loop
#[derive(Debug)]
pub struct ControlServer {
    transport: UnixSocketTransport,
    codec: LineCodec,
    config: ControlServerConfig,
    subscriber: Option<UnixStream>,
}

impl ControlServer {
    /// Bind the control socket
    pub fn bind(config: ControlServerConfig) -> IpcResult<Self> {
        config.validate()?;
        let transport = UnixSocketTransport::bind(config.socket_path.clone())?;
        info!(path = %config.socket_path.display(), "Control socket listening");
        Ok(Self {
            transport,
            codec: LineCodec::with_max_len(config.max_line_len),
            config,
            subscriber: None,
        })
    }

    /// Server configuration
    pub fn config(&self) -> &ControlServerConfig {
        &self.config
    }

    /// Accept at most one pending connection and read its request.
    ///
    /// Connections that send nothing usable are dropped and yield `None`;
    /// only listener failures are returned as errors.
    pub fn accept_one(&mut self) -> IpcResult<Option<Request>> {
        let Some(stream) = self.transport.accept()? else {
            return Ok(None);
        };
        match self.read_request(stream) {
            Ok(request) => Ok(request),
            Err(e) if e.is_per_connection() => {
                debug!(error = %e, "Dropping client connection");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn read_request(&self, stream: UnixStream) -> IpcResult<Option<Request>> {
        stream.set_nonblocking(false)?;
        stream.set_read_timeout(Some(self.config.read_timeout))?;
        stream.set_write_timeout(Some(self.config.write_timeout))?;
        let mut reader = RequestReader {
            stream: &stream,
            waiting: true,
        };
        let read = self.codec.read_request(&mut reader);
        stream.set_nonblocking(false)?;
        let line = match read {
            Ok(Some(line)) => line,
            Ok(None) => return Ok(None),
            Err(IpcError::Io(e))
                if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) =>
            {
                let timeout_ms =
                    u64::try_from(self.config.read_timeout.as_millis()).unwrap_or(u64::MAX);
                return Err(IpcError::timeout(timeout_ms));
            }
            Err(e) => return Err(e),
        };
        debug!(request = %line, "Control request");
        Ok(Some(Request {
            stream,
            line,
            codec: self.codec,
        }))
    }

    /// Acknowledge a `read-buttons` request and keep its connection as the
    /// event subscriber, replacing any previous one.
    pub fn subscribe(&mut self, request: Request) -> IpcResult<()> {
        let Request {
            mut stream, codec, ..
        } = request;
        stream.write_all(&codec.encode_line(&Reply::Ok))?;
        if self.subscriber.replace(stream).is_some() {
            debug!("Replaced previous event subscriber");
        } else {
            info!("Event subscriber attached");
        }
        Ok(())
    }

    /// Whether an event subscriber is attached
    pub fn has_subscriber(&self) -> bool {
        self.subscriber.is_some()
    }

    /// Push one line to the subscriber. A failed write detaches it.
    /// Returns whether the line was delivered.
    pub fn notify(&mut self, line: &dyn Display) -> bool {
        let Some(stream) = self.subscriber.as_mut() else {
            return false;
        };
        match stream.write_all(&self.codec.encode_line(line)) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Event subscriber went away");
                self.subscriber = None;
                false
            }
        }
    }
}
