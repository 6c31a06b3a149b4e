//! Unix domain socket lifecycle

use std::io::ErrorKind;
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::error::{IpcError, IpcResult};

/// Listening control socket. The socket file is removed on drop.
#[derive(Debug)]
pub struct UnixSocketTransport {
    socket_path: PathBuf,
    listener: UnixListener,
}

impl UnixSocketTransport {
    /// Bind a non-blocking listener at `path`, unlinking a stale socket file
    /// first.
    pub fn bind(path: impl Into<PathBuf>) -> IpcResult<Self> {
        let socket_path = path.into();
        match std::fs::remove_file(&socket_path) {
            Ok(()) => debug!(path = %socket_path.display(), "Removed stale socket file"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(IpcError::Bind(format!(
                    "cannot remove {}: {e}",
                    socket_path.display()
                )));
            }
        }

        let listener = UnixListener::bind(&socket_path).map_err(|e| {
            IpcError::Bind(format!("bind {}: {e}", socket_path.display()))
        })?;
        listener
            .set_nonblocking(true)
            .map_err(|e| IpcError::Bind(format!("set_nonblocking: {e}")))?;

        Ok(Self {
            socket_path,
            listener,
        })
    }

    /// Socket file path
    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// Accept a pending connection, if any
    pub fn accept(&self) -> IpcResult<Option<UnixStream>> {
        match self.listener.accept() {
            Ok((stream, _)) => Ok(Some(stream)),
            Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::Interrupted) => {
                Ok(None)
            }
            Err(e) => Err(IpcError::Accept(e.to_string())),
        }
    }
}

impl Drop for UnixSocketTransport {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_file(&self.socket_path)
            && e.kind() != ErrorKind::NotFound
        {
            warn!(path = %self.socket_path.display(), error = %e, "Failed to remove socket file");
        }
    }
}
