//! Control socket for the GoofyDeck device daemon
//!
//! This crate provides the process boundary of the daemon: a Unix domain
//! stream socket speaking one request line and one reply line per
//! connection, plus a single long-lived event subscriber.
//!
//! # Architecture
//!
//! - [`transport`]: socket file lifecycle (stale cleanup, non-blocking bind)
//! - [`codec`]: line framing for requests, replies and pushed events
//! - [`command`]: the command grammar and reply vocabulary
//! - [`server`]: accept loop step and subscriber registry
//! - [`error`]: IPC-specific error types
//!
//! # Example
//!
//! ```no_run
//! use goofydeck_ipc::prelude::*;
//!
//! fn serve_once(server: &mut ControlServer) -> IpcResult<()> {
//!     if let Some(request) = server.accept_one()? {
//!         match request.parse() {
//!             Ok(Command::Ping) => request.reply(Reply::Ok)?,
//!             Ok(Command::ReadButtons) => server.subscribe(request)?,
//!             Ok(_) => request.reply(Reply::Err)?,
//!             Err(_) => request.reply(Reply::Unknown)?,
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod codec;
pub mod command;
pub mod error;
pub mod prelude;
pub mod server;
pub mod transport;

pub use codec::LineCodec;
pub use command::{ButtonSet, ButtonSpec, Command, CommandError, DeviceEvent, ExplicitTarget, Reply};
pub use error::{IpcError, IpcResult};
pub use server::{ControlServer, ControlServerConfig, Request};
pub use transport::UnixSocketTransport;

/// Default control socket path
pub const DEFAULT_SOCKET_PATH: &str = "/tmp/ulanzi_device.sock";

/// Longest request line accepted, in bytes
pub const MAX_REQUEST_LEN: usize = 2047;
