//! Prelude module for convenient imports

pub use crate::codec::LineCodec;
pub use crate::command::{
    ButtonSet, ButtonSpec, Command, CommandError, DeviceEvent, ExplicitTarget, Reply,
};
pub use crate::error::{IpcError, IpcResult};
pub use crate::server::{ControlServer, ControlServerConfig, Request};
pub use crate::transport::UnixSocketTransport;
pub use crate::{DEFAULT_SOCKET_PATH, MAX_REQUEST_LEN};
