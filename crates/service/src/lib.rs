//! GoofyDeck device daemon
//!
//! Runs one cooperative loop over a [`session::DeviceSession`] and a
//! [`goofydeck_ipc::ControlServer`]: reconnect probing, control requests,
//! button reads turned into gesture events, and the periodic small-window
//! refresh with host load figures.

#![deny(static_mut_refs)]
#![deny(clippy::unwrap_used)]

pub mod config;
pub mod daemon;
pub mod error;
pub mod host_stats;
pub mod logging;
pub mod session;
pub mod telemetry;

pub use config::{Cli, DaemonConfig};
pub use daemon::{Daemon, Interval, install_shutdown_handler};
pub use error::{ConfigError, SessionError, SessionResult};
pub use host_stats::{GpuSource, HostSample, HostStats, StatsSource};
pub use session::DeviceSession;
pub use telemetry::{HumanBytes, Telemetry, human_bytes};
