//! Daemon configuration: command line with environment fallbacks

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use clap::builder::FalseyValueParser;
use goofydeck_hid_ulanzi_protocol::{DEFAULT_MAX_PADDING, PRODUCT_ID, PaddingPolicy, VENDOR_ID};
use goofydeck_ipc::{ControlServerConfig, DEFAULT_SOCKET_PATH};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Largest filler the padding search may be asked to try.
pub const MAX_PADDING_LIMIT: usize = 64 * 1024;

/// Upper bound for the keepalive and reconnect periods.
pub const MAX_INTERVAL: Duration = Duration::from_secs(3600);

/// Command line of `ulanzid`
#[derive(Debug, Clone, Parser)]
#[command(name = "ulanzid")]
#[command(about = "Ulanzi D200 device daemon")]
#[command(version)]
pub struct Cli {
    /// Control socket path
    #[arg(long, env = "ULANZI_SOCKET", default_value = DEFAULT_SOCKET_PATH)]
    pub socket: PathBuf,

    /// USB vendor id (hex)
    #[arg(long, value_parser = parse_hex_u16, default_value = "2207")]
    pub vid: u16,

    /// USB product id (hex)
    #[arg(long, value_parser = parse_hex_u16, default_value = "0019")]
    pub pid: u16,

    /// Largest filler length tried before falling back to byte patching
    #[arg(long, default_value_t = DEFAULT_MAX_PADDING)]
    pub max_padding: usize,

    /// Skip the padding search for `set-buttons` archives and patch offending
    /// bytes directly. `0`, `false`, `no`, `off` or an empty value leave it off.
    #[arg(long, env = "ULANZI_FAST_NOPAD", value_parser = FalseyValueParser::new())]
    pub fast_nopad: bool,

    /// Seconds between small-window refreshes
    #[arg(long, default_value_t = 24)]
    pub keepalive_secs: u64,

    /// Minimum delay between reconnect attempts, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub reconnect_ms: u64,

    /// HID read timeout per loop iteration, in milliseconds
    #[arg(long, default_value_t = 50)]
    pub read_timeout_ms: u64,

    /// Script printing the GPU load; replaces sysfs probing
    #[arg(long, env = "ULANZI_GPU_SCRIPT")]
    pub gpu_script: Option<PathBuf>,

    /// Debug logging when RUST_LOG is not set. `0`, `false`, `no`, `off` or an
    /// empty value leave it off.
    #[arg(long, env = "ULANZI_DEBUG", value_parser = FalseyValueParser::new())]
    pub debug: bool,
}

fn parse_hex_u16(value: &str) -> Result<u16, String> {
    let digits = value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
        .unwrap_or(value);
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex id {value:?}: {e}"))
}

/// Runtime configuration of the daemon
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DaemonConfig {
    pub socket_path: PathBuf,
    pub vendor_id: u16,
    pub product_id: u16,
    pub padding: PaddingPolicy,
    pub keepalive_interval: Duration,
    pub reconnect_interval: Duration,
    pub read_timeout: Duration,
    pub gpu_script: Option<PathBuf>,
    pub debug: bool,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            socket_path: PathBuf::from(DEFAULT_SOCKET_PATH),
            vendor_id: VENDOR_ID,
            product_id: PRODUCT_ID,
            padding: PaddingPolicy::default(),
            keepalive_interval: Duration::from_secs(24),
            reconnect_interval: Duration::from_millis(500),
            read_timeout: Duration::from_millis(50),
            gpu_script: None,
            debug: false,
        }
    }
}

impl DaemonConfig {
    /// Check value ranges
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.padding.max_padding > MAX_PADDING_LIMIT {
            return Err(ConfigError::OutOfRange {
                field: "max_padding",
                reason: format!("must be at most {MAX_PADDING_LIMIT}"),
            });
        }
        for (field, interval) in [
            ("keepalive_interval", self.keepalive_interval),
            ("reconnect_interval", self.reconnect_interval),
        ] {
            if interval.is_zero() || interval > MAX_INTERVAL {
                return Err(ConfigError::OutOfRange {
                    field,
                    reason: "must be between 1ms and 1h".into(),
                });
            }
        }
        if self.read_timeout.is_zero() || self.read_timeout > Duration::from_secs(1) {
            return Err(ConfigError::OutOfRange {
                field: "read_timeout",
                reason: "must be between 1ms and 1s".into(),
            });
        }
        if self.socket_path.as_os_str().is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "socket_path",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// HID read timeout in the unit hidapi takes
    pub fn read_timeout_ms(&self) -> u32 {
        u32::try_from(self.read_timeout.as_millis()).unwrap_or(u32::MAX)
    }

    /// Control socket settings
    pub fn server_config(&self) -> ControlServerConfig {
        ControlServerConfig::with_socket_path(self.socket_path.clone())
    }
}

impl TryFrom<Cli> for DaemonConfig {
    type Error = ConfigError;

    fn try_from(cli: Cli) -> Result<Self, Self::Error> {
        let config = Self {
            socket_path: cli.socket,
            vendor_id: cli.vid,
            product_id: cli.pid,
            padding: PaddingPolicy {
                max_padding: cli.max_padding,
                patch_only: cli.fast_nopad,
            },
            keepalive_interval: Duration::from_secs(cli.keepalive_secs),
            reconnect_interval: Duration::from_millis(cli.reconnect_ms),
            read_timeout: Duration::from_millis(cli.read_timeout_ms),
            gpu_script: cli.gpu_script,
            debug: cli.debug,
        };
        config.validate()?;
        Ok(config)
    }
}
