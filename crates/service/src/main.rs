//! Ulanzi D200 device daemon (ulanzid)

#![deny(clippy::unwrap_used)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use anyhow::{Context, Result};
use clap::Parser;
use goofydeck_hid_common::backend::HidApiPort;
use goofydeck_ipc::ControlServer;
use goofydeck_service::{Cli, Daemon, DaemonConfig, HostStats, install_shutdown_handler, logging};
use tracing::info;

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = DaemonConfig::try_from(cli).context("Invalid configuration")?;
    logging::init(config.debug).context("Failed to initialise logging")?;

    info!(
        version = env!("CARGO_PKG_VERSION"),
        socket = %config.socket_path.display(),
        vid = format_args!("{:04x}", config.vendor_id),
        pid = format_args!("{:04x}", config.product_id),
        "Starting ulanzid"
    );

    let running = Arc::new(AtomicBool::new(true));
    install_shutdown_handler(Arc::clone(&running)).context("Failed to install signal handler")?;

    let port = HidApiPort::new().context("Failed to initialise hidapi")?;
    let server =
        ControlServer::bind(config.server_config()).context("Failed to bind control socket")?;
    let stats = HostStats::new(config.gpu_script.clone());

    let mut daemon = Daemon::new(&config, Box::new(port), server, stats, running);
    daemon.run();

    info!("ulanzid stopped");
    Ok(())
}
