//! Event loop: reconnect probe, one control request, one HID read, keepalive.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use goofydeck_hid_common::HidPort;
use goofydeck_ipc::{Command, ControlServer, DeviceEvent, Reply, Request};
use tracing::{debug, info, warn};

use crate::config::DaemonConfig;
use crate::error::SessionResult;
use crate::host_stats::StatsSource;
use crate::session::DeviceSession;

/// Pause between loop iterations.
pub const LOOP_SLEEP: Duration = Duration::from_millis(5);

/// Fixed-period check driven by the loop clock.
#[derive(Debug, Clone, Copy)]
pub struct Interval {
    period: Duration,
    last: Instant,
}

impl Interval {
    pub fn new(period: Duration, now: Instant) -> Self {
        Self { period, last: now }
    }

    pub fn is_due(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) >= self.period
    }

    pub fn reset(&mut self, now: Instant) {
        self.last = now;
    }
}

/// Local wall clock as the device shows it.
pub fn clock_string() -> String {
    chrono::Local::now().format("%H:%M:%S").to_string()
}

pub struct Daemon<S> {
    session: DeviceSession,
    server: ControlServer,
    stats: S,
    keepalive: Interval,
    running: Arc<AtomicBool>,
}

impl<S: StatsSource> Daemon<S> {
    pub fn new(
        config: &DaemonConfig,
        port: Box<dyn HidPort>,
        server: ControlServer,
        stats: S,
        running: Arc<AtomicBool>,
    ) -> Self {
        Self {
            session: DeviceSession::new(port, config),
            server,
            stats,
            keepalive: Interval::new(config.keepalive_interval, Instant::now()),
            running,
        }
    }

    pub fn session(&self) -> &DeviceSession {
        &self.session
    }

    /// Loop until the running flag is cleared.
    pub fn run(&mut self) {
        info!("Daemon loop started");
        while self.running.load(Ordering::SeqCst) {
            self.tick(Instant::now());
            std::thread::sleep(LOOP_SLEEP);
        }
        info!(
            zips = self.session.telemetry().zips_sent,
            bytes = self.session.telemetry().bytes_sent,
            "Daemon loop stopped"
        );
    }

    /// One iteration of the loop, without the trailing sleep.
    pub fn tick(&mut self, now: Instant) {
        if self.session.poll_reconnect(now) {
            self.keepalive.reset(now);
            self.server.notify(&DeviceEvent::Connected);
        }

        match self.server.accept_one() {
            Ok(Some(request)) => self.dispatch(request),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Accept failed"),
        }

        if self.server.has_subscriber() && self.session.is_open() {
            match self.session.read_events() {
                Ok(events) => {
                    for event in &events {
                        debug!(%event, "gesture");
                        if !self.server.notify(event) {
                            break;
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "Device read failed");
                    self.handle_disconnect();
                }
            }
        }

        if self.keepalive.is_due(now) {
            self.keepalive.reset(now);
            if self.session.is_open() {
                let host = self.stats.sample();
                if let Err(e) = self.session.keepalive(host, &clock_string()) {
                    warn!(error = %e, "Keepalive failed");
                    self.handle_disconnect();
                }
            }
        }
    }

    fn handle_disconnect(&mut self) {
        self.session.disconnect();
        self.server.notify(&DeviceEvent::Disconnected);
    }

    fn dispatch(&mut self, request: Request) {
        let reply = match request.parse() {
            Ok(Command::Ping) if self.session.is_open() => Reply::Ok,
            Ok(Command::Ping) => Reply::NoDevice,
            Ok(Command::ReadButtons) => {
                if let Err(e) = self.server.subscribe(request) {
                    warn!(error = %e, "Subscribe failed");
                }
                return;
            }
            Ok(command) if command.requires_device() && !self.session.is_open() => {
                Reply::NoDevice
            }
            Err(_) if !self.session.is_open() => Reply::NoDevice,
            Err(e) => {
                debug!(request = request.line(), error = %e, "Rejected request");
                e.reply()
            }
            Ok(command) => match self.execute(command) {
                Ok(()) => Reply::Ok,
                Err(e) => {
                    warn!(request = request.line(), error = %e, "Command failed");
                    if e.is_disconnect() {
                        self.handle_disconnect();
                    }
                    Reply::Err
                }
            },
        };
        if let Err(e) = request.reply(reply) {
            debug!(error = %e, "Reply not delivered");
        }
    }

    fn execute(&mut self, command: Command) -> SessionResult<()> {
        match command {
            Command::SetBrightness(level) => self.session.set_brightness(level),
            Command::SetSmallWindow { window, clock } => {
                self.session.set_small_window(window, &clock)
            }
            Command::SetLabelStyle(path) => self.session.set_label_style(&path),
            Command::SetButtons(path) => self.session.set_buttons_zip(&path),
            Command::SetButtonsExplicit(set) => self.session.set_buttons_explicit(&set),
            Command::Ping | Command::ReadButtons => Ok(()),
        }
    }
}

/// Clear `running` on SIGINT or SIGTERM.
pub fn install_shutdown_handler(running: Arc<AtomicBool>) -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(move || {
        info!("Shutdown requested");
        running.store(false, Ordering::SeqCst);
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval() {
        let t0 = Instant::now();
        let mut interval = Interval::new(Duration::from_secs(24), t0);
        assert!(!interval.is_due(t0 + Duration::from_secs(23)));
        assert!(interval.is_due(t0 + Duration::from_secs(24)));
        interval.reset(t0 + Duration::from_secs(24));
        assert!(!interval.is_due(t0 + Duration::from_secs(30)));
    }

    #[test]
    fn test_clock_string_shape() {
        let clock = clock_string();
        assert_eq!(clock.len(), 8);
        assert_eq!(clock.matches(':').count(), 2);
    }
}
