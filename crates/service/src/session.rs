//! Device session: owns the HID handle, the reconnect throttle, the gesture
//! decoder and the small-window state kept alive between refreshes.

use std::collections::HashSet;
use std::path::Path;
use std::time::{Duration, Instant};

use goofydeck_gesture::{GestureDecoder, GestureEvent, GestureThresholds};
use goofydeck_hid_common::{HidDevice, HidPort};
use goofydeck_hid_ulanzi_protocol::{
    DeviceReport, Frame, IconItem, OutCommand, PaddingPolicy, PreparedArchive, SmallWindow,
    brightness_payload, encode_blob, encode_command, label_style_payload, prepare_external_archive,
    prepare_icon_archive, with_report_id,
};
use goofydeck_ipc::{ButtonSet, ButtonSpec};
use tracing::{debug, info, trace, warn};

use crate::config::DaemonConfig;
use crate::error::{SessionError, SessionResult};
use crate::host_stats::HostSample;
use crate::telemetry::Telemetry;

pub struct DeviceSession {
    port: Box<dyn HidPort>,
    device: Option<Box<dyn HidDevice>>,
    vendor_id: u16,
    product_id: u16,
    padding: PaddingPolicy,
    reconnect_interval: Duration,
    read_timeout_ms: u32,
    /// Earliest next open attempt; `None` probes on the next poll.
    next_probe: Option<Instant>,
    small_window: SmallWindow,
    decoder: GestureDecoder,
    telemetry: Telemetry,
}

impl DeviceSession {
    pub fn new(port: Box<dyn HidPort>, config: &DaemonConfig) -> Self {
        Self {
            port,
            device: None,
            vendor_id: config.vendor_id,
            product_id: config.product_id,
            padding: config.padding,
            reconnect_interval: config.reconnect_interval,
            read_timeout_ms: config.read_timeout_ms(),
            next_probe: None,
            small_window: SmallWindow::default(),
            decoder: GestureDecoder::new(GestureThresholds::default()),
            telemetry: Telemetry::default(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.device.is_some()
    }

    pub fn telemetry(&self) -> &Telemetry {
        &self.telemetry
    }

    pub fn small_window(&self) -> SmallWindow {
        self.small_window
    }

    /// Try to open the device when closed and the throttle allows it.
    /// Returns `true` when a new handle was opened.
    pub fn poll_reconnect(&mut self, now: Instant) -> bool {
        if self.device.is_some() || self.next_probe.is_some_and(|at| now < at) {
            return false;
        }
        match self.port.open_first(self.vendor_id, self.product_id) {
            Ok(device) => {
                info!(
                    device = %device.get_device_info().display_name(),
                    id = %device.get_device_info().id_string(),
                    "Device connected"
                );
                self.device = Some(device);
                self.next_probe = None;
                self.decoder.reset();
                true
            }
            Err(e) => {
                trace!(error = %e, "Device probe failed");
                self.next_probe = Some(now.checked_add(self.reconnect_interval).unwrap_or(now));
                false
            }
        }
    }

    /// Drop the handle and clear button state. The next poll probes at once.
    pub fn disconnect(&mut self) {
        if let Some(mut device) = self.device.take() {
            if let Err(e) = device.close() {
                debug!(error = %e, "Close after disconnect failed");
            }
            info!("Device disconnected");
        }
        self.decoder.reset();
        self.next_probe = None;
    }

    fn device(&mut self) -> SessionResult<&mut Box<dyn HidDevice>> {
        self.device.as_mut().ok_or(SessionError::NoDevice)
    }

    /// Write one frame behind report id 0, or bare when the host stack
    /// rejects the prefixed form.
    fn write_frame(&mut self, frame: &Frame) -> SessionResult<()> {
        let device = self.device()?;
        if let Err(e) = device.write_report(&with_report_id(frame)) {
            debug!(error = %e, "Prefixed write failed, retrying without report id");
            device.write_report(frame)?;
        }
        Ok(())
    }

    pub fn send_command(&mut self, command: OutCommand, payload: &[u8]) -> SessionResult<()> {
        let frame = encode_command(command, payload)?;
        debug!(command = ?command, len = payload.len(), "send command");
        self.write_frame(&frame)
    }

    fn send_archive(&mut self, command: OutCommand, archive: PreparedArchive) -> SessionResult<()> {
        let frames = encode_blob(command, &archive.bytes)?;
        debug!(command = ?command, frames = frames.len(), "send archive");
        for frame in &frames {
            self.write_frame(frame)?;
        }
        self.telemetry.record_archive(&archive);
        Ok(())
    }

    pub fn set_brightness(&mut self, level: i64) -> SessionResult<()> {
        self.send_command(OutCommand::SetBrightness, &brightness_payload(level))
    }

    /// Remembers `window` for later refreshes even when the write fails.
    pub fn set_small_window(&mut self, window: SmallWindow, clock: &str) -> SessionResult<()> {
        self.small_window = window;
        let payload = window.payload(clock)?;
        self.send_command(OutCommand::SetSmallWindowData, &payload)
    }

    /// Re-send the remembered mode with fresh host figures.
    pub fn keepalive(&mut self, host: HostSample, clock: &str) -> SessionResult<()> {
        let window = SmallWindow {
            mode: self.small_window.mode,
            cpu: host.cpu,
            mem: host.mem,
            gpu: host.gpu,
        };
        debug!(mode = %window.mode, clock, "keepalive");
        self.set_small_window(window, clock)
    }

    pub fn set_label_style(&mut self, path: &Path) -> SessionResult<()> {
        let style = read_file(path)?;
        let payload = label_style_payload(&style)?;
        self.send_command(OutCommand::SetLabelStyle, payload)
    }

    /// Re-wrap a prebuilt store-only ZIP and upload it as a full page.
    pub fn set_buttons_zip(&mut self, path: &Path) -> SessionResult<()> {
        let input = read_file(path)?;
        let archive = prepare_external_archive(&input, self.padding)?;
        self.send_archive(OutCommand::SetButtons, archive)
    }

    /// Build an archive from icon files on disk and upload it.
    pub fn set_buttons_explicit(&mut self, set: &ButtonSet) -> SessionResult<()> {
        let items = load_icons(&set.buttons)?;
        let archive = prepare_icon_archive(&items, self.padding)?;
        self.send_archive(set.target.out_command(), archive)
    }

    /// One timed read. Gesture events from the report, or from the idle
    /// timers when nothing arrived. Read failures are returned for the
    /// caller to treat as a disconnect.
    pub fn read_events(&mut self) -> SessionResult<Vec<GestureEvent>> {
        let timeout = self.read_timeout_ms;
        let data = self.device()?.read_report(timeout)?;
        let now = Instant::now();
        if data.is_empty() {
            return Ok(self.decoder.poll_idle(now));
        }
        match DeviceReport::parse(&data) {
            Ok(DeviceReport::Button(report)) => {
                if let Some(mode) = report.small_window_mode()
                    && mode != self.small_window.mode
                {
                    debug!(%mode, "device changed small-window mode");
                    self.small_window.mode = mode;
                }
                Ok(self.decoder.on_report(&report, now))
            }
            Ok(DeviceReport::DeviceInfo(info)) => {
                debug!(len = info.len(), "device info report");
                Ok(Vec::new())
            }
            Ok(DeviceReport::Unknown(command)) => {
                trace!(command = format_args!("{command:#06x}"), "unknown report");
                Ok(Vec::new())
            }
            Err(e) => {
                trace!(error = %e, len = data.len(), "unparsed report");
                Ok(Vec::new())
            }
        }
    }
}

impl Drop for DeviceSession {
    fn drop(&mut self) {
        if let Some(mut device) = self.device.take()
            && let Err(e) = device.close()
        {
            warn!(error = %e, "Failed to close device");
        }
    }
}

fn read_file(path: &Path) -> SessionResult<Vec<u8>> {
    std::fs::read(path).map_err(|e| SessionError::file(path, e))
}

/// Archive file name for an icon path; a clash gets the button number as
/// prefix.
fn icon_name(spec: &ButtonSpec, taken: &HashSet<String>) -> String {
    let base = spec
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| format!("button{}.png", spec.index + 1));
    if taken.contains(&base) {
        format!("{}_{base}", spec.index + 1)
    } else {
        base
    }
}

fn load_icons(buttons: &[ButtonSpec]) -> SessionResult<Vec<IconItem>> {
    let mut taken = HashSet::new();
    let mut items = Vec::with_capacity(buttons.len());
    for spec in buttons {
        let data = read_file(&spec.path)?;
        let name = icon_name(spec, &taken);
        taken.insert(name.clone());
        items.push(IconItem::new(spec.index, name, spec.label.clone(), data)?);
    }
    Ok(items)
}

impl std::fmt::Debug for DeviceSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("open", &self.is_open())
            .field("next_probe", &self.next_probe)
            .field("small_window", &self.small_window)
            .field("telemetry", &self.telemetry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    use goofydeck_hid_common::mock::{MockHidDevice, MockHidPort};
    use goofydeck_hid_ulanzi_protocol::{PACKET_SIZE, PRODUCT_ID, SmallWindowMode, VENDOR_ID};

    fn session_with_device() -> (DeviceSession, MockHidDevice, MockHidPort) {
        let port = MockHidPort::new();
        let device = MockHidDevice::new(VENDOR_ID, PRODUCT_ID, "/dev/hidraw3");
        port.add_device(device.clone());
        let session = DeviceSession::new(Box::new(port.clone()), &DaemonConfig::default());
        (session, device, port)
    }

    fn button_report(state: u8, index: u8, raw_press: u8) -> Vec<u8> {
        let mut report = vec![0x7c, 0x7c, 0x01, 0x01, 0x04, 0x00, 0x00, 0x00];
        report.extend_from_slice(&[state, index, 0x00, raw_press]);
        report
    }

    #[test]
    fn test_reconnect_is_throttled() {
        let port = MockHidPort::new();
        let mut session = DeviceSession::new(Box::new(port.clone()), &DaemonConfig::default());
        let t0 = Instant::now();

        assert!(!session.poll_reconnect(t0));
        assert!(!session.poll_reconnect(t0 + Duration::from_millis(100)));
        assert_eq!(port.probes(), 1);
        assert!(!session.poll_reconnect(t0 + Duration::from_millis(500)));
        assert_eq!(port.probes(), 2);
    }

    #[test]
    fn test_huge_reconnect_interval_does_not_overflow() {
        let port = MockHidPort::new();
        let config = DaemonConfig {
            reconnect_interval: Duration::MAX,
            ..DaemonConfig::default()
        };
        let mut session = DeviceSession::new(Box::new(port.clone()), &config);
        let t0 = Instant::now();

        assert!(!session.poll_reconnect(t0));
        assert!(!session.poll_reconnect(t0 + Duration::from_millis(5)));
        assert_eq!(port.probes(), 2);
    }

    #[test]
    fn test_write_retries_without_report_id() -> SessionResult<()> {
        let (mut session, device, _port) = session_with_device();
        assert!(session.poll_reconnect(Instant::now()));
        device.reject_report_id_prefix(true);

        session.set_brightness(150)?;
        let writes = device.get_write_history();
        assert_eq!(writes.len(), 1);
        let frame = writes.first().map(Vec::as_slice).unwrap_or_default();
        assert_eq!(frame.len(), PACKET_SIZE);
        assert_eq!(frame.get(..8), Some(&[0x7c, 0x7c, 0x00, 0x0a, 0x03, 0, 0, 0][..]));
        assert_eq!(frame.get(8..11), Some(&b"100"[..]));
        Ok(())
    }

    #[test]
    fn test_prefixed_write_is_default() -> SessionResult<()> {
        let (mut session, device, _port) = session_with_device();
        assert!(session.poll_reconnect(Instant::now()));
        session.set_brightness(5)?;
        let writes = device.get_write_history();
        assert_eq!(writes.first().map(Vec::len), Some(PACKET_SIZE + 1));
        assert_eq!(writes.first().and_then(|w| w.first()), Some(&0x00));
        Ok(())
    }

    #[test]
    fn test_commands_need_device() {
        let port = MockHidPort::new();
        let mut session = DeviceSession::new(Box::new(port), &DaemonConfig::default());
        assert!(matches!(session.set_brightness(10), Err(SessionError::NoDevice)));
    }

    #[test]
    fn test_small_window_persists_on_failure() {
        let (mut session, device, _port) = session_with_device();
        assert!(session.poll_reconnect(Instant::now()));
        device.fail_next_writes(2);
        let window = SmallWindow {
            mode: SmallWindowMode::Stats,
            cpu: 10,
            mem: 20,
            gpu: 30,
        };
        assert!(session.set_small_window(window, "12:00:00").is_err());
        assert_eq!(session.small_window(), window);
    }

    #[test]
    fn test_keepalive_keeps_learned_mode() -> SessionResult<()> {
        let (mut session, device, _port) = session_with_device();
        assert!(session.poll_reconnect(Instant::now()));

        device.queue_read(button_report(2, 13, 0x00));
        assert!(session.read_events()?.is_empty());
        assert_eq!(session.small_window().mode, SmallWindowMode::Background);

        session.keepalive(HostSample { cpu: 7, mem: 55, gpu: 3 }, "08:15:00")?;
        let writes = device.get_write_history();
        let frame = writes.last().map(Vec::as_slice).unwrap_or_default();
        assert_eq!(frame.get(1..5), Some(&[0x7c, 0x7c, 0x00, 0x06][..]));
        assert_eq!(frame.get(9..26), Some(&b"2|7|55|08:15:00|3"[..]));
        Ok(())
    }

    #[test]
    fn test_read_events_tap() -> SessionResult<()> {
        let (mut session, device, _port) = session_with_device();
        assert!(session.poll_reconnect(Instant::now()));
        device.queue_read(button_report(0, 2, 0x01));
        device.queue_read(button_report(0, 2, 0x00));

        assert!(session.read_events()?.is_empty());
        let lines: Vec<String> = session.read_events()?.iter().map(ToString::to_string).collect();
        assert_eq!(lines, vec!["button 3 TAP", "button 3 RELEASED"]);
        Ok(())
    }

    #[test]
    fn test_read_failure_surfaces() {
        let (mut session, device, _port) = session_with_device();
        assert!(session.poll_reconnect(Instant::now()));
        device.queue_read_failure();
        let err = session.read_events().err();
        assert!(err.is_some_and(|e| e.is_disconnect()));
    }

    #[test]
    fn test_garbage_report_ignored() -> SessionResult<()> {
        let (mut session, device, _port) = session_with_device();
        assert!(session.poll_reconnect(Instant::now()));
        device.queue_read(vec![0xde, 0xad, 0xbe, 0xef]);
        assert!(session.read_events()?.is_empty());
        assert!(session.is_open());
        Ok(())
    }

    #[test]
    fn test_missing_icon_is_file_error() {
        let (mut session, _device, _port) = session_with_device();
        assert!(session.poll_reconnect(Instant::now()));
        let set = ButtonSet {
            target: goofydeck_ipc::ExplicitTarget::Grid,
            buttons: vec![ButtonSpec {
                index: 0,
                path: PathBuf::from("/definitely/missing.png"),
                label: String::new(),
            }],
        };
        let err = session.set_buttons_explicit(&set).err();
        assert!(matches!(err, Some(SessionError::File { .. })));
    }

    #[test]
    fn test_icon_name_clash() {
        let spec = |index: usize, path: &str| ButtonSpec {
            index,
            path: PathBuf::from(path),
            label: String::new(),
        };
        let mut taken = HashSet::new();
        assert_eq!(icon_name(&spec(0, "/a/play.png"), &taken), "play.png");
        taken.insert("play.png".to_string());
        assert_eq!(icon_name(&spec(4, "/b/play.png"), &taken), "5_play.png");
    }
}
