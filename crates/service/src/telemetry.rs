//! Upload counters

use std::fmt;

use goofydeck_hid_ulanzi_protocol::PreparedArchive;
use serde::{Deserialize, Serialize};
use tracing::info;

/// Cumulative archive upload statistics for one daemon run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Telemetry {
    pub bytes_sent: u64,
    pub bytes_patched: u64,
    pub zips_sent: u64,
}

impl Telemetry {
    /// Account for an uploaded archive and log the running totals.
    pub fn record_archive(&mut self, archive: &PreparedArchive) {
        let size = archive.bytes.len() as u64;
        self.bytes_sent = self.bytes_sent.saturating_add(size);
        self.bytes_patched = self.bytes_patched.saturating_add(archive.patched as u64);
        self.zips_sent = self.zips_sent.saturating_add(1);
        info!(
            size,
            pad = archive.pad,
            patched = archive.patched,
            total = %HumanBytes(self.bytes_sent),
            total_patched = self.bytes_patched,
            "sendzip"
        );
    }
}

/// Byte count rendered with binary units, e.g. `17.78MB`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HumanBytes(pub u64);

const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];

/// Scale `bytes` by 1024 until it drops below 1024 or units run out.
pub fn human_bytes(bytes: u64) -> (f64, &'static str) {
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit + 1 < UNITS.len() {
        value /= 1024.0;
        unit += 1;
    }
    (value, UNITS.get(unit).copied().unwrap_or("B"))
}

impl fmt::Display for HumanBytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (value, unit) = human_bytes(self.0);
        write!(f, "{value:.2}{unit}")
    }
}
