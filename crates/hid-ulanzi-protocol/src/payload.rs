//! Payload encoders for the short commands

use crate::{LABEL_STYLE_MAX_BYTES, UlanziError, UlanziResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// ASCII decimal brightness, clamped to 0..=100.
pub fn brightness_payload(level: i64) -> Vec<u8> {
    level.clamp(0, 100).to_string().into_bytes()
}

/// What the wide tile shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SmallWindowMode {
    Stats = 0,
    #[default]
    Clock = 1,
    Background = 2,
}

impl SmallWindowMode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(SmallWindowMode::Stats),
            1 => Some(SmallWindowMode::Clock),
            2 => Some(SmallWindowMode::Background),
            _ => None,
        }
    }

    pub const fn code(self) -> u8 {
        self as u8
    }
}

impl fmt::Display for SmallWindowMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Small-window state remembered between keepalives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SmallWindow {
    pub mode: SmallWindowMode,
    pub cpu: u32,
    pub mem: u32,
    pub gpu: u32,
}

impl SmallWindow {
    /// `mode|cpu|mem|HH:MM:SS|gpu`
    pub fn payload(&self, clock: &str) -> UlanziResult<Vec<u8>> {
        if clock.is_empty() || clock.contains(['|', ' ']) {
            return Err(UlanziError::InvalidArgument(format!(
                "invalid clock field {clock:?}"
            )));
        }
        Ok(format!(
            "{}|{}|{}|{}|{}",
            self.mode, self.cpu, self.mem, clock, self.gpu
        )
        .into_bytes())
    }
}

/// Label style JSON is forwarded verbatim; only its size is checked.
pub fn label_style_payload(style: &[u8]) -> UlanziResult<&[u8]> {
    if style.is_empty() {
        return Err(UlanziError::EmptyPayload);
    }
    if style.len() > LABEL_STYLE_MAX_BYTES {
        return Err(UlanziError::PayloadTooLarge {
            limit: LABEL_STYLE_MAX_BYTES,
            actual: style.len(),
        });
    }
    Ok(style)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_brightness_clamps() {
        assert_eq!(brightness_payload(-5), b"0");
        assert_eq!(brightness_payload(42), b"42");
        assert_eq!(brightness_payload(250), b"100");
    }

    #[test]
    fn test_small_window_payload() -> UlanziResult<()> {
        let sw = SmallWindow {
            mode: SmallWindowMode::Stats,
            cpu: 12,
            mem: 48,
            gpu: 3,
        };
        assert_eq!(sw.payload("09:05:00")?, b"0|12|48|09:05:00|3");
        assert!(sw.payload("09|05").is_err());
        assert!(sw.payload("").is_err());
        Ok(())
    }

    #[test]
    fn test_default_mode_is_clock() {
        assert_eq!(SmallWindow::default().mode, SmallWindowMode::Clock);
        assert_eq!(SmallWindowMode::from_code(3), None);
    }

    #[test]
    fn test_label_style_limits() {
        assert!(label_style_payload(b"{}").is_ok());
        assert!(matches!(label_style_payload(b""), Err(UlanziError::EmptyPayload)));
        let big = vec![b' '; LABEL_STYLE_MAX_BYTES + 1];
        assert!(matches!(
            label_style_payload(&big),
            Err(UlanziError::PayloadTooLarge { limit: 4096, actual: 4097 })
        ));
        assert!(label_style_payload(&big[..LABEL_STYLE_MAX_BYTES]).is_ok());
    }
}
