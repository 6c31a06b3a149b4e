//! Device to host report parsing

use crate::frame::parse_header;
use crate::payload::SmallWindowMode;
use crate::{BUTTON_COUNT, HEADER_SIZE, InCommand, UlanziError, UlanziResult, WIDE_BUTTON_INDEX};
use goofydeck_hid_common::ReportParser;

/// Bytes needed for a button report: header plus `state, index, _, raw_press`.
pub const BUTTON_REPORT_SIZE: usize = HEADER_SIZE + 4;

/// Raw button telemetry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonReport {
    pub command: InCommand,
    /// Mode of the wide tile when `index` is 13, otherwise opaque.
    pub state: u8,
    pub index: u8,
    pub raw_press: u8,
}

impl ButtonReport {
    /// Zero-based button index, `None` for indices the device should never send.
    pub fn button(&self) -> Option<usize> {
        let idx = usize::from(self.index);
        (idx < BUTTON_COUNT).then_some(idx)
    }

    /// Small-window mode reported on the wide tile.
    pub fn small_window_mode(&self) -> Option<SmallWindowMode> {
        if self.button() != Some(WIDE_BUTTON_INDEX) {
            return None;
        }
        SmallWindowMode::from_code(self.state)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceReport {
    Button(ButtonReport),
    DeviceInfo(Vec<u8>),
    Unknown(u16),
}

impl DeviceReport {
    pub fn parse(data: &[u8]) -> UlanziResult<Self> {
        let header = parse_header(data)?;
        let Some(command) = InCommand::from_code(header.command) else {
            return Ok(DeviceReport::Unknown(header.command));
        };

        let mut parser = ReportParser::new(data);
        parser.skip(HEADER_SIZE);

        if !command.is_button() {
            let len = (header.total_length as usize).min(parser.remaining());
            return Ok(DeviceReport::DeviceInfo(parser.read_bytes(len)?.to_vec()));
        }

        if data.len() < BUTTON_REPORT_SIZE {
            return Err(UlanziError::InvalidReportSize {
                expected: BUTTON_REPORT_SIZE,
                actual: data.len(),
            });
        }
        let state = parser.read_u8()?;
        let index = parser.read_u8()?;
        parser.skip(1);
        let raw_press = parser.read_u8()?;

        Ok(DeviceReport::Button(ButtonReport {
            command,
            state,
            index,
            raw_press,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(cmd: u16, body: &[u8]) -> Vec<u8> {
        let mut data = vec![0x7c, 0x7c];
        data.extend_from_slice(&cmd.to_be_bytes());
        data.extend_from_slice(&(body.len() as u32).to_le_bytes());
        data.extend_from_slice(body);
        data.resize(1024, 0);
        data
    }

    #[test]
    fn test_parse_button_report() -> UlanziResult<()> {
        let data = report(0x0101, &[0x00, 0x04, 0x00, 0x01]);
        let DeviceReport::Button(button) = DeviceReport::parse(&data)? else {
            return Err(UlanziError::InvalidArgument("expected button".into()));
        };
        assert_eq!(button.command, InCommand::Button);
        assert_eq!(button.button(), Some(4));
        assert_eq!(button.raw_press, 0x01);
        assert_eq!(button.small_window_mode(), None);
        Ok(())
    }

    #[test]
    fn test_wide_tile_reports_mode() -> UlanziResult<()> {
        let data = report(0x0102, &[0x02, 0x0d, 0x00, 0x01]);
        let DeviceReport::Button(button) = DeviceReport::parse(&data)? else {
            return Err(UlanziError::InvalidArgument("expected button".into()));
        };
        assert_eq!(button.small_window_mode(), Some(SmallWindowMode::Background));

        let data = report(0x0101, &[0x07, 0x0d, 0x00, 0x01]);
        let DeviceReport::Button(button) = DeviceReport::parse(&data)? else {
            return Err(UlanziError::InvalidArgument("expected button".into()));
        };
        assert_eq!(button.small_window_mode(), None);
        Ok(())
    }

    #[test]
    fn test_out_of_range_index() -> UlanziResult<()> {
        let data = report(0x0101, &[0x00, 0x0e, 0x00, 0x01]);
        let DeviceReport::Button(button) = DeviceReport::parse(&data)? else {
            return Err(UlanziError::InvalidArgument("expected button".into()));
        };
        assert_eq!(button.button(), None);
        Ok(())
    }

    #[test]
    fn test_unknown_and_device_info() -> UlanziResult<()> {
        assert_eq!(
            DeviceReport::parse(&report(0x0201, &[]))?,
            DeviceReport::Unknown(0x0201)
        );
        assert_eq!(
            DeviceReport::parse(&report(0x0303, b"D200"))?,
            DeviceReport::DeviceInfo(b"D200".to_vec())
        );
        Ok(())
    }

    #[test]
    fn test_short_button_report() {
        let data = [0x7c, 0x7c, 0x01, 0x01, 0, 0, 0, 0, 0];
        assert!(matches!(
            DeviceReport::parse(&data),
            Err(UlanziError::InvalidReportSize { expected: 12, actual: 9 })
        ));
    }
}
