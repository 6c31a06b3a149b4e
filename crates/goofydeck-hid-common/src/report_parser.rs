//! Byte cursors for reading and assembling vendor reports

use crate::{HidCommonError, HidCommonResult};

/// Forward-only reader over a borrowed report.
pub struct ReportParser<'a> {
    buffer: &'a [u8],
    position: usize,
}

impl<'a> ReportParser<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buffer: data,
            position: 0,
        }
    }

    pub fn position(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.buffer.len().saturating_sub(self.position)
    }

    pub fn read_bytes(&mut self, count: usize) -> HidCommonResult<&'a [u8]> {
        let end = self
            .position
            .checked_add(count)
            .ok_or_else(|| HidCommonError::InvalidReport("length overflow".to_string()))?;
        let bytes = self.buffer.get(self.position..end).ok_or_else(|| {
            HidCommonError::InvalidReport(format!(
                "unexpected end of data at offset {}, wanted {count} more byte(s)",
                self.position
            ))
        })?;
        self.position = end;
        Ok(bytes)
    }

    pub fn read_array<const N: usize>(&mut self) -> HidCommonResult<[u8; N]> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.read_bytes(N)?);
        Ok(out)
    }

    pub fn read_u8(&mut self) -> HidCommonResult<u8> {
        let [b] = self.read_array::<1>()?;
        Ok(b)
    }

    pub fn read_u16_le(&mut self) -> HidCommonResult<u16> {
        Ok(u16::from_le_bytes(self.read_array()?))
    }

    pub fn read_u16_be(&mut self) -> HidCommonResult<u16> {
        Ok(u16::from_be_bytes(self.read_array()?))
    }

    pub fn read_u32_le(&mut self) -> HidCommonResult<u32> {
        Ok(u32::from_le_bytes(self.read_array()?))
    }

    pub fn skip(&mut self, count: usize) {
        self.position = self.position.saturating_add(count).min(self.buffer.len());
    }

    pub fn rest(&self) -> &'a [u8] {
        self.buffer.get(self.position..).unwrap_or_default()
    }
}

/// Appending writer for reports and container records.
#[derive(Debug, Default, Clone)]
pub struct ReportBuilder {
    buffer: Vec<u8>,
}

impl ReportBuilder {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: Vec::with_capacity(capacity),
        }
    }

    pub fn write_u8(&mut self, value: u8) -> &mut Self {
        self.buffer.push(value);
        self
    }

    pub fn write_u16_le(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_u16_be(&mut self, value: u16) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_be_bytes());
        self
    }

    pub fn write_u32_le(&mut self, value: u32) -> &mut Self {
        self.buffer.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn write_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.buffer.extend_from_slice(data);
        self
    }

    /// Zero-fills up to `len`. Longer buffers are left untouched.
    pub fn pad_to(&mut self, len: usize) -> &mut Self {
        if self.buffer.len() < len {
            self.buffer.resize(len, 0);
        }
        self
    }

    pub fn into_inner(self) -> Vec<u8> {
        self.buffer
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }

    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_parser_mixed_endianness() -> Result<(), HidCommonError> {
        let data = [0x7c, 0x7c, 0x01, 0x01, 0x10, 0x00, 0x00, 0x00];
        let mut parser = ReportParser::new(&data);

        assert_eq!(parser.read_array::<2>()?, [0x7c, 0x7c]);
        assert_eq!(parser.read_u16_be()?, 0x0101);
        assert_eq!(parser.read_u32_le()?, 16);
        assert_eq!(parser.remaining(), 0);
        assert!(parser.read_u8().is_err());
        Ok(())
    }

    #[test]
    fn test_read_bytes_past_end() -> Result<(), HidCommonError> {
        let data = [1u8, 2, 3];
        let mut parser = ReportParser::new(&data);

        assert_eq!(parser.read_bytes(2)?, &[1, 2]);
        assert!(parser.read_bytes(2).is_err());
        assert_eq!(parser.rest(), &[3]);
        Ok(())
    }

    #[test]
    fn test_skip_saturates() {
        let data = [0u8; 4];
        let mut parser = ReportParser::new(&data);
        parser.skip(10);
        assert_eq!(parser.remaining(), 0);
        assert!(parser.rest().is_empty());
    }

    #[test]
    fn test_report_builder() {
        let mut builder = ReportBuilder::with_capacity(16);

        builder
            .write_u8(0x01)
            .write_u16_be(0x000b)
            .write_u16_le(0x1234)
            .write_u32_le(0x12345678)
            .write_bytes(&[0xAA, 0xBB]);

        assert_eq!(
            builder.into_inner(),
            vec![0x01, 0x00, 0x0b, 0x34, 0x12, 0x78, 0x56, 0x34, 0x12, 0xAA, 0xBB]
        );
    }

    #[test]
    fn test_report_builder_pad_to() {
        let mut builder = ReportBuilder::default();
        builder.write_bytes(&[9, 9]).pad_to(5);
        assert_eq!(builder.as_slice(), &[9, 9, 0, 0, 0]);

        builder.pad_to(3);
        assert_eq!(builder.len(), 5);
    }
}
