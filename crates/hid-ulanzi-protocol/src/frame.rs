//! 1024-byte frame codec
//!
//! ```text
//! 0      2        4               8                       1024
//! +------+--------+---------------+-----------------------+
//! | 7c7c | cmd BE | total_len LE  | payload (<=1016 B)    |
//! +------+--------+---------------+-----------------------+
//! ```
//!
//! A blob longer than 1016 bytes continues in raw 1024-byte frames with no
//! header; `total_len` in the first frame tells the device how much follows.

use crate::{
    FIRST_PAYLOAD_SIZE, HEADER_SIZE, MAGIC, PACKET_SIZE, REPORT_ID, UlanziError, UlanziResult,
};
use goofydeck_hid_common::{ReportBuilder, ReportParser};

pub type Frame = [u8; PACKET_SIZE];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub command: u16,
    pub total_length: u32,
}

fn into_frame(builder: ReportBuilder) -> UlanziResult<Frame> {
    Frame::try_from(builder.into_inner()).map_err(|rejected| UlanziError::InvalidReportSize {
        expected: PACKET_SIZE,
        actual: rejected.len(),
    })
}

fn header_frame(command: u16, total_length: u32, payload: &[u8]) -> UlanziResult<Frame> {
    let head = payload.get(..FIRST_PAYLOAD_SIZE).unwrap_or(payload);
    let mut builder = ReportBuilder::with_capacity(PACKET_SIZE);
    builder
        .write_bytes(&MAGIC)
        .write_u16_be(command)
        .write_u32_le(total_length)
        .write_bytes(head)
        .pad_to(PACKET_SIZE);
    into_frame(builder)
}

fn continuation_frame(chunk: &[u8]) -> UlanziResult<Frame> {
    let mut builder = ReportBuilder::with_capacity(PACKET_SIZE);
    builder.write_bytes(chunk).pad_to(PACKET_SIZE);
    into_frame(builder)
}

fn length_field(len: usize) -> UlanziResult<u32> {
    u32::try_from(len).map_err(|_| UlanziError::PayloadTooLarge {
        limit: u32::MAX as usize,
        actual: len,
    })
}

/// Single-frame command. Payload beyond 1016 bytes is dropped while the
/// length field still reports the full size.
pub fn encode_command(command: impl Into<u16>, payload: &[u8]) -> UlanziResult<Frame> {
    header_frame(command.into(), length_field(payload.len())?, payload)
}

/// Splits `blob` into a header frame followed by raw continuation frames.
pub fn encode_blob(command: impl Into<u16>, blob: &[u8]) -> UlanziResult<Vec<Frame>> {
    let total = length_field(blob.len())?;
    let (first, rest) = blob.split_at(blob.len().min(FIRST_PAYLOAD_SIZE));

    let mut frames = Vec::with_capacity(frame_count(blob.len()));
    frames.push(header_frame(command.into(), total, first)?);
    for chunk in rest.chunks(PACKET_SIZE) {
        frames.push(continuation_frame(chunk)?);
    }
    Ok(frames)
}

/// Number of frames [`encode_blob`] produces for a blob of `len` bytes.
pub fn frame_count(len: usize) -> usize {
    1 + len.saturating_sub(FIRST_PAYLOAD_SIZE).div_ceil(PACKET_SIZE)
}

/// Frame as written to the HID handle, with the report-ID prefix.
pub fn with_report_id(frame: &Frame) -> Vec<u8> {
    let mut out = Vec::with_capacity(PACKET_SIZE + 1);
    out.push(REPORT_ID);
    out.extend_from_slice(frame);
    out
}

pub fn parse_header(data: &[u8]) -> UlanziResult<FrameHeader> {
    if data.len() < HEADER_SIZE {
        return Err(UlanziError::InvalidReportSize {
            expected: HEADER_SIZE,
            actual: data.len(),
        });
    }
    let mut parser = ReportParser::new(data);
    let magic = parser.read_array::<2>()?;
    if magic != MAGIC {
        return Err(UlanziError::InvalidHeader(magic));
    }
    Ok(FrameHeader {
        command: parser.read_u16_be()?,
        total_length: parser.read_u32_le()?,
    })
}

/// Reassembles a frame sequence into `(command, payload)`.
pub fn decode_frames(frames: &[Frame]) -> UlanziResult<(u16, Vec<u8>)> {
    let Some((first, rest)) = frames.split_first() else {
        return Err(UlanziError::IncompleteFrames {
            needed: HEADER_SIZE,
        });
    };
    let header = parse_header(first)?;
    let total = header.total_length as usize;

    let mut payload = Vec::with_capacity(total);
    let head_len = total.min(FIRST_PAYLOAD_SIZE);
    payload.extend_from_slice(first.get(HEADER_SIZE..HEADER_SIZE + head_len).unwrap_or_default());

    for frame in rest {
        let needed = total.saturating_sub(payload.len());
        if needed == 0 {
            break;
        }
        payload.extend_from_slice(frame.get(..needed.min(PACKET_SIZE)).unwrap_or_default());
    }

    let missing = total.saturating_sub(payload.len());
    if missing > 0 {
        return Err(UlanziError::IncompleteFrames { needed: missing });
    }
    Ok((header.command, payload))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OutCommand;

    #[test]
    fn test_command_frame_layout() -> UlanziResult<()> {
        let frame = encode_command(OutCommand::SetBrightness, b"42")?;
        assert_eq!(&frame[..10], &[0x7c, 0x7c, 0x00, 0x0a, 2, 0, 0, 0, b'4', b'2']);
        assert!(frame[10..].iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_oversized_command_is_truncated() -> UlanziResult<()> {
        let payload = vec![0xAB; 1100];
        let frame = encode_command(OutCommand::SetLabelStyle, &payload)?;
        let header = parse_header(&frame)?;
        assert_eq!(header.total_length, 1100);
        assert!(frame[HEADER_SIZE..].iter().all(|&b| b == 0xAB));
        Ok(())
    }

    #[test]
    fn test_blob_continuation_frames_are_raw() -> UlanziResult<()> {
        let blob: Vec<u8> = (0..2041u32).map(|i| (i % 251) as u8 + 1).collect();
        let frames = encode_blob(OutCommand::SetButtons, &blob)?;
        assert_eq!(frames.len(), 3);
        assert_eq!(parse_header(&frames[0])?.total_length, 2041);
        assert_eq!(&frames[0][HEADER_SIZE..], &blob[..1016]);
        assert_eq!(&frames[1][..], &blob[1016..2040]);
        assert_eq!(frames[2][0], blob[2040]);
        assert!(frames[2][1..].iter().all(|&b| b == 0));
        Ok(())
    }

    #[test]
    fn test_frame_count() {
        assert_eq!(frame_count(0), 1);
        assert_eq!(frame_count(1016), 1);
        assert_eq!(frame_count(1017), 2);
        assert_eq!(frame_count(2040), 2);
        assert_eq!(frame_count(2041), 3);
    }

    #[test]
    fn test_report_id_prefix() -> UlanziResult<()> {
        let frame = encode_command(OutCommand::SetBrightness, b"1")?;
        let wire = with_report_id(&frame);
        assert_eq!(wire.len(), PACKET_SIZE + 1);
        assert_eq!(wire[0], REPORT_ID);
        assert_eq!(&wire[1..3], &MAGIC);
        Ok(())
    }

    #[test]
    fn test_bad_magic() {
        let mut frame = [0u8; PACKET_SIZE];
        frame[0] = 0x7c;
        frame[1] = 0x7d;
        assert!(matches!(
            parse_header(&frame),
            Err(UlanziError::InvalidHeader([0x7c, 0x7d]))
        ));
    }

    #[test]
    fn test_decode_detects_missing_frames() -> UlanziResult<()> {
        let blob = vec![1u8; 3000];
        let frames = encode_blob(OutCommand::SetButtons, &blob)?;
        let result = decode_frames(&frames[..2]);
        assert!(matches!(result, Err(UlanziError::IncompleteFrames { needed: 960 })));
        Ok(())
    }
}
