//! Firmware transfer quirk
//!
//! The device corrupts an archive when the byte at any blob offset
//! `1016 + 1024k` (the first byte of each continuation frame except the
//! first one) is `0x00` or `0x7C`.

use crate::{FIRST_PAYLOAD_SIZE, PACKET_SIZE};

pub const QUIRK_REPLACEMENT: u8 = 0x11;

pub const fn is_quirk_byte(byte: u8) -> bool {
    byte == 0x00 || byte == 0x7c
}

/// Checkpoint offsets inside a blob of `len` bytes.
pub fn quirk_offsets(len: usize) -> impl Iterator<Item = usize> {
    (FIRST_PAYLOAD_SIZE..len).step_by(PACKET_SIZE)
}

pub fn has_quirk_bytes(buf: &[u8]) -> bool {
    quirk_offsets(buf.len()).any(|i| buf.get(i).copied().is_some_and(is_quirk_byte))
}

/// Overwrites every offending checkpoint byte with [`QUIRK_REPLACEMENT`] and
/// returns how many were changed.
pub fn patch_quirk_bytes(buf: &mut [u8]) -> usize {
    let mut patched = 0;
    for i in quirk_offsets(buf.len()) {
        if let Some(byte) = buf.get_mut(i)
            && is_quirk_byte(*byte)
        {
            *byte = QUIRK_REPLACEMENT;
            patched += 1;
        }
    }
    patched
}

/// An archive that passed the quirk check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Padded {
    pub pad: usize,
    pub bytes: Vec<u8>,
}

/// Tries filler lengths `0..=max_padding` in order and returns the first
/// build free of quirk bytes, or `None` when every length fails.
pub fn find_valid_padding<B, E>(max_padding: usize, mut build: B) -> Result<Option<Padded>, E>
where
    B: FnMut(usize) -> Result<Vec<u8>, E>,
{
    for pad in 0..=max_padding {
        let bytes = build(pad)?;
        if !has_quirk_bytes(&bytes) {
            return Ok(Some(Padded { pad, bytes }));
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    #[test]
    fn test_offsets() {
        assert_eq!(quirk_offsets(1016).count(), 0);
        assert_eq!(quirk_offsets(1017).collect::<Vec<_>>(), vec![1016]);
        assert_eq!(quirk_offsets(3000).collect::<Vec<_>>(), vec![1016, 2040]);
    }

    #[test]
    fn test_detect_and_patch() {
        let mut buf = vec![0x01u8; 3100];
        assert!(!has_quirk_bytes(&buf));

        buf[1016] = 0x7c;
        buf[2040] = 0x00;
        buf[1017] = 0x00;
        assert!(has_quirk_bytes(&buf));

        assert_eq!(patch_quirk_bytes(&mut buf), 2);
        assert_eq!(buf[1016], QUIRK_REPLACEMENT);
        assert_eq!(buf[2040], QUIRK_REPLACEMENT);
        assert_eq!(buf[1017], 0x00);
        assert!(!has_quirk_bytes(&buf));
        assert_eq!(patch_quirk_bytes(&mut buf), 0);
    }

    #[test]
    fn test_padding_search_shifts_bad_byte() -> Result<(), Infallible> {
        // content has a zero that lands on the checkpoint with no padding
        let build = |pad: usize| -> Result<Vec<u8>, Infallible> {
            let mut v = vec![0x01u8; pad];
            let mut body = vec![0x02u8; 1500];
            body[1016] = 0x00;
            v.append(&mut body);
            Ok(v)
        };
        let found = find_valid_padding(1024, build)?;
        assert_eq!(found.map(|p| p.pad), Some(1));
        Ok(())
    }

    #[test]
    fn test_padding_search_exhausted() -> Result<(), Infallible> {
        let mut calls = 0;
        let found = find_valid_padding(3, |_| {
            calls += 1;
            Ok::<_, Infallible>(vec![0u8; 2048])
        })?;
        assert_eq!(found, None);
        assert_eq!(calls, 4);
        Ok(())
    }
}
