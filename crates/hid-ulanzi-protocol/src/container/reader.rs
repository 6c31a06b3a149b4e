//! Local-entry walker for caller supplied ZIP files
//!
//! Only store-only entries without data descriptors are accepted, which is
//! what the icon tooling emits. Walking stops at the first non-local
//! signature, normally the central directory.

use super::writer::{LOCAL_HEADER_SIG, LOCAL_HEADER_SIZE};
use super::{ZipError, ZipResult};
use goofydeck_hid_common::ReportParser;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry<'a> {
    pub name: &'a [u8],
    pub data: &'a [u8],
    pub offset: usize,
}

impl LocalEntry<'_> {
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(self.name).into_owned()
    }
}

fn truncated(offset: usize) -> impl Fn(goofydeck_hid_common::HidCommonError) -> ZipError {
    move |_| ZipError::Truncated { offset }
}

pub fn parse_local_entries(buf: &[u8]) -> ZipResult<Vec<LocalEntry<'_>>> {
    let mut entries = Vec::new();
    let mut offset = 0usize;

    while buf.len().saturating_sub(offset) >= LOCAL_HEADER_SIZE {
        let mut parser = ReportParser::new(buf);
        parser.skip(offset);
        let err = truncated(offset);

        if parser.read_u32_le().map_err(&err)? != LOCAL_HEADER_SIG {
            break;
        }
        parser.skip(2);
        let flags = parser.read_u16_le().map_err(&err)?;
        let method = parser.read_u16_le().map_err(&err)?;
        parser.skip(8);
        let compressed_size = parser.read_u32_le().map_err(&err)? as usize;
        parser.skip(4);
        let name_len = usize::from(parser.read_u16_le().map_err(&err)?);
        let extra_len = usize::from(parser.read_u16_le().map_err(&err)?);

        let name = parser.read_bytes(name_len).map_err(&err)?;
        if flags != 0 {
            return Err(ZipError::UnsupportedFlags {
                name: String::from_utf8_lossy(name).into_owned(),
                flags,
            });
        }
        if method != 0 {
            return Err(ZipError::UnsupportedMethod {
                name: String::from_utf8_lossy(name).into_owned(),
                method,
            });
        }
        parser.read_bytes(extra_len).map_err(&err)?;
        let data = parser.read_bytes(compressed_size).map_err(&err)?;

        entries.push(LocalEntry { name, data, offset });
        offset = parser.position();
    }

    if entries.is_empty() {
        return Err(ZipError::Empty);
    }
    Ok(entries)
}
