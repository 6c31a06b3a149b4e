//! Store-only ZIP writer

use super::{ZipError, ZipResult};
use goofydeck_hid_common::ReportBuilder;

pub const LOCAL_HEADER_SIG: u32 = 0x0403_4b50;
pub const CENTRAL_HEADER_SIG: u32 = 0x0201_4b50;
pub const END_OF_CENTRAL_SIG: u32 = 0x0605_4b50;
pub const LOCAL_HEADER_SIZE: usize = 30;
pub const CENTRAL_HEADER_SIZE: usize = 46;
pub const END_OF_CENTRAL_SIZE: usize = 22;
const ZIP_VERSION: u16 = 20;
const METHOD_STORE: u16 = 0;

/// One written entry, as recorded for the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipEntry {
    pub name: Vec<u8>,
    pub crc32: u32,
    pub size: u32,
    pub offset: u32,
}

impl ZipEntry {
    pub fn name_lossy(&self) -> String {
        String::from_utf8_lossy(&self.name).into_owned()
    }
}

/// Writes entries in insertion order; [`StoreZipWriter::finish`] appends the
/// central directory and end record.
#[derive(Debug, Default)]
pub struct StoreZipWriter {
    out: ReportBuilder,
    entries: Vec<ZipEntry>,
}

impl StoreZipWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            out: ReportBuilder::with_capacity(bytes),
            entries: Vec::new(),
        }
    }

    pub fn entries(&self) -> &[ZipEntry] {
        &self.entries
    }

    pub fn add_entry(&mut self, name: impl AsRef<[u8]>, data: &[u8]) -> ZipResult<()> {
        let name = name.as_ref();
        if self.entries.len() >= usize::from(u16::MAX) {
            return Err(ZipError::TooManyEntries(self.entries.len() + 1));
        }
        let name_len = u16::try_from(name.len()).map_err(|_| ZipError::NameTooLong(name.len()))?;
        let size = u32::try_from(data.len()).map_err(|_| ZipError::EntryTooLarge {
            name: String::from_utf8_lossy(name).into_owned(),
            size: data.len(),
        })?;
        let offset = u32::try_from(self.out.len())
            .map_err(|_| ZipError::ArchiveTooLarge(self.out.len()))?;
        let crc32 = crc32fast::hash(data);

        self.out
            .write_u32_le(LOCAL_HEADER_SIG)
            .write_u16_le(ZIP_VERSION)
            .write_u16_le(0)
            .write_u16_le(METHOD_STORE)
            .write_u16_le(0)
            .write_u16_le(0)
            .write_u32_le(crc32)
            .write_u32_le(size)
            .write_u32_le(size)
            .write_u16_le(name_len)
            .write_u16_le(0)
            .write_bytes(name)
            .write_bytes(data);

        self.entries.push(ZipEntry {
            name: name.to_vec(),
            crc32,
            size,
            offset,
        });
        Ok(())
    }

    pub fn finish(self) -> ZipResult<Vec<u8>> {
        let Self { mut out, entries } = self;
        let central_offset = out.len();

        for entry in &entries {
            // add_entry already bounded the name length
            let name_len = u16::try_from(entry.name.len()).unwrap_or(u16::MAX);
            out.write_u32_le(CENTRAL_HEADER_SIG)
                .write_u16_le(ZIP_VERSION)
                .write_u16_le(ZIP_VERSION)
                .write_u16_le(0)
                .write_u16_le(METHOD_STORE)
                .write_u16_le(0)
                .write_u16_le(0)
                .write_u32_le(entry.crc32)
                .write_u32_le(entry.size)
                .write_u32_le(entry.size)
                .write_u16_le(name_len)
                .write_u16_le(0)
                .write_u16_le(0)
                .write_u16_le(0)
                .write_u16_le(0)
                .write_u32_le(0)
                .write_u32_le(entry.offset)
                .write_bytes(&entry.name);
        }

        let central_size = out.len().saturating_sub(central_offset);
        let count = u16::try_from(entries.len()).map_err(|_| ZipError::TooManyEntries(entries.len()))?;
        let central_size =
            u32::try_from(central_size).map_err(|_| ZipError::ArchiveTooLarge(out.len()))?;
        let central_offset =
            u32::try_from(central_offset).map_err(|_| ZipError::ArchiveTooLarge(central_offset))?;

        out.write_u32_le(END_OF_CENTRAL_SIG)
            .write_u16_le(0)
            .write_u16_le(0)
            .write_u16_le(count)
            .write_u16_le(count)
            .write_u32_le(central_size)
            .write_u32_le(central_offset)
            .write_u16_le(0);

        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_entry_layout() -> ZipResult<()> {
        let mut writer = StoreZipWriter::new();
        writer.add_entry("a.txt", b"hi")?;
        let bytes = writer.finish()?;

        let local = LOCAL_HEADER_SIZE + 5 + 2;
        assert_eq!(
            bytes.len(),
            local + CENTRAL_HEADER_SIZE + 5 + END_OF_CENTRAL_SIZE
        );
        assert_eq!(&bytes[..4], &[0x50, 0x4b, 0x03, 0x04]);
        assert_eq!(&bytes[local..local + 4], &[0x50, 0x4b, 0x01, 0x02]);
        let eocd = bytes.len() - END_OF_CENTRAL_SIZE;
        assert_eq!(&bytes[eocd..eocd + 4], &[0x50, 0x4b, 0x05, 0x06]);
        // central directory offset
        assert_eq!(&bytes[eocd + 16..eocd + 20], &(local as u32).to_le_bytes());
        Ok(())
    }

    #[test]
    fn test_entry_offsets_are_sequential() -> ZipResult<()> {
        let mut writer = StoreZipWriter::new();
        writer.add_entry("dummy.txt", &[1; 7])?;
        writer.add_entry("manifest.json", b"{}")?;
        let entries = writer.entries().to_vec();

        assert_eq!(entries[0].offset, 0);
        assert_eq!(entries[1].offset, (LOCAL_HEADER_SIZE + 9 + 7) as u32);
        assert_eq!(entries[1].crc32, crc32fast::hash(b"{}"));
        assert_eq!(entries[1].name_lossy(), "manifest.json");
        Ok(())
    }

    #[test]
    fn test_empty_archive_is_just_eocd() -> ZipResult<()> {
        let bytes = StoreZipWriter::new().finish()?;
        assert_eq!(bytes.len(), END_OF_CENTRAL_SIZE);
        Ok(())
    }

    #[test]
    fn test_name_too_long() {
        let mut writer = StoreZipWriter::new();
        let name = vec![b'x'; 70_000];
        assert_eq!(
            writer.add_entry(&name, b""),
            Err(ZipError::NameTooLong(70_000))
        );
    }
}
