//! Quirk-free archive assembly

use super::manifest::{IconItem, MANIFEST_NAME, manifest_json};
use super::quirk::{find_valid_padding, patch_quirk_bytes};
use super::reader::{LocalEntry, parse_local_entries};
use super::writer::StoreZipWriter;
use super::ZipError;
use crate::{DEFAULT_MAX_PADDING, UlanziError, UlanziResult};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const FILLER_NAME: &str = "dummy.txt";
pub const FILLER_BYTE: u8 = 0x01;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaddingPolicy {
    /// Largest filler length tried before patching.
    pub max_padding: usize,
    /// Skip the search for caller supplied archives and go straight to the
    /// patch fallback. Archives built from icon items always search.
    pub patch_only: bool,
}

impl Default for PaddingPolicy {
    fn default() -> Self {
        Self {
            max_padding: DEFAULT_MAX_PADDING,
            patch_only: false,
        }
    }
}

/// Archive ready to send, plus how it was made safe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedArchive {
    pub bytes: Vec<u8>,
    /// Filler length used.
    pub pad: usize,
    /// Checkpoint bytes overwritten by the fallback.
    pub patched: usize,
}

fn writer_with_filler(pad: usize, hint: usize) -> Result<StoreZipWriter, ZipError> {
    let mut writer = StoreZipWriter::with_capacity(hint.saturating_add(pad));
    if pad > 0 {
        writer.add_entry(FILLER_NAME, &vec![FILLER_BYTE; pad])?;
    }
    Ok(writer)
}

/// Filler, then `manifest.json`, then one `icons/<name>` entry per item.
pub fn build_icon_archive(items: &[IconItem], manifest: &[u8], pad: usize) -> UlanziResult<Vec<u8>> {
    let hint = items.iter().map(|i| i.data.len() + 128).sum::<usize>() + manifest.len();
    let mut writer = writer_with_filler(pad, hint)?;
    writer.add_entry(MANIFEST_NAME, manifest)?;
    for item in items {
        writer.add_entry(item.archive_path(), &item.data)?;
    }
    Ok(writer.finish()?)
}

/// Filler followed by the caller's entries, names and data unchanged.
pub fn rewrap_entries(entries: &[LocalEntry<'_>], pad: usize) -> Result<Vec<u8>, ZipError> {
    let hint = entries.iter().map(|e| e.data.len() + 128).sum();
    let mut writer = writer_with_filler(pad, hint)?;
    for entry in entries {
        writer.add_entry(entry.name, entry.data)?;
    }
    writer.finish()
}

/// Runs the padding search under `policy`, falling back to patching the
/// archive built with the largest filler.
pub fn prepare_with<B, E>(policy: PaddingPolicy, mut build: B) -> Result<PreparedArchive, E>
where
    B: FnMut(usize) -> Result<Vec<u8>, E>,
{
    if !policy.patch_only
        && let Some(found) = find_valid_padding(policy.max_padding, &mut build)?
    {
        if found.pad > 0 {
            debug!(pad = found.pad, "filler padding cleared quirk bytes");
        }
        return Ok(PreparedArchive {
            bytes: found.bytes,
            pad: found.pad,
            patched: 0,
        });
    }

    let mut bytes = build(policy.max_padding)?;
    let patched = patch_quirk_bytes(&mut bytes);
    debug!(
        pad = policy.max_padding,
        patched, "padding search exhausted, patched quirk bytes"
    );
    Ok(PreparedArchive {
        bytes,
        pad: policy.max_padding,
        patched,
    })
}

pub fn prepare_icon_archive(
    items: &[IconItem],
    policy: PaddingPolicy,
) -> UlanziResult<PreparedArchive> {
    if items.is_empty() {
        return Err(UlanziError::Zip(ZipError::Empty));
    }
    let manifest = manifest_json(items)?;
    let policy = PaddingPolicy {
        patch_only: false,
        ..policy
    };
    prepare_with(policy, |pad| build_icon_archive(items, &manifest, pad))
}

/// Rebuilds a caller supplied store-only ZIP with a leading filler.
pub fn prepare_external_archive(
    input: &[u8],
    policy: PaddingPolicy,
) -> Result<PreparedArchive, ZipError> {
    let entries = parse_local_entries(input)?;
    prepare_with(policy, |pad| rewrap_entries(&entries, pad))
}
