//! Icon items and the `manifest.json` that maps grid slots to them

use crate::{BUTTON_COUNT, GRID_COLUMNS, UlanziError, UlanziResult, WIDE_BUTTON_INDEX};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;

pub const MANIFEST_NAME: &str = "manifest.json";
pub const ICON_DIR: &str = "icons";

/// One button image destined for the device.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IconItem {
    /// Zero-based; 0..=12 form the 5x3 grid, 13 is the wide tile.
    pub button_index: usize,
    /// File name inside `icons/`.
    pub name: String,
    pub label: String,
    pub data: Vec<u8>,
}

impl IconItem {
    pub fn new(
        button_index: usize,
        name: impl Into<String>,
        label: impl Into<String>,
        data: Vec<u8>,
    ) -> UlanziResult<Self> {
        if button_index >= BUTTON_COUNT {
            return Err(UlanziError::InvalidButtonIndex(button_index));
        }
        Ok(Self {
            button_index,
            name: name.into(),
            label: label.into(),
            data,
        })
    }

    /// `(col, row)` on the device grid.
    pub fn grid_position(&self) -> (usize, usize) {
        (
            self.button_index % GRID_COLUMNS,
            self.button_index / GRID_COLUMNS,
        )
    }

    pub fn is_wide(&self) -> bool {
        self.button_index == WIDE_BUTTON_INDEX
    }

    pub fn archive_path(&self) -> String {
        format!("{ICON_DIR}/{}", self.name)
    }

    pub fn manifest_key(&self) -> String {
        let (col, row) = self.grid_position();
        format!("{col}_{row}")
    }

    /// Label as shown on the device; the wide tile never has one.
    pub fn display_label(&self) -> &str {
        if self.is_wide() { "" } else { &self.label }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ManifestButton<'a> {
    state: u8,
    view_param: [ViewParam<'a>; 1],
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct ViewParam<'a> {
    icon: String,
    text: &'a str,
}

/// Serializes items as a JSON object in item order.
pub struct Manifest<'a>(pub &'a [IconItem]);

impl Serialize for Manifest<'_> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for item in self.0 {
            map.serialize_entry(
                &item.manifest_key(),
                &ManifestButton {
                    state: 0,
                    view_param: [ViewParam {
                        icon: item.archive_path(),
                        text: item.display_label(),
                    }],
                },
            )?;
        }
        map.end()
    }
}

pub fn manifest_json(items: &[IconItem]) -> UlanziResult<Vec<u8>> {
    Ok(serde_json::to_vec(&Manifest(items))?)
}
