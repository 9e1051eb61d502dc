//! Sheet list file loading.

use crate::error::SyncError;
use crate::types::ResourceDescriptor;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// One entry of the sheet list file.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct SheetEntry {
    /// Sheet (tab) name, also the output file stem.
    pub name: String,
    /// Spreadsheet document key from the share link.
    pub key: String,
}

/// Contents of a sheet list file.
///
/// ```json
/// {
///   "output_dir": "Spreadsheets",
///   "sheets": [
///     { "name": "Items", "key": "1AbCdEf" },
///     { "name": "Quests", "key": "1AbCdEf" }
///   ]
/// }
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct SheetList {
    /// Overrides the default output directory when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_dir: Option<PathBuf>,
    #[serde(default)]
    pub sheets: Vec<SheetEntry>,
}

impl SheetList {
    /// Reads and parses a sheet list file.
    pub fn load(path: &Path) -> Result<Self, SyncError> {
        let content = std::fs::read_to_string(path)?;
        let list: SheetList = serde_json::from_str(&content)?;
        info!("Loaded {} sheet(s) from {}", list.sheets.len(), path.display());
        Ok(list)
    }

    /// Validates every entry, failing on the first invalid one or on duplicate names.
    pub fn descriptors(&self) -> Result<Vec<ResourceDescriptor>, SyncError> {
        parse_entries(self.sheets.iter().map(|s| (s.name.as_str(), s.key.as_str())))
    }
}

/// Builds descriptors from `(name, key)` pairs.
///
/// Two sheets with the same name would write the same file, so duplicates
/// are rejected.
pub fn parse_entries<'a>(
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Result<Vec<ResourceDescriptor>, SyncError> {
    let mut descriptors: Vec<ResourceDescriptor> = Vec::new();
    for (name, key) in entries {
        if descriptors.iter().any(|d| d.name() == name) {
            return Err(SyncError::InvalidDescriptor {
                name: name.to_string(),
                reason: "duplicate sheet name",
            });
        }
        descriptors.push(ResourceDescriptor::new(name, key)?);
    }
    Ok(descriptors)
}
