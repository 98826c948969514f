//! JSON index of generated placeholders.
//!
//! Placeholders are usually inlined into HTML rather than fetched, so the
//! placeholder pipeline can optionally write one JSON file at the destination
//! root mapping each placeholder's output path to its dimensions and a base64
//! `data:` URI:
//!
//! ```json
//! {
//!   "version": 1,
//!   "entries": {
//!     "a/cat.webp": {
//!       "width": 16, "height": 12,
//!       "original_width": 400, "original_height": 300,
//!       "data_uri": "data:image/webp;base64,UklGR..."
//!     }
//!   }
//! }
//! ```
//!
//! Runs are incremental: written files replace their entry, skipped files
//! keep theirs (or get one built from the placeholder already on disk), and
//! entries whose source is gone are dropped. A missing, corrupt or
//! older-version index is treated as empty.

use crate::config::PlaceholderFormat;
use crate::imaging::Placeholder;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

const INDEX_VERSION: u32 = 1;

/// One placeholder's dimensions and inline representation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub width: u32,
    pub height: u32,
    pub original_width: u32,
    pub original_height: u32,
    pub data_uri: String,
}

impl IndexEntry {
    pub fn new(placeholder: &Placeholder, format: PlaceholderFormat) -> Self {
        Self {
            width: placeholder.dimensions.width,
            height: placeholder.dimensions.height,
            original_width: placeholder.original.width,
            original_height: placeholder.original.height,
            data_uri: data_uri(&placeholder.content, format.mime_type()),
        }
    }
}

/// `data:<mime>;base64,<payload>`
pub fn data_uri(bytes: &[u8], mime: &str) -> String {
    format!("data:{mime};base64,{}", BASE64.encode(bytes))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PlaceholderIndex {
    pub version: u32,
    /// Keyed by output path relative to the destination, `/`-separated.
    pub entries: BTreeMap<String, IndexEntry>,
}

impl PlaceholderIndex {
    pub fn empty() -> Self {
        Self {
            version: INDEX_VERSION,
            entries: BTreeMap::new(),
        }
    }

    /// Load `dest/name`, or an empty index if it is missing or unreadable.
    pub fn load(dest: &Path, name: &str) -> Self {
        let Ok(content) = std::fs::read_to_string(dest.join(name)) else {
            return Self::empty();
        };
        match serde_json::from_str::<Self>(&content) {
            Ok(index) if index.version == INDEX_VERSION => index,
            _ => Self::empty(),
        }
    }

    pub fn save(&self, dest: &Path, name: &str) -> io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(dest.join(name), json)
    }

    pub fn insert(&mut self, output: &Path, entry: IndexEntry) {
        self.entries.insert(key(output), entry);
    }

    pub fn get(&self, output: &Path) -> Option<&IndexEntry> {
        self.entries.get(&key(output))
    }

    /// Drop every entry whose output is not in `outputs`.
    pub fn retain_outputs(&mut self, outputs: &[PathBuf]) {
        let keep: HashSet<String> = outputs.iter().map(|p| key(p)).collect();
        self.entries.retain(|k, _| keep.contains(k));
    }
}

fn key(output: &Path) -> String {
    output.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::Dimensions;
    use tempfile::TempDir;

    fn entry(width: u32) -> IndexEntry {
        IndexEntry {
            width,
            height: 8,
            original_width: 400,
            original_height: 200,
            data_uri: "data:image/webp;base64,AA==".into(),
        }
    }

    #[test]
    fn data_uri_encodes_payload() {
        assert_eq!(data_uri(b"hi", "image/jpeg"), "data:image/jpeg;base64,aGk=");
    }

    #[test]
    fn entry_from_placeholder() {
        let placeholder = Placeholder {
            content: b"hi".to_vec(),
            dimensions: Dimensions { width: 16, height: 8 },
            original: Dimensions { width: 400, height: 200 },
        };
        let entry = IndexEntry::new(&placeholder, PlaceholderFormat::Webp);
        assert_eq!(entry.width, 16);
        assert_eq!(entry.original_height, 200);
        assert_eq!(entry.data_uri, "data:image/webp;base64,aGk=");
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let mut index = PlaceholderIndex::empty();
        index.insert(Path::new("a/cat.webp"), entry(16));
        index.save(tmp.path(), "index.json").unwrap();

        let loaded = PlaceholderIndex::load(tmp.path(), "index.json");
        assert_eq!(loaded.get(Path::new("a/cat.webp")), Some(&entry(16)));
    }

    #[test]
    fn insert_replaces_existing_entry() {
        let mut index = PlaceholderIndex::empty();
        index.insert(Path::new("cat.webp"), entry(16));
        index.insert(Path::new("cat.webp"), entry(12));
        assert_eq!(index.entries.len(), 1);
        assert_eq!(index.get(Path::new("cat.webp")).unwrap().width, 12);
    }

    #[test]
    fn load_missing_or_corrupt_is_empty() {
        let tmp = TempDir::new().unwrap();
        assert!(PlaceholderIndex::load(tmp.path(), "none.json").entries.is_empty());

        std::fs::write(tmp.path().join("bad.json"), "not json").unwrap();
        assert!(PlaceholderIndex::load(tmp.path(), "bad.json").entries.is_empty());
    }

    #[test]
    fn load_wrong_version_is_empty() {
        let tmp = TempDir::new().unwrap();
        let json = format!(
            r#"{{"version": {}, "entries": {{}}}}"#,
            INDEX_VERSION + 1
        );
        std::fs::write(tmp.path().join("index.json"), json).unwrap();
        let loaded = PlaceholderIndex::load(tmp.path(), "index.json");
        assert_eq!(loaded.version, INDEX_VERSION);
    }

    #[test]
    fn retain_outputs_drops_unknown_entries() {
        let mut index = PlaceholderIndex::empty();
        index.insert(Path::new("a/cat.webp"), entry(16));
        index.insert(Path::new("dog.webp"), entry(16));

        index.retain_outputs(&[PathBuf::from("a/cat.webp")]);
        assert!(index.get(Path::new("a/cat.webp")).is_some());
        assert!(index.get(Path::new("dog.webp")).is_none());
    }
}
