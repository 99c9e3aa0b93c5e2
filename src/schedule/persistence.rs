//! Local persistence slot for the section list
//!
//! The list is stored whole in a single named slot and replaced on every
//! write. There is no schema versioning.

use std::{
    fs,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};
use tracing::{debug, warn};

use super::Section;
use crate::error::StorageError;

/// A place the section list can be read from once and overwritten wholesale
pub trait SectionSlot: Send + Sync {
    /// Read the stored list, `None` when the slot has never been written
    fn load(&self) -> Result<Option<Vec<Section>>, StorageError>;

    /// Replace the stored list
    fn save(&self, sections: &[Section]) -> Result<(), StorageError>;

    /// Load the list for startup, treating any failure as an empty list.
    ///
    /// Stored entries are kept as written, even ones that would be rejected
    /// on creation.
    fn load_or_empty(&self) -> Vec<Section> {
        match self.load() {
            Ok(Some(sections)) => {
                let invalid = sections.iter().filter(|s| s.validate().is_err()).count();
                if invalid > 0 {
                    warn!("Stored list contains {} invalid sections, keeping them as stored", invalid);
                }
                sections
            }
            Ok(None) => Vec::new(),
            Err(e) => {
                warn!("Failed to load stored sections, starting empty: {}", e);
                Vec::new()
            }
        }
    }
}

impl<S: SectionSlot + ?Sized> SectionSlot for Arc<S> {
    fn load(&self) -> Result<Option<Vec<Section>>, StorageError> {
        (**self).load()
    }

    fn save(&self, sections: &[Section]) -> Result<(), StorageError> {
        (**self).save(sections)
    }
}

/// JSON file slot
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl SectionSlot for FileSlot {
    fn load(&self) -> Result<Option<Vec<Section>>, StorageError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_error(e)),
        };

        let sections: Vec<Section> = serde_json::from_str(&raw)?;
        debug!("Loaded {} sections from {}", sections.len(), self.path.display());
        Ok(Some(sections))
    }

    fn save(&self, sections: &[Section]) -> Result<(), StorageError> {
        let json = serde_json::to_string(sections)?;

        // Write beside the target then rename so a crash never leaves half a list
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp, &self.path).map_err(|e| self.io_error(e))?;

        debug!("Saved {} sections to {}", sections.len(), self.path.display());
        Ok(())
    }
}

/// In-process slot, used when nothing should touch the disk
#[derive(Debug, Default)]
pub struct MemorySlot {
    stored: Mutex<Option<Vec<Section>>>,
}

impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sections(sections: Vec<Section>) -> Self {
        Self {
            stored: Mutex::new(Some(sections)),
        }
    }

    /// Snapshot of the last saved list
    pub fn stored(&self) -> Option<Vec<Section>> {
        self.stored.lock().ok().and_then(|s| s.clone())
    }
}

impl SectionSlot for MemorySlot {
    fn load(&self) -> Result<Option<Vec<Section>>, StorageError> {
        Ok(self.stored())
    }

    fn save(&self, sections: &[Section]) -> Result<(), StorageError> {
        if let Ok(mut stored) = self.stored.lock() {
            *stored = Some(sections.to_vec());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Section> {
        vec![
            Section::new("Intro", 1).unwrap(),
            Section::new("Main", 2).unwrap(),
        ]
    }

    #[test]
    fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("sections.json"));
        assert!(slot.load().unwrap().is_none());
        assert!(slot.load_or_empty().is_empty());
    }

    #[test]
    fn file_slot_replaces_whole_list() {
        let dir = tempfile::tempdir().unwrap();
        let slot = FileSlot::new(dir.path().join("sections.json"));

        slot.save(&sample()).unwrap();
        slot.save(&sample()[..1]).unwrap();

        let loaded = slot.load().unwrap().unwrap();
        assert_eq!(loaded, vec![Section::new("Intro", 1).unwrap()]);
    }

    #[test]
    fn file_slot_writes_plain_json_array() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sections.json");
        FileSlot::new(&path).save(&sample()).unwrap();

        let raw = fs::read_to_string(&path).unwrap();
        assert_eq!(raw, r#"[{"name":"Intro","duration":1},{"name":"Main","duration":2}]"#);
    }

    #[test]
    fn malformed_file_falls_back_to_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sections.json");
        fs::write(&path, "{not json").unwrap();

        let slot = FileSlot::new(&path);
        assert!(slot.load().is_err());
        assert!(slot.load_or_empty().is_empty());
    }

    #[test]
    fn invalid_stored_entries_are_kept_on_startup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sections.json");
        fs::write(
            &path,
            r#"[{"name":"ok","duration":3},{"name":"","duration":3},{"name":"zero","duration":0}]"#,
        )
        .unwrap();

        let loaded = FileSlot::new(&path).load_or_empty();
        assert_eq!(loaded.len(), 3);
        assert_eq!(loaded[0], Section::new("ok", 3).unwrap());
        assert_eq!(loaded[1].name, "");
        assert_eq!(loaded[2].duration_minutes, 0);
    }

    #[test]
    fn memory_slot_round_trips() {
        let slot = MemorySlot::new();
        assert!(slot.stored().is_none());
        slot.save(&sample()).unwrap();
        assert_eq!(slot.load().unwrap(), Some(sample()));
    }
}
