//! # Mapping Source
//!
//! The mapping file is re-read at the start of every cycle so edits take
//! effect without a restart.
//!
//! ```json
//! [
//!   { "webflowVariantId": "64f...", "marianatekVariantId": "1201" },
//!   { "webflowVariantId": "64a...", "marianatekVariantId": "1202", "locationId": "48" }
//! ]
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use stocklink_core::{MappingEntry, MappingSet};

use crate::error::{StoreError, StoreResult};

/// Supplies the current mapping entries.
pub trait MappingSource: Send + Sync {
    fn load(&self) -> StoreResult<MappingSet>;
}

/// Mapping entries read from a JSON array file.
#[derive(Debug, Clone)]
pub struct JsonMappingFile {
    path: PathBuf,
}

impl JsonMappingFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        JsonMappingFile { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl MappingSource for JsonMappingFile {
    fn load(&self) -> StoreResult<MappingSet> {
        if !self.path.exists() {
            return Err(StoreError::MappingNotFound(self.path.clone()));
        }

        let contents = fs::read_to_string(&self.path).map_err(|e| StoreError::io(&self.path, e))?;
        let entries: Vec<MappingEntry> =
            serde_json::from_str(&contents).map_err(|e| StoreError::corrupt(&self.path, e))?;

        build_set(entries)
    }
}

/// Fixed mapping entries.
#[derive(Debug, Clone, Default)]
pub struct StaticMapping {
    entries: Vec<MappingEntry>,
}

impl StaticMapping {
    pub fn new(entries: Vec<MappingEntry>) -> Self {
        StaticMapping { entries }
    }
}

impl MappingSource for StaticMapping {
    fn load(&self) -> StoreResult<MappingSet> {
        build_set(self.entries.clone())
    }
}

fn build_set(entries: Vec<MappingEntry>) -> StoreResult<MappingSet> {
    let build = MappingSet::build(entries)?;
    for key in &build.duplicates {
        warn!(key = %key, "Duplicate mapping entry ignored");
    }
    debug!(pairs = build.set.len(), "Mapping loaded");
    Ok(build.set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_mapping_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        fs::write(
            &path,
            r#"[
                {"webflowVariantId": "wf-1", "marianatekVariantId": "mt-1"},
                {"webflowVariantId": "wf-2", "marianatekVariantId": "mt-2", "locationId": "48"}
            ]"#,
        )
        .unwrap();

        let set = JsonMappingFile::new(&path).load().unwrap();
        assert_eq!(set.len(), 2);
        assert_eq!(
            set.for_marianatek("mt-2").and_then(|e| e.location_id.as_deref()),
            Some("48")
        );
    }

    #[test]
    fn test_edits_are_picked_up_on_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("mapping.json");
        let source = JsonMappingFile::new(&path);

        fs::write(&path, r#"[{"webflowVariantId": "wf-1", "marianatekVariantId": "mt-1"}]"#)
            .unwrap();
        assert_eq!(source.load().unwrap().len(), 1);

        fs::write(&path, "[]").unwrap();
        assert!(source.load().unwrap().is_empty());
    }

    #[test]
    fn test_missing_and_invalid_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = JsonMappingFile::new(dir.path().join("nope.json"));
        assert!(matches!(missing.load(), Err(StoreError::MappingNotFound(_))));

        let path = dir.path().join("bad.json");
        fs::write(&path, r#"[{"webflowVariantId": "", "marianatekVariantId": "mt-1"}]"#).unwrap();
        assert!(matches!(
            JsonMappingFile::new(&path).load(),
            Err(StoreError::InvalidMapping(_))
        ));
    }
}
