use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tempfile::NamedTempFile;

use crate::domain::{HookError, Metadata, Result, Version};

pub const VERSION_FILE: &str = "version.json";
pub const METADATA_FILE: &str = "metadata.json";

/// Sidecar files under `<workdir>/.git/resource/`, the only state carried
/// from the in phase to the out phase.
///
/// Layout:
/// - `version.json`: the resolved version
/// - `metadata.json`: the metadata array
/// - one file per metadata field, named after the field, holding its raw value
pub struct SidecarStore {
    dir: PathBuf,
}

impl SidecarStore {
    pub fn new(workdir: impl AsRef<Path>) -> Self {
        Self {
            dir: workdir.as_ref().join(".git").join("resource"),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Write every sidecar file. Returns the number of files written.
    pub fn write(&self, version: &Version, metadata: &Metadata) -> Result<usize> {
        fs::create_dir_all(&self.dir).map_err(|e| {
            HookError::Filesystem(format!(
                "failed to create resource directory {}: {e}",
                self.dir.display()
            ))
        })?;

        self.write_file(VERSION_FILE, &serde_json::to_vec(version)?)?;
        self.write_file(METADATA_FILE, &serde_json::to_vec(metadata)?)?;
        for field in metadata.iter() {
            self.write_file(&field.name, field.value.as_bytes())?;
        }

        Ok(2 + metadata.len())
    }

    pub fn read_version(&self) -> Result<Version> {
        self.read_json(VERSION_FILE)
    }

    pub fn read_metadata(&self) -> Result<Metadata> {
        self.read_json(METADATA_FILE)
    }

    // Temp file + rename so a reader never sees a half-written file.
    fn write_file(&self, name: &str, data: &[u8]) -> Result<()> {
        let path = self.dir.join(name);
        let fail = |e: std::io::Error| {
            HookError::Filesystem(format!("failed to write {}: {e}", path.display()))
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(fail)?;
        tmp.write_all(data).map_err(fail)?;
        tmp.persist(&path).map_err(|e| fail(e.error))?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let bytes = fs::read(&path).map_err(|e| {
            HookError::Filesystem(format!("failed to read {}: {e}", path.display()))
        })?;
        serde_json::from_slice(&bytes).map_err(|e| {
            HookError::Filesystem(format!("invalid json in {}: {e}", path.display()))
        })
    }
}
