//! Whole-file load and save
//!
//! Loading reads the entire file and deserializes it with format detection.
//! Saving serializes first, then writes atomically (temp + rename) so a
//! failed save never leaves a truncated file behind.

use crate::container::ValueContainer;
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tracing::info;
use vessel_core::{Error, Result};
use vessel_storage::StoragePolicy;
use vessel_wire::Format;

/// Read a file into a new container
///
/// # Errors
/// `FileNotFound` when the path does not exist, `FileReadError` when it
/// cannot be read, otherwise whatever deserialization reports.
pub fn load(path: impl AsRef<Path>) -> Result<ValueContainer> {
    let container = ValueContainer::new();
    container.load_from_file(path)?;
    Ok(container)
}

/// Write a container to a file in the given format
///
/// # Errors
/// Serialization errors, or `FileWriteError` when the file cannot be written.
pub fn save<P: StoragePolicy>(
    container: &ValueContainer<P>,
    path: impl AsRef<Path>,
    format: Format,
) -> Result<()> {
    container.save_to_file(path, format)
}

impl<P: StoragePolicy> ValueContainer<P> {
    /// Replace contents with a file's contents
    ///
    /// The container is unchanged on error.
    pub fn load_from_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let bytes = std::fs::read(path).map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => Error::FileNotFound(path.display().to_string()),
            _ => Error::FileReadError(format!("{}: {}", path.display(), e)),
        })?;
        self.deserialize(&bytes)?;
        info!(
            target: "vessel::io",
            path = %path.display(),
            bytes = bytes.len(),
            "loaded container"
        );
        Ok(())
    }

    /// Serialize and write to a file, replacing any existing file
    pub fn save_to_file(&self, path: impl AsRef<Path>, format: Format) -> Result<()> {
        let path = path.as_ref();
        let bytes = self.serialize(format)?;
        write_atomic(path, &bytes)
            .map_err(|e| Error::FileWriteError(format!("{}: {}", path.display(), e)))?;
        info!(
            target: "vessel::io",
            path = %path.display(),
            format = %format,
            bytes = bytes.len(),
            "saved container"
        );
        Ok(())
    }
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    replace_with(path, |file| {
        file.write_all(bytes)?;
        file.sync_all()
    })
}

/// Fill a sibling temp file and rename it over `path`
///
/// The temp file is removed on any failure after it was created.
fn replace_with<F>(path: &Path, fill: F) -> io::Result<()>
where
    F: FnOnce(&mut File) -> io::Result<()>,
{
    let tmp_path = temp_path(path);
    let mut file = File::create(&tmp_path)?;
    let result = fill(&mut file).and_then(|()| {
        drop(file);
        std::fs::rename(&tmp_path, path)
    });
    if result.is_err() {
        let _ = std::fs::remove_file(&tmp_path);
    }
    result
}

fn temp_path(path: &Path) -> PathBuf {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    path.with_file_name(tmp_name)
}
