// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic write-rename persistence

use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors that can occur in storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("YAML error on {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

impl StorageError {
    pub(crate) fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn yaml(path: &Path, source: serde_yaml::Error) -> Self {
        Self::Yaml {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Serialize a value to YAML and atomically replace `path`.
///
/// The document is written to a sibling temporary file, fsynced,
/// then renamed over the target; readers observe the old or the new
/// version, never a partial one.
pub fn atomic_write_yaml<T: Serialize>(path: &Path, value: &T) -> Result<(), StorageError> {
    let content = serde_yaml::to_string(value).map_err(|e| StorageError::yaml(path, e))?;
    atomic_write_bytes(path, content.as_bytes())
}

/// Atomically replace `path` with the given bytes
pub fn atomic_write_bytes(path: &Path, content: &[u8]) -> Result<(), StorageError> {
    let io_err = |e| StorageError::io(path, e);

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let temp_path = path.with_extension(format!("tmp-{}", std::process::id()));
    fs::write(&temp_path, content).map_err(io_err)?;
    File::open(&temp_path)
        .and_then(|file| file.sync_all())
        .map_err(io_err)?;
    fs::rename(&temp_path, path).map_err(io_err)?;
    Ok(())
}

/// Read a YAML document, `None` when the file does not exist yet
pub fn read_yaml<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, StorageError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(StorageError::io(path, e)),
    };
    serde_yaml::from_str(&content)
        .map(Some)
        .map_err(|e| StorageError::yaml(path, e))
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
