// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Attachment byte storage.
//!
//! The workflow records attachment metadata on the permit; the bytes live in
//! an `AttachmentStore` keyed by permit id and storage key.

use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Attachment store errors.
#[derive(Debug, Error)]
pub enum AttachmentStoreError {
    /// The storage key is not a plain file name.
    #[error("Invalid storage key '{0}'")]
    InvalidKey(String),

    /// Nothing is stored under the key.
    #[error("No attachment stored for permit {permit_id} under '{storage_key}'")]
    NotFound { permit_id: i64, storage_key: String },

    /// The underlying file operation failed.
    #[error("Attachment I/O failed for '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Byte storage for permit attachments.
pub trait AttachmentStore: Send + Sync {
    /// Stores `bytes` for a permit under `storage_key`, replacing any previous content.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is invalid or the write fails.
    fn save(
        &self,
        permit_id: i64,
        storage_key: &str,
        bytes: &[u8],
    ) -> Result<(), AttachmentStoreError>;

    /// Reads the bytes stored for a permit under `storage_key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing is stored, or an error if the read fails.
    fn read(&self, permit_id: i64, storage_key: &str) -> Result<Vec<u8>, AttachmentStoreError>;

    /// Deletes the bytes stored for a permit under `storage_key`.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if nothing is stored, or an error if the delete fails.
    fn delete(&self, permit_id: i64, storage_key: &str) -> Result<(), AttachmentStoreError>;
}

/// Generates a fresh storage key.
#[must_use]
pub fn generate_storage_key() -> String {
    format!("{:016x}{:016x}", rand::random::<u64>(), rand::random::<u64>())
}

fn validate_key(storage_key: &str) -> Result<(), AttachmentStoreError> {
    let valid: bool = !storage_key.is_empty()
        && storage_key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(AttachmentStoreError::InvalidKey(storage_key.to_string()))
    }
}

/// Stores attachments as files under `<root>/<permit_id>/<storage_key>`.
#[derive(Debug, Clone)]
pub struct FsAttachmentStore {
    root: PathBuf,
}

impl FsAttachmentStore {
    /// Creates a store rooted at `root`. The directory is created on first write.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The directory attachments are stored under.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path_for(&self, permit_id: i64, storage_key: &str) -> Result<PathBuf, AttachmentStoreError> {
        validate_key(storage_key)?;
        Ok(self.root.join(permit_id.to_string()).join(storage_key))
    }
}

fn io_error(path: &Path, source: std::io::Error) -> AttachmentStoreError {
    AttachmentStoreError::Io {
        path: path.display().to_string(),
        source,
    }
}

impl AttachmentStore for FsAttachmentStore {
    fn save(
        &self,
        permit_id: i64,
        storage_key: &str,
        bytes: &[u8],
    ) -> Result<(), AttachmentStoreError> {
        let path: PathBuf = self.path_for(permit_id, storage_key)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| io_error(parent, e))?;
        }
        std::fs::write(&path, bytes).map_err(|e| io_error(&path, e))?;
        debug!(permit_id, storage_key, size = bytes.len(), "Saved attachment bytes");
        Ok(())
    }

    fn read(&self, permit_id: i64, storage_key: &str) -> Result<Vec<u8>, AttachmentStoreError> {
        let path: PathBuf = self.path_for(permit_id, storage_key)?;
        std::fs::read(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AttachmentStoreError::NotFound {
                permit_id,
                storage_key: storage_key.to_string(),
            },
            _ => io_error(&path, e),
        })
    }

    fn delete(&self, permit_id: i64, storage_key: &str) -> Result<(), AttachmentStoreError> {
        let path: PathBuf = self.path_for(permit_id, storage_key)?;
        std::fs::remove_file(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => AttachmentStoreError::NotFound {
                permit_id,
                storage_key: storage_key.to_string(),
            },
            _ => io_error(&path, e),
        })?;
        debug!(permit_id, storage_key, "Deleted attachment bytes");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used, clippy::expect_used)]

    use super::*;

    fn temp_store(name: &str) -> FsAttachmentStore {
        let root: PathBuf = std::env::temp_dir().join(format!(
            "hse-permit-attachments-{name}-{}",
            generate_storage_key()
        ));
        FsAttachmentStore::new(root)
    }

    #[test]
    fn test_save_read_delete() {
        let store: FsAttachmentStore = temp_store("roundtrip");
        store.save(7, "abc123", b"checklist").unwrap();
        assert_eq!(store.read(7, "abc123").unwrap(), b"checklist".to_vec());

        store.delete(7, "abc123").unwrap();
        assert!(matches!(
            store.read(7, "abc123"),
            Err(AttachmentStoreError::NotFound { permit_id: 7, .. })
        ));
        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_keys_cannot_escape_the_root() {
        let store: FsAttachmentStore = temp_store("escape");
        assert!(matches!(
            store.save(1, "../outside", b"x"),
            Err(AttachmentStoreError::InvalidKey(_))
        ));
        assert!(matches!(
            store.delete(1, ""),
            Err(AttachmentStoreError::InvalidKey(_))
        ));
    }

    #[test]
    fn test_permits_do_not_share_files() {
        let store: FsAttachmentStore = temp_store("scoped");
        store.save(1, "same-key", b"one").unwrap();
        assert!(store.read(2, "same-key").is_err());
        std::fs::remove_dir_all(store.root()).ok();
    }

    #[test]
    fn test_generated_keys_are_valid_and_distinct() {
        let a: String = generate_storage_key();
        let b: String = generate_storage_key();
        assert_ne!(a, b);
        assert!(validate_key(&a).is_ok());
    }
}
