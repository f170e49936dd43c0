//! Vault file store contract implemented by the hosting application, plus an
//! in-memory implementation for tests and embedding hosts without a real
//! filesystem.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::Mutex;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("not found: {0}")]
    NotFound(PathBuf),

    #[error("already exists: {0}")]
    AlreadyExists(PathBuf),

    #[error("permission denied: {0}")]
    Permission(PathBuf),

    #[error("i/o failure on {path}: {message}")]
    Io { path: PathBuf, message: String },
}

/// Asynchronous text and binary file access keyed by vault-relative path.
#[async_trait]
pub trait VaultStore: Send + Sync {
    /// Reads a text file. An absent file is `Ok(None)`, not an error.
    async fn read(&self, path: &Path) -> Result<Option<String>, VaultError>;

    async fn write(&self, path: &Path, text: &str) -> Result<(), VaultError>;

    /// Creates a new text file; fails with `AlreadyExists` if present.
    async fn create(&self, path: &Path, initial: &str) -> Result<(), VaultError>;

    async fn exists(&self, path: &Path) -> bool;

    async fn read_binary(&self, path: &Path) -> Result<Vec<u8>, VaultError>;

    async fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<(), VaultError>;
}

/// In-memory vault. Supports injected write failures so callers can exercise
/// their failure paths.
#[derive(Default)]
pub struct MemoryVault {
    files: Mutex<HashMap<PathBuf, Vec<u8>>>,
    fail_writes: Mutex<bool>,
    write_count: Mutex<usize>,
}

impl MemoryVault {
    pub fn new() -> Self {
        Self::default()
    }

    /// When set, subsequent `write`/`write_binary` calls fail with a
    /// permission error.
    pub fn set_fail_writes(&self, fail: bool) {
        *self.fail_writes.lock() = fail;
    }

    /// Number of successful text writes performed.
    pub fn write_count(&self) -> usize {
        *self.write_count.lock()
    }

    pub fn text(&self, path: &Path) -> Option<String> {
        self.files
            .lock()
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
    }

    pub fn insert(&self, path: impl Into<PathBuf>, bytes: impl Into<Vec<u8>>) {
        self.files.lock().insert(path.into(), bytes.into());
    }

    fn check_writable(&self, path: &Path) -> Result<(), VaultError> {
        if *self.fail_writes.lock() {
            return Err(VaultError::Permission(path.to_path_buf()));
        }
        Ok(())
    }
}

#[async_trait]
impl VaultStore for MemoryVault {
    async fn read(&self, path: &Path) -> Result<Option<String>, VaultError> {
        Ok(self
            .files
            .lock()
            .get(path)
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned()))
    }

    async fn write(&self, path: &Path, text: &str) -> Result<(), VaultError> {
        self.check_writable(path)?;
        self.files
            .lock()
            .insert(path.to_path_buf(), text.as_bytes().to_vec());
        *self.write_count.lock() += 1;
        Ok(())
    }

    async fn create(&self, path: &Path, initial: &str) -> Result<(), VaultError> {
        self.check_writable(path)?;
        let mut files = self.files.lock();
        if files.contains_key(path) {
            return Err(VaultError::AlreadyExists(path.to_path_buf()));
        }
        files.insert(path.to_path_buf(), initial.as_bytes().to_vec());
        Ok(())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.files.lock().contains_key(path)
    }

    async fn read_binary(&self, path: &Path) -> Result<Vec<u8>, VaultError> {
        self.files
            .lock()
            .get(path)
            .cloned()
            .ok_or_else(|| VaultError::NotFound(path.to_path_buf()))
    }

    async fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<(), VaultError> {
        self.check_writable(path)?;
        self.files.lock().insert(path.to_path_buf(), bytes.to_vec());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn read_of_absent_file_is_none() {
        let vault = MemoryVault::new();
        assert_eq!(vault.read(Path::new("missing.md")).await.unwrap(), None);
        assert!(!vault.exists(Path::new("missing.md")).await);
    }

    #[tokio::test]
    async fn create_rejects_existing_file() {
        let vault = MemoryVault::new();
        vault.create(Path::new("a.md"), "one").await.unwrap();
        let err = vault.create(Path::new("a.md"), "two").await.unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists(_)));
        assert_eq!(vault.text(Path::new("a.md")), Some("one".to_owned()));
    }

    #[tokio::test]
    async fn injected_failure_blocks_writes() {
        let vault = MemoryVault::new();
        vault.set_fail_writes(true);
        let err = vault.write(Path::new("a.md"), "x").await.unwrap_err();
        assert!(matches!(err, VaultError::Permission(_)));
        assert_eq!(vault.write_count(), 0);

        vault.set_fail_writes(false);
        vault.write(Path::new("a.md"), "x").await.unwrap();
        assert_eq!(vault.write_count(), 1);
    }

    #[tokio::test]
    async fn binary_round_trip() {
        let vault = MemoryVault::new();
        vault
            .write_binary(Path::new("doc.pdf"), b"%PDF-1.7")
            .await
            .unwrap();
        assert_eq!(
            vault.read_binary(Path::new("doc.pdf")).await.unwrap(),
            b"%PDF-1.7"
        );
        let err = vault.read_binary(Path::new("nope.pdf")).await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }
}
