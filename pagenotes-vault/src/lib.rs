//! Filesystem-backed vault store.
//!
//! Resolves vault-relative paths under a root directory and writes
//! atomically (sibling tmp file, then rename) so an interrupted save never
//! leaves a half-written notes document behind.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use pagenotes_core::{VaultError, VaultStore};
use tracing::{debug, instrument};

pub struct FsVault {
    root: PathBuf,
}

impl FsVault {
    pub fn new(root: PathBuf) -> Result<Self, VaultError> {
        fs::create_dir_all(&root).map_err(|err| io_error(&root, err))?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Vault paths are relative and must stay inside the root.
    fn resolve(&self, path: &Path) -> Result<PathBuf, VaultError> {
        if path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(VaultError::Io {
                path: path.to_path_buf(),
                message: "vault paths must be relative and must not traverse upward".to_owned(),
            });
        }
        Ok(self.root.join(path))
    }

    fn write_atomic(&self, path: &Path, bytes: &[u8]) -> Result<(), VaultError> {
        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            fs::create_dir_all(parent).map_err(|err| io_error(path, err))?;
        }
        let file_name = resolved
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "vault-write".to_owned());
        let tmp = resolved.with_file_name(format!("{file_name}.tmp"));
        fs::write(&tmp, bytes).map_err(|err| io_error(path, err))?;
        fs::rename(&tmp, &resolved).map_err(|err| io_error(path, err))?;
        debug!(path = %path.display(), bytes = bytes.len(), "vault write");
        Ok(())
    }
}

#[async_trait]
impl VaultStore for FsVault {
    #[instrument(skip(self))]
    async fn read(&self, path: &Path) -> Result<Option<String>, VaultError> {
        let resolved = self.resolve(path)?;
        match fs::read_to_string(&resolved) {
            Ok(text) => Ok(Some(text)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(io_error(path, err)),
        }
    }

    async fn write(&self, path: &Path, text: &str) -> Result<(), VaultError> {
        self.write_atomic(path, text.as_bytes())
    }

    async fn create(&self, path: &Path, initial: &str) -> Result<(), VaultError> {
        let resolved = self.resolve(path)?;
        if resolved.exists() {
            return Err(VaultError::AlreadyExists(path.to_path_buf()));
        }
        self.write_atomic(path, initial.as_bytes())
    }

    async fn exists(&self, path: &Path) -> bool {
        self.resolve(path).map(|p| p.exists()).unwrap_or(false)
    }

    async fn read_binary(&self, path: &Path) -> Result<Vec<u8>, VaultError> {
        let resolved = self.resolve(path)?;
        fs::read(&resolved).map_err(|err| io_error(path, err))
    }

    async fn write_binary(&self, path: &Path, bytes: &[u8]) -> Result<(), VaultError> {
        self.write_atomic(path, bytes)
    }
}

fn io_error(path: &Path, err: io::Error) -> VaultError {
    match err.kind() {
        io::ErrorKind::NotFound => VaultError::NotFound(path.to_path_buf()),
        io::ErrorKind::PermissionDenied => VaultError::Permission(path.to_path_buf()),
        _ => VaultError::Io {
            path: path.to_path_buf(),
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn vault() -> (tempfile::TempDir, FsVault) {
        let dir = tempdir().unwrap();
        let vault = FsVault::new(dir.path().join("vault")).unwrap();
        (dir, vault)
    }

    #[tokio::test]
    async fn text_round_trip_with_nested_path() {
        let (_dir, vault) = vault();
        let path = Path::new("papers/deep/attention-notes.md");

        assert_eq!(vault.read(path).await.unwrap(), None);
        vault.write(path, "# Notes\n").await.unwrap();
        assert_eq!(vault.read(path).await.unwrap(), Some("# Notes\n".into()));
        assert!(vault.exists(path).await);
    }

    #[tokio::test]
    async fn create_fails_on_existing_file() {
        let (_dir, vault) = vault();
        let path = Path::new("a-notes.md");
        vault.create(path, "first").await.unwrap();
        let err = vault.create(path, "second").await.unwrap_err();
        assert!(matches!(err, VaultError::AlreadyExists(_)));
        assert_eq!(vault.read(path).await.unwrap(), Some("first".into()));
    }

    #[tokio::test]
    async fn write_leaves_no_tmp_file_behind() {
        let (_dir, vault) = vault();
        vault.write(Path::new("notes.md"), "body").await.unwrap();
        assert!(!vault.root().join("notes.md.tmp").exists());
        assert!(vault.root().join("notes.md").exists());
    }

    #[tokio::test]
    async fn binary_round_trip() {
        let (_dir, vault) = vault();
        let path = Path::new("paper.pdf");
        vault.write_binary(path, b"%PDF-1.7\n").await.unwrap();
        assert_eq!(vault.read_binary(path).await.unwrap(), b"%PDF-1.7\n");

        let err = vault.read_binary(Path::new("nope.pdf")).await.unwrap_err();
        assert!(matches!(err, VaultError::NotFound(_)));
    }

    #[tokio::test]
    async fn traversal_and_absolute_paths_are_rejected() {
        let (_dir, vault) = vault();
        let err = vault.read(Path::new("../escape.md")).await.unwrap_err();
        assert!(matches!(err, VaultError::Io { .. }));
        let err = vault.read(Path::new("/etc/passwd")).await.unwrap_err();
        assert!(matches!(err, VaultError::Io { .. }));
    }
}
