use std::path::{Path, PathBuf};

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::error::{AppError, Result};

/// Archive for original upload bytes. Callers treat failures as non-fatal.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return a locator for the archived copy.
    async fn archive(&self, bytes: &[u8], file_name: Option<&str>) -> Result<String>;
}

/// Content-addressed archive on the local disk: `<dir>/<sha256>.<ext>`.
#[derive(Debug, Clone)]
pub struct LocalBlobStore {
    root: PathBuf,
}

impl LocalBlobStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, digest: &str, file_name: Option<&str>) -> PathBuf {
        let extension = file_name
            .and_then(|name| Path::new(name).extension())
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_ascii_lowercase())
            .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
            .unwrap_or_else(|| "bin".to_string());

        self.root.join(format!("{}.{}", digest, extension))
    }
}

pub fn content_digest(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    async fn archive(&self, bytes: &[u8], file_name: Option<&str>) -> Result<String> {
        ensure_dir(&self.root).await?;

        let digest = content_digest(bytes);
        let path = self.path_for(&digest, file_name);

        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            debug!(path = %path.display(), "Upload already archived");
        } else {
            tokio::fs::write(&path, bytes).await.map_err(|e| {
                AppError::IoError(format!("Failed to archive upload to {}: {}", path.display(), e))
            })?;
        }

        Ok(path.to_string_lossy().into_owned())
    }
}

async fn ensure_dir(path: &Path) -> Result<()> {
    if !tokio::fs::try_exists(path).await.unwrap_or(false) {
        tokio::fs::create_dir_all(path).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_archive_is_content_addressed() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path().join("uploads"));

        let first = store.archive(b"Condominio,Email\n", Some("Export.CSV")).await.unwrap();
        let second = store.archive(b"Condominio,Email\n", Some("copy.csv")).await.unwrap();

        assert_eq!(first, second);
        assert!(first.ends_with(".csv"));
        assert!(first.contains(&content_digest(b"Condominio,Email\n")));
        assert_eq!(std::fs::read(&first).unwrap(), b"Condominio,Email\n");
    }

    #[tokio::test]
    async fn test_missing_extension_falls_back_to_bin() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalBlobStore::new(dir.path());

        let path = store.archive(b"data", None).await.unwrap();
        assert!(path.ends_with(".bin"));
    }

    #[test]
    fn test_digest_is_hex_sha256() {
        let digest = content_digest(b"");
        assert_eq!(
            digest,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }
}
