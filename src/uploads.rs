use std::{
    io,
    path::{Path, PathBuf},
};

use base64::{Engine, engine::general_purpose::STANDARD};
use uuid::Uuid;

use crate::error::EventError;

/// Directory that attached files are written to and served from.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
    url_prefix: String,
    max_bytes: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredFile {
    pub url: String,
    pub content_type: String,
    pub path: PathBuf,
}

impl UploadDir {
    pub fn new(root: impl Into<PathBuf>, url_prefix: &str, max_bytes: usize) -> UploadDir {
        UploadDir {
            root: root.into(),
            url_prefix: url_prefix.trim_end_matches('/').to_owned(),
            max_bytes,
        }
    }

    /// Url path the stored files are served under, without a trailing slash.
    pub fn url_prefix(&self) -> &str {
        &self.url_prefix
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Accepts plain base64 or a `data:<type>;base64,` url.
    pub fn decode(&self, data: &str) -> Result<Vec<u8>, EventError> {
        let encoded = match data.split_once(";base64,") {
            Some((head, rest)) if head.starts_with("data:") => rest,
            _ => data,
        };

        if encoded.len() / 4 * 3 > self.max_bytes + 2 {
            return Err(EventError::validation("file too large"));
        }

        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|err| EventError::validation(format!("file data: {err}")))?;

        if bytes.is_empty() {
            return Err(EventError::validation("file is empty"));
        }
        if bytes.len() > self.max_bytes {
            return Err(EventError::validation("file too large"));
        }

        Ok(bytes)
    }

    pub async fn store(&self, bytes: &[u8], name: &str, content_type: &str) -> io::Result<StoredFile> {
        tokio::fs::create_dir_all(&self.root).await?;

        let file_name = format!("{}{}", Uuid::now_v7().simple(), extension(name));
        let path = self.root.join(&file_name);
        tokio::fs::write(&path, bytes).await?;

        tracing::debug!(path = %path.display(), size = bytes.len(), "stored upload");

        Ok(StoredFile {
            url: format!("{}/{}", self.url_prefix, file_name),
            content_type: content_type.to_owned(),
            path,
        })
    }

    pub async fn remove(&self, file: &StoredFile) {
        if let Err(err) = tokio::fs::remove_file(&file.path).await {
            tracing::warn!(path = %file.path.display(), %err, "could not remove orphaned upload");
        }
    }
}

fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty() && ext.len() <= 16 && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keeps_safe_extensions_only() {
        assert_eq!(extension("cat.PNG"), ".png");
        assert_eq!(extension("notes"), "");
        assert_eq!(extension("evil.p/h"), "");
        assert_eq!(extension("archive.tar.gz"), ".gz");
    }

    #[test]
    fn decodes_data_urls() {
        let uploads = UploadDir::new("unused", "/uploads", 1024);
        assert_eq!(uploads.decode("aGk=").unwrap(), b"hi");
        assert_eq!(uploads.decode("data:text/plain;base64,aGk=").unwrap(), b"hi");
        assert!(matches!(uploads.decode("***"), Err(EventError::Validation(_))));
        assert!(matches!(uploads.decode(""), Err(EventError::Validation(_))));
    }

    #[test]
    fn rejects_oversized() {
        let uploads = UploadDir::new("unused", "/uploads", 4);
        assert!(uploads.decode(&STANDARD.encode([0u8; 64])).is_err());
    }

    #[tokio::test]
    async fn store_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let uploads = UploadDir::new(dir.path().join("files"), "/uploads/", 1024);

        let stored = uploads.store(b"\x89PNG", "me.png", "image/png").await.unwrap();
        assert!(stored.url.starts_with("/uploads/"));
        assert!(stored.url.ends_with(".png"));
        assert_eq!(stored.content_type, "image/png");
        assert_eq!(tokio::fs::read(&stored.path).await.unwrap(), b"\x89PNG");

        uploads.remove(&stored).await;
        assert!(!stored.path.exists());
    }
}
