//! Upload storage on the local filesystem
//!
//! Files live under `{uploads_dir}/{session_id}/{file_id}-{name}`. The database
//! keeps the path relative to the uploads directory.

use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, warn};

/// Longest stored file name component
const MAX_NAME_LEN: usize = 120;

/// Reduce a client-supplied file name to a safe single path component
pub fn sanitize_file_name(name: &str) -> String {
    let base = name.rsplit(|c| c == '/' || c == '\\').next().unwrap_or(name);

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();

    let trimmed = cleaned.trim_matches('.');
    if trimmed.is_empty() {
        return "upload".to_string();
    }
    trimmed.chars().take(MAX_NAME_LEN).collect()
}

/// Local upload directory
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write one upload and return its path relative to the store root
    pub async fn save(
        &self,
        session_id: &str,
        file_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> std::io::Result<String> {
        let dir = self.root.join(session_id);
        fs::create_dir_all(&dir).await?;

        let file_name = format!("{}-{}", file_id, sanitize_file_name(original_name));
        fs::write(dir.join(&file_name), bytes).await?;

        let relative = format!("{}/{}", session_id, file_name);
        debug!("Stored upload {} ({} bytes)", relative, bytes.len());
        Ok(relative)
    }

    pub async fn read(&self, relative: &str) -> std::io::Result<Vec<u8>> {
        fs::read(self.resolve(relative)?).await
    }

    /// Remove a stored file; a file that is already gone is not an error
    pub async fn remove(&self, relative: &str) -> std::io::Result<()> {
        match fs::remove_file(self.resolve(relative)?).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!("Upload {} already missing from disk", relative);
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Stored paths never contain `..`; refuse anything that would leave the root
    fn resolve(&self, relative: &str) -> std::io::Result<PathBuf> {
        let path = Path::new(relative);
        if path.is_absolute()
            || path
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid stored path: {}", relative),
            ));
        }
        Ok(self.root.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("slides final.pdf"), "slides_final.pdf");
        assert_eq!(sanitize_file_name("../../etc/passwd"), "passwd");
        assert_eq!(sanitize_file_name("C:\\Users\\kim\\발표.pptx"), "발표.pptx");
        assert_eq!(sanitize_file_name(".."), "upload");
        assert_eq!(sanitize_file_name(""), "upload");
    }

    #[tokio::test]
    async fn test_save_read_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let relative = store.save("session-1", "f1", "talk.pdf", b"%PDF").await.unwrap();
        assert_eq!(relative, "session-1/f1-talk.pdf");
        assert_eq!(store.read(&relative).await.unwrap(), b"%PDF");

        store.remove(&relative).await.unwrap();
        assert!(store.read(&relative).await.is_err());
        store.remove(&relative).await.unwrap();
    }

    #[tokio::test]
    async fn test_parent_paths_refused() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        assert!(store.read("../secret").await.is_err());
    }
}
