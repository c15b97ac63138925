use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::{ImagesError, SelectedFile, UploadedUrl};

/// Destination for image file transfers.
#[async_trait]
pub trait FileStorage: Send + Sync {
    /// Stores the file and returns the URL it can be fetched from.
    async fn store(&self, file: &SelectedFile) -> Result<UploadedUrl, ImagesError>;
}

/// Writes uploads into a local directory, named by content hash.
pub struct LocalFileStorage {
    directory: PathBuf,
    url_prefix: String,
}

impl LocalFileStorage {
    pub fn new(directory: PathBuf, url_prefix: impl Into<String>) -> Self {
        Self {
            directory,
            url_prefix: url_prefix.into(),
        }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub(crate) fn file_name_for(file: &SelectedFile) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&file.data);
        format!("{:x}.{}", hasher.finalize(), extension_for(&file.media_type))
    }
}

fn extension_for(media_type: &str) -> String {
    let subtype = media_type
        .split_once('/')
        .map(|(_, subtype)| subtype.trim().to_lowercase())
        .unwrap_or_default();

    match subtype.as_str() {
        "jpeg" | "jpg" => "jpg".to_string(),
        "" => "bin".to_string(),
        other => other.to_string(),
    }
}

#[async_trait]
impl FileStorage for LocalFileStorage {
    async fn store(&self, file: &SelectedFile) -> Result<UploadedUrl, ImagesError> {
        file.validate()?;

        tokio::fs::create_dir_all(&self.directory).await?;

        let file_name = Self::file_name_for(file);
        let path = self.directory.join(&file_name);

        if tokio::fs::try_exists(&path).await? {
            debug!("Upload {:?} already stored as {}", file.name, file_name);
        } else {
            tokio::fs::write(&path, &file.data).await?;
            info!(
                "Stored upload {:?} ({} bytes) as {}",
                file.name,
                file.size(),
                file_name
            );
        }

        UploadedUrl::parse(format!(
            "{}/{}",
            self.url_prefix.trim_end_matches('/'),
            file_name
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::FieldError;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_store_writes_file_and_returns_url() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path().join("uploads"), "/uploads");
        let file = SelectedFile::new("photo.png", "image/png", vec![1u8, 2, 3]);

        let url = storage.store(&file).await.unwrap();
        let file_name = LocalFileStorage::file_name_for(&file);
        assert_eq!(url.as_str(), format!("/uploads/{}", file_name));
        assert!(file_name.ends_with(".png"));

        let stored = std::fs::read(storage.directory().join(&file_name)).unwrap();
        assert_eq!(stored, vec![1u8, 2, 3]);
    }

    #[tokio::test]
    async fn test_same_content_maps_to_same_url() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(
            temp_dir.path().to_path_buf(),
            "https://example.com/uploads/",
        );

        let a = SelectedFile::new("a.jpeg", "image/JPEG", vec![9u8; 16]);
        let b = SelectedFile::new("b.jpeg", "image/jpeg", vec![9u8; 16]);

        let url_a = storage.store(&a).await.unwrap();
        let url_b = storage.store(&b).await.unwrap();
        assert_eq!(url_a, url_b);
        assert!(url_a.as_str().starts_with("https://example.com/uploads/"));
        assert!(url_a.as_str().ends_with(".jpg"));
    }

    #[tokio::test]
    async fn test_store_rejects_invalid_file() {
        let temp_dir = TempDir::new().unwrap();
        let storage = LocalFileStorage::new(temp_dir.path().join("uploads"), "/uploads");
        let file = SelectedFile::new("photo.bmp", "image/bmp", vec![0u8; 10]);

        let result = storage.store(&file).await;
        assert!(matches!(
            result,
            Err(ImagesError::Validation(FieldError::UnsupportedFormat))
        ));
        assert!(!storage.directory().exists());
    }
}
