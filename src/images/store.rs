use async_trait::async_trait;
use chrono::{SubsecRound, Utc};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use super::{Image, ImageApi, ImagesError, NewImage};

const IMAGES_FILE: &str = "images.json";

/// Image records kept in memory and persisted as JSON after every change.
pub struct ImageStore {
    data_file: PathBuf,
    images: RwLock<Vec<Image>>,
}

impl ImageStore {
    pub fn new(data_directory: &Path) -> Self {
        let data_file = data_directory.join(IMAGES_FILE);
        let images = load_images(&data_file).unwrap_or_else(|e| {
            warn!("Failed to load images from {:?}: {}", data_file, e);
            Vec::new()
        });

        Self {
            data_file,
            images: RwLock::new(images),
        }
    }

    pub async fn len(&self) -> usize {
        self.images.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.images.read().await.is_empty()
    }

    pub async fn list(&self) -> Vec<Image> {
        self.images.read().await.clone()
    }

    pub async fn get(&self, id: &str) -> Result<Image, ImagesError> {
        self.images
            .read()
            .await
            .iter()
            .find(|image| image.id == id)
            .cloned()
            .ok_or_else(|| ImagesError::NotFound(id.to_string()))
    }

    /// Validates and appends a new image. The record is only kept once it has
    /// been written to disk.
    pub async fn insert(&self, new_image: NewImage) -> Result<Image, ImagesError> {
        new_image.validate()?;

        let image = Image {
            id: uuid::Uuid::new_v4().to_string(),
            title: new_image.title,
            description: new_image.description,
            url: new_image.url.into_string(),
            created_at: Utc::now().trunc_subsecs(3),
        };

        let mut images = self.images.write().await;
        let mut updated = images.clone();
        updated.push(image.clone());
        self.save(&updated).await?;
        *images = updated;

        info!("Registered image '{}' ({})", image.title, image.id);
        Ok(image)
    }

    async fn save(&self, images: &[Image]) -> Result<(), ImagesError> {
        if let Some(parent) = self.data_file.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let json = serde_json::to_string_pretty(images)?;
        let tmp_file = self.data_file.with_extension("json.tmp");
        tokio::fs::write(&tmp_file, json).await?;
        tokio::fs::rename(&tmp_file, &self.data_file).await?;

        debug!("Saved {} images to {:?}", images.len(), self.data_file);
        Ok(())
    }
}

#[async_trait]
impl ImageApi for ImageStore {
    async fn list_images(&self) -> Result<Vec<Image>, ImagesError> {
        Ok(self.list().await)
    }

    async fn create_image(&self, image: NewImage) -> Result<Image, ImagesError> {
        self.insert(image).await
    }
}

pub(crate) fn load_images(data_file: &Path) -> Result<Vec<Image>, ImagesError> {
    if !data_file.exists() {
        debug!("Image data file not found, starting with an empty gallery");
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(data_file)?;
    let images: Vec<Image> = serde_json::from_str(&json)?;

    info!("Loaded {} images", images.len());
    Ok(images)
}
