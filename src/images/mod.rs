// Image records, their storage, and the REST endpoints in front of them
mod error;
mod handlers;
mod storage;
mod store;
mod types;

pub use error::ImagesError;
pub use handlers::{
    CreateImageRequest, ListQuery, UPLOAD_BODY_LIMIT, UploadResponse, create_image_handler,
    list_images_handler, upload_handler,
};
pub use storage::{FileStorage, LocalFileStorage};
pub use store::ImageStore;
pub use types::*;

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

use crate::cache::{CacheEvent, QueryCache};

/// Cache key of the image collection.
pub const IMAGES_KEY: &str = "images";

pub type ImageCache = QueryCache<Vec<Image>>;

/// Backend holding the image collection.
#[async_trait]
pub trait ImageApi: Send + Sync {
    async fn list_images(&self) -> Result<Vec<Image>, ImagesError>;

    async fn create_image(&self, image: NewImage) -> Result<Image, ImagesError>;
}

/// Reads the collection through the cache.
pub async fn load_collection(
    api: &dyn ImageApi,
    cache: &ImageCache,
) -> Result<Vec<Image>, ImagesError> {
    cache
        .get_or_fetch(IMAGES_KEY, || api.list_images())
        .await
}

/// Re-fetches the collection whenever it is invalidated, so the next gallery
/// read is served warm.
pub fn start_refresh_on_invalidate(
    cache: Arc<ImageCache>,
    api: Arc<dyn ImageApi>,
) -> tokio::task::JoinHandle<()> {
    let mut events = cache.subscribe();

    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(CacheEvent::Invalidated(key)) if key == IMAGES_KEY => {
                    debug!("Image collection invalidated, refreshing");
                    match load_collection(api.as_ref(), &cache).await {
                        Ok(images) => {
                            info!("Image collection refreshed ({} images)", images.len())
                        }
                        Err(e) => error!("Failed to refresh image collection: {}", e),
                    }
                }
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Cache subscriber lagged by {} events", skipped);
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tempfile::TempDir;

    fn new_image(title: &str) -> NewImage {
        NewImage {
            title: title.to_string(),
            description: "A nice day".to_string(),
            url: UploadedUrl::parse("/uploads/a.png").unwrap(),
        }
    }

    #[tokio::test]
    async fn test_load_collection_uses_cache_until_invalidated() {
        let temp_dir = TempDir::new().unwrap();
        let store = ImageStore::new(temp_dir.path());
        let cache = ImageCache::new();

        assert!(load_collection(&store, &cache).await.unwrap().is_empty());

        store.insert(new_image("Hidden")).await.unwrap();
        assert!(load_collection(&store, &cache).await.unwrap().is_empty());

        cache.invalidate(IMAGES_KEY).await;
        assert_eq!(load_collection(&store, &cache).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_background_refresh_after_invalidation() {
        let temp_dir = TempDir::new().unwrap();
        let store = Arc::new(ImageStore::new(temp_dir.path()));
        let cache = Arc::new(ImageCache::new());

        let handle = start_refresh_on_invalidate(cache.clone(), store.clone());
        store.insert(new_image("Fresh")).await.unwrap();
        cache.invalidate(IMAGES_KEY).await;

        let mut refreshed = false;
        for _ in 0..50 {
            if cache.is_fresh(IMAGES_KEY).await {
                refreshed = true;
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(refreshed, "collection should be re-fetched in the background");
        handle.abort();
    }
}
