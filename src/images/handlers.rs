use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
};
use serde::{Deserialize, Serialize};
use tracing::info;

use super::{
    FileStorage, IMAGES_KEY, Image, ImageApi, ImagePage, ImagesError, NewImage, SelectedFile,
    UploadedUrl, load_collection, paginate,
};
use crate::{
    AppState,
    validation::{FieldError, MAX_FILE_SIZE},
};

/// Request bodies may exceed the file limit a little so oversized files reach
/// validation and get a proper message instead of a bare 413.
pub const UPLOAD_BODY_LIMIT: usize = MAX_FILE_SIZE as usize + 64 * 1024;

#[derive(Debug, Deserialize, Default)]
pub struct ListQuery {
    pub after: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateImageRequest {
    pub title: String,
    pub description: String,
    pub url: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Pages through the cached collection, the same read the gallery page uses.
pub async fn list_images_handler(
    State(app_state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ImagePage>, ImagesError> {
    let images = load_collection(&*app_state.store, &app_state.cache).await?;
    Ok(Json(paginate(
        &images,
        query.after.as_deref(),
        app_state.config.gallery.images_per_page,
    )))
}

pub async fn create_image_handler(
    State(app_state): State<AppState>,
    Json(request): Json<CreateImageRequest>,
) -> Result<(StatusCode, Json<Image>), ImagesError> {
    let new_image = NewImage {
        title: request.title,
        description: request.description,
        url: UploadedUrl::parse(request.url)?,
    };

    let image = app_state.store.create_image(new_image).await?;
    app_state.cache.invalidate(IMAGES_KEY).await;

    Ok((StatusCode::CREATED, Json(image)))
}

/// Accepts a raw file body. The declared type comes from `Content-Type`; an
/// optional percent-encoded `X-File-Name` header names the file in logs.
pub async fn upload_handler(
    State(app_state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<UploadResponse>, ImagesError> {
    if body.is_empty() {
        return Err(FieldError::FileRequired.into());
    }

    let media_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|h| h.to_str().ok())
        .map(|value| value.split(';').next().unwrap_or("").trim().to_string())
        .unwrap_or_default();

    let name = headers
        .get("x-file-name")
        .and_then(|h| h.to_str().ok())
        .map(|raw| {
            urlencoding::decode(raw)
                .map(|name| name.into_owned())
                .unwrap_or_else(|_| raw.to_string())
        })
        .unwrap_or_else(|| "upload".to_string());

    info!(
        "Upload received: {:?} ({}, {} bytes)",
        name,
        media_type,
        body.len()
    );

    let file = SelectedFile::new(name, media_type, body);
    let url = app_state.storage.store(&file).await?;

    Ok(Json(UploadResponse {
        url: url.into_string(),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Config;
    use tempfile::TempDir;

    fn test_state(temp_dir: &TempDir) -> AppState {
        let mut config = Config::default();
        config.storage.data_directory = temp_dir.path().join("data");
        config.storage.uploads_directory = temp_dir.path().join("data/uploads");
        AppState::new(config)
    }

    fn new_image(title: &str) -> NewImage {
        NewImage {
            title: title.to_string(),
            description: "A nice day".to_string(),
            url: UploadedUrl::parse("/uploads/a.png").unwrap(),
        }
    }

    async fn list(app_state: &AppState) -> ImagePage {
        let Json(page) = list_images_handler(State(app_state.clone()), Query(ListQuery::default()))
            .await
            .unwrap();
        page
    }

    #[tokio::test]
    async fn test_listing_reads_through_cache() {
        let temp_dir = TempDir::new().unwrap();
        let app_state = test_state(&temp_dir);

        assert!(list(&app_state).await.data.is_empty());

        // a write that skips invalidation stays invisible
        app_state.store.insert(new_image("Hidden")).await.unwrap();
        assert!(list(&app_state).await.data.is_empty());

        app_state.cache.invalidate(IMAGES_KEY).await;
        assert_eq!(list(&app_state).await.data.len(), 1);
    }

    #[tokio::test]
    async fn test_create_invalidates_listing() {
        let temp_dir = TempDir::new().unwrap();
        let app_state = test_state(&temp_dir);
        assert!(list(&app_state).await.data.is_empty());

        let request = CreateImageRequest {
            title: "My Photo".to_string(),
            description: "A nice day".to_string(),
            url: "/uploads/a.png".to_string(),
        };
        let (status, _) = create_image_handler(State(app_state.clone()), Json(request))
            .await
            .unwrap();
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(list(&app_state).await.data.len(), 1);
    }
}
