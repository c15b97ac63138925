use axum::{
    body::Body,
    extract::{Path, Query, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Deserialize;
use std::{
    collections::HashMap,
    path::{Component, Path as StdPath, PathBuf},
    sync::Arc,
    time::UNIX_EPOCH,
};
use tokio::{fs::File, sync::RwLock};
use tokio_util::io::ReaderStream;
use tracing::{debug, error, info};

use crate::AppState;

/// Serves files below one root directory with cache headers.
#[derive(Clone)]
pub struct StaticFileHandler {
    pub root: PathBuf,
    immutable: bool,
    file_versions: Arc<RwLock<HashMap<String, u64>>>,
}

#[derive(Debug, Deserialize, Default)]
pub struct VersionQuery {
    pub v: Option<String>,
}

impl StaticFileHandler {
    pub fn new(root: PathBuf) -> Self {
        Self {
            root,
            immutable: false,
            file_versions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// For directories whose files never change once written, such as
    /// content-addressed uploads.
    pub fn immutable(root: PathBuf) -> Self {
        Self {
            immutable: true,
            ..Self::new(root)
        }
    }

    pub async fn refresh_file_versions(&self) {
        info!("Refreshing static file versions in {:?}", self.root);
        let mut versions = self.file_versions.write().await;
        versions.clear();

        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return;
        };

        for entry in entries.flatten() {
            let path = entry.path();
            if let Ok(metadata) = entry.metadata()
                && metadata.is_file()
                && let Some(ext) = path.extension()
                && (ext == "css" || ext == "js")
                && let Ok(modified) = metadata.modified()
                && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
                && let Some(file_name) = path.file_name().and_then(|f| f.to_str())
            {
                versions.insert(file_name.to_string(), duration.as_secs());
                debug!("File version: {} -> {}", file_name, duration.as_secs());
            }
        }
    }

    /// Appends `?v=<mtime>` to `url` when the file is known, so it can be
    /// cached forever.
    pub async fn versioned_url(&self, url: &str) -> String {
        let filename = url.rsplit('/').next().unwrap_or(url);
        match self.file_versions.read().await.get(filename) {
            Some(version) => format!("{}?v={}", url, version),
            None => url.to_string(),
        }
    }

    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = StdPath::new(path.trim_start_matches('/'));
        let safe = relative
            .components()
            .all(|component| matches!(component, Component::Normal(_)));
        (safe && !path.is_empty()).then(|| self.root.join(relative))
    }

    pub async fn serve(&self, path: &str, has_version: bool) -> Response {
        let Some(file_path) = self.resolve(path) else {
            error!("Rejected static path: {:?}", path);
            return (StatusCode::FORBIDDEN, "Forbidden").into_response();
        };

        debug!("Attempting to serve file: {:?}", file_path);

        let metadata = match tokio::fs::metadata(&file_path).await {
            Ok(m) if m.is_file() => m,
            _ => return (StatusCode::NOT_FOUND, "File not found").into_response(),
        };

        let file = match File::open(&file_path).await {
            Ok(file) => file,
            Err(e) => {
                debug!("Failed to open file {:?}: {}", file_path, e);
                return (StatusCode::NOT_FOUND, "File not found").into_response();
            }
        };

        let content_type = mime_guess::from_path(&file_path)
            .first_or_octet_stream()
            .to_string();

        let cache_control = if has_version || self.immutable {
            "public, max-age=31536000, immutable"
        } else if content_type.starts_with("image/") {
            "public, max-age=31536000"
        } else if content_type.starts_with("text/css")
            || content_type.starts_with("application/javascript")
            || content_type.starts_with("text/javascript")
        {
            "public, max-age=300, must-revalidate"
        } else {
            "public, max-age=3600"
        };

        let mut response = Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, content_type)
            .header(header::CACHE_CONTROL, cache_control)
            .header(header::CONTENT_LENGTH, metadata.len());

        if let Ok(modified) = metadata.modified()
            && let Ok(duration) = modified.duration_since(UNIX_EPOCH)
        {
            response = response
                .header(header::LAST_MODIFIED, httpdate::fmt_http_date(modified))
                .header(
                    header::ETAG,
                    format!("\"{}-{}\"", duration.as_secs(), metadata.len()),
                );
        }

        response
            .body(Body::from_stream(ReaderStream::new(file)))
            .unwrap_or_else(|e| {
                error!("Failed to build file response: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR.into_response()
            })
    }
}

pub async fn static_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
    Query(query): Query<VersionQuery>,
) -> Response {
    app_state
        .static_handler
        .serve(&path, query.v.is_some())
        .await
}

pub async fn upload_file_handler(
    State(app_state): State<AppState>,
    Path(path): Path<String>,
) -> Response {
    app_state.uploads_handler.serve(&path, false).await
}
