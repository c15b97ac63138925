use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub mod cache;
pub mod form;
pub mod images;
pub mod notify;
pub mod startup_checks;
pub mod static_files;
pub mod templating;
pub mod ui;
pub mod validation;


#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub server: ServerConfig,
    pub app: AppConfig,
    pub templates: TemplateConfig,
    pub static_files: StaticConfig,
    pub storage: StorageConfig,
    pub gallery: GalleryConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    pub name: String,
    pub log_level: String,
    /// Prefix for uploaded file URLs, e.g. `https://photos.example.com`.
    /// Uploads get root-relative URLs when unset.
    #[serde(default)]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TemplateConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StaticConfig {
    pub directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Holds `images.json`.
    pub data_directory: PathBuf,
    pub uploads_directory: PathBuf,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GalleryConfig {
    pub images_per_page: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 3000,
            },
            app: AppConfig {
                name: "Galleria".to_string(),
                log_level: "info".to_string(),
                base_url: None,
            },
            templates: TemplateConfig {
                directory: PathBuf::from("templates"),
            },
            static_files: StaticConfig {
                directory: PathBuf::from("static"),
            },
            storage: StorageConfig {
                data_directory: PathBuf::from("data"),
                uploads_directory: PathBuf::from("data/uploads"),
            },
            gallery: GalleryConfig { images_per_page: 6 },
        }
    }
}

impl Config {
    /// Where uploaded files are served from, as seen by browsers.
    pub fn uploads_url_prefix(&self) -> String {
        let base = self
            .app
            .base_url
            .as_deref()
            .unwrap_or("")
            .trim_end_matches('/');
        format!("{}{}", base, UPLOADS_ROUTE_PREFIX)
    }
}

pub const UPLOADS_ROUTE_PREFIX: &str = "/uploads";

use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct AppState {
    pub template_engine: Arc<templating::TemplateEngine>,
    pub static_handler: static_files::StaticFileHandler,
    pub uploads_handler: static_files::StaticFileHandler,
    pub store: Arc<images::ImageStore>,
    pub storage: Arc<images::LocalFileStorage>,
    pub cache: Arc<images::ImageCache>,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let template_engine = Arc::new(templating::TemplateEngine::new(
            config.templates.directory.clone(),
        ));
        let static_handler =
            static_files::StaticFileHandler::new(config.static_files.directory.clone());
        let uploads_handler =
            static_files::StaticFileHandler::immutable(config.storage.uploads_directory.clone());
        let store = Arc::new(images::ImageStore::new(&config.storage.data_directory));
        let storage = Arc::new(images::LocalFileStorage::new(
            config.storage.uploads_directory.clone(),
            config.uploads_url_prefix(),
        ));

        Self {
            template_engine,
            static_handler,
            uploads_handler,
            store,
            storage,
            cache: Arc::new(images::ImageCache::new()),
            config,
        }
    }
}

pub async fn create_app(config: Config) -> Router {
    let app_state = AppState::new(config);

    app_state.static_handler.refresh_file_versions().await;
    images::start_refresh_on_invalidate(app_state.cache.clone(), app_state.store.clone());

    Router::new()
        .route("/", get(ui::gallery_handler))
        .route(
            "/images",
            post(ui::submit_image_handler)
                .layer(DefaultBodyLimit::max(images::UPLOAD_BODY_LIMIT)),
        )
        .route(
            "/api/images",
            get(images::list_images_handler).post(images::create_image_handler),
        )
        .route(
            "/api/upload",
            post(images::upload_handler).layer(DefaultBodyLimit::max(images::UPLOAD_BODY_LIMIT)),
        )
        .route("/static/{*path}", get(static_files::static_file_handler))
        .route(
            &format!("{}/{{*path}}", UPLOADS_ROUTE_PREFIX),
            get(static_files::upload_file_handler),
        )
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    let matched_path = request
                        .extensions()
                        .get::<axum::extract::MatchedPath>()
                        .map(|matched_path| matched_path.as_str());

                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        matched_path,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    let user_agent = request
                        .headers()
                        .get("user-agent")
                        .and_then(|h| h.to_str().ok())
                        .unwrap_or("-");

                    tracing::info!(
                        target: "access_log",
                        method = %request.method(),
                        path = %request.uri().path(),
                        query = ?request.uri().query(),
                        user_agent = %user_agent,
                        "request"
                    );
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     _span: &tracing::Span| {
                        tracing::info!(
                            target: "access_log",
                            status = %response.status(),
                            latency_ms = %latency.as_millis(),
                            "response"
                        );
                    },
                ),
        )
        .with_state(app_state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uploads_url_prefix() {
        let mut config = Config::default();
        assert_eq!(config.uploads_url_prefix(), "/uploads");

        config.app.base_url = Some("https://photos.example.com/".to_string());
        assert_eq!(
            config.uploads_url_prefix(),
            "https://photos.example.com/uploads"
        );
    }

    #[test]
    fn test_config_parses_from_toml() {
        let toml = r#"
[server]
host = "0.0.0.0"
port = 8080

[app]
name = "Photos"
log_level = "debug"

[templates]
directory = "templates"

[static_files]
directory = "static"

[storage]
data_directory = "/var/lib/galleria"
uploads_directory = "/var/lib/galleria/uploads"

[gallery]
images_per_page = 12
"#;
        let config: Config = toml_edit::de::from_str(toml).unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.app.base_url, None);
        assert_eq!(config.gallery.images_per_page, 12);
        assert_eq!(
            config.storage.uploads_directory,
            PathBuf::from("/var/lib/galleria/uploads")
        );
    }
}
