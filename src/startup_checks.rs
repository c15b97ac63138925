use crate::Config;
use std::path::Path;
use thiserror::Error;
use tracing::{error, info, warn};

#[derive(Debug, Error)]
pub enum StartupCheckError {
    #[error("Failed to create directory {path}: {source}")]
    DirectoryCreationFailed {
        path: String,
        source: std::io::Error,
    },

    #[error("Static files directory does not exist")]
    StaticDirectoryMissing,

    #[error("Templates directory does not exist")]
    TemplatesDirectoryMissing,

    #[error("Required template missing: {0}")]
    RequiredTemplateMissing(String),
}

impl StartupCheckError {
    /// The server cannot store anything without its storage directories.
    pub fn is_critical(&self) -> bool {
        matches!(self, StartupCheckError::DirectoryCreationFailed { .. })
    }
}

async fn ensure_directory(label: &str, dir: &Path) -> Result<(), StartupCheckError> {
    if dir.exists() {
        info!("{} directory exists: {:?}", label, dir);
        return Ok(());
    }

    info!("{} directory does not exist, creating: {:?}", label, dir);
    tokio::fs::create_dir_all(dir).await.map_err(|source| {
        error!("Failed to create {} directory {:?}: {}", label, dir, source);
        StartupCheckError::DirectoryCreationFailed {
            path: dir.display().to_string(),
            source,
        }
    })
}

pub async fn perform_startup_checks(config: &Config) -> Result<(), Vec<StartupCheckError>> {
    let mut errors = Vec::new();

    info!("Performing startup checks...");

    for (label, dir) in [
        ("Data", &config.storage.data_directory),
        ("Uploads", &config.storage.uploads_directory),
    ] {
        if let Err(e) = ensure_directory(label, dir).await {
            errors.push(e);
        }
    }

    if !config.static_files.directory.exists() {
        warn!(
            "Static files directory does not exist: {:?}",
            config.static_files.directory
        );
        errors.push(StartupCheckError::StaticDirectoryMissing);
    }

    let templates_dir = &config.templates.directory;
    if !templates_dir.exists() {
        warn!("Templates directory does not exist: {:?}", templates_dir);
        errors.push(StartupCheckError::TemplatesDirectoryMissing);
    } else {
        let required = templates_dir.join("index.html.liquid");
        if !required.exists() {
            warn!("Gallery template missing: {:?}", required);
            errors.push(StartupCheckError::RequiredTemplateMissing(
                "index.html.liquid".to_string(),
            ));
        }
    }

    if errors.is_empty() {
        info!("All startup checks passed");
        Ok(())
    } else {
        error!("Startup checks failed with {} errors", errors.len());
        Err(errors)
    }
}
