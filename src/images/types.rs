use axum::body::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use url::{Position, Url};

use super::ImagesError;
use crate::validation::{self, FieldError};

/// A registered gallery entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    #[serde(rename = "ts", with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,
}

const RELATIVE_BASE: &str = "http://localhost";

/// Location of a file that finished its transfer to storage. Never empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UploadedUrl(String);

impl UploadedUrl {
    /// Accepts absolute http(s) URLs and root-relative paths. The value must
    /// already be in normalized URL form, so quotes, spaces and control
    /// characters are rejected rather than re-encoded.
    pub fn parse(raw: impl Into<String>) -> Result<Self, ImagesError> {
        let raw = raw.into();
        let trimmed = raw.trim();

        if trimmed.is_empty() {
            return Err(ImagesError::InvalidUrl(raw));
        }

        let normalized = if trimmed.starts_with('/') {
            if trimmed.starts_with("//") {
                return Err(ImagesError::InvalidUrl(raw));
            }
            Url::parse(RELATIVE_BASE)
                .and_then(|base| base.join(trimmed))
                .ok()
                .map(|joined| joined[Position::BeforePath..].to_string())
        } else {
            Url::parse(trimmed)
                .ok()
                .filter(|u| matches!(u.scheme(), "http" | "https"))
                .map(String::from)
        };

        match normalized {
            Some(normalized) if normalized == trimmed => Ok(Self(normalized)),
            _ => Err(ImagesError::InvalidUrl(raw)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl TryFrom<String> for UploadedUrl {
    type Error = ImagesError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<UploadedUrl> for String {
    fn from(url: UploadedUrl) -> Self {
        url.0
    }
}

impl std::fmt::Display for UploadedUrl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Creation request. Holding an [`UploadedUrl`] means the transfer step
/// already succeeded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewImage {
    pub title: String,
    pub description: String,
    pub url: UploadedUrl,
}

impl NewImage {
    pub fn validate(&self) -> Result<(), FieldError> {
        validation::validate_title(&self.title)?;
        validation::validate_description(&self.description)
    }
}

/// A file the user picked, before or after its transfer.
#[derive(Debug, Clone)]
pub struct SelectedFile {
    pub name: String,
    pub media_type: String,
    pub data: Bytes,
}

impl SelectedFile {
    pub fn new(
        name: impl Into<String>,
        media_type: impl Into<String>,
        data: impl Into<Bytes>,
    ) -> Self {
        Self {
            name: name.into(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }

    pub fn size(&self) -> u64 {
        self.data.len() as u64
    }

    pub fn validate(&self) -> Result<(), FieldError> {
        validation::validate_image(&self.media_type, self.size())
    }
}

/// One page of the image listing plus the cursor for the next one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePage {
    pub data: Vec<Image>,
    pub after: Option<String>,
}

/// Slices `images` after the image with id `after`. An unknown cursor starts
/// from the beginning.
pub fn paginate(images: &[Image], after: Option<&str>, limit: usize) -> ImagePage {
    let start = after
        .and_then(|id| images.iter().position(|image| image.id == id))
        .map(|index| index + 1)
        .unwrap_or(0);
    let end = (start + limit.max(1)).min(images.len());
    let data = images[start..end].to_vec();

    let after = if end < images.len() {
        data.last().map(|image| image.id.clone())
    } else {
        None
    };

    ImagePage { data, after }
}
