use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const SUCCESS_DURATION: Duration = Duration::from_millis(5000);
pub const ERROR_DURATION: Duration = Duration::from_millis(2000);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToastStatus {
    Success,
    Error,
}

/// A transient user-facing notification.
///
/// `duration_ms` of `None` means the toast stays until the user dismisses it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Toast {
    pub title: String,
    pub description: String,
    pub status: ToastStatus,
    pub duration_ms: Option<u64>,
}

/// Which of the upload outcomes a toast reports, carried across redirects
/// as the `notice` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Notice {
    Created,
    Failed,
    Missing,
}

impl Toast {
    fn new(title: &str, description: &str, status: ToastStatus, duration: Option<Duration>) -> Self {
        Self {
            title: title.to_string(),
            description: description.to_string(),
            status,
            duration_ms: duration.map(|d| d.as_millis() as u64),
        }
    }

    pub fn image_missing() -> Self {
        Self::new(
            "Image not added",
            "You must add an image and wait for its upload before submitting.",
            ToastStatus::Error,
            None,
        )
    }

    pub fn image_created() -> Self {
        Self::new(
            "Image registered",
            "Your image was registered successfully.",
            ToastStatus::Success,
            Some(SUCCESS_DURATION),
        )
    }

    pub fn image_failed() -> Self {
        Self::new(
            "Something went wrong",
            "The image could not be registered.",
            ToastStatus::Error,
            Some(ERROR_DURATION),
        )
    }

    pub fn duration(&self) -> Option<Duration> {
        self.duration_ms.map(Duration::from_millis)
    }
}

impl Notice {
    pub fn toast(self) -> Toast {
        match self {
            Notice::Created => Toast::image_created(),
            Notice::Failed => Toast::image_failed(),
            Notice::Missing => Toast::image_missing(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Notice::Created => "created",
            Notice::Failed => "failed",
            Notice::Missing => "missing",
        }
    }
}

impl std::str::FromStr for Notice {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Notice::Created),
            "failed" => Ok(Notice::Failed),
            "missing" => Ok(Notice::Missing),
            other => Err(format!("unknown notice {:?}", other)),
        }
    }
}
