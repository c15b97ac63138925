use serde::Serialize;

use crate::images::Image;

/// Render data for one gallery entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImageCard {
    pub id: String,
    pub title: String,
    pub description: String,
    pub url: String,
    pub created: String,
}

impl From<&Image> for ImageCard {
    fn from(image: &Image) -> Self {
        Self {
            id: image.id.clone(),
            title: image.title.clone(),
            description: image.description.clone(),
            url: image.url.clone(),
            created: image.created_at.format("%Y-%m-%d").to_string(),
        }
    }
}

impl ImageCard {
    /// Called when the user asks for the enlarged view; hands the card's url
    /// to `view_image`.
    pub fn request_view<F: FnOnce(&str)>(&self, view_image: F) {
        view_image(&self.url);
    }
}
