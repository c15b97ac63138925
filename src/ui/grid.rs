use serde::Serialize;
use std::collections::HashSet;
use thiserror::Error;

use super::{ImageCard, ViewImageOverlay};
use crate::images::Image;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum GridError {
    #[error("Duplicate image id in collection: {0}")]
    DuplicateId(String),
}

/// What the grid is currently showing in its overlay.
///
/// `active_image_url` survives closing the overlay and is only replaced by the
/// next selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GalleryViewState {
    pub active_image_url: Option<String>,
    pub is_overlay_open: bool,
}

pub struct GalleryGrid {
    cards: Vec<ImageCard>,
    view: GalleryViewState,
    overlay: ViewImageOverlay,
}

impl GalleryGrid {
    pub fn new(images: &[Image]) -> Result<Self, GridError> {
        let mut seen = HashSet::new();
        for image in images {
            if !seen.insert(image.id.as_str()) {
                return Err(GridError::DuplicateId(image.id.clone()));
            }
        }

        Ok(Self {
            cards: images.iter().map(ImageCard::from).collect(),
            view: GalleryViewState::default(),
            overlay: ViewImageOverlay::default(),
        })
    }

    pub fn cards(&self) -> &[ImageCard] {
        &self.cards
    }

    pub fn view_state(&self) -> &GalleryViewState {
        &self.view
    }

    pub fn overlay(&self) -> &ViewImageOverlay {
        &self.overlay
    }

    /// Opens the overlay on `url`.
    pub fn view_image(&mut self, url: &str) {
        self.view.active_image_url = Some(url.to_string());
        self.view.is_overlay_open = true;
        self.overlay = ViewImageOverlay::new(true, url);
    }

    /// Handles the view request of the card with `id`. Returns false for an
    /// unknown id.
    pub fn select(&mut self, id: &str) -> bool {
        let mut requested = None;
        if let Some(card) = self.cards.iter().find(|card| card.id == id) {
            card.request_view(|url| requested = Some(url.to_string()));
        }

        match requested {
            Some(url) => {
                self.view_image(&url);
                true
            }
            None => false,
        }
    }

    pub fn close_overlay(&mut self) -> bool {
        let view = &mut self.view;
        self.overlay.dismiss(|| view.is_overlay_open = false)
    }

    pub fn context(&self) -> liquid::Object {
        liquid::object!({
            "cards": self.cards,
            "view": self.view,
            "overlay": self.overlay.render(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn image(id: &str) -> Image {
        Image {
            id: id.to_string(),
            title: format!("Image {id}"),
            description: "desc".to_string(),
            url: format!("/uploads/{id}.png"),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_one_card_per_image_in_order() {
        let grid = GalleryGrid::new(&[image("a"), image("b"), image("c")]).unwrap();
        let ids: Vec<&str> = grid.cards().iter().map(|c| c.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert_eq!(grid.view_state(), &GalleryViewState::default());
        assert!(!grid.overlay().is_open());
    }

    #[test]
    fn test_duplicate_ids_are_rejected() {
        let result = GalleryGrid::new(&[image("a"), image("b"), image("a")]);
        assert_eq!(result.err(), Some(GridError::DuplicateId("a".to_string())));
    }

    #[test]
    fn test_selecting_a_then_b_tracks_latest() {
        let mut grid = GalleryGrid::new(&[image("a"), image("b")]).unwrap();

        assert!(grid.select("a"));
        assert_eq!(
            grid.view_state().active_image_url.as_deref(),
            Some("/uploads/a.png")
        );

        assert!(grid.select("b"));
        assert_eq!(
            grid.view_state().active_image_url.as_deref(),
            Some("/uploads/b.png")
        );
        assert!(grid.view_state().is_overlay_open);
        assert_eq!(grid.overlay().render().unwrap().image_url, "/uploads/b.png");
    }

    #[test]
    fn test_closing_keeps_last_viewed_url() {
        let mut grid = GalleryGrid::new(&[image("a")]).unwrap();
        grid.select("a");

        assert!(grid.close_overlay());
        assert!(!grid.view_state().is_overlay_open);
        assert_eq!(
            grid.view_state().active_image_url.as_deref(),
            Some("/uploads/a.png")
        );
        assert!(grid.overlay().render().is_none());

        // second close of the same activation does nothing
        assert!(!grid.close_overlay());
    }

    #[test]
    fn test_unknown_selection_is_ignored() {
        let mut grid = GalleryGrid::new(&[image("a")]).unwrap();
        assert!(!grid.select("zzz"));
        assert_eq!(grid.view_state(), &GalleryViewState::default());
    }

    #[test]
    fn test_context_exposes_overlay_only_when_open() {
        let mut grid = GalleryGrid::new(&[image("a")]).unwrap();
        let closed = grid.context();
        assert!(matches!(
            closed.get("overlay"),
            Some(liquid::model::Value::Nil)
        ));

        grid.select("a");
        let open = grid.context();
        assert!(matches!(
            open.get("overlay"),
            Some(liquid::model::Value::Object(_))
        ));
        assert!(open.get("cards").is_some());
    }
}
