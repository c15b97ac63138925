// Gallery page components and the handlers that render them
mod card;
mod grid;
mod handlers;
mod overlay;

pub use card::ImageCard;
pub use grid::{GalleryGrid, GalleryViewState, GridError};
pub use handlers::{GalleryQuery, gallery_handler, submit_image_handler};
pub use overlay::{OverlayView, ViewImageOverlay};
