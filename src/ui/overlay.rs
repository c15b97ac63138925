use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverlayView {
    pub image_url: String,
}

/// Full-size presentation of one image. Opening and closing is decided by the
/// owner; the overlay only renders and reports dismissal.
#[derive(Debug, Clone, Default)]
pub struct ViewImageOverlay {
    is_open: bool,
    image_url: String,
}

impl ViewImageOverlay {
    pub fn new(is_open: bool, image_url: impl Into<String>) -> Self {
        Self {
            is_open,
            image_url: image_url.into(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn render(&self) -> Option<OverlayView> {
        self.is_open.then(|| OverlayView {
            image_url: self.image_url.clone(),
        })
    }

    /// Runs `on_close` once for the current activation. Returns false when the
    /// overlay was not open.
    pub fn dismiss<F: FnOnce()>(&mut self, on_close: F) -> bool {
        if !self.is_open {
            return false;
        }
        self.is_open = false;
        on_close();
        true
    }
}
