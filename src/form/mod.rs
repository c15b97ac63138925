//! The image upload form: file selection, transfer to storage, and
//! registration of the new image with the backend.
//!
//! The two asynchronous steps are strictly ordered. [`UploadForm::upload`]
//! produces an [`UploadedUrl`], and the creation request built by
//! [`UploadForm::submit`] can only be assembled from one, so nothing reaches
//! the backend before the file transfer has finished.

mod error;
mod state;

pub use error::FormError;
pub use state::{FormEvent, FormState};

use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::{
    images::{
        FileStorage, IMAGES_KEY, Image, ImageApi, ImageCache, ImagesError, NewImage,
        SelectedFile, UploadedUrl,
    },
    notify::{Notice, Toast},
    validation::{self, Field, FieldError, FormErrors},
};

/// The file picked in the form and, once transferred, where it landed.
#[derive(Debug, Clone)]
pub struct PendingUpload {
    pub selected_file: SelectedFile,
    pub uploaded_url: Option<UploadedUrl>,
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Field validation failed; nothing was sent and the form keeps its values.
    Invalid(FormErrors),
    /// No finished upload at submit time. The backend was not contacted.
    MissingUpload(Toast),
    Created { image: Image, toast: Toast },
    Failed { error: ImagesError, toast: Toast },
}

impl SubmitOutcome {
    pub fn toast(&self) -> Option<&Toast> {
        match self {
            SubmitOutcome::Invalid(_) => None,
            SubmitOutcome::MissingUpload(toast)
            | SubmitOutcome::Created { toast, .. }
            | SubmitOutcome::Failed { toast, .. } => Some(toast),
        }
    }

    pub fn notice(&self) -> Option<Notice> {
        match self {
            SubmitOutcome::Invalid(_) => None,
            SubmitOutcome::MissingUpload(_) => Some(Notice::Missing),
            SubmitOutcome::Created { .. } => Some(Notice::Created),
            SubmitOutcome::Failed { .. } => Some(Notice::Failed),
        }
    }
}

pub struct UploadForm {
    api: Arc<dyn ImageApi>,
    storage: Arc<dyn FileStorage>,
    cache: Arc<ImageCache>,
    on_close: Box<dyn FnMut() + Send>,
    state: FormState,
    title: String,
    description: String,
    pending: Option<PendingUpload>,
    errors: FormErrors,
}

impl UploadForm {
    pub fn new(
        api: Arc<dyn ImageApi>,
        storage: Arc<dyn FileStorage>,
        cache: Arc<ImageCache>,
    ) -> Self {
        Self {
            api,
            storage,
            cache,
            on_close: Box::new(|| {}),
            state: FormState::Idle,
            title: String::new(),
            description: String::new(),
            pending: None,
            errors: FormErrors::new(),
        }
    }

    /// Sets the callback that closes the modal hosting this form. It runs once
    /// per finished submission.
    pub fn on_close(mut self, on_close: impl FnMut() + Send + 'static) -> Self {
        self.on_close = Box::new(on_close);
        self
    }

    pub fn state(&self) -> FormState {
        self.state
    }

    pub fn is_submitting(&self) -> bool {
        !self.state.can_submit()
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn errors(&self) -> &FormErrors {
        &self.errors
    }

    pub fn pending(&self) -> Option<&PendingUpload> {
        self.pending.as_ref()
    }

    pub fn uploaded_url(&self) -> Option<&UploadedUrl> {
        self.pending.as_ref()?.uploaded_url.as_ref()
    }

    /// Updates the title. A field that is already flagged is re-checked
    /// immediately so the inline message follows the input.
    pub fn set_title(&mut self, title: impl Into<String>) {
        self.title = title.into();
        if self.errors.get(Field::Title).is_some() {
            self.errors
                .record(Field::Title, validation::validate_title(&self.title));
        }
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = description.into();
        if self.errors.get(Field::Description).is_some() {
            self.errors.record(
                Field::Description,
                validation::validate_description(&self.description),
            );
        }
    }

    /// Validates and takes the picked file. A rejected file drops any previous
    /// selection so it cannot be submitted by accident.
    pub fn select_file(&mut self, file: SelectedFile) -> Result<(), FormError> {
        if let Err(e) = file.validate() {
            debug!("Rejected file {:?}: {}", file.name, e);
            if self.state != FormState::Idle {
                self.apply(FormEvent::Reset)?;
            }
            self.pending = None;
            self.errors.set(e.clone());
            return Err(e.into());
        }

        self.apply(FormEvent::FileChosen)?;
        self.errors.clear(Field::Image);
        self.pending = Some(PendingUpload {
            selected_file: file,
            uploaded_url: None,
        });
        Ok(())
    }

    /// Transfers the selected file to storage and records its URL.
    pub async fn upload(&mut self) -> Result<UploadedUrl, FormError> {
        let file = match (&self.pending, self.state) {
            (Some(pending), FormState::FileSelected) => pending.selected_file.clone(),
            _ => return Err(FormError::NoFileSelected),
        };

        self.apply(FormEvent::UploadStarted)?;

        match self.storage.store(&file).await {
            Ok(url) => {
                self.apply(FormEvent::UploadCompleted)?;
                if let Some(pending) = self.pending.as_mut() {
                    pending.uploaded_url = Some(url.clone());
                }
                info!("Uploaded {:?} to {}", file.name, url);
                Ok(url)
            }
            Err(e) => {
                self.apply(FormEvent::UploadFailed)?;
                let field_error = match &e {
                    ImagesError::Validation(field_error) => field_error.clone(),
                    _ => FieldError::UploadFailed,
                };
                self.errors.set(field_error);
                error!("Upload of {:?} failed: {}", file.name, e);
                Err(e.into())
            }
        }
    }

    /// Runs field validation, then sends exactly one creation request.
    ///
    /// Every outcome other than [`SubmitOutcome::Invalid`] resets the form and
    /// closes the hosting modal.
    pub async fn submit(&mut self) -> Result<SubmitOutcome, FormError> {
        let errors = self.check_fields();
        if !errors.is_empty() {
            debug!("Submission blocked by {} invalid fields", errors.len());
            self.errors = errors.clone();
            return Ok(SubmitOutcome::Invalid(errors));
        }
        self.errors = errors;

        let Some(new_image) = self.creation_request() else {
            warn!("Submission rejected: image not uploaded yet");
            self.finish()?;
            return Ok(SubmitOutcome::MissingUpload(Toast::image_missing()));
        };

        self.apply(FormEvent::SubmitStarted)?;

        let outcome = match self.api.create_image(new_image).await {
            Ok(image) => {
                self.apply(FormEvent::SubmitSucceeded)?;
                self.cache.invalidate(IMAGES_KEY).await;
                info!("Image '{}' registered", image.title);
                SubmitOutcome::Created {
                    image,
                    toast: Toast::image_created(),
                }
            }
            Err(error) => {
                self.apply(FormEvent::SubmitFailed)?;
                error!("Failed to register image: {}", error);
                SubmitOutcome::Failed {
                    error,
                    toast: Toast::image_failed(),
                }
            }
        };

        self.finish()?;
        Ok(outcome)
    }

    /// Clears every field and the pending upload.
    pub fn reset(&mut self) -> Result<(), FormError> {
        self.apply(FormEvent::Reset)?;
        self.title.clear();
        self.description.clear();
        self.pending = None;
        self.errors = FormErrors::new();
        Ok(())
    }

    fn finish(&mut self) -> Result<(), FormError> {
        self.reset()?;
        (self.on_close)();
        Ok(())
    }

    fn check_fields(&self) -> FormErrors {
        let file = self.pending.as_ref().map(|pending| {
            (
                pending.selected_file.media_type.as_str(),
                pending.selected_file.size(),
            )
        });
        let mut errors = validation::validate_fields(&self.title, &self.description, file);

        // a rejected selection keeps its own message rather than "required"
        if file.is_none()
            && let Some(rejected) = self
                .errors
                .get(Field::Image)
                .filter(|e| !matches!(e, FieldError::UploadFailed))
        {
            errors.set(rejected.clone());
        }
        errors
    }

    fn creation_request(&self) -> Option<NewImage> {
        if self.state != FormState::Uploaded {
            return None;
        }
        Some(NewImage {
            title: self.title.clone(),
            description: self.description.clone(),
            url: self.uploaded_url()?.clone(),
        })
    }

    fn apply(&mut self, event: FormEvent) -> Result<(), FormError> {
        let next = self.state.transition(event)?;
        debug!("Upload form {:?} -> {:?} on {:?}", self.state, next, event);
        self.state = next;
        Ok(())
    }
}
