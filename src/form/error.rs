use thiserror::Error;

use super::{FormEvent, FormState};
use crate::{images::ImagesError, validation::FieldError};

#[derive(Debug, Error)]
pub enum FormError {
    #[error("Cannot apply {event:?} while {from:?}")]
    InvalidTransition { from: FormState, event: FormEvent },

    #[error("No file selected")]
    NoFileSelected,

    #[error("{0}")]
    Invalid(#[from] FieldError),

    #[error("Upload failed: {0}")]
    Storage(#[from] ImagesError),
}
