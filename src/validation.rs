use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

pub const TITLE_MIN_CHARS: usize = 2;
pub const TITLE_MAX_CHARS: usize = 20;
pub const DESCRIPTION_MAX_CHARS: usize = 65;

/// Files must be strictly smaller than this many bytes.
pub const MAX_FILE_SIZE: u64 = 10_000 * 1024;

pub const ACCEPTED_FORMATS: &[&str] = &["jpg", "jpeg", "gif", "png"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Field {
    Image,
    Title,
    Description,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Image => "image",
            Field::Title => "title",
            Field::Description => "description",
        }
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    #[error("File is required.")]
    FileRequired,

    #[error("The file must be smaller than 10MB.")]
    FileTooLarge,

    #[error("Only PNG, JPEG and GIF files are accepted.")]
    UnsupportedFormat,

    #[error("Upload failed, try again.")]
    UploadFailed,

    #[error("Title is required.")]
    TitleRequired,

    #[error("Minimum 2 characters.")]
    TitleTooShort,

    #[error("Maximum 20 characters.")]
    TitleTooLong,

    #[error("Description is required.")]
    DescriptionRequired,

    #[error("Maximum 65 characters.")]
    DescriptionTooLong,
}

impl FieldError {
    pub fn field(&self) -> Field {
        match self {
            FieldError::FileRequired
            | FieldError::FileTooLarge
            | FieldError::UnsupportedFormat
            | FieldError::UploadFailed => Field::Image,
            FieldError::TitleRequired | FieldError::TitleTooShort | FieldError::TitleTooLong => {
                Field::Title
            }
            FieldError::DescriptionRequired | FieldError::DescriptionTooLong => {
                Field::Description
            }
        }
    }
}

pub fn validate_title(title: &str) -> Result<(), FieldError> {
    if title.is_empty() {
        return Err(FieldError::TitleRequired);
    }
    let chars = title.chars().count();
    if chars < TITLE_MIN_CHARS {
        Err(FieldError::TitleTooShort)
    } else if chars > TITLE_MAX_CHARS {
        Err(FieldError::TitleTooLong)
    } else {
        Ok(())
    }
}

pub fn validate_description(description: &str) -> Result<(), FieldError> {
    if description.is_empty() {
        return Err(FieldError::DescriptionRequired);
    }
    if description.chars().count() > DESCRIPTION_MAX_CHARS {
        return Err(FieldError::DescriptionTooLong);
    }
    Ok(())
}

/// Checks a declared media type such as `image/PNG`. Only the `image` top-level
/// type is accepted, and the subtype is matched case-insensitively.
pub fn is_accepted_format(media_type: &str) -> bool {
    let Some((kind, subtype)) = media_type.split_once('/') else {
        return false;
    };
    if !kind.trim().eq_ignore_ascii_case("image") {
        return false;
    }
    let subtype = subtype.trim();
    ACCEPTED_FORMATS
        .iter()
        .any(|format| subtype.eq_ignore_ascii_case(format))
}

pub fn validate_image(media_type: &str, size: u64) -> Result<(), FieldError> {
    if size >= MAX_FILE_SIZE {
        return Err(FieldError::FileTooLarge);
    }
    if !is_accepted_format(media_type) {
        return Err(FieldError::UnsupportedFormat);
    }
    Ok(())
}

/// Field-level errors keyed by the offending input.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FormErrors {
    errors: BTreeMap<Field, FieldError>,
}

impl FormErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn get(&self, field: Field) -> Option<&FieldError> {
        self.errors.get(&field)
    }

    pub fn set(&mut self, error: FieldError) {
        self.errors.insert(error.field(), error);
    }

    pub fn clear(&mut self, field: Field) {
        self.errors.remove(&field);
    }

    pub fn record(&mut self, field: Field, result: Result<(), FieldError>) {
        match result {
            Ok(()) => self.clear(field),
            Err(e) => self.set(e),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Field, &FieldError)> {
        self.errors.iter().map(|(field, error)| (*field, error))
    }

    /// Messages keyed by field name, ready for template rendering.
    pub fn messages(&self) -> BTreeMap<String, String> {
        self.iter()
            .map(|(field, error)| (field.to_string(), error.to_string()))
            .collect()
    }
}

/// Runs every rule and collects each failing field. `file` carries the declared
/// media type and size of the selected file, if any.
pub fn validate_fields(title: &str, description: &str, file: Option<(&str, u64)>) -> FormErrors {
    let mut errors = FormErrors::new();
    errors.record(Field::Title, validate_title(title));
    errors.record(Field::Description, validate_description(description));
    errors.record(
        Field::Image,
        match file {
            Some((media_type, size)) => validate_image(media_type, size),
            None => Err(FieldError::FileRequired),
        },
    );
    errors
}
