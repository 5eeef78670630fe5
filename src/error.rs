//! Error types for the claim form generator

use thiserror::Error;

/// Result type alias for the claim form generator
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the claim form generator
#[derive(Error, Debug)]
pub enum Error {
    /// Template file not found at the expected path
    #[error("Template not found: {path}")]
    TemplateNotFound { path: String },

    /// Template exists but is not a usable PDF
    #[error("Invalid template: {reason}")]
    InvalidTemplate { reason: String },

    /// Page out of bounds
    #[error("Page {page} out of bounds (total: {total})")]
    PageOutOfBounds { page: u32, total: u32 },

    /// Client record name does not follow the "Last, First - ####" convention
    #[error("Malformed client name {raw:?}: {reason}")]
    MalformedClientName { raw: String, reason: String },

    /// A field the form cannot be produced without is absent
    #[error("Missing required field '{field}' for {form}")]
    MissingField { form: String, field: String },

    /// Unknown form code
    #[error("Unknown form: {code}")]
    UnknownForm { code: String },

    /// Drawing or merging failed inside a generation run
    #[error("Failed to generate {form}: {reason}")]
    Generation { form: String, reason: String },

    /// Low-level PDF object error
    #[error("PDF error: {reason}")]
    Pdf { reason: String },

    /// Image decode or encode error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// Base64 decode error
    #[error("Invalid base64 data: {0}")]
    Base64Decode(#[from] base64::DecodeError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Path access denied (outside allowed output directories)
    #[error("Path access denied: {path}")]
    PathAccessDenied { path: String },
}

impl From<lopdf::Error> for Error {
    fn from(e: lopdf::Error) -> Self {
        Error::Pdf {
            reason: e.to_string(),
        }
    }
}

impl Error {
    /// Whether this error is a precondition failure that the generator facade
    /// passes through unchanged instead of folding into `Error::Generation`.
    pub fn is_precondition(&self) -> bool {
        matches!(
            self,
            Error::TemplateNotFound { .. }
                | Error::InvalidTemplate { .. }
                | Error::MalformedClientName { .. }
                | Error::MissingField { .. }
                | Error::UnknownForm { .. }
                | Error::PageOutOfBounds { .. }
        )
    }

    /// Return a sanitized error message safe to send to clients.
    /// Internal details (paths, library errors) are omitted.
    /// Full details should be logged via tracing before calling this.
    pub fn client_message(&self) -> String {
        match self {
            Error::TemplateNotFound { .. } => "Template not found".to_string(),
            Error::InvalidTemplate { .. } => "Invalid template file".to_string(),
            Error::PageOutOfBounds { page, total } => {
                format!("Page {} out of bounds (total: {})", page, total)
            }
            Error::MalformedClientName { raw, .. } => format!(
                "Malformed client name {:?}: expected 'Last, First - ####'",
                raw
            ),
            Error::MissingField { form, field } => {
                format!("Missing required field '{}' for {}", field, form)
            }
            Error::UnknownForm { code } => format!("Unknown form: {}", code),
            Error::Generation { form, .. } => format!("Failed to generate {}", form),
            Error::Pdf { .. } => "PDF processing error".to_string(),
            Error::Image(_) => "Image processing error".to_string(),
            Error::Base64Decode(_) => "Invalid base64 data".to_string(),
            Error::Io(_) => "I/O error".to_string(),
            Error::Serialization(_) => "Serialization error".to_string(),
            Error::PathAccessDenied { .. } => "Access denied".to_string(),
        }
    }
}
