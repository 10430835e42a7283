//! Error types
//!
//! Every fallible operation in the crate reports a [`DocumentError`].
//! Errors are returned at the call that detects them; nothing is retried
//! or silently corrected.

use crate::metadata::ValueKind;
use thiserror::Error;

/// Result type alias for xmlstore operations.
pub type Result<T> = std::result::Result<T, DocumentError>;

/// Errors raised by document handles, content cells, metadata stores and containers.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Content supplied to `set_content*` or produced while materializing a
    /// lazily fetched document is not well-formed XML.
    #[error("malformed XML content: {message}")]
    MalformedContent {
        message: String,
        /// Byte offset in the content where the problem was detected.
        position: Option<u64>,
    },

    /// A document with this name already exists in the container.
    #[error("a document named '{0}' already exists")]
    DuplicateName(String),

    /// The handle was disposed before this call.
    #[error("document handle used after dispose")]
    UseAfterDispose,

    /// Lookup of a document or container that does not exist.
    #[error("'{name}' not found in '{container}'")]
    NotFound { container: String, name: String },

    /// A typed metadata value whose lexical form does not match its kind.
    #[error("invalid {kind} value '{value}': {reason}")]
    InvalidValue {
        kind: ValueKind,
        value: String,
        reason: String,
    },

    /// Document names must be non-empty once a document is attached.
    #[error("invalid document name: {0}")]
    InvalidName(String),

    /// The implicit name attribute cannot be written through the metadata API.
    #[error("metadata '{{{uri}}}{name}' is reserved")]
    ReservedMetadata { uri: String, name: String },

    /// A materialization walk was started while another one was running on
    /// the same content.
    #[error("document content is already being materialized")]
    ReentrantMaterialization,

    /// A streaming reader outlived a replacement of the content it was reading.
    #[error("document content was replaced while a reader was active")]
    StaleReader,

    /// The backing store cursor failed.
    #[error("backing store error: {0}")]
    Source(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DocumentError {
    /// Build a `MalformedContent` error without position information.
    pub fn malformed(message: impl Into<String>) -> Self {
        DocumentError::MalformedContent {
            message: message.into(),
            position: None,
        }
    }

    /// Build a `MalformedContent` error at a byte offset.
    pub fn malformed_at(message: impl Into<String>, position: u64) -> Self {
        DocumentError::MalformedContent {
            message: message.into(),
            position: Some(position),
        }
    }

    /// Whether this error reports ill-formed XML.
    pub fn is_malformed(&self) -> bool {
        matches!(self, DocumentError::MalformedContent { .. })
    }
}

impl From<quick_xml::Error> for DocumentError {
    fn from(err: quick_xml::Error) -> Self {
        DocumentError::malformed(err.to_string())
    }
}

impl From<quick_xml::events::attributes::AttrError> for DocumentError {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        DocumentError::malformed(format!("attribute error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_display() {
        let err = DocumentError::malformed_at("unclosed tag <a>", 12);
        assert!(err.is_malformed());
        assert_eq!(err.to_string(), "malformed XML content: unclosed tag <a>");
    }

    #[test]
    fn test_reserved_display() {
        let err = DocumentError::ReservedMetadata {
            uri: "urn:x".to_string(),
            name: "name".to_string(),
        };
        assert_eq!(err.to_string(), "metadata '{urn:x}name' is reserved");
    }
}
