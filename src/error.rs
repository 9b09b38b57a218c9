//! Error types for dae
//!
//! This module defines the error types shared by the document parser, the
//! schema collaborators and the validation engine.

use std::fmt;
use thiserror::Error;

/// Result type alias using dae Error
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for dae operations
#[derive(Error, Debug)]
pub enum Error {
    /// A schema document could not be interpreted
    #[error("schema error: {0}")]
    Schema(String),

    /// The document namespace does not name a known COLLADA version
    #[error("unrecognized schema version: {0}")]
    UnrecognizedVersion(String),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Namespace error
    #[error("namespace error: {0}")]
    Namespace(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

/// A single schema violation found in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Source line of the offending element (1-based)
    pub line: Option<usize>,
    /// Path to the element that failed validation
    pub path: Option<String>,
    /// Schema the document was checked against
    pub schema: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            line: None,
            path: None,
            schema: None,
        }
    }

    /// Set the source line
    pub fn with_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    /// Set the path where validation failed
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Set the schema location
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(line) = self.line {
            write!(f, "line {}: ", line)?;
        }
        write!(f, "{}", self.message)?;

        if let Some(ref path) = self.path {
            write!(f, "\n\nPath: {}", path)?;
        }

        if let Some(ref schema) = self.schema {
            write!(f, "\n\nSchema: {}", schema)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::new("Element 'foo' is not declared")
            .with_line(12)
            .with_path("/COLLADA/foo")
            .with_schema("collada_schema_1_4_1.xsd");

        let msg = format!("{}", err);
        assert!(msg.starts_with("line 12: Element 'foo'"));
        assert!(msg.contains("Path: /COLLADA/foo"));
        assert!(msg.contains("Schema: collada_schema_1_4_1.xsd"));
    }

    #[test]
    fn test_io_error_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: Error = io.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.to_string(), "I/O error: gone");
    }
}
