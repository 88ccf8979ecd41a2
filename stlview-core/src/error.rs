//! Error types for the viewer core
//!
//! Every failure here is diagnostic: hosts log it and carry on with the
//! remaining viewers. Nothing is retried.

use thiserror::Error;

/// Errors produced while decoding STL data
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StlError {
    #[error("File too small to be a valid STL ({0} bytes)")]
    TooSmall(usize),

    #[error("Unexpected end of file: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("Failed to parse ASCII STL: {0}")]
    Ascii(String),

    #[error("STL file contains no facets")]
    Empty,
}

/// Errors produced while fetching and decoding a model
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LoadError {
    #[error("Failed to fetch model: {0}")]
    Fetch(String),

    #[error(transparent)]
    Decode(#[from] StlError),

    #[error("Model load was cancelled")]
    Cancelled,
}

/// Renderer failure, reported once per frame that failed
#[derive(Error, Debug, Clone, PartialEq)]
#[error("Render error: {0}")]
pub struct RenderError(pub String);

impl RenderError {
    pub fn new<T: ToString>(msg: T) -> Self {
        RenderError(msg.to_string())
    }
}

/// Invalid viewer configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Per-container viewer failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ViewerError {
    #[error("Container with ID {0} not found.")]
    MissingContainer(String),

    #[error("No source attribute found for STL viewer container {index}")]
    MissingSource { index: usize },

    #[error("Could not attach renderer to container {id}: {reason}")]
    Surface { id: String, reason: String },

    #[error("Error loading STL file: {0}")]
    Load(#[from] LoadError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_is_transparent() {
        let err = LoadError::from(StlError::Empty);
        assert_eq!(err.to_string(), "STL file contains no facets");
    }

    #[test]
    fn test_missing_source_message_names_container() {
        let err = ViewerError::MissingSource { index: 3 };
        assert!(err.to_string().contains("container 3"));
    }
}
