//! Error types for the capture pipeline

use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while normalizing, capturing or saving a screenshot
#[derive(Error, Debug)]
pub enum Error {
    /// The configured target root matched nothing in the document
    #[error("Target root not found: {0}")]
    TargetNotFound(String),

    /// The target root selector could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(String),

    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// A DOM mutation could not be applied
    #[error("DOM error: {0}")]
    Dom(String),

    /// The rendering engine rejected the capture
    #[error("Rendering failed: {0}")]
    Render(String),

    /// The raw bitmap could not be decoded
    #[error("Failed to decode bitmap: {0}")]
    Decode(String),

    /// The final canvas could not be encoded
    #[error("Failed to encode canvas: {0}")]
    Encode(String),

    /// The persistence endpoint failed
    #[error("Persistence failed: {0}")]
    Persistence(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<base64::DecodeError> for Error {
    fn from(err: base64::DecodeError) -> Self {
        Error::Decode(err.to_string())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<url::ParseError> for Error {
    fn from(err: url::ParseError) -> Self {
        Error::Config(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Persistence(err.to_string())
    }
}
