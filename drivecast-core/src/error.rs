use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    // Configuration errors
    #[error("Config file not found at {path}. A template has been created - please edit it with your drive URL and restart.")]
    ConfigNotFound { path: PathBuf },

    #[error("Failed to parse config file: {0}")]
    ConfigParseError(#[from] toml::de::Error),

    // Drive API errors
    #[error("Drive API returned status {status} for {url}")]
    HttpStatus { status: u16, url: String },

    #[error("Unexpected drive API response for {path}: {reason}")]
    UnexpectedResponse { path: String, reason: String },

    #[error("Invalid drive URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // Network errors
    #[error("Network request failed: {0}")]
    NetworkError(#[from] reqwest::Error),

    #[error("Network middleware failed: {0}")]
    MiddlewareError(#[from] reqwest_middleware::Error),

    // Cover art errors
    #[error("Failed to decode cover image: {0}")]
    ImageDecode(#[from] image::ImageError),

    // IO errors
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
