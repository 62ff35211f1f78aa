//! Error types for slide capture and PDF assembly

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for capture operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while capturing a slideshow
#[derive(Error, Debug)]
pub enum Error {
    /// Failed to initialize the browser
    #[error("Engine initialization failed: {0}")]
    InitializationError(String),

    /// Failed to load a URL
    #[error("Failed to load URL: {0}")]
    LoadError(String),

    /// Failed to capture a screenshot or print a page
    #[error("Rendering failed: {0}")]
    RenderError(String),

    /// Failed to execute JavaScript
    #[error("Script execution failed: {0}")]
    ScriptError(String),

    /// Invalid configuration or slide table
    #[error("Invalid configuration: {0}")]
    ConfigError(String),

    /// Local input file does not exist
    #[error("Input not found: {}", .0.display())]
    InputNotFound(PathBuf),

    /// The capture loop produced nothing to assemble
    #[error("No pages captured")]
    NoPagesCaptured,

    /// Input PDF has no pages
    #[error("PDF has no pages: {0}")]
    EmptyPdf(String),

    /// PDF processing error
    #[error("PDF error: {0}")]
    Pdf(#[from] lopdf::Error),

    /// Image decoding error
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON returned by a page script
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed slide table file
    #[error("Slide table parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// CDP-specific error
    #[cfg(feature = "cdp")]
    #[error("CDP error: {0}")]
    CdpError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

#[cfg(feature = "cdp")]
impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::CdpError(err.to_string())
    }
}
