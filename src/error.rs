use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Unsupported file type: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to fetch file from {url}: {reason}")]
    FetchFailed { url: String, reason: String },

    #[error("Conversion failed: {message}")]
    ConversionFailed {
        message: String,
        /// Partial outputs still on disk; the caller owns their cleanup.
        leftovers: Vec<PathBuf>,
    },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn conversion(message: impl Into<String>) -> Self {
        AppError::ConversionFailed {
            message: message.into(),
            leftovers: Vec::new(),
        }
    }

    /// Attach whichever of `paths` exist on disk to a conversion failure.
    /// Other variants pass through untouched.
    pub fn with_leftovers(self, paths: impl IntoIterator<Item = PathBuf>) -> Self {
        match self {
            AppError::ConversionFailed {
                message,
                mut leftovers,
            } => {
                leftovers.extend(paths.into_iter().filter(|p| p.exists()));
                AppError::ConversionFailed { message, leftovers }
            }
            other => other,
        }
    }

    pub fn leftovers(&self) -> &[PathBuf] {
        match self {
            AppError::ConversionFailed { leftovers, .. } => leftovers,
            _ => &[],
        }
    }

    /// Stable tag used in machine-readable error reports.
    pub fn kind(&self) -> &'static str {
        match self {
            AppError::UnsupportedFormat(_) => "unsupported_type",
            AppError::FetchFailed { .. } => "fetch_failed",
            AppError::ConversionFailed { .. } => "conversion_failed",
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::IoError(_) => "io_error",
            AppError::Internal(_) => "internal",
        }
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
