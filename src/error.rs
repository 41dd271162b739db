//! Error types shared across the daemon.

use thiserror::Error;

use crate::display::DisplayError;

/// Errors produced by the photo store, the settings store and the refresh
/// engine. None of these are fatal to the process: callers log them and the
/// daemon keeps serving.
#[derive(Debug, Error)]
pub enum FrameError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to decode image: {0}")]
    Image(#[from] image::ImageError),

    #[error("photo identifier {0:?} is not a bare filename")]
    InvalidPhotoName(String),

    #[error("photo {0:?} does not exist")]
    MissingPhoto(String),

    #[error("unsupported file type: {0:?}")]
    UnsupportedFileType(String),

    #[error("failed to serialize settings: {0}")]
    Settings(#[from] serde_json::Error),

    #[error("display error: {0}")]
    Display(#[from] DisplayError),
}
