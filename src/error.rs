use std::path::PathBuf;
use thiserror::Error;

/// Failure of a single image in the standardization pipeline.
///
/// A missing face is not represented here: it selects the fallback
/// reference instead of failing the image.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("background removal failed: {0}")]
    Extraction(String),

    #[error("failed to resize foreground: {0}")]
    Resize(String),

    #[error("failed to encode output image: {0}")]
    Encode(String),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid profile: {0}")]
    InvalidProfile(String),
}

pub type Result<T> = std::result::Result<T, ProcessError>;
