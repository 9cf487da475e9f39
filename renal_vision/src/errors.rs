// THEORY:
// `VisionError` is the one error type the analysis stages return. Each variant
// names the path or value involved and keeps the underlying cause as its source,
// so a caller printing the full chain sees both without repetition.

use std::path::PathBuf;

use thiserror::Error;

use crate::core_modules::classifier::ClassifyError;
use crate::core_modules::confidence::ConfidenceError;

#[derive(Debug, Error)]
pub enum VisionError {
    #[error("failed to read image {path}")]
    ImageRead {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to write image {path}")]
    ImageWrite {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },
    #[error("failed to create directory {path}")]
    CreateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("image buffer of {len} bytes does not fit {width}x{height}")]
    BufferSize { width: u32, height: u32, len: usize },
    #[error(transparent)]
    Confidence(#[from] ConfidenceError),
    #[error(transparent)]
    Classify(#[from] ClassifyError),
}
