//! Error types for the cutout library.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for the cutout library.
#[derive(Error, Debug)]
pub enum Error {
    /// Input image could not be read or decoded.
    #[error("failed to load image from {path}: {source}")]
    Load {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// The segmentation model could not process an image.
    #[error("segmentation failed: {reason}")]
    Segmentation { reason: String },

    /// Foreground and background sizes differ at composite time.
    #[error("dimension mismatch: foreground is {expected:?}, background is {actual:?}")]
    DimensionMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },

    /// The live frame source could not be acquired.
    #[error("frame source unavailable: {reason}")]
    SourceUnavailable { reason: String },

    /// Output image could not be encoded or written.
    #[error("failed to save image to {path}: {reason}")]
    Persist { path: PathBuf, reason: String },

    /// Failed to load an ONNX model.
    #[error("failed to load ONNX model {path}: {reason}")]
    ModelLoad { path: PathBuf, reason: String },

    /// Frame capture failed mid-session.
    #[error("frame capture failed: {reason}")]
    Capture { reason: String },

    /// Display sink rejected a frame.
    #[error("display output failed: {reason}")]
    Display { reason: String },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    pub(crate) fn segmentation(reason: impl Into<String>) -> Self {
        Self::Segmentation {
            reason: reason.into(),
        }
    }

    pub(crate) fn invalid_parameter(name: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name: name.to_string(),
            reason: reason.into(),
        }
    }
}

/// Result type alias for cutout operations.
pub type Result<T> = std::result::Result<T, Error>;
