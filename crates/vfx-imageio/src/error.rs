//! Error types for image input/output.
//!
//! Every fallible call on [`ImageInput`](crate::ImageInput),
//! [`ImageOutput`](crate::ImageOutput) and
//! [`FormatRegistry`](crate::FormatRegistry) reports an [`IoError`].
//! Nothing is retried; the error text names the file or the offending value.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use vfx_spec::SpecError;

/// I/O operation error.
#[derive(Debug, Error)]
pub enum IoError {
    /// No registered plugin matches the filename or format name.
    #[error("unsupported format: {0}")]
    UnsupportedFormat(String),

    /// The file could not be created or opened, or the spec was rejected.
    #[error("cannot open {}: {reason}", path.display())]
    Open {
        /// File being opened.
        path: PathBuf,
        /// Human-readable cause.
        reason: String,
    },

    /// The plugin lacks a capability the request needs.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(String),

    /// Coordinates or buffer sizes disagree with the bound spec.
    #[error("geometry error: {0}")]
    Geometry(String),

    /// File I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Operation requires an open file.
    #[error("not open: {0}")]
    NotOpen(String),

    /// Codec-reported encode or decode failure.
    #[error("format error: {0}")]
    Format(String),
}

impl IoError {
    /// Builds an [`IoError::Open`].
    pub fn open(path: &Path, reason: impl std::fmt::Display) -> Self {
        Self::Open {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }

    /// Builds an [`IoError::Open`] from a rejected spec.
    pub fn invalid_spec(path: &Path, err: SpecError) -> Self {
        Self::open(path, format_args!("invalid spec: {err}"))
    }

    /// Builds an [`IoError::Geometry`].
    pub fn geometry(msg: impl Into<String>) -> Self {
        Self::Geometry(msg.into())
    }

    /// Builds an [`IoError::Format`].
    pub fn format(msg: impl std::fmt::Display) -> Self {
        Self::Format(msg.to_string())
    }
}

/// Result type for I/O operations.
pub type IoResult<T> = Result<T, IoError>;
