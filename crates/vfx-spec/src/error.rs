//! Error types for image specifications.
//!
//! [`SpecError`] reports an [`ImageSpec`](crate::ImageSpec) that cannot
//! describe a real image: missing channels, inconsistent channel lists,
//! half-configured tiling, sizes that overflow buffer arithmetic.
//!
//! # Usage
//!
//! ```rust
//! use vfx_spec::{ImageSpec, SpecError, TypeDesc};
//!
//! let mut spec = ImageSpec::new(64, 64, 3, TypeDesc::UInt8);
//! spec.channelnames.pop();
//! assert!(matches!(spec.validate(), Err(SpecError::ChannelNames { .. })));
//! ```

use thiserror::Error;

/// Result type alias using [`SpecError`].
pub type Result<T> = std::result::Result<T, SpecError>;

/// Errors describing an inconsistent [`ImageSpec`](crate::ImageSpec).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SpecError {
    /// The spec declares no channels.
    #[error("image has no channels")]
    NoChannels,

    /// Data window has a zero dimension.
    #[error("invalid dimensions: {width}x{height}x{depth}")]
    InvalidDimensions {
        /// Data window width
        width: u32,
        /// Data window height
        height: u32,
        /// Data window depth
        depth: u32,
    },

    /// `channelnames` length disagrees with `nchannels`.
    #[error("expected {expected} channel names, got {got}")]
    ChannelNames {
        /// Declared channel count
        expected: u32,
        /// Number of names present
        got: usize,
    },

    /// `channelformats` is non-empty but not one entry per channel.
    #[error("expected {expected} channel formats, got {got}")]
    ChannelFormats {
        /// Declared channel count
        expected: u32,
        /// Number of formats present
        got: usize,
    },

    /// A designated alpha or depth channel index is out of range.
    #[error("{role} channel {index} out of range for {nchannels} channels")]
    ChannelIndex {
        /// "alpha" or "z"
        role: &'static str,
        /// Offending index
        index: usize,
        /// Declared channel count
        nchannels: u32,
    },

    /// Only some of the tile dimensions are set.
    #[error("invalid tile size {tile_width}x{tile_height}")]
    InvalidTileSize {
        /// Tile width
        tile_width: u32,
        /// Tile height
        tile_height: u32,
    },

    /// A window's far edge does not fit in an `i32` coordinate.
    #[error("{window} window extends past the i32 coordinate range")]
    WindowOutOfRange {
        /// "data", "display" or "tile" (data window rounded up to whole tiles)
        window: &'static str,
    },

    /// Buffer size arithmetic overflowed.
    #[error("image size overflows addressable memory")]
    Overflow,

    /// Unrecognized data type name.
    #[error("unknown data type: {0}")]
    UnknownType(String),
}
