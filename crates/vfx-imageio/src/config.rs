//! Per-object I/O configuration.
//!
//! Every [`ImageInput`](crate::ImageInput) and
//! [`ImageOutput`](crate::ImageOutput) carries an [`IoConfig`]. The defaults
//! are permissive enough for production plates while still refusing headers
//! that would allocate absurd buffers.
//!
//! # Example
//!
//! ```rust
//! use vfx_imageio::IoConfig;
//!
//! let config = IoConfig::default()
//!     .with_max_channels(16)
//!     .with_max_image_bytes(1 << 30)
//!     .with_max_tile_bytes(16 << 20)
//!     .with_try_all_readers(false);
//! assert_eq!(config.limits.max_channels, 16);
//! ```

use vfx_spec::ImageSpec;

/// Default channel count ceiling.
pub const DEFAULT_MAX_CHANNELS: u32 = 1024;

/// Default ceiling on the bytes of one sub-image (32 GiB).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 32 << 30;

/// Default ceiling on the bytes of one tile (256 MiB).
pub const DEFAULT_MAX_TILE_BYTES: u64 = 256 << 20;

/// Resource limits applied when a spec is bound at open time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Maximum channels per pixel.
    pub max_channels: u32,
    /// Maximum bytes of one sub-image in its native layout.
    pub max_image_bytes: u64,
    /// Maximum bytes of one tile in its native layout.
    pub max_tile_bytes: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_channels: DEFAULT_MAX_CHANNELS,
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_tile_bytes: DEFAULT_MAX_TILE_BYTES,
        }
    }
}

impl Limits {
    /// Returns a description of the first exceeded limit, if any.
    pub fn check(&self, spec: &ImageSpec) -> Option<String> {
        if spec.nchannels > self.max_channels {
            return Some(format!(
                "{} channels exceeds limit of {}",
                spec.nchannels, self.max_channels
            ));
        }
        let bytes = spec.image_bytes();
        if bytes > self.max_image_bytes {
            return Some(format!(
                "{bytes} bytes exceeds limit of {}",
                self.max_image_bytes
            ));
        }
        if spec.is_tiled() {
            let tile = (spec.tile_width as u64)
                .saturating_mul(spec.tile_height as u64)
                .saturating_mul(spec.tile_depth_or_one() as u64)
                .saturating_mul(spec.pixel_bytes() as u64);
            if tile > self.max_tile_bytes {
                return Some(format!(
                    "{tile} bytes per tile exceeds limit of {}",
                    self.max_tile_bytes
                ));
            }
        }
        None
    }
}

/// Behavior switches for one reader or writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoConfig {
    /// Resource limits.
    pub limits: Limits,
    /// When the extension's plugin rejects a file, retry with the plugin
    /// whose magic bytes match.
    pub try_all_readers: bool,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            limits: Limits::default(),
            try_all_readers: true,
        }
    }
}

impl IoConfig {
    /// Replaces all limits.
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the channel count ceiling.
    pub fn with_max_channels(mut self, max_channels: u32) -> Self {
        self.limits.max_channels = max_channels;
        self
    }

    /// Sets the per-sub-image byte ceiling.
    pub fn with_max_image_bytes(mut self, max_image_bytes: u64) -> Self {
        self.limits.max_image_bytes = max_image_bytes;
        self
    }

    /// Sets the per-tile byte ceiling.
    pub fn with_max_tile_bytes(mut self, max_tile_bytes: u64) -> Self {
        self.limits.max_tile_bytes = max_tile_bytes;
        self
    }

    /// Enables or disables the magic-byte fallback on open.
    pub fn with_try_all_readers(mut self, enabled: bool) -> Self {
        self.try_all_readers = enabled;
        self
    }
}
