//! Plugin contract for concrete file formats.
//!
//! A format plugin implements [`OutputBackend`] and/or [`InputBackend`] and
//! publishes factories for them through a [`FormatInfo`](crate::FormatInfo).
//! The core ([`ImageOutput`](crate::ImageOutput) /
//! [`ImageInput`](crate::ImageInput)) owns the state machine, validates
//! every spec and coordinate, and converts caller buffers, so a backend only
//! ever sees:
//!
//! - specs that passed [`ImageSpec::validate`] and the configured limits,
//! - absolute coordinates inside the bound data window, tile-aligned for
//!   tile calls,
//! - buffers in the bound spec's native per-channel layout: exactly one
//!   scanline for scanline calls, one full tile (including any part beyond
//!   the data window) for tile calls.
//!
//! ```text
//! caller ──► ImageOutput ──(native bytes)──► dyn OutputBackend ──► file
//! caller ◄── ImageInput  ◄─(native bytes)─── dyn InputBackend  ◄── file
//! ```

use crate::{IoError, IoResult};
use std::path::Path;
use vfx_spec::ImageSpec;

/// How [`ImageOutput::open_with_mode`](crate::ImageOutput::open_with_mode)
/// treats the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OpenMode {
    /// Create or truncate the file and bind sub-image 0.
    #[default]
    Create,
    /// Finish the current sub-image and bind the next one.
    AppendSubimage,
}

/// Writing half of a format plugin.
pub trait OutputBackend: Send {
    /// Registry name of the format.
    fn format_name(&self) -> &'static str;

    /// Creates (or truncates) `path` and binds `subimages[0]`.
    ///
    /// `subimages` holds every sub-image the caller declared up front; it is
    /// never empty. Returns the spec actually bound, which may differ from the
    /// request where the format cannot store something (pixel type, origin).
    fn create(&mut self, path: &Path, subimages: &[ImageSpec]) -> IoResult<ImageSpec>;

    /// Finalizes the current sub-image and binds `spec` as the next one.
    fn append_subimage(&mut self, spec: &ImageSpec) -> IoResult<ImageSpec> {
        let _ = spec;
        Err(IoError::UnsupportedFeature(format!(
            "{} cannot append subimages",
            self.format_name()
        )))
    }

    /// Stores one scanline of native pixels.
    fn write_scanline(&mut self, y: i32, z: i32, data: &[u8]) -> IoResult<()>;

    /// Stores one tile of native pixels whose corner is `(x, y, z)`.
    fn write_tile(&mut self, x: i32, y: i32, z: i32, data: &[u8]) -> IoResult<()> {
        let _ = (x, y, z, data);
        Err(IoError::UnsupportedFeature(format!(
            "{} does not support tiles",
            self.format_name()
        )))
    }

    /// Flushes and releases the file. Must release the handle even when
    /// flushing fails, and must be a no-op when nothing is open.
    fn close(&mut self) -> IoResult<()>;
}

/// Reading half of a format plugin.
pub trait InputBackend: Send {
    /// Registry name of the format.
    fn format_name(&self) -> &'static str;

    /// Opens `path` positioned at sub-image 0 and returns its spec.
    fn open(&mut self, path: &Path) -> IoResult<ImageSpec>;

    /// Number of sub-images in the open file.
    fn num_subimages(&self) -> usize;

    /// Moves to sub-image `index`; `Ok(None)` if there is no such index.
    fn seek_subimage(&mut self, index: usize) -> IoResult<Option<ImageSpec>>;

    /// Reads one scanline of native pixels into `out`.
    fn read_scanline(&mut self, y: i32, z: i32, out: &mut [u8]) -> IoResult<()>;

    /// Reads one full tile of native pixels whose corner is `(x, y, z)`.
    fn read_tile(&mut self, x: i32, y: i32, z: i32, out: &mut [u8]) -> IoResult<()> {
        let _ = (x, y, z, out);
        Err(IoError::UnsupportedFeature(format!(
            "{} does not support tiles",
            self.format_name()
        )))
    }

    /// Releases the file; a no-op when nothing is open.
    fn close(&mut self) -> IoResult<()>;
}
