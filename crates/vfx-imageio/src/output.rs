//! Format-agnostic image writer.
//!
//! [`ImageOutput`] drives a format plugin through a small state machine:
//!
//! ```text
//!            open / open_subimages            append_subimage
//! Closed ──────────────────────────► Open(0) ───────────────► Open(1) ...
//!   ▲                                   │                         │
//!   └──────────────── close ────────────┴─────────────────────────┘
//! ```
//!
//! While open, pixels go in as scanlines, tiles or whole images. All
//! coordinates are absolute: a crop whose data window starts at (32, 128)
//! writes its first scanline as `y = 128`. Caller buffers are converted to
//! the bound spec's stored layout before the plugin sees them.
//!
//! # Example
//!
//! ```rust,no_run
//! use vfx_imageio::{ImageOutput, IoResult};
//! use vfx_spec::{ImageSpec, TypeDesc};
//!
//! fn save(pixels: &[u8]) -> IoResult<()> {
//!     let mut out = ImageOutput::create("foo.tif")?;
//!     let spec = ImageSpec::new(320, 240, 3, TypeDesc::UInt8);
//!     out.open("foo.tif", &spec)?;
//!     out.write_image(TypeDesc::UInt8, pixels)?;
//!     out.close()
//! }
//! ```

use crate::buffer::{self, BufferFormat};
use crate::{
    Capability, FormatInfo, FormatRegistry, ImageInput, IoConfig, IoError, IoResult, OpenMode,
    OutputBackend,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use vfx_spec::{convert_pixels, layout_bytes, ImageSpec, Roi, Sample, TypeDesc};

#[derive(Debug)]
struct OpenState {
    path: PathBuf,
    subimage: usize,
    declared: usize,
}

/// Writer for one image file.
///
/// Obtained from [`ImageOutput::create`] (or a registry); unopened until
/// [`open`](Self::open). Dropping an open writer closes it, logging any
/// failure; call [`close`](Self::close) to observe errors.
pub struct ImageOutput {
    info: FormatInfo,
    backend: Box<dyn OutputBackend>,
    config: IoConfig,
    spec: ImageSpec,
    state: Option<OpenState>,
    scratch: Vec<u8>,
}

impl std::fmt::Debug for ImageOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageOutput")
            .field("format", &self.info.name)
            .field("state", &self.state)
            .field("spec", &format_args!("{}", self.spec))
            .finish()
    }
}

impl ImageOutput {
    /// Creates an unopened writer for a filename (by extension) or a format
    /// name, using the global registry.
    ///
    /// # Errors
    ///
    /// [`IoError::UnsupportedFormat`] when no plugin matches.
    pub fn create(path_or_name: &str) -> IoResult<Self> {
        FormatRegistry::global().create_output(path_or_name)
    }

    /// Like [`create`](Self::create) with an explicit configuration.
    pub fn create_with_config(path_or_name: &str, config: IoConfig) -> IoResult<Self> {
        Ok(Self::create(path_or_name)?.with_config(config))
    }

    /// Wraps a plugin backend directly.
    pub fn from_backend(info: FormatInfo, backend: Box<dyn OutputBackend>, config: IoConfig) -> Self {
        Self {
            info,
            backend,
            config,
            spec: ImageSpec::default(),
            state: None,
            scratch: Vec::new(),
        }
    }

    /// Replaces the configuration.
    pub fn with_config(mut self, config: IoConfig) -> Self {
        self.config = config;
        self
    }

    /// Active configuration.
    pub fn config(&self) -> &IoConfig {
        &self.config
    }

    /// Registry name of the plugin.
    pub fn format_name(&self) -> &'static str {
        self.info.name
    }

    /// Registry entry of the plugin.
    pub fn format_info(&self) -> &FormatInfo {
        &self.info
    }

    /// Capability query by canonical name; unknown names answer `false`.
    pub fn supports(&self, feature: &str) -> bool {
        self.info.supports_name(feature)
    }

    /// Capability query.
    pub fn supports_capability(&self, capability: Capability) -> bool {
        self.info.supports(capability)
    }

    /// Returns `true` between a successful open and close.
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    /// Spec bound to the current sub-image (as adjusted by the plugin).
    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    /// Index of the sub-image being written.
    pub fn current_subimage(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.subimage)
    }

    // === Opening ===

    /// Creates `path` and binds `spec` as sub-image 0.
    ///
    /// # Errors
    ///
    /// - [`IoError::Open`] for an invalid spec, exceeded limits or a file
    ///   that cannot be created
    /// - [`IoError::UnsupportedFeature`] for a tiled spec on a format without
    ///   tiles
    pub fn open(&mut self, path: impl AsRef<Path>, spec: &ImageSpec) -> IoResult<()> {
        self.open_subimages(path, std::slice::from_ref(spec))
    }

    /// Creates `path` declaring every sub-image up front and binds the first.
    ///
    /// Later sub-images are started with [`append_subimage`](Self::append_subimage).
    pub fn open_subimages(&mut self, path: impl AsRef<Path>, specs: &[ImageSpec]) -> IoResult<()> {
        let path = path.as_ref();
        if self.state.is_some() {
            self.close()?;
        }
        if specs.is_empty() {
            return Err(IoError::open(path, "no subimages given"));
        }
        if specs.len() > 1 && !self.supports_capability(Capability::MultiImage) {
            return Err(IoError::UnsupportedFeature(format!(
                "{} does not support multiple subimages",
                self.info.name
            )));
        }
        for spec in specs {
            self.check_spec(path, spec)?;
        }

        match self.backend.create(path, specs) {
            Ok(bound) => {
                debug!(
                    format = self.info.name,
                    path = %path.display(),
                    spec = %bound,
                    subimages = specs.len(),
                    "opened output"
                );
                self.spec = bound;
                self.state = Some(OpenState {
                    path: path.to_path_buf(),
                    subimage: 0,
                    declared: specs.len(),
                });
                Ok(())
            }
            Err(err) => {
                if let Err(close_err) = self.backend.close() {
                    warn!(path = %path.display(), error = %close_err, "cleanup after failed open");
                }
                Err(err)
            }
        }
    }

    /// [`open`](Self::open) or [`append_subimage`](Self::append_subimage),
    /// selected by `mode`.
    pub fn open_with_mode(&mut self, path: impl AsRef<Path>, spec: &ImageSpec, mode: OpenMode) -> IoResult<()> {
        let path = path.as_ref();
        match mode {
            OpenMode::Create => self.open(path, spec),
            OpenMode::AppendSubimage => {
                if let Some(state) = &self.state {
                    if state.path != path {
                        return Err(IoError::open(
                            path,
                            format!("cannot append: {} is open", state.path.display()),
                        ));
                    }
                }
                self.append_subimage(spec)
            }
        }
    }

    /// Finishes the current sub-image and binds `spec` as the next one.
    ///
    /// Needs `multiimage`; needs `appendsubimage` as well unless the next
    /// index was declared through [`open_subimages`](Self::open_subimages).
    pub fn append_subimage(&mut self, spec: &ImageSpec) -> IoResult<()> {
        let Some(state) = &self.state else {
            return Err(IoError::NotOpen("append_subimage: no file open".into()));
        };
        if !self.supports_capability(Capability::MultiImage) {
            return Err(IoError::UnsupportedFeature(format!(
                "{} does not support multiple subimages",
                self.info.name
            )));
        }
        let next = state.subimage + 1;
        if next >= state.declared && !self.supports_capability(Capability::AppendSubimage) {
            return Err(IoError::UnsupportedFeature(format!(
                "{} cannot append subimages beyond the {} declared at open",
                self.info.name, state.declared
            )));
        }
        let path = state.path.clone();
        self.check_spec(&path, spec)?;

        let bound = self.backend.append_subimage(spec)?;
        debug!(format = self.info.name, subimage = next, spec = %bound, "appended subimage");
        self.spec = bound;
        if let Some(state) = &mut self.state {
            state.subimage = next;
        }
        Ok(())
    }

    fn check_spec(&self, path: &Path, spec: &ImageSpec) -> IoResult<()> {
        spec.validate().map_err(|e| IoError::invalid_spec(path, e))?;
        if let Some(msg) = self.config.limits.check(spec) {
            return Err(IoError::open(path, msg));
        }
        if spec.is_tiled() && !self.supports_capability(Capability::Tiles) {
            return Err(IoError::UnsupportedFeature(format!(
                "{} does not support tiled images",
                self.info.name
            )));
        }
        Ok(())
    }

    // === Writing ===

    fn caller_layout(&self, op: &str, format: BufferFormat) -> IoResult<Vec<TypeDesc>> {
        if self.state.is_none() {
            return Err(IoError::NotOpen(format!("{op}: no file open")));
        }
        format.layout(&self.spec)
    }

    /// Writes scanline `y` of plane `z` from a buffer of `width` pixels.
    ///
    /// # Errors
    ///
    /// [`IoError::Geometry`] when the image is tiled, the coordinates fall
    /// outside the data window, or the buffer is short.
    pub fn write_scanline(&mut self, y: i32, z: i32, format: impl Into<BufferFormat>, data: &[u8]) -> IoResult<()> {
        let layout = self.caller_layout("write_scanline", format.into())?;
        self.put_scanline(y, z, &layout, data)
    }

    /// Writes scanlines `[ybegin, yend)` of plane `z` from one contiguous buffer.
    pub fn write_scanlines(
        &mut self,
        ybegin: i32,
        yend: i32,
        z: i32,
        format: impl Into<BufferFormat>,
        data: &[u8],
    ) -> IoResult<()> {
        let layout = self.caller_layout("write_scanlines", format.into())?;
        if yend < ybegin {
            return Err(IoError::geometry(format!("empty scanline range [{ybegin}, {yend})")));
        }
        let row = self.spec.width as usize * layout_bytes(&layout);
        buffer::check_len("scanlines", data.len(), (yend - ybegin) as usize * row)?;
        trace!(ybegin, yend, z, "write_scanlines");
        for (i, y) in (ybegin..yend).enumerate() {
            self.put_scanline(y, z, &layout, &data[i * row..(i + 1) * row])?;
        }
        Ok(())
    }

    fn put_scanline(&mut self, y: i32, z: i32, layout: &[TypeDesc], data: &[u8]) -> IoResult<()> {
        let spec = &self.spec;
        if spec.is_tiled() {
            return Err(IoError::geometry("scanline write to a tiled image"));
        }
        let roi = spec.roi();
        if y < roi.ybegin || y >= roi.yend || z < roi.zbegin || z >= roi.zend {
            return Err(IoError::geometry(format!(
                "scanline y={y} z={z} outside data window {roi}"
            )));
        }
        let width = spec.width as usize;
        buffer::check_len("scanline", data.len(), width * layout_bytes(layout))?;

        self.scratch.resize(spec.scanline_bytes(), 0);
        convert_pixels(data, layout, &mut self.scratch, &spec.channel_layout(), width);
        self.backend.write_scanline(y, z, &self.scratch)
    }

    /// Writes the tile whose corner is `(x, y, z)` from a buffer of one full
    /// tile, even at the right and bottom edges.
    ///
    /// # Errors
    ///
    /// [`IoError::Geometry`] when the image is not tiled, the corner is not
    /// tile-aligned inside the data window, or the buffer is short.
    pub fn write_tile(&mut self, x: i32, y: i32, z: i32, format: impl Into<BufferFormat>, data: &[u8]) -> IoResult<()> {
        let layout = self.caller_layout("write_tile", format.into())?;
        self.put_tile(x, y, z, &layout, data)
    }

    /// Writes every tile of a whole-tile region from one contiguous buffer
    /// covering exactly that region.
    #[allow(clippy::too_many_arguments)]
    pub fn write_tiles(
        &mut self,
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        zbegin: i32,
        zend: i32,
        format: impl Into<BufferFormat>,
        data: &[u8],
    ) -> IoResult<()> {
        let layout = self.caller_layout("write_tiles", format.into())?;
        self.put_tiles(&Roi::new(xbegin, xend, ybegin, yend, zbegin, zend), &layout, data)
    }

    fn put_tile(&mut self, x: i32, y: i32, z: i32, layout: &[TypeDesc], data: &[u8]) -> IoResult<()> {
        let spec = &self.spec;
        if !spec.is_tiled() {
            return Err(IoError::geometry("tile write to a scanline image"));
        }
        buffer::check_tile_corner(spec, x, y, z)?;
        let npixels = spec.tile_pixels();
        buffer::check_len("tile", data.len(), npixels * layout_bytes(layout))?;

        self.scratch.resize(spec.tile_bytes(), 0);
        convert_pixels(data, layout, &mut self.scratch, &spec.channel_layout(), npixels);
        trace!(x, y, z, "write_tile");
        self.backend.write_tile(x, y, z, &self.scratch)
    }

    fn put_tiles(&mut self, region: &Roi, layout: &[TypeDesc], data: &[u8]) -> IoResult<()> {
        let spec = &self.spec;
        if !spec.is_tiled() {
            return Err(IoError::geometry("tile write to a scanline image"));
        }
        let r = region;
        if !spec.valid_tile_range(r.xbegin, r.xend, r.ybegin, r.yend, r.zbegin, r.zend) {
            return Err(IoError::geometry(format!(
                "{region} is not a whole-tile range of data window {}",
                spec.roi()
            )));
        }
        let pixel_bytes = layout_bytes(layout);
        buffer::check_len("tiles", data.len(), region.npixels() as usize * pixel_bytes)?;

        let mut tile = vec![0u8; spec.tile_pixels() * pixel_bytes];
        let corners: Vec<_> = buffer::tile_corners(spec, region).collect();
        for (x, y, z) in corners {
            let extent = buffer::tile_extent(&self.spec, x, y, z);
            let Some(clip) = extent.intersect(region) else {
                continue;
            };
            tile.fill(0);
            buffer::copy_region(data, region, &mut tile, &extent, &clip, pixel_bytes);
            self.put_tile(x, y, z, layout, &tile)?;
        }
        Ok(())
    }

    /// Writes the whole data window from one contiguous buffer.
    ///
    /// Issues the same scanline or tile calls a caller would, so the file is
    /// identical to one written piecewise.
    pub fn write_image(&mut self, format: impl Into<BufferFormat>, data: &[u8]) -> IoResult<()> {
        let layout = self.caller_layout("write_image", format.into())?;
        let pixel_bytes = layout_bytes(&layout);
        buffer::check_len(
            "image",
            data.len(),
            self.spec.image_pixels() as usize * pixel_bytes,
        )?;
        let roi = self.spec.roi();
        if self.spec.is_tiled() {
            return self.put_tiles(&roi, &layout, data);
        }
        let row = roi.width() as usize * pixel_bytes;
        let mut offset = 0;
        for z in roi.zbegin..roi.zend {
            for y in roi.ybegin..roi.yend {
                self.put_scanline(y, z, &layout, &data[offset..offset + row])?;
                offset += row;
            }
        }
        Ok(())
    }

    /// Typed [`write_scanline`](Self::write_scanline).
    pub fn write_scanline_samples<T: Sample>(&mut self, y: i32, z: i32, data: &[T]) -> IoResult<()> {
        self.write_scanline(y, z, T::TYPE, bytemuck::cast_slice(data))
    }

    /// Typed [`write_tile`](Self::write_tile).
    pub fn write_tile_samples<T: Sample>(&mut self, x: i32, y: i32, z: i32, data: &[T]) -> IoResult<()> {
        self.write_tile(x, y, z, T::TYPE, bytemuck::cast_slice(data))
    }

    /// Typed [`write_image`](Self::write_image).
    pub fn write_image_samples<T: Sample>(&mut self, data: &[T]) -> IoResult<()> {
        self.write_image(T::TYPE, bytemuck::cast_slice(data))
    }

    /// Copies the current sub-image of `input` into the current sub-image.
    ///
    /// Sizes and channel counts must match; pixel types convert as usual.
    pub fn copy_image(&mut self, input: &mut ImageInput) -> IoResult<()> {
        if self.state.is_none() {
            return Err(IoError::NotOpen("copy_image: no file open".into()));
        }
        let src = input.spec();
        let dst = &self.spec;
        if (src.width, src.height, src.depth, src.nchannels)
            != (dst.width, dst.height, dst.depth, dst.nchannels)
        {
            return Err(IoError::geometry(format!("cannot copy {src} into {dst}")));
        }
        let layout = src.channel_layout();
        let mut pixels = vec![0u8; src.image_bytes() as usize];
        input.read_image(BufferFormat::Native, &mut pixels)?;
        self.write_image(BufferFormat::PerChannel(layout), &pixels)
    }

    // === Closing ===

    /// Finalizes the file and releases it.
    ///
    /// Idempotent: closing a closed writer succeeds. The writer is closed
    /// afterwards even when flushing fails.
    pub fn close(&mut self) -> IoResult<()> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };
        self.scratch = Vec::new();
        let result = self.backend.close();
        debug!(
            format = self.info.name,
            path = %state.path.display(),
            subimages = state.subimage + 1,
            ok = result.is_ok(),
            "closed output"
        );
        result
    }
}

impl Drop for ImageOutput {
    fn drop(&mut self) {
        if self.state.is_some() {
            if let Err(err) = self.close() {
                warn!(format = self.info.name, error = %err, "failed to close image output on drop");
            }
        }
    }
}
