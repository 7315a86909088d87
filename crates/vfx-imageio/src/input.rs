//! Format-agnostic image reader.
//!
//! [`ImageInput`] mirrors [`ImageOutput`](crate::ImageOutput): open a file,
//! inspect its [`ImageSpec`], move between sub-images by index, and read
//! scanlines, tiles or the whole data window converted to the caller's
//! buffer type.
//!
//! Scanline reads of a tiled file are served from the covering tiles. Tile
//! reads always fill a full tile; pixels beyond the data window read as zero.
//!
//! # Example
//!
//! ```rust,no_run
//! use vfx_imageio::{ImageInput, IoResult};
//!
//! fn load(path: &str) -> IoResult<Vec<f32>> {
//!     let mut input = ImageInput::open_file(path)?;
//!     println!("{}", input.spec());
//!     input.read_image_vec::<f32>()
//! }
//! ```

use crate::buffer::{self, BufferFormat};
use crate::{Capability, FormatInfo, FormatRegistry, InputBackend, IoConfig, IoError, IoResult};
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::{debug, trace, warn};
use vfx_spec::{convert_pixels, layout_bytes, ImageSpec, Roi, Sample, TypeDesc};

/// Bytes read for magic-number detection.
const HEADER_PROBE_LEN: u64 = 64;

#[derive(Debug)]
struct OpenState {
    path: PathBuf,
    subimage: usize,
    nsubimages: usize,
}

/// Reader for one image file.
pub struct ImageInput {
    info: FormatInfo,
    backend: Box<dyn InputBackend>,
    config: IoConfig,
    spec: ImageSpec,
    state: Option<OpenState>,
    scratch: Vec<u8>,
    /// One stored tile, reused when scanlines are read from a tiled file.
    tile: Vec<u8>,
}

impl std::fmt::Debug for ImageInput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImageInput")
            .field("format", &self.info.name)
            .field("state", &self.state)
            .field("spec", &format_args!("{}", self.spec))
            .finish()
    }
}

fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let mut header = Vec::new();
    std::fs::File::open(path)?
        .take(HEADER_PROBE_LEN)
        .read_to_end(&mut header)?;
    Ok(header)
}

impl ImageInput {
    /// Creates an unopened reader for a filename (by extension) or a format
    /// name, using the global registry.
    pub fn create(path_or_name: &str) -> IoResult<Self> {
        FormatRegistry::global().create_input(path_or_name)
    }

    /// Like [`create`](Self::create) with an explicit configuration.
    pub fn create_with_config(path_or_name: &str, config: IoConfig) -> IoResult<Self> {
        Ok(Self::create(path_or_name)?.with_config(config))
    }

    /// Creates a reader for `path` and opens it.
    pub fn open_file(path: impl AsRef<Path>) -> IoResult<Self> {
        Self::open_file_with_config(path, IoConfig::default())
    }

    /// Creates a reader for `path` and opens it.
    ///
    /// With [`IoConfig::try_all_readers`], a file the extension's plugin
    /// rejects (or whose extension is unknown) is retried with the plugin
    /// whose magic bytes match.
    pub fn open_file_with_config(path: impl AsRef<Path>, config: IoConfig) -> IoResult<Self> {
        let path = path.as_ref();
        let registry = FormatRegistry::global();
        let name = path.to_string_lossy();

        let mut tried = None;
        let err = match registry.create_input(&name) {
            Ok(input) => {
                let mut input = input.with_config(config);
                tried = Some(input.format_name());
                match input.open(path) {
                    Ok(_) => return Ok(input),
                    Err(err) => err,
                }
            }
            Err(err) => err,
        };
        if !config.try_all_readers {
            return Err(err);
        }

        let Ok(header) = read_header(path) else {
            return Err(err);
        };
        let Some(detected) = registry.detect_format(&header).filter(|d| Some(*d) != tried) else {
            return Err(err);
        };
        debug!(path = %path.display(), format = detected, error = %err, "retrying with detected format");
        let mut input = registry.create_input(detected)?.with_config(config);
        input.open(path)?;
        Ok(input)
    }

    /// Wraps a plugin backend directly.
    pub fn from_backend(info: FormatInfo, backend: Box<dyn InputBackend>, config: IoConfig) -> Self {
        Self {
            info,
            backend,
            config,
            spec: ImageSpec::default(),
            state: None,
            scratch: Vec::new(),
            tile: Vec::new(),
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

    /// Returns `true` if the file header carries this plugin's magic bytes.
    pub fn valid_file(&self, path: impl AsRef<Path>) -> bool {
        read_header(path.as_ref()).is_ok_and(|h| (self.info.can_read)(&h))
    }

    /// Returns `true` between a successful open and close.
    pub fn is_open(&self) -> bool {
        self.state.is_some()
    }

    // === Opening and navigation ===

    /// Opens `path` at sub-image 0 and returns its spec.
    ///
    /// # Errors
    ///
    /// [`IoError::Open`] when the file is missing, malformed, or exceeds the
    /// configured limits. The reader stays closed.
    pub fn open(&mut self, path: impl AsRef<Path>) -> IoResult<ImageSpec> {
        let path = path.as_ref();
        if self.state.is_some() {
            self.close()?;
        }
        let spec = match self.backend.open(path).and_then(|s| self.admit(path, s)) {
            Ok(spec) => spec,
            Err(err) => {
                self.release(path);
                return Err(err);
            }
        };
        let nsubimages = self.backend.num_subimages();
        debug!(
            format = self.info.name,
            path = %path.display(),
            spec = %spec,
            subimages = nsubimages,
            "opened input"
        );
        self.spec = spec.clone();
        self.state = Some(OpenState {
            path: path.to_path_buf(),
            subimage: 0,
            nsubimages,
        });
        Ok(spec)
    }

    fn admit(&self, path: &Path, spec: ImageSpec) -> IoResult<ImageSpec> {
        spec.validate()
            .map_err(|e| IoError::open(path, format!("malformed header: {e}")))?;
        if let Some(msg) = self.config.limits.check(&spec) {
            return Err(IoError::open(path, msg));
        }
        Ok(spec)
    }

    fn release(&mut self, path: &Path) {
        if let Err(err) = self.backend.close() {
            warn!(path = %path.display(), error = %err, "cleanup after failed open");
        }
    }

    /// Spec of the current sub-image.
    pub fn spec(&self) -> &ImageSpec {
        &self.spec
    }

    /// Spec of sub-image `index` without moving away from the current one.
    ///
    /// `Ok(None)` if the file has no such sub-image.
    pub fn spec_at(&mut self, index: usize) -> IoResult<Option<ImageSpec>> {
        let current = self.open_state("spec_at")?.subimage;
        if index == current {
            return Ok(Some(self.spec.clone()));
        }
        let spec = self.backend.seek_subimage(index)?;
        self.backend.seek_subimage(current)?;
        Ok(spec)
    }

    /// Moves to sub-image `index`; `Ok(false)` if there is no such index,
    /// leaving the current sub-image in place.
    pub fn seek_subimage(&mut self, index: usize) -> IoResult<bool> {
        let state = self.open_state("seek_subimage")?;
        let current = state.subimage;
        let path = state.path.clone();
        if index == current {
            return Ok(true);
        }
        let Some(spec) = self.backend.seek_subimage(index)? else {
            return Ok(false);
        };
        let spec = match self.admit(&path, spec) {
            Ok(spec) => spec,
            Err(err) => {
                self.backend.seek_subimage(current)?;
                return Err(err);
            }
        };
        debug!(subimage = index, spec = %spec, "seek_subimage");
        self.spec = spec;
        if let Some(state) = &mut self.state {
            state.subimage = index;
        }
        Ok(true)
    }

    /// Index of the current sub-image.
    pub fn current_subimage(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.subimage)
    }

    /// Number of sub-images in the open file (0 when closed).
    pub fn num_subimages(&self) -> usize {
        self.state.as_ref().map_or(0, |s| s.nsubimages)
    }

    fn open_state(&self, op: &str) -> IoResult<&OpenState> {
        self.state
            .as_ref()
            .ok_or_else(|| IoError::NotOpen(format!("{op}: no file open")))
    }

    fn caller_layout(&self, op: &str, format: BufferFormat) -> IoResult<Vec<TypeDesc>> {
        self.open_state(op)?;
        format.layout(&self.spec)
    }

    // === Reading ===

    /// Reads scanline `y` of plane `z` into a buffer of `width` pixels.
    ///
    /// # Errors
    ///
    /// [`IoError::Geometry`] when the coordinates fall outside the data
    /// window or the buffer is short.
    pub fn read_scanline(&mut self, y: i32, z: i32, format: impl Into<BufferFormat>, out: &mut [u8]) -> IoResult<()> {
        let layout = self.caller_layout("read_scanline", format.into())?;
        self.get_scanline(y, z, &layout, out)
    }

    /// Reads scanlines `[ybegin, yend)` of plane `z` into one contiguous buffer.
    pub fn read_scanlines(
        &mut self,
        ybegin: i32,
        yend: i32,
        z: i32,
        format: impl Into<BufferFormat>,
        out: &mut [u8],
    ) -> IoResult<()> {
        let layout = self.caller_layout("read_scanlines", format.into())?;
        if yend < ybegin {
            return Err(IoError::geometry(format!("empty scanline range [{ybegin}, {yend})")));
        }
        let row = self.spec.width as usize * layout_bytes(&layout);
        buffer::check_len("scanlines", out.len(), (yend - ybegin) as usize * row)?;
        trace!(ybegin, yend, z, "read_scanlines");
        for (i, y) in (ybegin..yend).enumerate() {
            self.get_scanline(y, z, &layout, &mut out[i * row..(i + 1) * row])?;
        }
        Ok(())
    }

    fn get_scanline(&mut self, y: i32, z: i32, layout: &[TypeDesc], out: &mut [u8]) -> IoResult<()> {
        let spec = &self.spec;
        let roi = spec.roi();
        if y < roi.ybegin || y >= roi.yend || z < roi.zbegin || z >= roi.zend {
            return Err(IoError::geometry(format!(
                "scanline y={y} z={z} outside data window {roi}"
            )));
        }
        let width = spec.width as usize;
        buffer::check_len("scanline", out.len(), width * layout_bytes(layout))?;

        self.scratch.resize(spec.scanline_bytes(), 0);
        if spec.is_tiled() {
            // Assemble the row from the tiles that cover it.
            let pixel_bytes = spec.pixel_bytes();
            let (tw, th, td) = (
                spec.tile_width as i32,
                spec.tile_height as i32,
                spec.tile_depth_or_one() as i32,
            );
            let ty = spec.y + (y - spec.y) / th * th;
            let tz = spec.z + (z - spec.z) / td * td;
            let row_extent = Roi::new(roi.xbegin, roi.xend, y, y + 1, z, z + 1);
            self.tile.resize(spec.tile_bytes(), 0);
            for tx in (roi.xbegin..roi.xend).step_by(tw as usize) {
                self.backend.read_tile(tx, ty, tz, &mut self.tile)?;
                let extent = buffer::tile_extent(spec, tx, ty, tz);
                let clip = Roi::new(tx, tx.saturating_add(tw).min(roi.xend), y, y + 1, z, z + 1);
                buffer::copy_region(&self.tile, &extent, &mut self.scratch, &row_extent, &clip, pixel_bytes);
            }
        } else {
            self.backend.read_scanline(y, z, &mut self.scratch)?;
        }
        convert_pixels(&self.scratch, &spec.channel_layout(), out, layout, width);
        Ok(())
    }

    /// Reads the tile whose corner is `(x, y, z)` into a buffer of one full
    /// tile; pixels beyond the data window are zero.
    ///
    /// # Errors
    ///
    /// [`IoError::Geometry`] when the file is scanline-organized, the corner
    /// is not tile-aligned inside the data window, or the buffer is short.
    pub fn read_tile(&mut self, x: i32, y: i32, z: i32, format: impl Into<BufferFormat>, out: &mut [u8]) -> IoResult<()> {
        let layout = self.caller_layout("read_tile", format.into())?;
        self.get_tile(x, y, z, &layout, out)
    }

    /// Reads every tile of a whole-tile region into one contiguous buffer
    /// covering exactly that region.
    #[allow(clippy::too_many_arguments)]
    pub fn read_tiles(
        &mut self,
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        zbegin: i32,
        zend: i32,
        format: impl Into<BufferFormat>,
        out: &mut [u8],
    ) -> IoResult<()> {
        let layout = self.caller_layout("read_tiles", format.into())?;
        self.get_tiles(&Roi::new(xbegin, xend, ybegin, yend, zbegin, zend), &layout, out)
    }

    fn get_tile(&mut self, x: i32, y: i32, z: i32, layout: &[TypeDesc], out: &mut [u8]) -> IoResult<()> {
        let spec = &self.spec;
        if !spec.is_tiled() {
            return Err(IoError::geometry("tile read from a scanline image"));
        }
        buffer::check_tile_corner(spec, x, y, z)?;
        let npixels = spec.tile_pixels();
        let pixel_bytes = layout_bytes(layout);
        buffer::check_len("tile", out.len(), npixels * pixel_bytes)?;

        self.scratch.clear();
        self.scratch.resize(spec.tile_bytes(), 0);
        self.backend.read_tile(x, y, z, &mut self.scratch)?;
        convert_pixels(&self.scratch, &spec.channel_layout(), out, layout, npixels);
        let extent = buffer::tile_extent(spec, x, y, z);
        buffer::zero_outside(out, &extent, &spec.roi(), pixel_bytes);
        trace!(x, y, z, "read_tile");
        Ok(())
    }

    fn get_tiles(&mut self, region: &Roi, layout: &[TypeDesc], out: &mut [u8]) -> IoResult<()> {
        let spec = &self.spec;
        if !spec.is_tiled() {
            return Err(IoError::geometry("tile read from a scanline image"));
        }
        let r = region;
        if !spec.valid_tile_range(r.xbegin, r.xend, r.ybegin, r.yend, r.zbegin, r.zend) {
            return Err(IoError::geometry(format!(
                "{region} is not a whole-tile range of data window {}",
                spec.roi()
            )));
        }
        let pixel_bytes = layout_bytes(layout);
        buffer::check_len("tiles", out.len(), region.npixels() as usize * pixel_bytes)?;

        let mut tile = vec![0u8; spec.tile_pixels() * pixel_bytes];
        let corners: Vec<_> = buffer::tile_corners(spec, region).collect();
        for (x, y, z) in corners {
            self.get_tile(x, y, z, layout, &mut tile)?;
            let extent = buffer::tile_extent(&self.spec, x, y, z);
            if let Some(clip) = extent.intersect(region) {
                buffer::copy_region(&tile, &extent, out, region, &clip, pixel_bytes);
            }
        }
        Ok(())
    }

    /// Reads the whole data window of the current sub-image.
    pub fn read_image(&mut self, format: impl Into<BufferFormat>, out: &mut [u8]) -> IoResult<()> {
        let layout = self.caller_layout("read_image", format.into())?;
        let pixel_bytes = layout_bytes(&layout);
        buffer::check_len(
            "image",
            out.len(),
            self.spec.image_pixels() as usize * pixel_bytes,
        )?;
        let roi = self.spec.roi();
        if self.spec.is_tiled() {
            return self.get_tiles(&roi, &layout, out);
        }
        let row = roi.width() as usize * pixel_bytes;
        let mut offset = 0;
        for z in roi.zbegin..roi.zend {
            for y in roi.ybegin..roi.yend {
                self.get_scanline(y, z, &layout, &mut out[offset..offset + row])?;
                offset += row;
            }
        }
        Ok(())
    }

    /// Typed [`read_scanline`](Self::read_scanline).
    pub fn read_scanline_samples<T: Sample>(&mut self, y: i32, z: i32, out: &mut [T]) -> IoResult<()> {
        self.read_scanline(y, z, T::TYPE, bytemuck::cast_slice_mut(out))
    }

    /// Typed [`read_tile`](Self::read_tile).
    pub fn read_tile_samples<T: Sample>(&mut self, x: i32, y: i32, z: i32, out: &mut [T]) -> IoResult<()> {
        self.read_tile(x, y, z, T::TYPE, bytemuck::cast_slice_mut(out))
    }

    /// Typed [`read_image`](Self::read_image).
    pub fn read_image_samples<T: Sample>(&mut self, out: &mut [T]) -> IoResult<()> {
        self.read_image(T::TYPE, bytemuck::cast_slice_mut(out))
    }

    /// Reads the whole data window into a new vector of `T`.
    pub fn read_image_vec<T: Sample>(&mut self) -> IoResult<Vec<T>> {
        let len = self.spec.image_pixels() as usize * self.spec.nchannels as usize;
        let mut pixels = vec![T::default(); len];
        self.read_image_samples(&mut pixels)?;
        Ok(pixels)
    }

    // === Closing ===

    /// Releases the file. Idempotent.
    pub fn close(&mut self) -> IoResult<()> {
        let Some(state) = self.state.take() else {
            return Ok(());
        };
        self.scratch = Vec::new();
        self.tile = Vec::new();
        let result = self.backend.close();
        debug!(format = self.info.name, path = %state.path.display(), "closed input");
        result
    }
}

impl Drop for ImageInput {
    fn drop(&mut self) {
        if self.state.is_some() {
            if let Err(err) = self.close() {
                warn!(format = self.info.name, error = %err, "failed to close image input on drop");
            }
        }
    }
}
