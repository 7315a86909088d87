//! Image specification: geometry, pixel layout and metadata.
//!
//! [`ImageSpec`] is the value type exchanged between callers and image
//! readers/writers. It describes one image (or one sub-image of a file):
//! where its pixels live, how each channel is stored, how it is organized on
//! disk (scanlines or tiles) and what metadata accompanies it.
//!
//! # Data vs display window
//!
//! The data window (`x, y, z, width, height, depth`) is the region actually
//! stored. The display window (`full_*`) is the logical canvas the image
//! belongs to. The two are independent: a crop stores a small data window
//! inside a large display window, overscan stores a data window larger than
//! the display window.
//!
//! ```text
//! ┌─────────────────────────────┐
//! │        Display Window       │
//! │   ┌───────────────────┐     │
//! │   │    Data Window    │     │
//! │   │   (actual pixels) │     │
//! │   └───────────────────┘     │
//! └─────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```rust
//! use vfx_spec::{ImageSpec, TypeDesc};
//!
//! let mut spec = ImageSpec::new(16, 16, 3, TypeDesc::UInt8);
//! spec.full_width = 640;
//! spec.full_height = 480;
//! spec.x = 32;
//! spec.y = 128;
//! spec.attribute("Artist", "VFX Artist");
//!
//! assert_eq!(spec.scanline_bytes(), 48);
//! assert_eq!(spec.get_string_attribute("Artist", ""), "VFX Artist");
//! assert!(spec.validate().is_ok());
//! ```

use crate::attrs::{AttrValue, Attrs};
use crate::error::{Result, SpecError};
use crate::roi::Roi;
use crate::typedesc::TypeDesc;

/// Complete description of one image.
///
/// Cheap to clone relative to pixel data; copied freely between callers and
/// I/O objects.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ImageSpec {
    /// Data window origin, x
    pub x: i32,
    /// Data window origin, y
    pub y: i32,
    /// Data window origin, z
    pub z: i32,
    /// Data window width in pixels
    pub width: u32,
    /// Data window height in pixels
    pub height: u32,
    /// Data window depth (1 for 2D images)
    pub depth: u32,
    /// Display window origin, x
    pub full_x: i32,
    /// Display window origin, y
    pub full_y: i32,
    /// Display window origin, z
    pub full_z: i32,
    /// Display window width
    pub full_width: u32,
    /// Display window height
    pub full_height: u32,
    /// Display window depth
    pub full_depth: u32,
    /// Tile width; 0 for scanline images
    pub tile_width: u32,
    /// Tile height; 0 for scanline images
    pub tile_height: u32,
    /// Tile depth; 0 or 1 for 2D tiles
    pub tile_depth: u32,
    /// Number of channels per pixel
    pub nchannels: u32,
    /// Uniform channel type, used when `channelformats` is empty
    pub format: TypeDesc,
    /// Per-channel types; empty when every channel uses `format`
    pub channelformats: Vec<TypeDesc>,
    /// Channel names, one per channel
    pub channelnames: Vec<String>,
    /// Index of the alpha channel
    pub alpha_channel: Option<usize>,
    /// Index of the depth channel
    pub z_channel: Option<usize>,
    /// Arbitrary named metadata
    pub extra_attribs: Attrs,
}

impl ImageSpec {
    /// Creates a 2D scanline spec with the display window equal to the data
    /// window and default channel names.
    pub fn new(width: u32, height: u32, nchannels: u32, format: TypeDesc) -> Self {
        let mut spec = Self {
            x: 0,
            y: 0,
            z: 0,
            width,
            height,
            depth: 1,
            full_x: 0,
            full_y: 0,
            full_z: 0,
            full_width: width,
            full_height: height,
            full_depth: 1,
            tile_width: 0,
            tile_height: 0,
            tile_depth: 0,
            nchannels,
            format,
            channelformats: Vec::new(),
            channelnames: Vec::new(),
            alpha_channel: None,
            z_channel: None,
            extra_attribs: Attrs::new(),
        };
        spec.default_channel_names();
        spec
    }

    /// Resets channel names to `Y` for one channel, otherwise
    /// `R, G, B, A, channel4, ...`, and designates alpha when present.
    pub fn default_channel_names(&mut self) {
        self.channelnames.clear();
        self.alpha_channel = None;
        self.z_channel = None;
        if self.nchannels == 1 {
            self.channelnames.push("Y".into());
            return;
        }
        for c in 0..self.nchannels as usize {
            let name = match c {
                0 => "R".to_string(),
                1 => "G".to_string(),
                2 => "B".to_string(),
                3 => "A".to_string(),
                _ => format!("channel{c}"),
            };
            self.channelnames.push(name);
        }
        if self.nchannels >= 4 {
            self.alpha_channel = Some(3);
        }
    }

    /// Sets a uniform channel format and clears per-channel formats.
    pub fn set_format(&mut self, format: TypeDesc) {
        self.format = format;
        self.channelformats.clear();
    }

    /// Storage type of channel `c`.
    #[inline]
    pub fn channelformat(&self, c: usize) -> TypeDesc {
        self.channelformats.get(c).copied().unwrap_or(self.format)
    }

    /// Storage type of every channel, in order.
    pub fn channel_layout(&self) -> Vec<TypeDesc> {
        (0..self.nchannels as usize).map(|c| self.channelformat(c)).collect()
    }

    /// Bytes for one sample of channel `c`.
    #[inline]
    pub fn channel_bytes(&self, c: usize) -> usize {
        self.channelformat(c).size()
    }

    /// Bytes per pixel in the stored layout.
    pub fn pixel_bytes(&self) -> usize {
        if self.channelformats.is_empty() {
            self.nchannels as usize * self.format.size()
        } else {
            self.channelformats.iter().map(TypeDesc::size).sum()
        }
    }

    /// Bytes per pixel when every channel is `format`.
    #[inline]
    pub fn pixel_bytes_as(&self, format: TypeDesc) -> usize {
        self.nchannels as usize * format.size()
    }

    /// Bytes per scanline in the stored layout.
    #[inline]
    pub fn scanline_bytes(&self) -> usize {
        self.width as usize * self.pixel_bytes()
    }

    /// Bytes per scanline when every channel is `format`.
    #[inline]
    pub fn scanline_bytes_as(&self, format: TypeDesc) -> usize {
        self.width as usize * self.pixel_bytes_as(format)
    }

    /// Returns `true` if the image is tile-organized.
    #[inline]
    pub fn is_tiled(&self) -> bool {
        self.tile_width != 0 && self.tile_height != 0
    }

    /// Tile depth with 0 read as 1.
    #[inline]
    pub fn tile_depth_or_one(&self) -> u32 {
        self.tile_depth.max(1)
    }

    /// Pixels per tile (0 for scanline images).
    #[inline]
    pub fn tile_pixels(&self) -> usize {
        if !self.is_tiled() {
            return 0;
        }
        self.tile_width as usize * self.tile_height as usize * self.tile_depth_or_one() as usize
    }

    /// Bytes per tile in the stored layout.
    #[inline]
    pub fn tile_bytes(&self) -> usize {
        self.tile_pixels() * self.pixel_bytes()
    }

    /// Bytes per tile when every channel is `format`.
    #[inline]
    pub fn tile_bytes_as(&self, format: TypeDesc) -> usize {
        self.tile_pixels() * self.pixel_bytes_as(format)
    }

    /// Pixels in the data window.
    #[inline]
    pub fn image_pixels(&self) -> u64 {
        (self.width as u64 * self.height as u64).saturating_mul(self.depth as u64)
    }

    /// Bytes in the data window, stored layout (saturating).
    #[inline]
    pub fn image_bytes(&self) -> u64 {
        self.image_pixels().saturating_mul(self.pixel_bytes() as u64)
    }

    /// Bytes in the data window when every channel is `format`.
    #[inline]
    pub fn image_bytes_as(&self, format: TypeDesc) -> u64 {
        self.image_pixels().saturating_mul(self.pixel_bytes_as(format) as u64)
    }

    /// Data window as a region.
    #[inline]
    pub fn roi(&self) -> Roi {
        Roi::from_origin(self.x, self.y, self.z, self.width, self.height, self.depth)
    }

    /// Display window as a region.
    #[inline]
    pub fn roi_full(&self) -> Roi {
        Roi::from_origin(
            self.full_x,
            self.full_y,
            self.full_z,
            self.full_width,
            self.full_height,
            self.full_depth,
        )
    }

    /// Index of the channel named `name`.
    pub fn channelindex(&self, name: &str) -> Option<usize> {
        self.channelnames.iter().position(|n| n == name)
    }

    /// Copies geometry, tiling and channel layout from `other`, leaving the
    /// attribute table untouched.
    pub fn copy_dimensions(&mut self, other: &ImageSpec) {
        self.x = other.x;
        self.y = other.y;
        self.z = other.z;
        self.width = other.width;
        self.height = other.height;
        self.depth = other.depth;
        self.full_x = other.full_x;
        self.full_y = other.full_y;
        self.full_z = other.full_z;
        self.full_width = other.full_width;
        self.full_height = other.full_height;
        self.full_depth = other.full_depth;
        self.tile_width = other.tile_width;
        self.tile_height = other.tile_height;
        self.tile_depth = other.tile_depth;
        self.nchannels = other.nchannels;
        self.format = other.format;
        self.channelformats = other.channelformats.clone();
        self.channelnames = other.channelnames.clone();
        self.alpha_channel = other.alpha_channel;
        self.z_channel = other.z_channel;
    }

    /// Returns `true` for a spec that describes nothing yet.
    #[inline]
    pub fn undefined(&self) -> bool {
        self.nchannels == 0
    }

    /// Returns `true` if the range is a whole number of tiles, aligned to
    /// the data window origin, ending on a tile boundary or the window edge.
    pub fn valid_tile_range(
        &self,
        xbegin: i32,
        xend: i32,
        ybegin: i32,
        yend: i32,
        zbegin: i32,
        zend: i32,
    ) -> bool {
        if !self.is_tiled() {
            return false;
        }
        let axis = |begin: i32, end: i32, origin: i32, size: u32, tile: u32| {
            let tile = tile as i32;
            let limit = origin + size as i32;
            begin >= origin
                && begin < end
                && end <= limit
                && (begin - origin) % tile == 0
                && ((end - origin) % tile == 0 || end == limit)
        };
        axis(xbegin, xend, self.x, self.width, self.tile_width)
            && axis(ybegin, yend, self.y, self.height, self.tile_height)
            && axis(zbegin, zend, self.z, self.depth, self.tile_depth_or_one())
    }

    /// Checks internal consistency.
    ///
    /// # Errors
    ///
    /// Returns the first inconsistency found.
    pub fn validate(&self) -> Result<()> {
        if self.nchannels == 0 {
            return Err(SpecError::NoChannels);
        }
        if self.width == 0 || self.height == 0 || self.depth == 0 {
            return Err(SpecError::InvalidDimensions {
                width: self.width,
                height: self.height,
                depth: self.depth,
            });
        }
        if self.channelnames.len() != self.nchannels as usize {
            return Err(SpecError::ChannelNames {
                expected: self.nchannels,
                got: self.channelnames.len(),
            });
        }
        if !self.channelformats.is_empty() && self.channelformats.len() != self.nchannels as usize {
            return Err(SpecError::ChannelFormats {
                expected: self.nchannels,
                got: self.channelformats.len(),
            });
        }
        for (role, index) in [("alpha", self.alpha_channel), ("z", self.z_channel)] {
            if let Some(index) = index {
                if index >= self.nchannels as usize {
                    return Err(SpecError::ChannelIndex {
                        role,
                        index,
                        nchannels: self.nchannels,
                    });
                }
            }
        }
        let windows = [
            ("data", [(self.x, self.width), (self.y, self.height), (self.z, self.depth)]),
            (
                "display",
                [
                    (self.full_x, self.full_width),
                    (self.full_y, self.full_height),
                    (self.full_z, self.full_depth),
                ],
            ),
        ];
        for (window, axes) in windows {
            // Every bound must stay addressable as an i32 coordinate.
            if axes
                .iter()
                .any(|&(origin, size)| origin as i64 + size as i64 > i32::MAX as i64)
            {
                return Err(SpecError::WindowOutOfRange { window });
            }
        }
        let tile_too_large = [self.tile_width, self.tile_height, self.tile_depth]
            .iter()
            .any(|&t| t > i32::MAX as u32);
        if (self.tile_width == 0) != (self.tile_height == 0) || tile_too_large {
            return Err(SpecError::InvalidTileSize {
                tile_width: self.tile_width,
                tile_height: self.tile_height,
            });
        }
        if self.is_tiled() {
            let edge = |origin: i32, size: u32, tile: u32| {
                let tiles = (size as i64 + tile as i64 - 1) / tile as i64;
                origin as i64 + tiles * tile as i64
            };
            if edge(self.x, self.width, self.tile_width) > i32::MAX as i64
                || edge(self.y, self.height, self.tile_height) > i32::MAX as i64
                || edge(self.z, self.depth, self.tile_depth_or_one()) > i32::MAX as i64
            {
                return Err(SpecError::WindowOutOfRange { window: "tile" });
            }
        }
        let tile_bytes = (self.tile_width as u64)
            .checked_mul(self.tile_height as u64)
            .and_then(|v| v.checked_mul(self.tile_depth_or_one() as u64))
            .and_then(|v| v.checked_mul(self.pixel_bytes() as u64))
            .ok_or(SpecError::Overflow)?;
        if usize::try_from(tile_bytes).is_err() {
            return Err(SpecError::Overflow);
        }
        let bytes = (self.width as u64)
            .checked_mul(self.height as u64)
            .and_then(|v| v.checked_mul(self.depth as u64))
            .and_then(|v| v.checked_mul(self.pixel_bytes() as u64))
            .ok_or(SpecError::Overflow)?;
        if usize::try_from(bytes).is_err() {
            return Err(SpecError::Overflow);
        }
        Ok(())
    }

    // === Attributes ===

    /// Sets an attribute, replacing any previous value of that name.
    pub fn attribute(&mut self, name: impl Into<String>, value: impl Into<AttrValue>) {
        self.extra_attribs.set(name, value);
    }

    /// Looks up an attribute.
    #[inline]
    pub fn find_attribute(&self, name: &str) -> Option<&AttrValue> {
        self.extra_attribs.get(name)
    }

    /// Removes an attribute, returning `true` if it existed.
    pub fn erase_attribute(&mut self, name: &str) -> bool {
        self.extra_attribs.remove(name).is_some()
    }

    /// Integer attribute, or `default` when absent or not an integer.
    pub fn get_int_attribute(&self, name: &str, default: i64) -> i64 {
        self.extra_attribs.get_int(name).unwrap_or(default)
    }

    /// Float attribute (integers widen), or `default` when absent or not
    /// numeric.
    pub fn get_float_attribute(&self, name: &str, default: f64) -> f64 {
        self.extra_attribs.get_float(name).unwrap_or(default)
    }

    /// String attribute, or `default` when absent or not a string.
    pub fn get_string_attribute<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.extra_attribs.get_str(name).unwrap_or(default)
    }

    /// Multi-line, human-readable dump of geometry and attributes.
    pub fn serialize(&self) -> String {
        use std::fmt::Write;

        let mut out = String::new();
        // Writing into a String cannot fail.
        let _ = writeln!(
            out,
            "{} x {}{}, {} channel, {}",
            self.width,
            self.height,
            if self.depth > 1 { format!(" x {}", self.depth) } else { String::new() },
            self.nchannels,
            self.format
        );
        let _ = writeln!(out, "    channel list: {}", self.channelnames.join(", "));
        if !self.channelformats.is_empty() {
            let formats: Vec<_> = self.channelformats.iter().map(TypeDesc::name).collect();
            let _ = writeln!(out, "    channel formats: {}", formats.join(", "));
        }
        if self.is_tiled() {
            let _ = writeln!(
                out,
                "    tile size: {} x {} x {}",
                self.tile_width,
                self.tile_height,
                self.tile_depth_or_one()
            );
        }
        let _ = writeln!(out, "    data window: {}", self.roi());
        let _ = writeln!(out, "    display window: {}", self.roi_full());
        if let Some(a) = self.alpha_channel {
            let _ = writeln!(out, "    alpha channel: {a}");
        }
        if let Some(z) = self.z_channel {
            let _ = writeln!(out, "    z channel: {z}");
        }
        for (key, value) in self.extra_attribs.iter() {
            let _ = writeln!(out, "    {key}: {value}");
        }
        out
    }
}

impl Default for ImageSpec {
    fn default() -> Self {
        Self::new(0, 0, 0, TypeDesc::UInt8)
    }
}

impl std::fmt::Display for ImageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}x{}x{} {} {}ch",
            self.width, self.height, self.depth, self.format, self.nchannels
        )?;
        if self.is_tiled() {
            write!(f, " tiled {}x{}", self.tile_width, self.tile_height)?;
        }
        Ok(())
    }
}
