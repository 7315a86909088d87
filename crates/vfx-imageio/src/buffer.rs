//! Caller buffer layouts and pixel-box copies.
//!
//! Every read and write names the layout of the caller's buffer with a
//! [`BufferFormat`]. A bare [`TypeDesc`] converts into
//! [`BufferFormat::Uniform`], so the common case reads naturally:
//!
//! ```rust,no_run
//! # use vfx_imageio::{ImageOutput, IoResult};
//! # use vfx_spec::{ImageSpec, TypeDesc};
//! # fn main() -> IoResult<()> {
//! # let mut out = ImageOutput::create("a.vxi")?;
//! # out.open("a.vxi", &ImageSpec::new(4, 1, 3, TypeDesc::Float))?;
//! let row = vec![0u8; 4 * 3];
//! out.write_scanline(0, 0, TypeDesc::UInt8, &row)?;
//! # Ok(())
//! # }
//! ```

use crate::{IoError, IoResult};
use vfx_spec::{ImageSpec, Roi, TypeDesc};

/// Layout of a caller-supplied pixel buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BufferFormat {
    /// Same per-channel types as the bound spec, no conversion.
    Native,
    /// Every channel has this type.
    Uniform(TypeDesc),
    /// One type per channel.
    PerChannel(Vec<TypeDesc>),
}

impl From<TypeDesc> for BufferFormat {
    fn from(format: TypeDesc) -> Self {
        Self::Uniform(format)
    }
}

impl BufferFormat {
    /// Resolves to one type per channel of `spec`.
    pub fn layout(&self, spec: &ImageSpec) -> IoResult<Vec<TypeDesc>> {
        match self {
            Self::Native => Ok(spec.channel_layout()),
            Self::Uniform(t) => Ok(vec![*t; spec.nchannels as usize]),
            Self::PerChannel(types) => {
                if types.len() != spec.nchannels as usize {
                    return Err(IoError::geometry(format!(
                        "buffer layout has {} channels, image has {}",
                        types.len(),
                        spec.nchannels
                    )));
                }
                Ok(types.clone())
            }
        }
    }
}

/// Checks a caller buffer against the bytes an operation needs.
pub(crate) fn check_len(what: &str, have: usize, need: usize) -> IoResult<()> {
    if have < need {
        return Err(IoError::geometry(format!(
            "{what} buffer holds {have} bytes, {need} required"
        )));
    }
    Ok(())
}

/// Byte offset of pixel `(x, y, z)` in a row-major buffer covering `extent`.
#[inline]
pub(crate) fn pixel_offset(extent: &Roi, x: i32, y: i32, z: i32, pixel_bytes: usize) -> usize {
    let row = (z - extent.zbegin) as usize * extent.height() as usize + (y - extent.ybegin) as usize;
    (row * extent.width() as usize + (x - extent.xbegin) as usize) * pixel_bytes
}

/// Copies the pixels of `region` between two row-major buffers.
///
/// `region` must lie inside both extents.
pub(crate) fn copy_region(
    src: &[u8],
    src_extent: &Roi,
    dst: &mut [u8],
    dst_extent: &Roi,
    region: &Roi,
    pixel_bytes: usize,
) {
    let span = region.width() as usize * pixel_bytes;
    for z in region.zbegin..region.zend {
        for y in region.ybegin..region.yend {
            let s = pixel_offset(src_extent, region.xbegin, y, z, pixel_bytes);
            let d = pixel_offset(dst_extent, region.xbegin, y, z, pixel_bytes);
            dst[d..d + span].copy_from_slice(&src[s..s + span]);
        }
    }
}

/// Region covered by the tile whose corner is `(x, y, z)`.
pub(crate) fn tile_extent(spec: &ImageSpec, x: i32, y: i32, z: i32) -> Roi {
    Roi::from_origin(
        x,
        y,
        z,
        spec.tile_width,
        spec.tile_height,
        spec.tile_depth_or_one(),
    )
}

/// Rejects `(x, y, z)` unless it is a tile corner inside the data window.
pub(crate) fn check_tile_corner(spec: &ImageSpec, x: i32, y: i32, z: i32) -> IoResult<()> {
    let roi = spec.roi();
    let aligned = roi.contains(x, y, z)
        && (x - spec.x) % spec.tile_width as i32 == 0
        && (y - spec.y) % spec.tile_height as i32 == 0
        && (z - spec.z) % spec.tile_depth_or_one() as i32 == 0;
    if !aligned {
        return Err(IoError::geometry(format!(
            "({x}, {y}, {z}) is not a tile corner inside data window {roi}"
        )));
    }
    Ok(())
}

/// Zeroes every pixel of a tile buffer that lies outside `window`.
pub(crate) fn zero_outside(tile: &mut [u8], extent: &Roi, window: &Roi, pixel_bytes: usize) {
    if window.contains_roi(extent) {
        return;
    }
    for z in extent.zbegin..extent.zend {
        for y in extent.ybegin..extent.yend {
            for x in extent.xbegin..extent.xend {
                if !window.contains(x, y, z) {
                    let at = pixel_offset(extent, x, y, z, pixel_bytes);
                    tile[at..at + pixel_bytes].fill(0);
                }
            }
        }
    }
}

/// Iterates tile corners covering `region`, z-major then row-major.
pub(crate) fn tile_corners(spec: &ImageSpec, region: &Roi) -> impl Iterator<Item = (i32, i32, i32)> {
    let (tw, th, td) = (
        spec.tile_width as usize,
        spec.tile_height as usize,
        spec.tile_depth_or_one() as usize,
    );
    let r = *region;
    (r.zbegin..r.zend).step_by(td).flat_map(move |z| {
        (r.ybegin..r.yend)
            .step_by(th)
            .flat_map(move |y| (r.xbegin..r.xend).step_by(tw).map(move |x| (x, y, z)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_resolution() {
        let mut spec = ImageSpec::new(2, 2, 3, TypeDesc::Half);
        assert_eq!(BufferFormat::Native.layout(&spec).unwrap(), vec![TypeDesc::Half; 3]);
        assert_eq!(
            BufferFormat::from(TypeDesc::UInt8).layout(&spec).unwrap(),
            vec![TypeDesc::UInt8; 3]
        );
        spec.channelformats = vec![TypeDesc::Half, TypeDesc::Half, TypeDesc::Float];
        assert_eq!(BufferFormat::Native.layout(&spec).unwrap()[2], TypeDesc::Float);
        assert!(BufferFormat::PerChannel(vec![TypeDesc::Float]).layout(&spec).is_err());
    }

    #[test]
    fn test_copy_region() {
        // 4x2 source, copy its right 2x2 half into a 2x2 destination
        let src_extent = Roi::new(0, 4, 0, 2, 0, 1);
        let src: Vec<u8> = (0..8).collect();
        let dst_extent = Roi::new(2, 4, 0, 2, 0, 1);
        let mut dst = vec![0u8; 4];
        copy_region(&src, &src_extent, &mut dst, &dst_extent, &dst_extent, 1);
        assert_eq!(dst, vec![2, 3, 6, 7]);
    }

    #[test]
    fn test_tile_corners() {
        let mut spec = ImageSpec::new(100, 70, 1, TypeDesc::UInt8);
        spec.x = -10;
        spec.tile_width = 64;
        spec.tile_height = 64;
        let corners: Vec<_> = tile_corners(&spec, &spec.roi()).collect();
        assert_eq!(corners, vec![(-10, 0, 0), (54, 0, 0), (-10, 64, 0), (54, 64, 0)]);

        assert!(check_tile_corner(&spec, 54, 64, 0).is_ok());
        assert!(check_tile_corner(&spec, 0, 0, 0).is_err());
        assert!(check_tile_corner(&spec, 118, 0, 0).is_err());
    }

    #[test]
    fn test_zero_outside() {
        let window = Roi::new(0, 3, 0, 3, 0, 1);
        let extent = Roi::new(2, 4, 2, 4, 0, 1);
        let mut tile = vec![9u8; 4];
        zero_outside(&mut tile, &extent, &window, 1);
        assert_eq!(tile, vec![9, 0, 0, 0]);
    }
}
