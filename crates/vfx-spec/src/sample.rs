//! Sample types and buffer conversion.
//!
//! [`Sample`] ties a Rust scalar type to its [`TypeDesc`] and to a
//! normalized `f64` value, the common currency for converting between a
//! caller's buffer type and the type stored in a file.
//!
//! # Normalization
//!
//! - unsigned integers map `[0, MAX]` to `[0.0, 1.0]`
//! - signed integers map `[-MAX, MAX]` to `[-1.0, 1.0]`
//! - floats pass through unchanged
//!
//! Converting between identical layouts never goes through `f64`: bytes are
//! copied verbatim, so same-type round trips are bit-exact.
//!
//! # Example
//!
//! ```rust
//! use vfx_spec::{convert_pixels, Sample, TypeDesc};
//!
//! let src = [0u8, 255];
//! let mut dst = [0u8; 4];
//! convert_pixels(&src, &[TypeDesc::UInt8], &mut dst, &[TypeDesc::UInt16], 2);
//! assert_eq!(u16::from_ne_bytes([dst[0], dst[1]]), 0);
//! assert_eq!(u16::from_ne_bytes([dst[2], dst[3]]), 65535);
//! assert_eq!(<u16 as Sample>::TYPE, TypeDesc::UInt16);
//! ```

use crate::TypeDesc;
use half::f16;

/// A scalar type usable as a pixel channel sample.
pub trait Sample: bytemuck::Pod + Default + Send + Sync + 'static {
    /// The matching runtime type descriptor.
    const TYPE: TypeDesc;

    /// Converts to a normalized `f64`.
    fn to_f64(self) -> f64;

    /// Converts from a normalized `f64`, clamping integers to range.
    fn from_f64(v: f64) -> Self;
}

macro_rules! unsigned_sample {
    ($t:ty, $desc:expr) => {
        impl Sample for $t {
            const TYPE: TypeDesc = $desc;

            #[inline]
            fn to_f64(self) -> f64 {
                self as f64 / <$t>::MAX as f64
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                (v.clamp(0.0, 1.0) * <$t>::MAX as f64).round() as $t
            }
        }
    };
}

macro_rules! signed_sample {
    ($t:ty, $desc:expr) => {
        impl Sample for $t {
            const TYPE: TypeDesc = $desc;

            #[inline]
            fn to_f64(self) -> f64 {
                (self as f64 / <$t>::MAX as f64).max(-1.0)
            }

            #[inline]
            fn from_f64(v: f64) -> Self {
                (v.clamp(-1.0, 1.0) * <$t>::MAX as f64).round() as $t
            }
        }
    };
}

unsigned_sample!(u8, TypeDesc::UInt8);
unsigned_sample!(u16, TypeDesc::UInt16);
unsigned_sample!(u32, TypeDesc::UInt32);
signed_sample!(i8, TypeDesc::Int8);
signed_sample!(i16, TypeDesc::Int16);
signed_sample!(i32, TypeDesc::Int32);

impl Sample for f16 {
    const TYPE: TypeDesc = TypeDesc::Half;

    #[inline]
    fn to_f64(self) -> f64 {
        f16::to_f64(self)
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        f16::from_f64(v)
    }
}

impl Sample for f32 {
    const TYPE: TypeDesc = TypeDesc::Float;

    #[inline]
    fn to_f64(self) -> f64 {
        self as f64
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v as f32
    }
}

impl Sample for f64 {
    const TYPE: TypeDesc = TypeDesc::Double;

    #[inline]
    fn to_f64(self) -> f64 {
        self
    }

    #[inline]
    fn from_f64(v: f64) -> Self {
        v
    }
}

#[inline]
fn load<T: Sample>(bytes: &[u8]) -> f64 {
    bytemuck::pod_read_unaligned::<T>(&bytes[..std::mem::size_of::<T>()]).to_f64()
}

#[inline]
fn store<T: Sample>(v: f64, out: &mut [u8]) {
    out[..std::mem::size_of::<T>()].copy_from_slice(bytemuck::bytes_of(&T::from_f64(v)));
}

/// Reads one sample of type `format` from the front of `bytes`.
///
/// # Panics
///
/// Panics if `bytes` is shorter than `format.size()`.
pub fn load_sample(format: TypeDesc, bytes: &[u8]) -> f64 {
    match format {
        TypeDesc::UInt8 => load::<u8>(bytes),
        TypeDesc::Int8 => load::<i8>(bytes),
        TypeDesc::UInt16 => load::<u16>(bytes),
        TypeDesc::Int16 => load::<i16>(bytes),
        TypeDesc::UInt32 => load::<u32>(bytes),
        TypeDesc::Int32 => load::<i32>(bytes),
        TypeDesc::Half => load::<f16>(bytes),
        TypeDesc::Float => load::<f32>(bytes),
        TypeDesc::Double => load::<f64>(bytes),
    }
}

/// Writes one normalized value as type `format` to the front of `out`.
///
/// # Panics
///
/// Panics if `out` is shorter than `format.size()`.
pub fn store_sample(format: TypeDesc, v: f64, out: &mut [u8]) {
    match format {
        TypeDesc::UInt8 => store::<u8>(v, out),
        TypeDesc::Int8 => store::<i8>(v, out),
        TypeDesc::UInt16 => store::<u16>(v, out),
        TypeDesc::Int16 => store::<i16>(v, out),
        TypeDesc::UInt32 => store::<u32>(v, out),
        TypeDesc::Int32 => store::<i32>(v, out),
        TypeDesc::Half => store::<f16>(v, out),
        TypeDesc::Float => store::<f32>(v, out),
        TypeDesc::Double => store::<f64>(v, out),
    }
}

/// Bytes per pixel for a per-channel layout.
#[inline]
pub fn layout_bytes(formats: &[TypeDesc]) -> usize {
    formats.iter().map(TypeDesc::size).sum()
}

/// Converts `npixels` interleaved pixels between two channel layouts.
///
/// `src_formats` and `dst_formats` list one type per channel and must have
/// the same length. Identical layouts are copied byte for byte.
///
/// # Panics
///
/// Panics if either buffer is shorter than `npixels` pixels of its layout,
/// or if the layouts have different channel counts.
pub fn convert_pixels(
    src: &[u8],
    src_formats: &[TypeDesc],
    dst: &mut [u8],
    dst_formats: &[TypeDesc],
    npixels: usize,
) {
    assert_eq!(src_formats.len(), dst_formats.len(), "channel count mismatch");
    let src_pixel = layout_bytes(src_formats);
    let dst_pixel = layout_bytes(dst_formats);

    if src_formats == dst_formats {
        let n = npixels * src_pixel;
        dst[..n].copy_from_slice(&src[..n]);
        return;
    }

    for p in 0..npixels {
        let mut s = p * src_pixel;
        let mut d = p * dst_pixel;
        for (&sf, &df) in src_formats.iter().zip(dst_formats) {
            let v = load_sample(sf, &src[s..]);
            store_sample(df, v, &mut dst[d..]);
            s += sf.size();
            d += df.size();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_normalization() {
        assert_eq!(255u8.to_f64(), 1.0);
        assert_eq!(<u16 as Sample>::from_f64(0.5), 32768);
        assert_eq!(<i8 as Sample>::from_f64(-1.0), -127);
        assert_eq!(<u8 as Sample>::from_f64(2.0), 255);
        assert_eq!(<u8 as Sample>::from_f64(-0.5), 0);
        assert_eq!((-128i8).to_f64(), -1.0);
    }

    #[test]
    fn test_identity_copy_is_exact() {
        let src: Vec<f32> = vec![0.1, -3.5, f32::MAX, 1e-30];
        let mut dst = vec![0u8; 16];
        convert_pixels(
            bytemuck::cast_slice(&src),
            &[TypeDesc::Float; 2],
            &mut dst,
            &[TypeDesc::Float; 2],
            2,
        );
        assert_eq!(&dst[..], bytemuck::cast_slice::<f32, u8>(&src));
    }

    #[test]
    fn test_float_to_half() {
        let src: Vec<f32> = vec![0.5, 0.25, 1.0];
        let mut dst = vec![0u8; 6];
        convert_pixels(
            bytemuck::cast_slice(&src),
            &[TypeDesc::Float; 3],
            &mut dst,
            &[TypeDesc::Half; 3],
            1,
        );
        assert_abs_diff_eq!(load_sample(TypeDesc::Half, &dst[2..]), 0.25);
        assert_abs_diff_eq!(load_sample(TypeDesc::Half, &dst[4..]), 1.0);
    }

    #[test]
    fn test_mixed_layout() {
        // RGB half + A uint8 -> uniform float
        let mut src = vec![0u8; 7];
        store_sample(TypeDesc::Half, 0.5, &mut src[0..]);
        store_sample(TypeDesc::Half, 1.0, &mut src[2..]);
        store_sample(TypeDesc::Half, 0.0, &mut src[4..]);
        src[6] = 255;
        let mut dst = vec![0u8; 16];
        convert_pixels(
            &src,
            &[TypeDesc::Half, TypeDesc::Half, TypeDesc::Half, TypeDesc::UInt8],
            &mut dst,
            &[TypeDesc::Float; 4],
            1,
        );
        let out: Vec<f32> = dst
            .chunks_exact(4)
            .map(|c| f32::from_ne_bytes([c[0], c[1], c[2], c[3]]))
            .collect();
        assert_eq!(out, vec![0.5, 1.0, 0.0, 1.0]);
    }
}
