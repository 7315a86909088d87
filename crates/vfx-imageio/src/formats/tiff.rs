//! TIFF plugin.
//!
//! One IFD (page) per sub-image, appended as the caller goes. Gray, RGB and
//! RGBA pages in 8-bit, 16-bit or 32-bit float samples.
//!
//! Requested types bind to the nearest storable one: `uint8`/`int8` as
//! `uint8`, `uint16`/`int16` as `uint16`, everything else as `float`. The
//! baseline descriptive text tags round trip as string attributes of the
//! same name.
//!
//! The data window origin is stored in `XPosition`/`YPosition` (in pixels,
//! resolution 1/1) and the display window size in the Pixar full-window
//! tags. TIFF positions are unsigned, so a negative origin is refused and
//! the display window always starts at 0.

use crate::{Capability, FormatInfo, InputBackend, IoError, IoResult, OutputBackend};
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tiff::decoder::{Decoder, DecodingResult};
use tiff::encoder::colortype::{self, ColorType};
use tiff::decoder::ifd::Value;
use tiff::encoder::{Rational, TiffEncoder, TiffValue};
use tiff::tags::Tag;
use tracing::{debug, warn};
use vfx_spec::{ImageSpec, TypeDesc};

/// Text tags persisted as attributes of the same name.
const TEXT_TAGS: [(Tag, &str); 8] = [
    (Tag::ImageDescription, "ImageDescription"),
    (Tag::Make, "Make"),
    (Tag::Model, "Model"),
    (Tag::Software, "Software"),
    (Tag::DateTime, "DateTime"),
    (Tag::Artist, "Artist"),
    (Tag::HostComputer, "HostComputer"),
    (Tag::Copyright, "Copyright"),
];

const X_POSITION: Tag = Tag::Unknown(286);
const Y_POSITION: Tag = Tag::Unknown(287);
const PIXAR_FULL_WIDTH: Tag = Tag::Unknown(33300);
const PIXAR_FULL_HEIGHT: Tag = Tag::Unknown(33301);

/// Registry entry.
pub fn format_info() -> FormatInfo {
    FormatInfo {
        name: "tiff",
        extensions: &["tif", "tiff"],
        capabilities: &[
            Capability::MultiImage,
            Capability::AppendSubimage,
            Capability::Alpha,
            Capability::Origin,
            Capability::DisplayWindow,
        ],
        can_read: |h| {
            if h.len() < 4 {
                return false;
            }
            let le = h[0] == b'I' && h[1] == b'I' && h[2] == 0x2A && h[3] == 0x00;
            let be = h[0] == b'M' && h[1] == b'M' && h[2] == 0x00 && h[3] == 0x2A;
            le || be
        },
        create_input: Some(new_input),
        create_output: Some(new_output),
    }
}

fn new_input() -> Box<dyn InputBackend> {
    Box::new(TiffInput::default())
}

fn new_output() -> Box<dyn OutputBackend> {
    Box::new(TiffOutput::default())
}

fn storage_format(requested: TypeDesc) -> TypeDesc {
    match requested {
        TypeDesc::UInt8 | TypeDesc::Int8 => TypeDesc::UInt8,
        TypeDesc::UInt16 | TypeDesc::Int16 => TypeDesc::UInt16,
        _ => TypeDesc::Float,
    }
}

fn samples<T: bytemuck::Pod>(bytes: &[u8]) -> Vec<T> {
    bytes
        .chunks_exact(std::mem::size_of::<T>())
        .map(bytemuck::pod_read_unaligned)
        .collect()
}

// === Writer ===

/// Writer backend; each sub-image is buffered and written as one page.
#[derive(Default)]
pub struct TiffOutput {
    encoder: Option<TiffEncoder<File>>,
    path: PathBuf,
    spec: ImageSpec,
    pixels: Vec<u8>,
}

impl TiffOutput {
    /// Returns the spec a page would be stored with, without touching the
    /// page being written.
    fn check(&self, requested: &ImageSpec) -> IoResult<ImageSpec> {
        if !matches!(requested.nchannels, 1 | 3 | 4) {
            return Err(IoError::open(
                &self.path,
                format!("tiff stores 1, 3 or 4 channels, not {}", requested.nchannels),
            ));
        }
        if requested.depth != 1 {
            return Err(IoError::open(&self.path, "tiff cannot store volume images"));
        }
        if requested.x < 0 || requested.y < 0 {
            return Err(IoError::open(
                &self.path,
                format!("tiff cannot store origin ({}, {})", requested.x, requested.y),
            ));
        }
        let mut spec = requested.clone();
        spec.set_format(storage_format(requested.format));
        if spec.full_x != 0 || spec.full_y != 0 {
            warn!(full_x = spec.full_x, full_y = spec.full_y, "tiff: display window origin set to 0");
            spec.full_x = 0;
            spec.full_y = 0;
        }
        Ok(spec)
    }

    fn bind(&mut self, spec: ImageSpec) -> ImageSpec {
        for (key, _) in spec.extra_attribs.iter() {
            if !TEXT_TAGS.iter().any(|(_, name)| *name == key) {
                warn!(attribute = key, "tiff: attribute not stored");
            }
        }
        self.pixels = vec![0; spec.image_bytes() as usize];
        self.spec = spec.clone();
        spec
    }

    fn write_page(&mut self) -> IoResult<()> {
        let encoder = self
            .encoder
            .as_mut()
            .ok_or_else(|| IoError::NotOpen("tiff: no file open".into()))?;
        let spec = &self.spec;
        let px = &self.pixels;
        match (spec.nchannels, spec.format) {
            (1, TypeDesc::UInt8) => write_page::<colortype::Gray8>(encoder, spec, px),
            (3, TypeDesc::UInt8) => write_page::<colortype::RGB8>(encoder, spec, px),
            (4, TypeDesc::UInt8) => write_page::<colortype::RGBA8>(encoder, spec, px),
            (1, TypeDesc::UInt16) => write_page::<colortype::Gray16>(encoder, spec, &samples(px)),
            (3, TypeDesc::UInt16) => write_page::<colortype::RGB16>(encoder, spec, &samples(px)),
            (4, TypeDesc::UInt16) => write_page::<colortype::RGBA16>(encoder, spec, &samples(px)),
            (1, TypeDesc::Float) => write_page::<colortype::Gray32Float>(encoder, spec, &samples(px)),
            (3, TypeDesc::Float) => write_page::<colortype::RGB32Float>(encoder, spec, &samples(px)),
            (4, TypeDesc::Float) => write_page::<colortype::RGBA32Float>(encoder, spec, &samples(px)),
            (n, t) => Err(IoError::format(format!("tiff: cannot encode {n} x {t}"))),
        }
    }
}

fn write_page<C>(encoder: &mut TiffEncoder<File>, spec: &ImageSpec, data: &[C::Inner]) -> IoResult<()>
where
    C: ColorType,
    [C::Inner]: TiffValue,
{
    let mut image = encoder
        .new_image::<C>(spec.width, spec.height)
        .map_err(IoError::format)?;
    let dir = image.encoder();
    for (tag, name) in TEXT_TAGS {
        if let Some(text) = spec.extra_attribs.get_str(name) {
            dir.write_tag(tag, text).map_err(IoError::format)?;
        }
    }
    if spec.x != 0 || spec.y != 0 {
        // Non-negative, checked when the page was bound.
        dir.write_tag(X_POSITION, Rational { n: spec.x as u32, d: 1 })
            .map_err(IoError::format)?;
        dir.write_tag(Y_POSITION, Rational { n: spec.y as u32, d: 1 })
            .map_err(IoError::format)?;
    }
    if (spec.full_width, spec.full_height) != (spec.width, spec.height) {
        dir.write_tag(PIXAR_FULL_WIDTH, spec.full_width)
            .map_err(IoError::format)?;
        dir.write_tag(PIXAR_FULL_HEIGHT, spec.full_height)
            .map_err(IoError::format)?;
    }
    image.write_data(data).map_err(IoError::format)
}

impl OutputBackend for TiffOutput {
    fn format_name(&self) -> &'static str {
        "tiff"
    }

    fn create(&mut self, path: &Path, subimages: &[ImageSpec]) -> IoResult<ImageSpec> {
        let first = subimages
            .first()
            .ok_or_else(|| IoError::open(path, "no subimages given"))?;
        self.path = path.to_path_buf();
        let spec = self.check(first)?;
        let spec = self.bind(spec);
        let file = File::create(path).map_err(|e| IoError::open(path, e))?;
        self.encoder = Some(TiffEncoder::new(file).map_err(|e| IoError::open(path, e))?);
        Ok(spec)
    }

    fn append_subimage(&mut self, spec: &ImageSpec) -> IoResult<ImageSpec> {
        let next = self.check(spec)?;
        self.write_page()?;
        Ok(self.bind(next))
    }

    fn write_scanline(&mut self, y: i32, _z: i32, data: &[u8]) -> IoResult<()> {
        let row = self.spec.scanline_bytes();
        let at = (y - self.spec.y) as usize * row;
        self.pixels[at..at + row].copy_from_slice(&data[..row]);
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        if self.encoder.is_none() {
            return Ok(());
        }
        let result = self.write_page();
        self.encoder = None;
        self.pixels = Vec::new();
        result
    }
}

// === Reader ===

/// Reader backend; decodes one page at a time.
#[derive(Default)]
pub struct TiffInput {
    path: Option<PathBuf>,
    pages: usize,
    spec: ImageSpec,
    pixels: Vec<u8>,
}

fn open_decoder(path: &Path) -> IoResult<Decoder<BufReader<File>>> {
    let file = File::open(path).map_err(|e| IoError::open(path, e))?;
    Decoder::new(BufReader::new(file)).map_err(|e| IoError::open(path, e))
}

/// Numeric tag value as a float, for the tag types writers use in practice.
fn tag_number(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> IoResult<Option<f64>> {
    let value = decoder.find_tag(tag).map_err(IoError::format)?;
    Ok(match value {
        Some(Value::Rational(n, d)) if d != 0 => Some(n as f64 / d as f64),
        Some(Value::SRational(n, d)) if d != 0 => Some(n as f64 / d as f64),
        Some(Value::Short(v)) => Some(v as f64),
        Some(Value::Unsigned(v)) => Some(v as f64),
        Some(Value::Float(v)) => Some(v as f64),
        Some(Value::Double(v)) => Some(v),
        _ => None,
    })
}

/// Position tags are in resolution units; converts them back to pixels.
fn position(decoder: &mut Decoder<BufReader<File>>, tag: Tag, resolution: Tag) -> IoResult<i32> {
    let Some(pos) = tag_number(decoder, tag)? else {
        return Ok(0);
    };
    let res = tag_number(decoder, resolution)?.filter(|r| *r > 0.0).unwrap_or(1.0);
    let px = (pos * res).round();
    if !(0.0..=i32::MAX as f64).contains(&px) {
        return Err(IoError::format(format!("tiff: position {pos} out of range")));
    }
    Ok(px as i32)
}

fn decode_page(decoder: &mut Decoder<BufReader<File>>) -> IoResult<(ImageSpec, Vec<u8>)> {
    use tiff::ColorType as Color;

    let (width, height) = decoder.dimensions().map_err(IoError::format)?;
    let nchannels = match decoder.colortype().map_err(IoError::format)? {
        Color::Gray(_) => 1,
        Color::GrayA(_) => 2,
        Color::RGB(_) => 3,
        Color::RGBA(_) => 4,
        other => return Err(IoError::format(format!("tiff: unsupported color type {other:?}"))),
    };
    let text: Vec<(&str, String)> = TEXT_TAGS
        .iter()
        .filter_map(|(tag, name)| {
            let value = decoder.get_tag_ascii_string(*tag).ok()?;
            Some((*name, value.trim_end_matches('\0').to_string()))
        })
        .collect();
    let x = position(decoder, X_POSITION, Tag::XResolution)?;
    let y = position(decoder, Y_POSITION, Tag::YResolution)?;
    let full_width = decoder
        .find_tag_unsigned::<u32>(PIXAR_FULL_WIDTH)
        .map_err(IoError::format)?
        .unwrap_or(width);
    let full_height = decoder
        .find_tag_unsigned::<u32>(PIXAR_FULL_HEIGHT)
        .map_err(IoError::format)?
        .unwrap_or(height);

    let (format, pixels) = match decoder.read_image().map_err(IoError::format)? {
        DecodingResult::U8(v) => (TypeDesc::UInt8, v),
        DecodingResult::U16(v) => (TypeDesc::UInt16, bytemuck::cast_slice(&v).to_vec()),
        DecodingResult::F32(v) => (TypeDesc::Float, bytemuck::cast_slice(&v).to_vec()),
        _ => return Err(IoError::format("tiff: unsupported sample type")),
    };

    let mut spec = ImageSpec::new(width, height, nchannels, format);
    if nchannels == 2 {
        spec.channelnames = vec!["Y".into(), "A".into()];
        spec.alpha_channel = Some(1);
    }
    spec.x = x;
    spec.y = y;
    spec.full_width = full_width;
    spec.full_height = full_height;
    for (name, value) in text {
        spec.attribute(name, value);
    }
    if spec.validate().is_err() {
        return Err(IoError::format(format!("tiff: inconsistent page {spec}")));
    }
    if pixels.len() as u64 != spec.image_bytes() {
        return Err(IoError::format(format!(
            "tiff: decoded {} bytes for {spec}",
            pixels.len()
        )));
    }
    Ok((spec, pixels))
}

impl TiffInput {
    fn load_page(&mut self, path: &Path, index: usize) -> IoResult<ImageSpec> {
        let mut decoder = open_decoder(path)?;
        for _ in 0..index {
            decoder.next_image().map_err(IoError::format)?;
        }
        let (spec, pixels) = decode_page(&mut decoder)?;
        debug!(page = index, spec = %spec, "tiff: decoded page");
        self.spec = spec.clone();
        self.pixels = pixels;
        Ok(spec)
    }
}

impl InputBackend for TiffInput {
    fn format_name(&self) -> &'static str {
        "tiff"
    }

    fn open(&mut self, path: &Path) -> IoResult<ImageSpec> {
        let mut decoder = open_decoder(path)?;
        let mut pages = 1;
        while decoder.more_images() {
            decoder.next_image().map_err(|e| IoError::open(path, e))?;
            pages += 1;
        }
        let spec = self.load_page(path, 0)?;
        self.path = Some(path.to_path_buf());
        self.pages = pages;
        Ok(spec)
    }

    fn num_subimages(&self) -> usize {
        self.pages
    }

    fn seek_subimage(&mut self, index: usize) -> IoResult<Option<ImageSpec>> {
        let path = self
            .path
            .clone()
            .ok_or_else(|| IoError::NotOpen("tiff: no file open".into()))?;
        if index >= self.pages {
            return Ok(None);
        }
        self.load_page(&path, index).map(Some)
    }

    fn read_scanline(&mut self, y: i32, _z: i32, out: &mut [u8]) -> IoResult<()> {
        let row = self.spec.scanline_bytes();
        let at = (y - self.spec.y) as usize * row;
        out[..row].copy_from_slice(&self.pixels[at..at + row]);
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        self.path = None;
        self.pages = 0;
        self.pixels = Vec::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_format() {
        assert_eq!(storage_format(TypeDesc::Int8), TypeDesc::UInt8);
        assert_eq!(storage_format(TypeDesc::Int16), TypeDesc::UInt16);
        assert_eq!(storage_format(TypeDesc::Half), TypeDesc::Float);
        assert_eq!(storage_format(TypeDesc::Double), TypeDesc::Float);
    }

    #[test]
    fn test_samples_unaligned() {
        let bytes = [0u8, 1, 0, 2, 0];
        let v: Vec<u16> = samples(&bytes[1..]);
        assert_eq!(v, vec![u16::from_ne_bytes([1, 0]), u16::from_ne_bytes([2, 0])]);
    }
}
