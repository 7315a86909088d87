//! PNG plugin.
//!
//! Single scanline image, 1 to 4 channels, 8 or 16 bits per sample.
//!
//! - `uint8` and `int8` requests bind as `uint8`; every other type binds as
//!   `uint16`.
//! - PNG has nowhere to store a data window origin or a separate display
//!   window, so the bound spec places the image at (0, 0) with the display
//!   window equal to the data window.
//! - String attributes persist as `tEXt` chunks; other attribute types are
//!   dropped with a warning.
//! - Palette and sub-byte images are expanded to 8 bits on read.

use crate::{Capability, FormatInfo, InputBackend, IoError, IoResult, OutputBackend};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;
use vfx_spec::{ImageSpec, TypeDesc};

/// File signature.
pub const SIGNATURE: [u8; 8] = [0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A];

/// Registry entry.
pub fn format_info() -> FormatInfo {
    FormatInfo {
        name: "png",
        extensions: &["png"],
        capabilities: &[Capability::Alpha],
        can_read: |h| h.starts_with(&SIGNATURE),
        create_input: Some(new_input),
        create_output: Some(new_output),
    }
}

fn new_input() -> Box<dyn InputBackend> {
    Box::new(PngInput::default())
}

fn new_output() -> Box<dyn OutputBackend> {
    Box::new(PngOutput::default())
}

/// tEXt keywords are 1-79 Latin-1 characters without outer spaces; text is
/// Latin-1.
fn is_text_chunk(keyword: &str, text: &str) -> bool {
    let latin1 = |s: &str| s.chars().all(|c| (c as u32) < 256 && c != '\0');
    (1..=79).contains(&keyword.chars().count())
        && keyword.trim() == keyword
        && latin1(keyword)
        && latin1(text)
}

// === Writer ===

/// Writer backend; encodes on close.
#[derive(Default)]
pub struct PngOutput {
    file: Option<File>,
    spec: ImageSpec,
    pixels: Vec<u8>,
}

impl OutputBackend for PngOutput {
    fn format_name(&self) -> &'static str {
        "png"
    }

    fn create(&mut self, path: &Path, subimages: &[ImageSpec]) -> IoResult<ImageSpec> {
        let requested = subimages
            .first()
            .ok_or_else(|| IoError::open(path, "no subimages given"))?;
        if !(1..=4).contains(&requested.nchannels) {
            return Err(IoError::open(
                path,
                format!("png stores 1 to 4 channels, not {}", requested.nchannels),
            ));
        }
        if requested.depth != 1 {
            return Err(IoError::open(path, "png cannot store volume images"));
        }

        let mut spec = requested.clone();
        let format = match requested.format {
            TypeDesc::UInt8 | TypeDesc::Int8 => TypeDesc::UInt8,
            _ => TypeDesc::UInt16,
        };
        spec.set_format(format);
        if (spec.x, spec.y) != (0, 0) || spec.roi_full() != spec.roi() {
            warn!(x = spec.x, y = spec.y, "png: image placed at the origin");
        }
        spec.x = 0;
        spec.y = 0;
        spec.full_x = 0;
        spec.full_y = 0;
        spec.full_width = spec.width;
        spec.full_height = spec.height;

        self.file = Some(File::create(path).map_err(|e| IoError::open(path, e))?);
        self.pixels = vec![0; spec.image_bytes() as usize];
        self.spec = spec.clone();
        Ok(spec)
    }

    fn write_scanline(&mut self, y: i32, _z: i32, data: &[u8]) -> IoResult<()> {
        let row = self.spec.scanline_bytes();
        let at = (y - self.spec.y) as usize * row;
        self.pixels[at..at + row].copy_from_slice(&data[..row]);
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        let Some(file) = self.file.take() else {
            return Ok(());
        };
        let pixels = std::mem::take(&mut self.pixels);
        encode(BufWriter::new(file), &self.spec, pixels)
    }
}

fn encode<W: Write>(w: W, spec: &ImageSpec, mut pixels: Vec<u8>) -> IoResult<()> {
    let color = match spec.nchannels {
        1 => png::ColorType::Grayscale,
        2 => png::ColorType::GrayscaleAlpha,
        3 => png::ColorType::Rgb,
        _ => png::ColorType::Rgba,
    };
    let sixteen = spec.format == TypeDesc::UInt16;

    let mut encoder = png::Encoder::new(w, spec.width, spec.height);
    encoder.set_color(color);
    encoder.set_depth(if sixteen { png::BitDepth::Sixteen } else { png::BitDepth::Eight });
    for (key, value) in spec.extra_attribs.iter() {
        match value.as_str() {
            Some(text) if is_text_chunk(key, text) => {
                encoder
                    .add_text_chunk(key.to_string(), text.to_string())
                    .map_err(IoError::format)?;
            }
            _ => warn!(attribute = key, kind = value.type_name(), "png: attribute not stored"),
        }
    }

    if sixteen {
        for c in pixels.chunks_exact_mut(2) {
            let v = u16::from_ne_bytes([c[0], c[1]]);
            c.copy_from_slice(&v.to_be_bytes());
        }
    }
    let mut writer = encoder.write_header().map_err(IoError::format)?;
    writer.write_image_data(&pixels).map_err(IoError::format)?;
    writer.finish().map_err(IoError::format)
}

// === Reader ===

/// Reader backend; decodes on open.
#[derive(Default)]
pub struct PngInput {
    spec: Option<ImageSpec>,
    pixels: Vec<u8>,
}

impl InputBackend for PngInput {
    fn format_name(&self) -> &'static str {
        "png"
    }

    fn open(&mut self, path: &Path) -> IoResult<ImageSpec> {
        let file = File::open(path).map_err(|e| IoError::open(path, e))?;
        let mut decoder = png::Decoder::new(BufReader::new(file));
        decoder.set_transformations(png::Transformations::EXPAND);
        let mut reader = decoder.read_info().map_err(|e| IoError::open(path, e))?;

        let size = reader
            .output_buffer_size()
            .ok_or_else(|| IoError::open(path, "cannot determine output buffer size"))?;
        let mut buf = vec![0u8; size];
        let frame = reader.next_frame(&mut buf).map_err(IoError::format)?;
        buf.truncate(frame.buffer_size());

        let nchannels = match frame.color_type {
            png::ColorType::Grayscale => 1,
            png::ColorType::GrayscaleAlpha => 2,
            png::ColorType::Rgb => 3,
            png::ColorType::Rgba => 4,
            other => return Err(IoError::format(format!("png: unexpected color type {other:?}"))),
        };
        let format = match frame.bit_depth {
            png::BitDepth::Sixteen => {
                for c in buf.chunks_exact_mut(2) {
                    let v = u16::from_be_bytes([c[0], c[1]]);
                    c.copy_from_slice(&v.to_ne_bytes());
                }
                TypeDesc::UInt16
            }
            _ => TypeDesc::UInt8,
        };

        let mut spec = ImageSpec::new(frame.width, frame.height, nchannels, format);
        if nchannels == 2 {
            spec.channelnames = vec!["Y".into(), "A".into()];
            spec.alpha_channel = Some(1);
        }
        for chunk in &reader.info().uncompressed_latin1_text {
            spec.attribute(chunk.keyword.clone(), chunk.text.clone());
        }

        self.pixels = buf;
        self.spec = Some(spec.clone());
        Ok(spec)
    }

    fn num_subimages(&self) -> usize {
        usize::from(self.spec.is_some())
    }

    fn seek_subimage(&mut self, index: usize) -> IoResult<Option<ImageSpec>> {
        Ok(self.spec.clone().filter(|_| index == 0))
    }

    fn read_scanline(&mut self, y: i32, _z: i32, out: &mut [u8]) -> IoResult<()> {
        let spec = self
            .spec
            .as_ref()
            .ok_or_else(|| IoError::NotOpen("png: no file open".into()))?;
        let row = spec.scanline_bytes();
        let at = (y - spec.y) as usize * row;
        out[..row].copy_from_slice(&self.pixels[at..at + row]);
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        self.spec = None;
        self.pixels = Vec::new();
        Ok(())
    }
}
