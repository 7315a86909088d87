//! `vxi`: reference container supporting every capability.
//!
//! The container stores each sub-image verbatim: the complete
//! [`ImageSpec`] (geometry, tiling, per-channel formats, ordered attribute
//! table) as a YAML header, followed by the data window's native pixels.
//!
//! # Layout
//!
//! ```text
//! "VXI1"
//! repeat per sub-image:
//!     u32 LE   header length
//!     [u8]     YAML ImageSpec
//!     u64 LE   payload length (= spec.image_bytes())
//!     [u8]     pixels, row-major z/y/x, channels interleaved
//! ```
//!
//! Tiled images are stored in the same row-major order; tiling is recorded
//! in the header. The writer buffers the current sub-image zero-filled and
//! emits it on append or close, so pixels never written read back as zero
//! and writes may come in any order.

use crate::buffer::{copy_region, pixel_offset, tile_extent};
use crate::{Capability, FormatInfo, InputBackend, IoError, IoResult, OutputBackend};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::Path;
use vfx_spec::ImageSpec;

/// File signature.
pub const MAGIC: &[u8; 4] = b"VXI1";

/// Registry entry.
pub fn format_info() -> FormatInfo {
    FormatInfo {
        name: "vxi",
        extensions: &["vxi"],
        capabilities: &Capability::ALL,
        can_read: |h| h.starts_with(MAGIC),
        create_input: Some(new_input),
        create_output: Some(new_output),
    }
}

fn new_input() -> Box<dyn InputBackend> {
    Box::new(VxiInput::default())
}

fn new_output() -> Box<dyn OutputBackend> {
    Box::new(VxiOutput::default())
}

fn write_record<W: Write>(w: &mut W, spec: &ImageSpec, pixels: &[u8]) -> IoResult<()> {
    let header = serde_yaml::to_string(spec).map_err(IoError::format)?;
    let header_len = u32::try_from(header.len())
        .map_err(|_| IoError::format("subimage header exceeds 4 GiB"))?;
    w.write_u32::<LittleEndian>(header_len)?;
    w.write_all(header.as_bytes())?;
    w.write_u64::<LittleEndian>(pixels.len() as u64)?;
    w.write_all(pixels)?;
    Ok(())
}

// === Writer ===

/// Writer backend.
#[derive(Default)]
pub struct VxiOutput {
    file: Option<BufWriter<File>>,
    spec: ImageSpec,
    pixels: Vec<u8>,
}

impl VxiOutput {
    fn bind(&mut self, spec: &ImageSpec) -> ImageSpec {
        self.spec = spec.clone();
        self.pixels = vec![0; spec.image_bytes() as usize];
        self.spec.clone()
    }
}

impl OutputBackend for VxiOutput {
    fn format_name(&self) -> &'static str {
        "vxi"
    }

    fn create(&mut self, path: &Path, subimages: &[ImageSpec]) -> IoResult<ImageSpec> {
        let first = subimages
            .first()
            .ok_or_else(|| IoError::open(path, "no subimages given"))?;
        let file = File::create(path).map_err(|e| IoError::open(path, e))?;
        let mut file = BufWriter::new(file);
        file.write_all(MAGIC)?;
        self.file = Some(file);
        Ok(self.bind(first))
    }

    fn append_subimage(&mut self, spec: &ImageSpec) -> IoResult<ImageSpec> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| IoError::NotOpen("vxi: no file open".into()))?;
        write_record(file, &self.spec, &self.pixels)?;
        Ok(self.bind(spec))
    }

    fn write_scanline(&mut self, y: i32, z: i32, data: &[u8]) -> IoResult<()> {
        let roi = self.spec.roi();
        let row = self.spec.scanline_bytes();
        let at = pixel_offset(&roi, roi.xbegin, y, z, self.spec.pixel_bytes());
        self.pixels[at..at + row].copy_from_slice(&data[..row]);
        Ok(())
    }

    fn write_tile(&mut self, x: i32, y: i32, z: i32, data: &[u8]) -> IoResult<()> {
        let roi = self.spec.roi();
        let extent = tile_extent(&self.spec, x, y, z);
        let clip = extent
            .intersect(&roi)
            .ok_or_else(|| IoError::geometry(format!("tile at ({x}, {y}, {z}) misses {roi}")))?;
        copy_region(data, &extent, &mut self.pixels, &roi, &clip, self.spec.pixel_bytes());
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        let Some(mut file) = self.file.take() else {
            return Ok(());
        };
        let pixels = std::mem::take(&mut self.pixels);
        write_record(&mut file, &self.spec, &pixels)?;
        file.flush()?;
        Ok(())
    }
}

// === Reader ===

struct Record {
    spec: ImageSpec,
    offset: u64,
}

/// Reader backend.
#[derive(Default)]
pub struct VxiInput {
    file: Option<BufReader<File>>,
    records: Vec<Record>,
    current: usize,
}

impl VxiInput {
    fn parse(path: &Path, reader: &mut BufReader<File>, len: u64) -> IoResult<Vec<Record>> {
        let mut magic = [0u8; 4];
        reader
            .read_exact(&mut magic)
            .map_err(|_| IoError::open(path, "truncated vxi signature"))?;
        if &magic != MAGIC {
            return Err(IoError::open(path, "not a vxi file"));
        }

        let mut records = Vec::new();
        let mut pos = MAGIC.len() as u64;
        while pos < len {
            let header_len = reader.read_u32::<LittleEndian>()? as u64;
            let mut header = vec![0u8; header_len.min(len) as usize];
            reader.read_exact(&mut header)?;
            let spec: ImageSpec = serde_yaml::from_slice(&header)
                .map_err(|e| IoError::open(path, format!("bad subimage header: {e}")))?;
            let payload = reader.read_u64::<LittleEndian>()?;
            if payload != spec.image_bytes() {
                return Err(IoError::open(
                    path,
                    format!("payload of {payload} bytes does not match {spec}"),
                ));
            }
            let offset = pos + 4 + header_len + 8;
            pos = offset.saturating_add(payload);
            if pos > len {
                return Err(IoError::open(path, "truncated pixel data"));
            }
            reader.seek(SeekFrom::Start(pos))?;
            records.push(Record { spec, offset });
        }
        if records.is_empty() {
            return Err(IoError::open(path, "file holds no subimages"));
        }
        Ok(records)
    }

    fn current(&mut self) -> IoResult<(&ImageSpec, u64, &mut BufReader<File>)> {
        let file = self
            .file
            .as_mut()
            .ok_or_else(|| IoError::NotOpen("vxi: no file open".into()))?;
        let record = &self.records[self.current];
        Ok((&record.spec, record.offset, file))
    }
}

impl InputBackend for VxiInput {
    fn format_name(&self) -> &'static str {
        "vxi"
    }

    fn open(&mut self, path: &Path) -> IoResult<ImageSpec> {
        let file = File::open(path).map_err(|e| IoError::open(path, e))?;
        let len = file.metadata()?.len();
        let mut reader = BufReader::new(file);
        let records = Self::parse(path, &mut reader, len)?;
        let spec = records[0].spec.clone();
        self.records = records;
        self.file = Some(reader);
        self.current = 0;
        Ok(spec)
    }

    fn num_subimages(&self) -> usize {
        self.records.len()
    }

    fn seek_subimage(&mut self, index: usize) -> IoResult<Option<ImageSpec>> {
        let Some(record) = self.records.get(index) else {
            return Ok(None);
        };
        self.current = index;
        Ok(Some(record.spec.clone()))
    }

    fn read_scanline(&mut self, y: i32, z: i32, out: &mut [u8]) -> IoResult<()> {
        let (spec, offset, file) = self.current()?;
        let roi = spec.roi();
        let row = spec.scanline_bytes();
        let at = offset + pixel_offset(&roi, roi.xbegin, y, z, spec.pixel_bytes()) as u64;
        file.seek(SeekFrom::Start(at))?;
        file.read_exact(&mut out[..row])?;
        Ok(())
    }

    fn read_tile(&mut self, x: i32, y: i32, z: i32, out: &mut [u8]) -> IoResult<()> {
        let (spec, offset, file) = self.current()?;
        let roi = spec.roi();
        let pixel_bytes = spec.pixel_bytes();
        let extent = tile_extent(spec, x, y, z);
        let clip = extent
            .intersect(&roi)
            .ok_or_else(|| IoError::geometry(format!("tile at ({x}, {y}, {z}) misses {roi}")))?;
        let span = clip.width() as usize * pixel_bytes;

        out.fill(0);
        for tz in clip.zbegin..clip.zend {
            for ty in clip.ybegin..clip.yend {
                let src = offset + pixel_offset(&roi, clip.xbegin, ty, tz, pixel_bytes) as u64;
                let dst = pixel_offset(&extent, clip.xbegin, ty, tz, pixel_bytes);
                file.seek(SeekFrom::Start(src))?;
                file.read_exact(&mut out[dst..dst + span])?;
            }
        }
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        self.file = None;
        self.records.clear();
        self.current = 0;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vfx_spec::TypeDesc;

    #[test]
    fn test_record_layout() {
        let spec = ImageSpec::new(2, 1, 1, TypeDesc::UInt8);
        let mut buf = Vec::new();
        write_record(&mut buf, &spec, &[7, 9]).unwrap();

        let header_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
        let header = std::str::from_utf8(&buf[4..4 + header_len]).unwrap();
        assert!(header.contains("width: 2"));
        assert!(header.contains("format: uint8"));
        assert_eq!(&buf[buf.len() - 2..], &[7, 9]);
    }

    #[test]
    fn test_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake.vxi");
        std::fs::write(&path, b"NOPE").unwrap();
        let mut input = VxiInput::default();
        assert!(matches!(input.open(&path), Err(IoError::Open { .. })));
    }

    #[test]
    fn test_rejects_truncated_payload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("short.vxi");
        let spec = ImageSpec::new(4, 4, 3, TypeDesc::UInt8);
        let mut bytes = MAGIC.to_vec();
        write_record(&mut bytes, &spec, &vec![1u8; 48]).unwrap();
        bytes.truncate(bytes.len() - 10);
        std::fs::write(&path, &bytes).unwrap();

        let mut input = VxiInput::default();
        let err = input.open(&path).unwrap_err();
        assert!(err.to_string().contains("truncated"));
    }

    fn crafted(dir: &Path, spec: &ImageSpec) -> std::path::PathBuf {
        let path = dir.join("crafted.vxi");
        let mut bytes = MAGIC.to_vec();
        write_record(&mut bytes, spec, &vec![0u8; spec.image_bytes() as usize]).unwrap();
        std::fs::write(&path, &bytes).unwrap();
        path
    }

    #[test]
    fn test_header_with_huge_tiles_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = ImageSpec::new(16, 16, 4, TypeDesc::Float);
        spec.tile_width = 1 << 20;
        spec.tile_height = 1 << 20;
        let path = crafted(dir.path(), &spec);

        // The backend parses it; the reader refuses before any tile is allocated.
        assert!(VxiInput::default().open(&path).is_ok());
        let mut input = crate::ImageInput::from_backend(format_info(), new_input(), crate::IoConfig::default());
        let err = input.open(&path).unwrap_err();
        assert!(matches!(err, IoError::Open { .. }), "{err}");
        assert!(!input.is_open());
    }

    #[test]
    fn test_header_past_coordinate_range_is_refused() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = ImageSpec::new(16, 16, 1, TypeDesc::UInt8);
        spec.y = i32::MAX - 4;
        let path = crafted(dir.path(), &spec);

        let mut input = crate::ImageInput::from_backend(format_info(), new_input(), crate::IoConfig::default());
        let err = input.open(&path).unwrap_err();
        assert!(err.to_string().contains("malformed header"), "{err}");
    }
}
