//! Write-then-read round trips through the reference container.

use std::fs;
use std::path::{Path, PathBuf};
use vfx_imageio::{BufferFormat, ImageInput, ImageOutput};
use vfx_spec::{store_sample, AttrValue, ImageSpec, TypeDesc};

fn write_vxi(path: &Path, spec: &ImageSpec, format: impl Into<BufferFormat>, pixels: &[u8]) {
    let mut out = ImageOutput::create("vxi").expect("vxi plugin");
    out.open(path, spec).expect("open");
    out.write_image(format, pixels).expect("write_image");
    out.close().expect("close");
}

fn ramp(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 37 % 251) as u8).collect()
}

fn tiled(width: u32, height: u32, channels: u32, tile: u32) -> ImageSpec {
    let mut spec = ImageSpec::new(width, height, channels, TypeDesc::UInt8);
    spec.tile_width = tile;
    spec.tile_height = tile;
    spec
}

fn join(dir: &tempfile::TempDir, name: &str) -> PathBuf {
    dir.path().join(name)
}

#[test]
fn every_type_survives_native() {
    let dir = tempfile::tempdir().unwrap();
    for format in TypeDesc::ALL {
        let path = join(&dir, &format!("native_{format}.vxi"));
        let spec = ImageSpec::new(9, 5, 3, format);
        let pixels = ramp(spec.image_bytes() as usize);
        write_vxi(&path, &spec, BufferFormat::Native, &pixels);

        let mut input = ImageInput::open_file(&path).unwrap();
        assert_eq!(input.spec().format, format);
        let mut back = vec![0u8; pixels.len()];
        input.read_image(BufferFormat::Native, &mut back).unwrap();
        assert_eq!(back, pixels, "{format}");
    }
}

#[test]
fn uint8_through_float_storage() {
    let dir = tempfile::tempdir().unwrap();
    let path = join(&dir, "float.vxi");
    let spec = ImageSpec::new(16, 4, 3, TypeDesc::Float);
    let pixels = ramp(16 * 4 * 3);
    write_vxi(&path, &spec, TypeDesc::UInt8, &pixels);

    let mut input = ImageInput::open_file(&path).unwrap();
    let floats: Vec<f32> = input.read_image_vec().unwrap();
    assert!((floats[1] - pixels[1] as f32 / 255.0).abs() < 1e-6);
    let bytes: Vec<u8> = input.read_image_vec().unwrap();
    assert_eq!(bytes, pixels);
}

#[test]
fn attributes_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    let path = join(&dir, "attrs.vxi");
    let mut spec = ImageSpec::new(4, 4, 4, TypeDesc::Half);
    spec.attribute("Artist", "lighting");
    spec.attribute("oiio:ColorSpace", "ACEScg");
    spec.attribute("frame", 1001);
    spec.attribute("exposure", 1.5f32);
    spec.attribute("PixelAspectRatio", 2.0f64);
    spec.attribute("framesPerSecond", AttrValue::Rational(24000, 1001));
    spec.attribute("offsets", vec![1, -2, 3]);
    let mut identity = [0.0f32; 16];
    for i in 0..4 {
        identity[i * 5] = 1.0;
    }
    spec.attribute("worldToCamera", identity);

    write_vxi(&path, &spec, TypeDesc::Float, &vec![0u8; 4 * 4 * 4 * 4]);

    let input = ImageInput::open_file(&path).unwrap();
    let read = input.spec();
    assert_eq!(read.extra_attribs, spec.extra_attribs);
    assert_eq!(read.get_string_attribute("Artist", ""), "lighting");
    assert_eq!(read.get_int_attribute("frame", 0), 1001);
    assert_eq!(read.get_float_attribute("exposure", 0.0), 1.5);
    let keys: Vec<&str> = read.extra_attribs.keys().collect();
    assert_eq!(keys[0], "Artist");
    assert_eq!(keys[keys.len() - 1], "worldToCamera");
}

#[test]
fn per_channel_formats() {
    let dir = tempfile::tempdir().unwrap();
    let path = join(&dir, "channels.vxi");
    let mut spec = ImageSpec::new(3, 2, 4, TypeDesc::Half);
    spec.channelformats = vec![TypeDesc::Half, TypeDesc::Half, TypeDesc::Half, TypeDesc::Float];
    spec.channelnames = ["R", "G", "B", "Z"].map(String::from).to_vec();
    spec.alpha_channel = None;
    spec.z_channel = Some(3);

    let layout = spec.channel_layout();
    let pixel_bytes = spec.pixel_bytes();
    assert_eq!(pixel_bytes, 10);
    let mut native = vec![0u8; 6 * pixel_bytes];
    for p in 0..6 {
        let mut at = p * pixel_bytes;
        for (c, format) in layout.iter().enumerate() {
            store_sample(*format, 0.25 * c as f64 + p as f64, &mut native[at..]);
            at += format.size();
        }
    }
    write_vxi(&path, &spec, BufferFormat::Native, &native);

    let mut input = ImageInput::open_file(&path).unwrap();
    assert_eq!(input.spec().channelformats, spec.channelformats);
    assert_eq!(input.spec().z_channel, Some(3));

    let mut back = vec![0u8; native.len()];
    input.read_image(BufferFormat::Native, &mut back).unwrap();
    assert_eq!(back, native);

    let floats: Vec<f32> = input.read_image_vec().unwrap();
    assert_eq!(&floats[..4], &[0.0, 0.25, 0.5, 0.75]);
    assert_eq!(floats[5 * 4 + 3], 5.75);
}

#[test]
fn negative_origin() {
    let dir = tempfile::tempdir().unwrap();
    let path = join(&dir, "origin.vxi");
    let mut spec = ImageSpec::new(8, 4, 1, TypeDesc::UInt8);
    spec.x = -8;
    spec.y = -4;
    let pixels = ramp(32);

    let mut out = ImageOutput::create("vxi").unwrap();
    out.open(&path, &spec).unwrap();
    out.write_scanlines(-4, 0, 0, TypeDesc::UInt8, &pixels).unwrap();
    out.close().unwrap();

    let mut input = ImageInput::open_file(&path).unwrap();
    assert_eq!((input.spec().x, input.spec().y), (-8, -4));
    let mut row = vec![0u8; 8];
    input.read_scanline(-1, 0, TypeDesc::UInt8, &mut row).unwrap();
    assert_eq!(row, &pixels[24..32]);
}

#[test]
fn piecewise_and_whole_writes_match() {
    let dir = tempfile::tempdir().unwrap();
    let spec = ImageSpec::new(20, 10, 3, TypeDesc::UInt16);
    let pixels = ramp(20 * 10 * 3);
    let row = 20 * 3;

    let whole = join(&dir, "whole.vxi");
    write_vxi(&whole, &spec, TypeDesc::UInt8, &pixels);

    let rows = join(&dir, "rows.vxi");
    let mut out = ImageOutput::create("vxi").unwrap();
    out.open(&rows, &spec).unwrap();
    for y in (0..10).rev() {
        out.write_scanline(y, 0, TypeDesc::UInt8, &pixels[y as usize * row..][..row])
            .unwrap();
    }
    out.close().unwrap();

    assert_eq!(fs::read(&whole).unwrap(), fs::read(&rows).unwrap());
}

#[test]
fn tiled_writes_match_whole_image() {
    let dir = tempfile::tempdir().unwrap();
    let spec = tiled(100, 70, 2, 32);
    let pixels = ramp(100 * 70 * 2);

    let whole = join(&dir, "whole.vxi");
    write_vxi(&whole, &spec, TypeDesc::UInt8, &pixels);

    // Cut full tiles out of the image by hand, zero-padded at the edges.
    let tiles = join(&dir, "tiles.vxi");
    let mut out = ImageOutput::create("vxi").unwrap();
    out.open(&tiles, &spec).unwrap();
    for ty in (0..70).step_by(32) {
        for tx in (0..100).step_by(32) {
            let mut tile = vec![0u8; 32 * 32 * 2];
            for j in 0..32 {
                for i in 0..32 {
                    let (x, y) = (tx + i, ty + j);
                    if x < 100 && y < 70 {
                        let src = (y * 100 + x) * 2;
                        let dst = (j * 32 + i) * 2;
                        tile[dst..dst + 2].copy_from_slice(&pixels[src..src + 2]);
                    }
                }
            }
            out.write_tile(tx as i32, ty as i32, 0, TypeDesc::UInt8, &tile).unwrap();
        }
    }
    out.close().unwrap();

    assert_eq!(fs::read(&whole).unwrap(), fs::read(&tiles).unwrap());
}

#[test]
fn edge_tiles_are_zero_padded() {
    let dir = tempfile::tempdir().unwrap();
    let path = join(&dir, "edge.vxi");
    let spec = tiled(100, 70, 1, 64);
    write_vxi(&path, &spec, TypeDesc::UInt8, &vec![200u8; 100 * 70]);

    let mut input = ImageInput::open_file(&path).unwrap();
    let mut tile = vec![7u8; 64 * 64];
    input.read_tile(64, 64, 0, TypeDesc::UInt8, &mut tile).unwrap();
    for j in 0..64 {
        for i in 0..64 {
            let inside = 64 + i < 100 && 64 + j < 70;
            let expected = if inside { 200 } else { 0 };
            assert_eq!(tile[j * 64 + i], expected, "pixel ({i}, {j})");
        }
    }
}

#[test]
fn scanline_reads_from_tiled_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = join(&dir, "emulated.vxi");
    let spec = tiled(50, 40, 3, 16);
    let pixels = ramp(50 * 40 * 3);
    write_vxi(&path, &spec, TypeDesc::UInt8, &pixels);

    let mut input = ImageInput::open_file(&path).unwrap();
    assert!(input.spec().is_tiled());
    let row = 50 * 3;
    let mut scanline = vec![0u8; row];
    for y in [0, 15, 16, 39] {
        input.read_scanline(y, 0, TypeDesc::UInt8, &mut scanline).unwrap();
        assert_eq!(scanline, &pixels[y as usize * row..][..row], "row {y}");
    }

    let mut all = vec![0u8; pixels.len()];
    input.read_scanlines(0, 40, 0, TypeDesc::UInt8, &mut all).unwrap();
    assert_eq!(all, pixels);
}

#[test]
fn scanline_reads_across_tile_sizes() {
    let dir = tempfile::tempdir().unwrap();
    let path = join(&dir, "mixed_tiles.vxi");
    let small = tiled(20, 12, 1, 4);
    let large = tiled(20, 12, 1, 32);
    let small_pixels = ramp(20 * 12);
    let large_pixels: Vec<u8> = ramp(20 * 12).iter().map(|v| v ^ 0xff).collect();

    let mut out = ImageOutput::create("vxi").unwrap();
    out.open_subimages(&path, &[small.clone(), large.clone()]).unwrap();
    out.write_image(TypeDesc::UInt8, &small_pixels).unwrap();
    out.append_subimage(&large).unwrap();
    out.write_image(TypeDesc::UInt8, &large_pixels).unwrap();
    out.close().unwrap();

    // The reader's tile buffer follows the tile size of the current sub-image.
    let mut input = ImageInput::open_file(&path).unwrap();
    let mut row = [0u8; 20];
    for (subimage, pixels) in [(1, &large_pixels), (0, &small_pixels), (1, &large_pixels)] {
        assert!(input.seek_subimage(subimage).unwrap());
        for y in [0, 5, 11] {
            input.read_scanline(y, 0, TypeDesc::UInt8, &mut row).unwrap();
            assert_eq!(&row[..], &pixels[y as usize * 20..][..20], "subimage {subimage} row {y}");
        }
    }
}

#[test]
fn partial_tile_range() {
    let dir = tempfile::tempdir().unwrap();
    let path = join(&dir, "range.vxi");
    let spec = tiled(40, 40, 1, 16);
    let pixels = ramp(40 * 40);
    write_vxi(&path, &spec, TypeDesc::UInt8, &pixels);

    let mut input = ImageInput::open_file(&path).unwrap();
    // Columns [16, 40) of rows [32, 40): the last tile row, clipped.
    let mut region = vec![0u8; 24 * 8];
    input
        .read_tiles(16, 40, 32, 40, 0, 1, TypeDesc::UInt8, &mut region)
        .unwrap();
    for j in 0..8 {
        let src = (32 + j) * 40 + 16;
        assert_eq!(&region[j * 24..][..24], &pixels[src..src + 24]);
    }

    let err = input.read_tiles(8, 40, 0, 16, 0, 1, TypeDesc::UInt8, &mut region);
    assert!(err.is_err());
}

#[test]
fn copy_image_between_files() {
    let dir = tempfile::tempdir().unwrap();
    let src = join(&dir, "src.vxi");
    let dst = join(&dir, "dst.vxi");
    let spec = ImageSpec::new(6, 6, 3, TypeDesc::UInt8);
    let pixels = ramp(6 * 6 * 3);
    write_vxi(&src, &spec, TypeDesc::UInt8, &pixels);

    let mut input = ImageInput::open_file(&src).unwrap();
    let mut out = ImageOutput::create("vxi").unwrap();
    out.open(&dst, &tiled(6, 6, 3, 4)).unwrap();
    out.copy_image(&mut input).unwrap();
    out.close().unwrap();

    let mut copied = ImageInput::open_file(&dst).unwrap();
    let back: Vec<u8> = copied.read_image_vec().unwrap();
    assert_eq!(back, pixels);
}
