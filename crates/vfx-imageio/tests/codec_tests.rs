//! PNG and TIFF plugins behind the common interface.

#![cfg(any(feature = "png", feature = "tiff"))]

use std::path::Path;
use vfx_imageio::{ImageInput, ImageOutput};
use vfx_spec::{ImageSpec, TypeDesc};

fn write(path: &Path, spec: &ImageSpec, format: TypeDesc, pixels: &[u8]) -> ImageSpec {
    let mut out = ImageOutput::create(path.to_str().unwrap()).expect("create");
    out.open(path, spec).expect("open");
    let bound = out.spec().clone();
    out.write_image(format, pixels).expect("write_image");
    out.close().expect("close");
    bound
}

fn pattern(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 13 % 256) as u8).collect()
}

#[cfg(feature = "png")]
#[test]
fn png_rgba8() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("rgba.png");
    let spec = ImageSpec::new(13, 7, 4, TypeDesc::UInt8);
    let pixels = pattern(13 * 7 * 4);
    write(&path, &spec, TypeDesc::UInt8, &pixels);

    let mut input = ImageInput::open_file(&path).unwrap();
    assert_eq!(input.format_name(), "png");
    assert_eq!(input.num_subimages(), 1);
    let read = input.spec().clone();
    assert_eq!((read.width, read.height, read.nchannels), (13, 7, 4));
    assert_eq!(read.alpha_channel, Some(3));
    let back: Vec<u8> = input.read_image_vec().unwrap();
    assert_eq!(back, pixels);
    assert!(!input.seek_subimage(1).unwrap());
}

#[cfg(feature = "png")]
#[test]
fn png_binds_sixteen_bits() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("deep.png");
    let spec = ImageSpec::new(5, 3, 1, TypeDesc::Float);
    let values: Vec<f32> = (0..15).map(|i| i as f32 / 14.0).collect();

    let mut out = ImageOutput::create("png").unwrap();
    out.open(&path, &spec).unwrap();
    assert_eq!(out.spec().format, TypeDesc::UInt16);
    out.write_image_samples(&values).unwrap();
    out.close().unwrap();

    let mut input = ImageInput::open_file(&path).unwrap();
    assert_eq!(input.spec().format, TypeDesc::UInt16);
    let back: Vec<f32> = input.read_image_vec().unwrap();
    for (a, b) in values.iter().zip(&back) {
        approx::assert_abs_diff_eq!(*a, *b, epsilon = 1.0 / 65535.0);
    }
}

#[cfg(feature = "png")]
#[test]
fn png_text_attributes() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("text.png");
    let mut spec = ImageSpec::new(2, 2, 3, TypeDesc::UInt8);
    spec.attribute("Artist", "comp");
    spec.attribute("Software", "vfx-imageio");
    spec.attribute("frame", 12);
    write(&path, &spec, TypeDesc::UInt8, &[0; 12]);

    let input = ImageInput::open_file(&path).unwrap();
    let read = input.spec();
    assert_eq!(read.get_string_attribute("Artist", ""), "comp");
    assert_eq!(read.get_string_attribute("Software", ""), "vfx-imageio");
    assert!(read.find_attribute("frame").is_none());
}

#[cfg(feature = "png")]
#[test]
fn png_binds_the_origin_to_zero() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("origin.png");
    let mut spec = ImageSpec::new(4, 2, 1, TypeDesc::UInt8);
    spec.x = 10;
    spec.y = 20;
    spec.full_width = 64;
    spec.full_height = 64;
    let pixels = pattern(8);

    let mut out = ImageOutput::create("png").unwrap();
    out.open(&path, &spec).unwrap();
    let bound = out.spec().clone();
    assert_eq!((bound.x, bound.y), (0, 0));
    assert_eq!(bound.roi_full(), bound.roi());
    // Rows are addressed in the bound window.
    assert!(out.write_scanline(20, 0, TypeDesc::UInt8, &pixels[..4]).is_err());
    out.write_scanline(0, 0, TypeDesc::UInt8, &pixels[..4]).unwrap();
    out.write_scanline(1, 0, TypeDesc::UInt8, &pixels[4..]).unwrap();
    out.close().unwrap();

    let mut input = ImageInput::open_file(&path).unwrap();
    assert_eq!(input.spec().roi(), bound.roi());
    assert_eq!(input.spec().roi_full(), bound.roi_full());
    assert_eq!(input.read_image_vec::<u8>().unwrap(), pixels);
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_storage_types() {
    let dir = tempfile::tempdir().unwrap();
    let cases = [
        (TypeDesc::UInt8, TypeDesc::UInt8),
        (TypeDesc::Int16, TypeDesc::UInt16),
        (TypeDesc::Half, TypeDesc::Float),
    ];
    for (i, (requested, stored)) in cases.into_iter().enumerate() {
        let path = dir.path().join(format!("type{i}.tif"));
        let spec = ImageSpec::new(6, 4, 3, requested);
        let pixels = pattern(6 * 4 * 3);
        let bound = write(&path, &spec, TypeDesc::UInt8, &pixels);
        assert_eq!(bound.format, stored);

        let mut input = ImageInput::open_file(&path).unwrap();
        assert_eq!(input.spec().format, stored);
        let back: Vec<u8> = input.read_image_vec().unwrap();
        assert_eq!(back, pixels, "{requested}");
    }
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_text_tags() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tags.tif");
    let mut spec = ImageSpec::new(3, 3, 1, TypeDesc::UInt8);
    spec.attribute("Artist", "paint");
    spec.attribute("ImageDescription", "matte pass");
    spec.attribute("oiio:ColorSpace", "sRGB");
    write(&path, &spec, TypeDesc::UInt8, &[1; 9]);

    let input = ImageInput::open_file(&path).unwrap();
    let read = input.spec();
    assert_eq!(read.get_string_attribute("Artist", ""), "paint");
    assert_eq!(read.get_string_attribute("ImageDescription", ""), "matte pass");
    assert!(read.find_attribute("oiio:ColorSpace").is_none());
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_crop_window() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("crop.tif");
    let mut spec = ImageSpec::new(16, 16, 3, TypeDesc::UInt8);
    spec.x = 32;
    spec.y = 128;
    spec.full_width = 640;
    spec.full_height = 480;

    let mut out = ImageOutput::create(path.to_str().unwrap()).unwrap();
    assert!(out.supports("origin"));
    assert!(out.supports("displaywindow"));
    assert!(!out.supports("negativeorigin"));
    out.open(&path, &spec).unwrap();
    assert_eq!(out.spec(), &spec);
    for y in 128..144 {
        let row = vec![(y - 128) as u8; 16 * 3];
        out.write_scanline(y, 0, TypeDesc::UInt8, &row).unwrap();
    }
    out.close().unwrap();

    let mut input = ImageInput::open_file(&path).unwrap();
    let read = input.spec().clone();
    assert_eq!((read.x, read.y, read.width, read.height), (32, 128, 16, 16));
    assert_eq!((read.full_x, read.full_y), (0, 0));
    assert_eq!((read.full_width, read.full_height), (640, 480));
    let mut row = vec![0u8; 16 * 3];
    input.read_scanline(130, 0, TypeDesc::UInt8, &mut row).unwrap();
    assert!(row.iter().all(|&v| v == 2));
    assert!(input.read_scanline(0, 0, TypeDesc::UInt8, &mut row).is_err());
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_refuses_negative_origin() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("negative.tif");
    let mut spec = ImageSpec::new(4, 4, 1, TypeDesc::UInt8);
    spec.x = -2;
    let mut out = ImageOutput::create("tif").unwrap();
    let err = out.open(&path, &spec).unwrap_err();
    assert!(matches!(err, vfx_imageio::IoError::Open { .. }), "{err}");
    assert!(!out.is_open());
}

#[cfg(feature = "tiff")]
#[test]
fn tiff_rejects_two_channels() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("ya.tif");
    let mut out = ImageOutput::create("tif").unwrap();
    let err = out.open(&path, &ImageSpec::new(2, 2, 2, TypeDesc::UInt8)).unwrap_err();
    assert!(matches!(err, vfx_imageio::IoError::Open { .. }));
    assert!(!out.is_open());
}
