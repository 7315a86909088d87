//! Registry lookup and third-party plugins.

use std::path::Path;
use vfx_imageio::{Capability, FormatInfo, FormatRegistry, InputBackend, IoError, IoResult};
use vfx_spec::{ImageSpec, TypeDesc};

/// Read-only plugin producing a constant gray ramp for any path.
#[derive(Default)]
struct RampInput {
    spec: Option<ImageSpec>,
}

impl InputBackend for RampInput {
    fn format_name(&self) -> &'static str {
        "ramp"
    }

    fn open(&mut self, _path: &Path) -> IoResult<ImageSpec> {
        let spec = ImageSpec::new(4, 2, 1, TypeDesc::UInt8);
        self.spec = Some(spec.clone());
        Ok(spec)
    }

    fn num_subimages(&self) -> usize {
        1
    }

    fn seek_subimage(&mut self, index: usize) -> IoResult<Option<ImageSpec>> {
        Ok(self.spec.clone().filter(|_| index == 0))
    }

    fn read_scanline(&mut self, y: i32, _z: i32, out: &mut [u8]) -> IoResult<()> {
        for (x, v) in out[..4].iter_mut().enumerate() {
            *v = (y * 4 + x as i32) as u8;
        }
        Ok(())
    }

    fn close(&mut self) -> IoResult<()> {
        self.spec = None;
        Ok(())
    }
}

fn new_ramp() -> Box<dyn InputBackend> {
    Box::new(RampInput::default())
}

fn ramp_info() -> FormatInfo {
    FormatInfo {
        name: "ramp",
        extensions: &["ramp", "rmp"],
        capabilities: &[Capability::RandomAccess],
        can_read: |h| h.starts_with(b"RAMP"),
        create_input: Some(new_ramp),
        create_output: None,
    }
}

#[test]
fn builtin_lookup() {
    let registry = FormatRegistry::with_builtin_formats();
    assert_eq!(registry.resolve("shot.0001.VXI").map(|f| f.name), Some("vxi"));
    assert_eq!(registry.resolve("vxi").map(|f| f.name), Some("vxi"));
    assert!(registry.resolve("shot.exr").is_none());
    assert_eq!(registry.detect_format(b"VXI1...."), Some("vxi"));
    assert!(registry.supports("vxi", Capability::Tiles));
    assert!(!registry.supports("nosuch", Capability::Tiles));

    #[cfg(feature = "tiff")]
    {
        assert_eq!(registry.resolve("plate.tif").map(|f| f.name), Some("tiff"));
        assert_eq!(registry.resolve("TIF").map(|f| f.name), Some("tiff"));
        assert_eq!(registry.detect_format(b"II*\0rest"), Some("tiff"));
    }
}

#[test]
fn custom_plugin() {
    let mut registry = FormatRegistry::new();
    registry.register(ramp_info());
    assert_eq!(registry.format_names().collect::<Vec<_>>(), vec!["ramp"]);

    let err = registry.create_output("out.ramp").unwrap_err();
    assert!(matches!(err, IoError::UnsupportedFormat(_)));

    let mut input = registry.create_input("in.rmp").unwrap();
    assert!(input.supports_capability(Capability::RandomAccess));
    assert!(!input.supports_capability(Capability::Tiles));
    input.open("anything.rmp").unwrap();
    let pixels: Vec<u8> = input.read_image_vec().unwrap();
    assert_eq!(pixels, (0..8).collect::<Vec<u8>>());
    input.close().unwrap();
}

#[test]
fn register_replaces_by_name() {
    let mut registry = FormatRegistry::with_builtin_formats();
    let before = registry.format_names().count();
    let mut info = ramp_info();
    info.name = "vxi";
    registry.register(info);
    assert_eq!(registry.format_names().count(), before);
    assert_eq!(registry.get("VXI").map(|f| f.extensions), Some(&["ramp", "rmp"][..]));
}
