//! # vfx-imageio
//!
//! Format-agnostic image input/output.
//!
//! Callers describe an image with an [`ImageSpec`](vfx_spec::ImageSpec),
//! pick a plugin by filename or format name through the [`FormatRegistry`],
//! and drive an [`ImageOutput`] or [`ImageInput`] state machine: open, move
//! pixels as scanlines, tiles or whole images across one or more sub-images,
//! close. The core never knows which codec is behind a handle; it asks the
//! plugin's capability table instead.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use vfx_imageio::{Capability, ImageInput, ImageOutput, IoResult};
//! use vfx_spec::{ImageSpec, TypeDesc};
//!
//! fn main() -> IoResult<()> {
//!     let mut spec = ImageSpec::new(640, 480, 3, TypeDesc::UInt8);
//!
//!     let mut out = ImageOutput::create("plate.vxi")?;
//!     if out.supports_capability(Capability::Tiles) {
//!         spec.tile_width = 64;
//!         spec.tile_height = 64;
//!     }
//!     out.open("plate.vxi", &spec)?;
//!     out.write_image(TypeDesc::UInt8, &vec![0u8; 640 * 480 * 3])?;
//!     out.close()?;
//!
//!     let mut input = ImageInput::open_file("plate.vxi")?;
//!     let pixels: Vec<f32> = input.read_image_vec()?;
//!     assert_eq!(pixels.len(), 640 * 480 * 3);
//!     Ok(())
//! }
//! ```
//!
//! # Built-in formats
//!
//! | Format | Feature | Capabilities                                      |
//! |--------|---------|---------------------------------------------------|
//! | vxi    | always  | all                                               |
//! | png    | `png`   | alpha                                             |
//! | tiff   | `tiff`  | multiimage, appendsubimage, alpha                 |
//!
//! Additional formats plug in by implementing [`OutputBackend`] /
//! [`InputBackend`] and registering a [`FormatInfo`].
//!
//! # Logging
//!
//! Opens, closes, appends and format fallbacks are reported through
//! `tracing` at `debug`, per-call pixel traffic at `trace`, best-effort
//! cleanup failures and attributes a format cannot store at `warn`. Install
//! a subscriber in the application to see them.

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod backend;
pub mod buffer;
pub mod capability;
pub mod config;
pub mod error;
pub mod formats;
pub mod input;
pub mod output;
pub mod registry;

pub use backend::{InputBackend, OpenMode, OutputBackend};
pub use buffer::BufferFormat;
pub use capability::Capability;
pub use config::{IoConfig, Limits};
pub use error::{IoError, IoResult};
pub use input::ImageInput;
pub use output::ImageOutput;
pub use registry::{FormatInfo, FormatRegistry, InputFactory, OutputFactory};

/// Re-export of the spec crate.
pub use vfx_spec;
