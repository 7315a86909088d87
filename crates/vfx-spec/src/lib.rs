//! # vfx-spec
//!
//! Value types describing an image independently of any file format.
//!
//! - [`ImageSpec`] - geometry, data/display windows, tiling, channel layout
//! - [`TypeDesc`] - storage type of a channel sample
//! - [`Sample`], [`convert_pixels`] - typed samples and layout conversion
//! - [`Attrs`], [`AttrValue`] - ordered metadata table
//! - [`Roi`] - half-open pixel regions
//!
//! ## Crate Structure
//!
//! ```text
//! vfx-spec (this crate)
//!    ^
//!    |
//!    +-- vfx-imageio (ImageInput / ImageOutput, format registry, plugins)
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` - Enable serialization for [`ImageSpec`], [`Attrs`] and [`TypeDesc`]

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod attrs;
pub mod error;
pub mod roi;
pub mod sample;
pub mod spec;
pub mod typedesc;

pub use attrs::{is_reserved, AttrValue, Attrs, BITS_PER_SAMPLE, COLORSPACE, RESERVED_PREFIX};
pub use error::{Result, SpecError};
pub use roi::Roi;
pub use sample::{convert_pixels, layout_bytes, load_sample, store_sample, Sample};
pub use spec::ImageSpec;
pub use typedesc::TypeDesc;
