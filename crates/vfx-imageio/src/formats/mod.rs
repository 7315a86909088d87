//! Built-in format plugins.
//!
//! | Format | Tiles | Sub-images | Append | Pixel types                | Metadata            |
//! |--------|-------|------------|--------|----------------------------|---------------------|
//! | vxi    | yes   | yes        | yes    | all                        | every attribute     |
//! | png    | no    | no         | no     | uint8, uint16              | string -> tEXt      |
//! | tiff   | no    | yes        | yes    | uint8, uint16, float       | baseline text tags  |
//!
//! `png` and `tiff` are behind the Cargo features of the same name.

pub mod vxi;

#[cfg(feature = "png")]
pub mod png;

#[cfg(feature = "tiff")]
pub mod tiff;

use crate::FormatInfo;

/// Plugins compiled into this build, in detection priority order.
pub(crate) fn builtin_formats() -> Vec<FormatInfo> {
    let mut formats = vec![vxi::format_info()];
    #[cfg(feature = "png")]
    formats.push(png::format_info());
    #[cfg(feature = "tiff")]
    formats.push(tiff::format_info());
    formats
}
