//! Format capability names.
//!
//! Each plugin declares a static set of [`Capability`] values in its
//! [`FormatInfo`](crate::FormatInfo). Callers ask before they rely on a
//! feature, either with the enum or with the canonical string name:
//!
//! ```rust
//! use vfx_imageio::Capability;
//!
//! assert_eq!(Capability::from_name("tiles"), Some(Capability::Tiles));
//! assert_eq!(Capability::AppendSubimage.name(), "appendsubimage");
//! assert_eq!(Capability::from_name("teleport"), None);
//! ```

use std::fmt;

/// A feature a format plugin may or may not support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Capability {
    /// Tile-organized pixel storage.
    Tiles,
    /// More than one sub-image per file.
    MultiImage,
    /// Sub-images may be appended one at a time without pre-declaration.
    AppendSubimage,
    /// Scanlines/tiles may be written in any order.
    RandomAccess,
    /// Channels may have different storage types.
    ChannelFormats,
    /// Display window stored independently of the data window.
    DisplayWindow,
    /// Data window origin other than (0, 0).
    Origin,
    /// Data window origin may be negative.
    NegativeOrigin,
    /// Any attribute name/value is persisted.
    ArbitraryMetadata,
    /// An alpha channel is recognized.
    Alpha,
    /// Any channel count is accepted.
    NChannels,
}

impl Capability {
    /// Every capability, in declaration order.
    pub const ALL: [Capability; 11] = [
        Self::Tiles,
        Self::MultiImage,
        Self::AppendSubimage,
        Self::RandomAccess,
        Self::ChannelFormats,
        Self::DisplayWindow,
        Self::Origin,
        Self::NegativeOrigin,
        Self::ArbitraryMetadata,
        Self::Alpha,
        Self::NChannels,
    ];

    /// Canonical query name.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Tiles => "tiles",
            Self::MultiImage => "multiimage",
            Self::AppendSubimage => "appendsubimage",
            Self::RandomAccess => "random_access",
            Self::ChannelFormats => "channelformats",
            Self::DisplayWindow => "displaywindow",
            Self::Origin => "origin",
            Self::NegativeOrigin => "negativeorigin",
            Self::ArbitraryMetadata => "arbitrary_metadata",
            Self::Alpha => "alpha",
            Self::NChannels => "nchannels",
        }
    }

    /// Looks up a capability by canonical name; unknown names give `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == name)
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_round_trip() {
        for cap in Capability::ALL {
            assert_eq!(Capability::from_name(cap.name()), Some(cap));
        }
    }

    #[test]
    fn test_names_are_case_sensitive() {
        assert_eq!(Capability::from_name("Tiles"), None);
        assert_eq!(Capability::from_name(""), None);
    }
}
