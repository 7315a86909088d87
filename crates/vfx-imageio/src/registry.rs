//! Format registry: filename or format name -> plugin.
//!
//! The registry provides a centralized way to:
//! - Register format plugins with their capability tables
//! - Resolve a plugin by extension or explicit format name
//! - Auto-detect formats by magic bytes
//! - Construct [`ImageInput`] / [`ImageOutput`] handles
//!
//! # Architecture
//!
//! The process-wide table lives behind [`FormatRegistry::global()`] and is
//! built from the built-in plugins on first use. A program that wants a
//! different table hands it to [`FormatRegistry::install`] before the first
//! lookup; afterwards the table is immutable and shared by `&'static`
//! reference, so lookups never lock.
//!
//! Resolution performs no I/O and opens no file.
//!
//! # Example
//!
//! ```rust
//! use vfx_imageio::{Capability, FormatRegistry};
//!
//! let registry = FormatRegistry::global();
//! let info = registry.resolve("shot.0001.vxi").unwrap();
//! assert_eq!(info.name, "vxi");
//! assert!(info.supports(Capability::Tiles));
//!
//! assert!(registry.resolve("notes.txt").is_none());
//! assert_eq!(registry.detect_format(b"VXI1...."), Some("vxi"));
//! ```

use crate::backend::{InputBackend, OutputBackend};
use crate::{Capability, ImageInput, ImageOutput, IoConfig, IoError, IoResult};
use std::path::Path;
use std::sync::OnceLock;
use tracing::debug;

/// Constructs an unopened reader backend.
pub type InputFactory = fn() -> Box<dyn InputBackend>;

/// Constructs an unopened writer backend.
pub type OutputFactory = fn() -> Box<dyn OutputBackend>;

/// Format information entry in the registry.
#[derive(Debug, Clone)]
pub struct FormatInfo {
    /// Format name used for explicit lookups (e.g., "tiff", "png").
    pub name: &'static str,
    /// File extensions without dots (e.g., ["tif", "tiff"]).
    pub extensions: &'static [&'static str],
    /// Capabilities supported by this format.
    pub capabilities: &'static [Capability],
    /// Function to check if header bytes match this format.
    pub can_read: fn(&[u8]) -> bool,
    /// Reader factory (None if the format cannot be read).
    pub create_input: Option<InputFactory>,
    /// Writer factory (None if the format cannot be written).
    pub create_output: Option<OutputFactory>,
}

impl FormatInfo {
    /// Checks a capability against the static table.
    #[inline]
    pub fn supports(&self, capability: Capability) -> bool {
        self.capabilities.contains(&capability)
    }

    /// Checks a capability by canonical name; unknown names answer `false`.
    pub fn supports_name(&self, feature: &str) -> bool {
        Capability::from_name(feature).is_some_and(|c| self.supports(c))
    }
}

/// Central registry of format plugins.
///
/// Registration order is kept: it decides which plugin wins magic-byte
/// detection and the order of [`format_names`](Self::format_names).
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    formats: Vec<FormatInfo>,
}

static GLOBAL: OnceLock<FormatRegistry> = OnceLock::new();

impl FormatRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self { formats: Vec::new() }
    }

    /// Creates a registry holding the built-in plugins enabled at build time.
    pub fn with_builtin_formats() -> Self {
        let mut registry = Self::new();
        for info in crate::formats::builtin_formats() {
            registry.register(info);
        }
        registry
    }

    /// Returns the process-wide registry, built-ins unless
    /// [`install`](Self::install) ran first.
    pub fn global() -> &'static FormatRegistry {
        GLOBAL.get_or_init(Self::with_builtin_formats)
    }

    /// Makes `registry` the process-wide table.
    ///
    /// # Errors
    ///
    /// Hands the registry back if the global table was already initialized
    /// by an earlier lookup or install.
    pub fn install(registry: FormatRegistry) -> Result<(), FormatRegistry> {
        GLOBAL.set(registry)
    }

    /// Registers a format, replacing any entry with the same name.
    pub fn register(&mut self, info: FormatInfo) {
        match self.formats.iter_mut().find(|f| f.name == info.name) {
            Some(slot) => *slot = info,
            None => self.formats.push(info),
        }
    }

    /// Returns an iterator over registered format names.
    pub fn format_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.formats.iter().map(|f| f.name)
    }

    /// Returns format info by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&FormatInfo> {
        self.formats.iter().find(|f| f.name.eq_ignore_ascii_case(name))
    }

    /// Returns format info by file extension (case-insensitive, no dot).
    pub fn get_by_extension(&self, ext: &str) -> Option<&FormatInfo> {
        let ext = ext.trim_start_matches('.');
        self.formats
            .iter()
            .find(|f| f.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
    }

    /// Resolves a filename by its extension, or a bare format name.
    ///
    /// `"out.TIF"` resolves through the extension table; `"tiff"` and `"tif"`
    /// resolve as a name or an extension.
    pub fn resolve(&self, path_or_name: &str) -> Option<&FormatInfo> {
        match Path::new(path_or_name).extension().and_then(|e| e.to_str()) {
            Some(ext) => self.get_by_extension(ext),
            None => self
                .get(path_or_name)
                .or_else(|| self.get_by_extension(path_or_name)),
        }
    }

    /// Detects format from file header bytes.
    pub fn detect_format(&self, header: &[u8]) -> Option<&'static str> {
        self.formats
            .iter()
            .find(|f| (f.can_read)(header))
            .map(|f| f.name)
    }

    /// Checks whether a format supports a capability, by format name.
    pub fn supports(&self, format: &str, capability: Capability) -> bool {
        self.get(format).is_some_and(|f| f.supports(capability))
    }

    /// Returns an unopened writer for a filename or format name.
    ///
    /// # Errors
    ///
    /// [`IoError::UnsupportedFormat`] when nothing matches or the matching
    /// plugin cannot write.
    pub fn create_output(&self, path_or_name: &str) -> IoResult<ImageOutput> {
        let info = self.resolve_or_err(path_or_name)?;
        let factory = info
            .create_output
            .ok_or_else(|| IoError::UnsupportedFormat(format!("{} (read-only)", info.name)))?;
        debug!(format = info.name, path = path_or_name, "created output");
        Ok(ImageOutput::from_backend(info.clone(), factory(), IoConfig::default()))
    }

    /// Returns an unopened reader for a filename or format name.
    ///
    /// # Errors
    ///
    /// [`IoError::UnsupportedFormat`] when nothing matches or the matching
    /// plugin cannot read.
    pub fn create_input(&self, path_or_name: &str) -> IoResult<ImageInput> {
        let info = self.resolve_or_err(path_or_name)?;
        let factory = info
            .create_input
            .ok_or_else(|| IoError::UnsupportedFormat(format!("{} (write-only)", info.name)))?;
        debug!(format = info.name, path = path_or_name, "created input");
        Ok(ImageInput::from_backend(info.clone(), factory(), IoConfig::default()))
    }

    fn resolve_or_err(&self, path_or_name: &str) -> IoResult<&FormatInfo> {
        self.resolve(path_or_name).ok_or_else(|| {
            let what = Path::new(path_or_name)
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or(path_or_name);
            IoError::UnsupportedFormat(what.to_string())
        })
    }
}
