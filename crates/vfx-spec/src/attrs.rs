//! Ordered, typed attribute storage for image metadata.
//!
//! Every [`ImageSpec`](crate::ImageSpec) carries an [`Attrs`] table holding
//! format-specific and semantic metadata ("Artist", "oiio:ColorSpace",
//! "compression", ...). The table keeps insertion order: two tables are
//! equal only if they hold the same `(key, value)` pairs in the same order,
//! which is what write-then-read verification compares.
//!
//! # Example
//!
//! ```rust
//! use vfx_spec::{Attrs, AttrValue};
//!
//! let mut attrs = Attrs::new();
//! attrs.set("Artist", "Jane");
//! attrs.set("FrameRate", 24);
//! attrs.set("Artist", "John"); // replaces in place
//!
//! assert_eq!(attrs.get_str("Artist"), Some("John"));
//! assert_eq!(attrs.keys().collect::<Vec<_>>(), vec!["Artist", "FrameRate"]);
//! assert_eq!(attrs.get("artist"), None); // keys are case-sensitive
//! ```
//!
//! # Reserved keys
//!
//! Keys starting with [`RESERVED_PREFIX`] carry meaning for the I/O layer
//! itself. Everything else belongs to the caller and is never renamed or
//! dropped by the core.

/// Prefix of implementation-semantic attribute names.
pub const RESERVED_PREFIX: &str = "oiio:";

/// Color space tag attribute.
pub const COLORSPACE: &str = "oiio:ColorSpace";

/// Bits actually used per sample when narrower than the storage type.
pub const BITS_PER_SAMPLE: &str = "oiio:BitsPerSample";

/// Typed attribute value.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum AttrValue {
    /// Signed 32-bit integer.
    Int(i32),
    /// Unsigned 32-bit integer.
    UInt(u32),
    /// Signed 64-bit integer.
    Int64(i64),
    /// 32-bit float.
    Float(f32),
    /// 64-bit float.
    Double(f64),
    /// UTF-8 string.
    Str(String),
    /// Signed rational (numerator, denominator).
    Rational(i32, i32),
    /// Integer array.
    IntList(Vec<i32>),
    /// Float array.
    FloatList(Vec<f32>),
    /// 4x4 matrix, row-major.
    Matrix44([f32; 16]),
}

impl AttrValue {
    /// Returns the type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Int64(_) => "int64",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::Str(_) => "string",
            Self::Rational(_, _) => "rational",
            Self::IntList(_) => "int[]",
            Self::FloatList(_) => "float[]",
            Self::Matrix44(_) => "matrix44",
        }
    }

    /// Returns the value as an `i64` if it is an integer that fits.
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v as i64),
            Self::UInt(v) => Some(*v as i64),
            Self::Int64(v) => Some(*v),
            _ => None,
        }
    }

    /// Returns the value as an `f64`; integers and rationals widen.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(v) => Some(*v as f64),
            Self::Double(v) => Some(*v),
            Self::Rational(n, d) if *d != 0 => Some(*n as f64 / *d as f64),
            _ => self.as_int().map(|v| v as f64),
        }
    }

    /// Returns the string slice if this is a string value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl std::fmt::Display for AttrValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "{v}"),
            Self::UInt(v) => write!(f, "{v}"),
            Self::Int64(v) => write!(f, "{v}"),
            Self::Float(v) => write!(f, "{v}"),
            Self::Double(v) => write!(f, "{v}"),
            Self::Str(s) => write!(f, "\"{s}\""),
            Self::Rational(n, d) => write!(f, "{n}/{d}"),
            Self::IntList(v) => write_list(f, v),
            Self::FloatList(v) => write_list(f, v),
            Self::Matrix44(m) => write_list(f, m),
        }
    }
}

fn write_list<T: std::fmt::Display>(f: &mut std::fmt::Formatter<'_>, items: &[T]) -> std::fmt::Result {
    for (i, v) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{v}")?;
    }
    Ok(())
}

impl From<i32> for AttrValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<u32> for AttrValue {
    fn from(v: u32) -> Self {
        Self::UInt(v)
    }
}

impl From<i64> for AttrValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f32> for AttrValue {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for AttrValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for AttrValue {
    fn from(v: String) -> Self {
        Self::Str(v)
    }
}

impl From<&str> for AttrValue {
    fn from(v: &str) -> Self {
        Self::Str(v.to_string())
    }
}

impl From<Vec<i32>> for AttrValue {
    fn from(v: Vec<i32>) -> Self {
        Self::IntList(v)
    }
}

impl From<Vec<f32>> for AttrValue {
    fn from(v: Vec<f32>) -> Self {
        Self::FloatList(v)
    }
}

impl From<[f32; 16]> for AttrValue {
    fn from(v: [f32; 16]) -> Self {
        Self::Matrix44(v)
    }
}

/// Ordered attribute table: string key -> typed value.
///
/// Lookups are linear; image headers hold tens of entries, not thousands.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct Attrs {
    entries: Vec<(String, AttrValue)>,
}

impl Attrs {
    /// Creates an empty table.
    #[inline]
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Inserts or overwrites a value.
    ///
    /// An existing key keeps its position; a new key is appended.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<AttrValue>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, slot)) => *slot = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Gets a value by exact key.
    pub fn get(&self, key: &str) -> Option<&AttrValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Removes a key, returning its value.
    pub fn remove(&mut self, key: &str) -> Option<AttrValue> {
        let idx = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(idx).1)
    }

    /// Checks if a key exists.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Gets a string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(AttrValue::as_str)
    }

    /// Gets an integer value.
    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(AttrValue::as_int)
    }

    /// Gets a float value (integers widen).
    pub fn get_float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(AttrValue::as_float)
    }

    /// Number of entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no entries are stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates `(key, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AttrValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterates keys in insertion order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Removes every entry.
    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<K: Into<String>, V: Into<AttrValue>> FromIterator<(K, V)> for Attrs {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut attrs = Attrs::new();
        for (k, v) in iter {
            attrs.set(k, v);
        }
        attrs
    }
}

/// Returns true if `key` is in the reserved implementation namespace.
#[inline]
pub fn is_reserved(key: &str) -> bool {
    key.starts_with(RESERVED_PREFIX)
}
