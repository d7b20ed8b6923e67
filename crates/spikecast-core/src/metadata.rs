//! Per-channel metadata model and the reader that renders raw values.
//!
//! Channels declare their metadata layout as a list of
//! [`MetadataDescriptor`]s; each event then carries one raw
//! [`MetadataValue`] per descriptor. [`read`] turns a raw payload into a
//! textual [`MetaValue`] for JSON enrichment.

use bytes::Bytes;

/// Scalar types a metadata descriptor may declare.
///
/// The set is closed: [`read`] matches on it exhaustively with no default
/// arm, so adding or removing a type is a compile-time-checked change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScalarType {
    /// Raw text, decoded as UTF-8.
    Char,
    Int8,
    Uint8,
    Int16,
    Uint16,
    Int32,
    Uint32,
    Int64,
    Uint64,
    Float,
    Double,
}

impl ScalarType {
    /// Size of one element, in bytes.
    #[must_use]
    pub const fn element_size(self) -> usize {
        match self {
            ScalarType::Char | ScalarType::Int8 | ScalarType::Uint8 => 1,
            ScalarType::Int16 | ScalarType::Uint16 => 2,
            ScalarType::Int32 | ScalarType::Uint32 | ScalarType::Float => 4,
            ScalarType::Int64 | ScalarType::Uint64 | ScalarType::Double => 8,
        }
    }
}

/// A named, typed metadata attribute declared on a channel.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataDescriptor {
    /// Attribute name, used as the JSON field name.
    pub name: String,
    /// Declared element type.
    pub scalar_type: ScalarType,
    /// Declared element count.
    pub count: usize,
}

impl MetadataDescriptor {
    /// Declared payload size, in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.scalar_type.element_size() * self.count
    }
}

/// A raw metadata payload attached to an event.
///
/// Interpreted using the matching descriptor's declared type.
#[derive(Debug, Clone, PartialEq)]
pub struct MetadataValue {
    /// Raw little-endian payload bytes.
    pub bytes: Bytes,
    /// Number of elements in the payload.
    pub count: usize,
}

/// A rendered metadata value, ready to become a JSON field.
#[derive(Debug, Clone, PartialEq)]
pub enum MetaValue {
    /// A decoded text payload.
    Text(String),
    /// A single numeric element, rendered as decimal text.
    Scalar(String),
    /// Multiple numeric elements, each rendered as decimal text.
    List(Vec<String>),
}

/// Little-endian scalar decoding for the numeric metadata types.
trait LeScalar: Sized + std::fmt::Display {
    const SIZE: usize;

    fn from_le(chunk: &[u8]) -> Self;
}

macro_rules! le_scalar {
    ($($ty:ty => $size:literal),* $(,)?) => {
        $(
            impl LeScalar for $ty {
                const SIZE: usize = $size;

                fn from_le(chunk: &[u8]) -> Self {
                    let mut raw = [0u8; $size];
                    raw.copy_from_slice(chunk);
                    <$ty>::from_le_bytes(raw)
                }
            }
        )*
    };
}

le_scalar!(
    i8 => 1, u8 => 1,
    i16 => 2, u16 => 2,
    i32 => 4, u32 => 4,
    i64 => 8, u64 => 8,
    f32 => 4, f64 => 8,
);

fn numeric<T: LeScalar>(bytes: &[u8], count: usize) -> MetaValue {
    let mut rendered = Vec::with_capacity(count);
    for chunk in bytes.chunks_exact(T::SIZE).take(count) {
        rendered.push(T::from_le(chunk).to_string());
    }
    if count == 1 {
        MetaValue::Scalar(rendered.pop().unwrap_or_default())
    } else {
        MetaValue::List(rendered)
    }
}

/// Render a raw metadata payload using its declared type.
///
/// Numeric payloads become decimal text, one scalar when `count == 1` and an
/// ordered list otherwise; `Char` payloads decode directly as text with
/// trailing NUL padding trimmed. A payload whose length does not match the
/// declared type is a defect in the producing pipeline; debug builds assert,
/// release builds render the complete elements that are present.
#[must_use]
pub fn read(scalar_type: ScalarType, bytes: &[u8], count: usize) -> MetaValue {
    debug_assert_eq!(
        bytes.len(),
        scalar_type.element_size() * count,
        "metadata payload does not match its declared type"
    );
    match scalar_type {
        ScalarType::Char => {
            let text = String::from_utf8_lossy(bytes);
            MetaValue::Text(text.trim_end_matches('\0').to_string())
        }
        ScalarType::Int8 => numeric::<i8>(bytes, count),
        ScalarType::Uint8 => numeric::<u8>(bytes, count),
        ScalarType::Int16 => numeric::<i16>(bytes, count),
        ScalarType::Uint16 => numeric::<u16>(bytes, count),
        ScalarType::Int32 => numeric::<i32>(bytes, count),
        ScalarType::Uint32 => numeric::<u32>(bytes, count),
        ScalarType::Int64 => numeric::<i64>(bytes, count),
        ScalarType::Uint64 => numeric::<u64>(bytes, count),
        ScalarType::Float => numeric::<f32>(bytes, count),
        ScalarType::Double => numeric::<f64>(bytes, count),
    }
}
