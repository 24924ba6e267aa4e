//! Tagged property stream decoder
//!
//! A property stream has no length prefix: each tag reports its own extent
//! and the next tag starts where the previous one ended. The walk stops at
//! the first tag named `None`, and also at the first tag it cannot trust
//! (bad name index, bad size, truncated value). Stopping is not an error:
//! [`decode`] always returns the properties read so far together with the
//! reason it stopped.
//!
//! Array and struct interiors are kept as opaque bytes.

use serde::Serialize;

use super::bytes::{read_i32, read_u32};
use super::constants::{
    NONE_NAME, PROPERTY_START_DEFAULT, PROPERTY_START_SHORT, PROPERTY_START_STACK,
    PROPERTY_TAG_SIZE,
};
use super::names::{NameLookup, NameReference};
use super::package::Package;
use super::tables::ExportEntry;

/// Property type tag, resolved from the tag's type name
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum PropertyType {
    None,
    Struct,
    Int,
    Float,
    Object,
    Name,
    Bool,
    Byte,
    Array,
    Str,
    StringRef,
    Delegate,
    Unknown,
}

impl PropertyType {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "None" => PropertyType::None,
            "StructProperty" => PropertyType::Struct,
            "IntProperty" => PropertyType::Int,
            "FloatProperty" => PropertyType::Float,
            "ObjectProperty" => PropertyType::Object,
            "NameProperty" => PropertyType::Name,
            "BoolProperty" => PropertyType::Bool,
            "ByteProperty" => PropertyType::Byte,
            "ArrayProperty" => PropertyType::Array,
            "StrProperty" => PropertyType::Str,
            "StringRefProperty" => PropertyType::StringRef,
            "DelegateProperty" => PropertyType::Delegate,
            _ => PropertyType::Unknown,
        }
    }

    pub fn short_name(&self) -> &'static str {
        match self {
            PropertyType::Struct => "Struct",
            PropertyType::Int => "Integer",
            PropertyType::Float => "Float",
            PropertyType::Object => "Object",
            PropertyType::Name => "Name",
            PropertyType::Bool => "Bool",
            PropertyType::Byte => "Byte",
            PropertyType::Array => "Array",
            PropertyType::Str => "String",
            PropertyType::StringRef => "String Ref",
            PropertyType::Delegate => "Delegate",
            PropertyType::None | PropertyType::Unknown => "Unknown/None",
        }
    }
}

/// Decoded value of one property
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum PropertyValue {
    /// Int, Object, StringRef, Bool and Byte values
    Int(i64),
    /// Raw IEEE-754 bit pattern
    Float(u32),
    Str(String),
    Name(NameReference),
    /// Array elements, struct bodies, delegates and unknown types
    Opaque(Vec<u8>),
}

impl PropertyValue {
    pub fn as_f32(&self) -> Option<f32> {
        match self {
            PropertyValue::Float(bits) => Some(f32::from_bits(*bits)),
            _ => None,
        }
    }
}

/// Type-specific data carried in the tag after the common 24 bytes
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum TypeDetail {
    None,
    Struct(NameReference),
    Enum(NameReference),
    /// Declared element count; not used to size the value
    Array { count: i32 },
    Delegate { function: i32 },
}

/// One decoded property
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Property {
    pub name: NameReference,
    pub kind: PropertyType,
    pub type_name: NameReference,
    pub size: i32,
    pub array_index: i32,
    pub detail: TypeDetail,
    pub value: PropertyValue,
    /// Offset of the tag inside the buffer
    pub offset: usize,
    /// Offset one past the last byte of this property
    pub end: usize,
    /// Verbatim bytes `offset..end`
    #[serde(skip)]
    pub raw: Vec<u8>,
}

impl Property {
    /// Length of the value as reported in dumps
    pub fn value_len(&self) -> usize {
        match (&self.value, self.kind) {
            (PropertyValue::Str(s), _) => s.chars().count(),
            (PropertyValue::Opaque(bytes), _) => bytes.len(),
            (_, PropertyType::Byte) => self.size.max(0) as usize,
            (PropertyValue::Name(_), _) => 8,
            (_, PropertyType::Bool) => 1,
            _ => 4,
        }
    }
}

/// Why the walk ended
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum StopReason {
    /// A tag named `None` closed the stream
    Terminator,
    /// Fewer than 8 bytes were left for the next tag name
    EndOfBuffer,
    /// The tag name index is outside the name table
    InvalidName,
    /// The tag type index is outside the name table
    InvalidType,
    /// Declared size is negative or larger than the rest of the buffer
    BadSize,
    /// The value runs past the end of the buffer
    Truncated,
}

/// The properties read from one buffer plus where and why reading stopped
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct PropertyStream {
    pub properties: Vec<Property>,
    pub start: usize,
    pub stop: StopReason,
    pub stop_offset: usize,
}

impl PropertyStream {
    /// End offset of the last property, or `start` when empty
    pub fn end(&self) -> usize {
        self.properties.last().map_or(self.start, |p| p.end)
    }

    /// Whether the stream was closed by its `None` terminator
    pub fn is_terminated(&self) -> bool {
        self.stop == StopReason::Terminator
    }

    pub fn len(&self) -> usize {
        self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Property> {
        self.properties.iter()
    }
}

/// Guess where the property list starts inside an export buffer.
///
/// With `has_stack` known it is authoritative. Without it a negative
/// integer at offset 4 selects the stack layout. Otherwise the two integers
/// at offsets 4 and 8 are probed as name indices.
pub fn detect_start<L: NameLookup + ?Sized>(
    names: &L,
    data: &[u8],
    has_stack: Option<bool>,
) -> usize {
    if has_stack == Some(true) {
        return PROPERTY_START_STACK;
    }

    let Some(first) = read_i32(data, 4) else {
        return PROPERTY_START_DEFAULT;
    };
    if has_stack.is_none() && first < 0 {
        return PROPERTY_START_STACK;
    }
    let Some(second) = read_i32(data, 8) else {
        return PROPERTY_START_DEFAULT;
    };

    if names.is_valid_name(first) && second == 0 {
        PROPERTY_START_SHORT
    } else {
        // Both valid with a non-zero second, or nothing recognisable
        PROPERTY_START_DEFAULT
    }
}

/// Decode the property stream of a bare buffer, guessing the start offset
pub fn read_properties<L: NameLookup + ?Sized>(names: &L, data: &[u8]) -> PropertyStream {
    let start = detect_start(names, data, None);
    decode(names, data, start)
}

/// Decode an export's property stream using its object flags
pub fn read_export_properties(package: &Package, export: &ExportEntry) -> PropertyStream {
    let start = detect_start(package, export.data(), Some(export.has_stack()));
    decode(package, export.data(), start)
}

/// Walk the property stream starting at `start`
pub fn decode<L: NameLookup + ?Sized>(names: &L, data: &[u8], start: usize) -> PropertyStream {
    let mut properties = Vec::new();
    let mut pos = start;

    let stop = loop {
        match decode_one(names, data, pos) {
            Ok(property) => {
                pos = property.end;
                properties.push(property);
            }
            Err(reason) => break reason,
        }
    };

    log::trace!(
        "Decoded {} properties from {} (stopped: {:?} at {:#x})",
        properties.len(),
        start,
        stop,
        pos
    );

    PropertyStream {
        properties,
        start,
        stop,
        stop_offset: pos,
    }
}

fn slice(data: &[u8], from: usize, to: usize) -> Result<&[u8], StopReason> {
    if from > to {
        return Err(StopReason::Truncated);
    }
    data.get(from..to).ok_or(StopReason::Truncated)
}

fn decode_one<L: NameLookup + ?Sized>(
    names: &L,
    data: &[u8],
    pos: usize,
) -> Result<Property, StopReason> {
    let name = NameReference::read(data, pos).ok_or(StopReason::EndOfBuffer)?;
    if !names.is_valid_name(name.index) {
        return Err(StopReason::InvalidName);
    }
    if names.name_is(name, NONE_NAME) {
        return Err(StopReason::Terminator);
    }

    let type_name = NameReference::read(data, pos + 8).ok_or(StopReason::Truncated)?;
    let size = read_i32(data, pos + 16).ok_or(StopReason::Truncated)?;
    let array_index = read_i32(data, pos + 20).ok_or(StopReason::Truncated)?;
    let type_str = names.name_at(type_name.index).ok_or(StopReason::InvalidType)?;

    let value_at = pos + PROPERTY_TAG_SIZE;
    let remaining = data.len().saturating_sub(value_at);
    let size_len = usize::try_from(size).map_err(|_| StopReason::BadSize)?;
    if size_len > remaining {
        return Err(StopReason::BadSize);
    }

    let kind = PropertyType::from_type_name(type_str);
    let (detail, value, end) = match kind {
        PropertyType::Delegate => {
            let end = value_at + size_len;
            let function = read_i32(data, value_at + 4).unwrap_or_default();
            let bytes = slice(data, value_at, end)?.to_vec();
            (
                TypeDetail::Delegate { function },
                PropertyValue::Opaque(bytes),
                end,
            )
        }
        PropertyType::Array => {
            // The element count is informational; the value is size - 4 bytes
            let count = read_i32(data, value_at).ok_or(StopReason::Truncated)?;
            if size_len < 4 {
                return Err(StopReason::BadSize);
            }
            let end = value_at + size_len;
            let bytes = slice(data, value_at + 4, end)?.to_vec();
            (TypeDetail::Array { count }, PropertyValue::Opaque(bytes), end)
        }
        PropertyType::Str => {
            let count = read_i32(data, value_at).ok_or(StopReason::Truncated)?;
            let chars_at = value_at + 4;
            let (text, end): (String, usize) = if count < 0 {
                // Wide string: keep the low byte of each 2-byte unit
                let len = count.unsigned_abs() as usize;
                let end = len
                    .checked_mul(2)
                    .and_then(|n| n.checked_add(chars_at))
                    .ok_or(StopReason::Truncated)?;
                let units = slice(data, chars_at, end)?;
                let text: String = units.chunks_exact(2).map(|u| u[0] as char).collect();
                (text, end)
            } else {
                // Only negative counts carry characters
                (String::new(), chars_at)
            };
            (TypeDetail::None, PropertyValue::Str(text), end)
        }
        PropertyType::Struct => {
            let struct_type = NameReference::read(data, value_at).ok_or(StopReason::Truncated)?;
            let body = value_at + 8;
            let end = body + size_len;
            let bytes = slice(data, body, end)?.to_vec();
            (
                TypeDetail::Struct(struct_type),
                PropertyValue::Opaque(bytes),
                end,
            )
        }
        PropertyType::Byte => {
            let enum_type = NameReference::read(data, value_at).ok_or(StopReason::Truncated)?;
            let body = value_at + 8;
            let end = body + size_len;
            let bytes = slice(data, body, end)?;
            let mut wide = [0u8; 8];
            let used = bytes.len().min(8);
            wide[..used].copy_from_slice(&bytes[..used]);
            (
                TypeDetail::Enum(enum_type),
                PropertyValue::Int(i64::from_le_bytes(wide)),
                end,
            )
        }
        PropertyType::Int | PropertyType::Object | PropertyType::StringRef => {
            let v = read_i32(data, value_at).ok_or(StopReason::Truncated)?;
            (TypeDetail::None, PropertyValue::Int(v.into()), value_at + 4)
        }
        PropertyType::Float => {
            let bits = read_u32(data, value_at).ok_or(StopReason::Truncated)?;
            (TypeDetail::None, PropertyValue::Float(bits), value_at + 4)
        }
        PropertyType::Name => {
            let name_value = NameReference::read(data, value_at).ok_or(StopReason::Truncated)?;
            (TypeDetail::None, PropertyValue::Name(name_value), value_at + 8)
        }
        PropertyType::Bool => {
            let b = *data.get(value_at).ok_or(StopReason::Truncated)?;
            (TypeDetail::None, PropertyValue::Int(b.into()), value_at + 1)
        }
        PropertyType::None | PropertyType::Unknown => {
            let end = value_at + size_len;
            let bytes = slice(data, value_at, end)?.to_vec();
            (TypeDetail::None, PropertyValue::Opaque(bytes), end)
        }
    };

    let raw = slice(data, pos, end)?.to_vec();
    Ok(Property {
        name,
        kind,
        type_name,
        size,
        array_index,
        detail,
        value,
        offset: pos,
        end,
        raw,
    })
}

/// Render the value column used by text dumps
pub fn format_value<L: NameLookup + ?Sized>(property: &Property, names: &L) -> String {
    let name_of = |r: &NameReference| r.resolve(names).unwrap_or_else(|| r.to_string());
    match (&property.value, &property.detail) {
        (PropertyValue::Opaque(bytes), TypeDetail::Struct(struct_type)) => {
            format!("{} ({} bytes)", name_of(struct_type), bytes.len())
        }
        (PropertyValue::Opaque(bytes), TypeDetail::Array { .. }) => {
            format!("{} items", bytes.len())
        }
        (PropertyValue::Opaque(bytes), _) => format!("{} bytes", bytes.len()),
        (PropertyValue::Int(v), TypeDetail::Enum(enum_type)) => {
            let value = i32::try_from(*v)
                .ok()
                .and_then(|i| names.name_at(i))
                .map_or_else(|| v.to_string(), str::to_string);
            format!("\"{}\" = \"{}\"", name_of(enum_type), value)
        }
        (PropertyValue::Int(v), _) => v.to_string(),
        (PropertyValue::Float(bits), _) => f32::from_bits(*bits).to_string(),
        (PropertyValue::Name(r), _) => name_of(r),
        (PropertyValue::Str(s), _) => s.trim_end_matches('\0').to_string(),
    }
}

/// One row of the fixed-width property table
pub fn property_to_text<L: NameLookup + ?Sized>(property: &Property, names: &L) -> String {
    let name = property
        .name
        .resolve(names)
        .unwrap_or_else(|| property.name.to_string());
    format!(
        "|{:>40}|{:>15}|{:>10}|{:>30}|",
        name,
        property.kind.short_name(),
        property.value_len(),
        format_value(property, names)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcc::names::NameTable;

    const NONE: i32 = 0;
    const HEALTH: i32 = 1;
    const INT_PROP: i32 = 2;
    const STR_PROP: i32 = 3;
    const ARRAY_PROP: i32 = 4;
    const STRUCT_PROP: i32 = 5;
    const VECTOR: i32 = 6;
    const BYTE_PROP: i32 = 7;
    const EDIFFICULTY: i32 = 8;
    const HARD: i32 = 9;
    const BOOL_PROP: i32 = 10;
    const NAME_PROP: i32 = 11;
    const FLOAT_PROP: i32 = 12;
    const DELEGATE_PROP: i32 = 13;
    const MYSTERY_PROP: i32 = 14;

    fn names() -> NameTable {
        [
            "None",
            "Health",
            "IntProperty",
            "StrProperty",
            "ArrayProperty",
            "StructProperty",
            "Vector",
            "ByteProperty",
            "EDifficulty",
            "Hard",
            "BoolProperty",
            "NameProperty",
            "FloatProperty",
            "DelegateProperty",
            "MysteryProperty",
        ]
        .into_iter()
        .collect()
    }

    fn tag(out: &mut Vec<u8>, name: i32, ty: i32, size: i32) {
        out.extend_from_slice(&name.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&ty.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
        out.extend_from_slice(&size.to_le_bytes());
        out.extend_from_slice(&0i32.to_le_bytes());
    }

    fn terminator(out: &mut Vec<u8>) {
        out.extend_from_slice(&(NONE as i64).to_le_bytes());
    }

    /// Int, Str, Struct, Array, Byte, Bool then None
    fn sample_stream() -> Vec<u8> {
        let mut out = Vec::new();
        tag(&mut out, HEALTH, INT_PROP, 4);
        out.extend_from_slice(&250i32.to_le_bytes());

        tag(&mut out, HEALTH, STR_PROP, 10);
        out.extend_from_slice(&(-3i32).to_le_bytes());
        out.extend_from_slice(&[b'a', 0, b'b', 0, 0, 0]);

        tag(&mut out, HEALTH, STRUCT_PROP, 12);
        out.extend_from_slice(&(VECTOR as i64).to_le_bytes());
        out.extend_from_slice(&[1u8; 12]);

        tag(&mut out, HEALTH, ARRAY_PROP, 7);
        out.extend_from_slice(&3i32.to_le_bytes());
        out.extend_from_slice(&[7, 8, 9]);

        tag(&mut out, HEALTH, BYTE_PROP, 8);
        out.extend_from_slice(&(EDIFFICULTY as i64).to_le_bytes());
        out.extend_from_slice(&(HARD as i64).to_le_bytes());

        tag(&mut out, HEALTH, BOOL_PROP, 0);
        out.push(1);

        terminator(&mut out);
        out
    }

    #[test]
    fn test_none_at_start_yields_empty_stream() {
        let mut data = Vec::new();
        terminator(&mut data);
        data.extend_from_slice(&sample_stream());

        let stream = decode(&names(), &data, 0);
        assert!(stream.is_empty());
        assert_eq!(stream.stop, StopReason::Terminator);
        assert_eq!(stream.end(), 0);
    }

    #[test]
    fn test_sample_stream_decodes_every_type() {
        let data = sample_stream();
        let names = names();
        let stream = decode(&names, &data, 0);

        assert!(stream.is_terminated());
        let kinds: Vec<PropertyType> = stream.iter().map(|p| p.kind).collect();
        assert_eq!(
            kinds,
            vec![
                PropertyType::Int,
                PropertyType::Str,
                PropertyType::Struct,
                PropertyType::Array,
                PropertyType::Byte,
                PropertyType::Bool,
            ]
        );

        let p = &stream.properties;
        assert_eq!(p[0].value, PropertyValue::Int(250));
        assert_eq!(p[1].value, PropertyValue::Str("ab\0".to_string()));
        assert_eq!(p[2].detail, TypeDetail::Struct(NameReference::new(VECTOR, 0)));
        assert_eq!(p[2].value, PropertyValue::Opaque(vec![1u8; 12]));
        assert_eq!(p[3].detail, TypeDetail::Array { count: 3 });
        assert_eq!(p[3].value, PropertyValue::Opaque(vec![7, 8, 9]));
        assert_eq!(p[4].detail, TypeDetail::Enum(NameReference::new(EDIFFICULTY, 0)));
        assert_eq!(p[4].value, PropertyValue::Int(HARD as i64));
        assert_eq!(p[5].value, PropertyValue::Int(1));

        // Offsets chain and raw spans cover exactly the property
        for pair in p.windows(2) {
            assert_eq!(pair[0].end, pair[1].offset);
        }
        for property in p {
            assert_eq!(property.raw, data[property.offset..property.end]);
        }
        assert_eq!(stream.end() + 8, data.len());
    }

    #[test]
    fn test_str_property_reads_low_bytes_at_stride_two() {
        let mut data = Vec::new();
        tag(&mut data, HEALTH, STR_PROP, 10);
        data.extend_from_slice(&(-3i32).to_le_bytes());
        data.extend_from_slice(&[b'x', 0x01, b'y', 0x02, b'z', 0x03]);
        terminator(&mut data);

        let stream = decode(&names(), &data, 0);
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.properties[0].value, PropertyValue::Str("xyz".to_string()));
        assert_eq!(stream.properties[0].end, 24 + 4 + 6);
    }

    #[test]
    fn test_str_property_with_positive_count_is_empty() {
        let mut data = Vec::new();
        tag(&mut data, HEALTH, STR_PROP, 7);
        data.extend_from_slice(&3i32.to_le_bytes());
        terminator(&mut data);

        let stream = decode(&names(), &data, 0);
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.properties[0].value, PropertyValue::Str(String::new()));
        assert_eq!(stream.properties[0].end, 24 + 4);
        assert!(stream.is_terminated());
    }

    #[test]
    fn test_truncation_keeps_only_complete_properties() {
        let data = sample_stream();
        let full = decode(&names(), &data, 0);

        for cut in 0..data.len() {
            let stream = decode(&names(), &data[..cut], 0);
            let expected: Vec<&Property> = full.iter().filter(|p| p.end <= cut).collect();
            assert_eq!(stream.len(), expected.len(), "cut at {cut}");
            for (got, want) in stream.iter().zip(expected) {
                assert_eq!(got, want);
            }
            assert!(stream.end() <= cut);
            assert!(!stream.is_terminated());
        }
    }

    #[test]
    fn test_invalid_name_stops_with_prefix() {
        let mut data = Vec::new();
        tag(&mut data, HEALTH, INT_PROP, 4);
        data.extend_from_slice(&1i32.to_le_bytes());
        tag(&mut data, 999, INT_PROP, 4);
        data.extend_from_slice(&2i32.to_le_bytes());

        let stream = decode(&names(), &data, 0);
        assert_eq!(stream.len(), 1);
        assert_eq!(stream.stop, StopReason::InvalidName);
        assert_eq!(stream.stop_offset, 28);
    }

    #[test]
    fn test_invalid_type_and_bad_sizes_stop() {
        let mut data = Vec::new();
        tag(&mut data, HEALTH, 500, 4);
        data.extend_from_slice(&[0; 8]);
        assert_eq!(decode(&names(), &data, 0).stop, StopReason::InvalidType);

        let mut data = Vec::new();
        tag(&mut data, HEALTH, INT_PROP, -1);
        data.extend_from_slice(&[0; 8]);
        assert_eq!(decode(&names(), &data, 0).stop, StopReason::BadSize);

        let mut data = Vec::new();
        tag(&mut data, HEALTH, INT_PROP, 4096);
        data.extend_from_slice(&[0; 8]);
        assert_eq!(decode(&names(), &data, 0).stop, StopReason::BadSize);
    }

    #[test]
    fn test_unknown_type_skips_declared_size() {
        let mut data = Vec::new();
        tag(&mut data, HEALTH, MYSTERY_PROP, 3);
        data.extend_from_slice(&[0xAA, 0xBB, 0xCC]);
        tag(&mut data, HEALTH, FLOAT_PROP, 4);
        data.extend_from_slice(&1.5f32.to_bits().to_le_bytes());
        terminator(&mut data);

        let stream = decode(&names(), &data, 0);
        assert!(stream.is_terminated());
        assert_eq!(stream.properties[0].kind, PropertyType::Unknown);
        assert_eq!(stream.properties[0].value, PropertyValue::Opaque(vec![0xAA, 0xBB, 0xCC]));
        assert_eq!(stream.properties[1].value.as_f32(), Some(1.5));
    }

    #[test]
    fn test_name_and_delegate_values() {
        let mut data = Vec::new();
        tag(&mut data, HEALTH, NAME_PROP, 8);
        data.extend_from_slice(&HARD.to_le_bytes());
        data.extend_from_slice(&2i32.to_le_bytes());
        tag(&mut data, HEALTH, DELEGATE_PROP, 12);
        data.extend_from_slice(&0i32.to_le_bytes());
        data.extend_from_slice(&HEALTH.to_le_bytes());
        data.extend_from_slice(&0i32.to_le_bytes());
        terminator(&mut data);

        let names = names();
        let stream = decode(&names, &data, 0);
        assert_eq!(stream.len(), 2);
        assert_eq!(stream.properties[0].value, PropertyValue::Name(NameReference::new(HARD, 2)));
        assert_eq!(format_value(&stream.properties[0], &names), "Hard_1");
        assert_eq!(stream.properties[1].detail, TypeDetail::Delegate { function: HEALTH });
        assert_eq!(stream.properties[1].end, 32 + 24 + 12);
    }

    #[test]
    fn test_decoder_terminates_on_noise() {
        // Deterministic LCG noise, no external RNG needed
        let names = names();
        let mut seed: u32 = 0x1234_5678;
        for _ in 0..200 {
            let len = (seed % 256) as usize;
            let data: Vec<u8> = (0..len)
                .map(|_| {
                    seed = seed.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                    // Bias towards small values so tags often look valid
                    ((seed >> 24) % 16) as u8
                })
                .collect();
            let stream = decode(&names, &data, 0);
            assert!(stream.end() <= data.len());
            for property in stream.iter() {
                assert!(property.end > property.offset);
            }
        }
    }

    #[test]
    fn test_detect_start_heuristics() {
        let names = names();
        let mut buf = vec![0u8; 16];

        // Negative integer at 4 without flags => stack layout
        buf[4..8].copy_from_slice(&(-1i32).to_le_bytes());
        assert_eq!(detect_start(&names, &buf, None), 30);

        // Valid name followed by zero => 4
        buf[4..8].copy_from_slice(&HEALTH.to_le_bytes());
        buf[8..12].copy_from_slice(&0i32.to_le_bytes());
        assert_eq!(detect_start(&names, &buf, None), 4);

        // Two valid names => 8
        buf[8..12].copy_from_slice(&INT_PROP.to_le_bytes());
        assert_eq!(detect_start(&names, &buf, None), 8);

        // Nothing recognisable => 8
        buf[4..8].copy_from_slice(&9999i32.to_le_bytes());
        assert_eq!(detect_start(&names, &buf, None), 8);

        // HasStack flag wins
        assert_eq!(detect_start(&names, &buf, Some(true)), 30);

        // Known flags without HasStack skip the negative pre-check
        buf[4..8].copy_from_slice(&(-1i32).to_le_bytes());
        assert_eq!(detect_start(&names, &buf, Some(false)), 8);

        // Short buffers fall back to the default
        assert_eq!(detect_start(&names, &[0u8; 6], None), 8);
    }

    #[test]
    fn test_property_row_format() {
        let data = sample_stream();
        let names = names();
        let stream = decode(&names, &data, 0);
        let row = property_to_text(&stream.properties[4], &names);
        assert!(row.starts_with('|'));
        assert!(row.contains("\"EDifficulty\" = \"Hard\""));
        assert_eq!(row.matches('|').count(), 5);
        assert!(property_to_text(&stream.properties[1], &names).ends_with("ab|"));
    }
}
