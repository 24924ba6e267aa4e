//! Name table and name references

use serde::Serialize;
use std::fmt;

/// A reference into the name table: index plus instance counter.
///
/// The counter is stored one-based; `0` means "no instance suffix".
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct NameReference {
    pub index: i32,
    pub number: i32,
}

impl NameReference {
    pub const fn new(index: i32, number: i32) -> Self {
        NameReference { index, number }
    }

    /// Split an 8-byte little-endian value into index and counter
    pub fn from_bytes(bytes: [u8; 8]) -> Self {
        NameReference {
            index: i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            number: i32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]),
        }
    }

    /// Read a reference at `offset`, `None` past the end of `data`
    pub fn read(data: &[u8], offset: usize) -> Option<Self> {
        let bytes = data.get(offset..offset.checked_add(8)?)?;
        Some(Self::from_bytes(bytes.try_into().ok()?))
    }

    /// Resolve to the display form, `None` when the index is out of bounds
    pub fn resolve<L: NameLookup + ?Sized>(&self, names: &L) -> Option<String> {
        let base = names.name_at(self.index)?;
        if self.number > 0 {
            Some(format!("{}_{}", base, self.number - 1))
        } else {
            Some(base.to_string())
        }
    }
}

/// Bounds-checked access to a name table
pub trait NameLookup {
    /// The raw name at `index`, `None` when out of bounds
    fn name_at(&self, index: i32) -> Option<&str>;

    fn is_valid_name(&self, index: i32) -> bool {
        self.name_at(index).is_some()
    }

    /// Whether `reference` points at exactly `expected`
    fn name_is(&self, reference: NameReference, expected: &str) -> bool {
        self.name_at(reference.index) == Some(expected)
    }
}

/// Ordered package name table. Names are not guaranteed unique.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NameTable {
    names: Vec<String>,
}

impl NameTable {
    pub fn new(names: Vec<String>) -> Self {
        NameTable { names }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// First index holding `name`
    pub fn find(&self, name: &str) -> Option<i32> {
        self.names
            .iter()
            .position(|n| n == name)
            .and_then(|i| i32::try_from(i).ok())
    }
}

impl NameLookup for NameTable {
    fn name_at(&self, index: i32) -> Option<&str> {
        let index = usize::try_from(index).ok()?;
        self.names.get(index).map(String::as_str)
    }
}

impl<S: Into<String>> FromIterator<S> for NameTable {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        NameTable::new(iter.into_iter().map(Into::into).collect())
    }
}

impl fmt::Display for NameReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.index)?;
        if self.number > 0 {
            write!(f, "_{}", self.number - 1)?;
        }
        Ok(())
    }
}
