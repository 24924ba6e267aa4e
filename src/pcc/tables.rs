// Package header and fixed-width table entries

use super::bytes::{read_fstring, read_i32, read_u16, read_u32, read_u64};
use super::constants::{
    EXPORT_DATA_OFFSET_FIELD, EXPORT_DATA_SIZE_FIELD, EXPORT_ENTRY_BASE_SIZE,
    EXPORT_GENERATION_COUNT_FIELD, FOLDER_NAME_FIELD, HEADER_SIZE_FIELD, IMPORT_ENTRY_SIZE,
    OBJECT_FLAG_HAS_STACK, PACKAGE_FLAG_COMPRESSED, PACKAGE_MAGIC,
};
use super::names::NameReference;
use crate::exceptions::{Result, TransplantError};

fn corrupt(what: &str, offset: usize) -> TransplantError {
    TransplantError::CorruptPackage(format!("{what} out of bounds at {offset:#x}"))
}

/// Package summary header.
///
/// The raw bytes up to the first table are kept so that unknown header
/// fields are written back untouched.
#[derive(Clone, Debug)]
pub struct PackageHeader {
    pub version: u16,
    pub licensee: u16,
    pub header_size: u32,
    pub folder_name: String,
    pub package_flags: u32,
    pub name_count: u32,
    pub name_offset: u32,
    pub export_count: u32,
    pub export_offset: u32,
    pub import_count: u32,
    pub import_offset: u32,
    pub depends_offset: u32,
    flags_at: usize,
    raw: Vec<u8>,
}

impl PackageHeader {
    /// Unpack the header from the start of a package image
    pub fn unpack(data: &[u8]) -> Result<Self> {
        let magic = read_u32(data, 0).ok_or_else(|| corrupt("magic", 0))?;
        if magic != PACKAGE_MAGIC {
            return Err(TransplantError::UnsupportedFormat(format!(
                "bad package magic {magic:#010x}"
            )));
        }

        let version = read_u16(data, 4).ok_or_else(|| corrupt("version", 4))?;
        let licensee = read_u16(data, 6).ok_or_else(|| corrupt("licensee", 6))?;
        let header_size =
            read_u32(data, HEADER_SIZE_FIELD).ok_or_else(|| corrupt("header size", 8))?;
        let (folder_name, consumed) = read_fstring(data, FOLDER_NAME_FIELD)
            .ok_or_else(|| corrupt("folder name", FOLDER_NAME_FIELD))?;

        let flags_at = FOLDER_NAME_FIELD + consumed;
        let field = |n: usize| {
            let at = flags_at + n * 4;
            read_u32(data, at).ok_or_else(|| corrupt("summary field", at))
        };

        let package_flags = field(0)?;
        if package_flags & PACKAGE_FLAG_COMPRESSED != 0 {
            return Err(TransplantError::UnsupportedFormat(
                "compressed packages are not supported".to_string(),
            ));
        }

        let mut header = PackageHeader {
            version,
            licensee,
            header_size,
            folder_name,
            package_flags,
            name_count: field(1)?,
            name_offset: field(2)?,
            export_count: field(3)?,
            export_offset: field(4)?,
            import_count: field(5)?,
            import_offset: field(6)?,
            depends_offset: field(7)?,
            flags_at,
            raw: Vec::new(),
        };

        let fields_end = header.fields_end();
        let header_end = header.first_table_offset().unwrap_or(fields_end);
        if header_end < fields_end || header_end > data.len() {
            return Err(TransplantError::CorruptPackage(format!(
                "table offset {header_end:#x} overlaps the package summary"
            )));
        }
        header.raw = data[..header_end].to_vec();

        log::trace!(
            "Header: v{}/{} names={}@{:#x} imports={}@{:#x} exports={}@{:#x}",
            header.version,
            header.licensee,
            header.name_count,
            header.name_offset,
            header.import_count,
            header.import_offset,
            header.export_count,
            header.export_offset
        );

        Ok(header)
    }

    /// Pack the header with the current field values
    pub fn pack(&self) -> Vec<u8> {
        let mut bytes = self.raw.clone();
        bytes[HEADER_SIZE_FIELD..HEADER_SIZE_FIELD + 4]
            .copy_from_slice(&self.header_size.to_le_bytes());

        let fields = [
            self.package_flags,
            self.name_count,
            self.name_offset,
            self.export_count,
            self.export_offset,
            self.import_count,
            self.import_offset,
            self.depends_offset,
        ];
        for (n, value) in fields.iter().enumerate() {
            let at = self.flags_at + n * 4;
            bytes[at..at + 4].copy_from_slice(&value.to_le_bytes());
        }
        bytes
    }

    /// Length of the raw header block written ahead of the tables
    pub fn len(&self) -> usize {
        self.raw.len()
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    fn fields_end(&self) -> usize {
        self.flags_at + 8 * 4
    }

    /// Lowest offset of any non-empty table
    fn first_table_offset(&self) -> Option<usize> {
        [
            (self.name_count, self.name_offset),
            (self.import_count, self.import_offset),
            (self.export_count, self.export_offset),
        ]
        .iter()
        .filter(|(count, _)| *count > 0)
        .map(|(_, offset)| *offset as usize)
        .min()
    }
}

/// An object defined in another package
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ImportEntry {
    pub package_file: NameReference,
    pub class_name: NameReference,
    pub link: i32,
    pub object_name: NameReference,
}

impl ImportEntry {
    pub fn unpack(data: &[u8], offset: usize) -> Result<Self> {
        let name_at = |n: usize| {
            NameReference::read(data, offset + n).ok_or_else(|| corrupt("import entry", offset))
        };
        Ok(ImportEntry {
            package_file: name_at(0)?,
            class_name: name_at(8)?,
            link: read_i32(data, offset + 16).ok_or_else(|| corrupt("import entry", offset))?,
            object_name: name_at(20)?,
        })
    }

    pub fn pack(&self) -> [u8; IMPORT_ENTRY_SIZE] {
        let mut bytes = [0u8; IMPORT_ENTRY_SIZE];
        bytes[0..4].copy_from_slice(&self.package_file.index.to_le_bytes());
        bytes[4..8].copy_from_slice(&self.package_file.number.to_le_bytes());
        bytes[8..12].copy_from_slice(&self.class_name.index.to_le_bytes());
        bytes[12..16].copy_from_slice(&self.class_name.number.to_le_bytes());
        bytes[16..20].copy_from_slice(&self.link.to_le_bytes());
        bytes[20..24].copy_from_slice(&self.object_name.index.to_le_bytes());
        bytes[24..28].copy_from_slice(&self.object_name.number.to_le_bytes());
        bytes
    }
}

/// One serialized object owned by the package.
///
/// `data_size` and `data_offset` are the values recorded in the file; after
/// `set_data` the buffer length is authoritative and the writers recompute
/// both.
#[derive(Clone, Debug)]
pub struct ExportEntry {
    pub class_index: i32,
    pub super_index: i32,
    pub link: i32,
    pub object_name: NameReference,
    pub archetype: i32,
    pub object_flags: u64,
    pub data_size: u32,
    pub data_offset: u32,
    table_offset: usize,
    raw: Vec<u8>,
    data: Vec<u8>,
    changed: bool,
}

impl ExportEntry {
    /// Unpack the table entry at `offset`. Returns the entry (without data)
    /// and the number of bytes it occupies.
    pub fn unpack(data: &[u8], offset: usize) -> Result<(Self, usize)> {
        let err = || corrupt("export entry", offset);
        let int_at = |n: usize| read_i32(data, offset + n).ok_or_else(err);

        let generations = int_at(EXPORT_GENERATION_COUNT_FIELD)?;
        let generations = usize::try_from(generations).map_err(|_| {
            TransplantError::CorruptPackage(format!(
                "negative generation count in export entry at {offset:#x}"
            ))
        })?;
        let size = generations
            .checked_mul(4)
            .and_then(|g| g.checked_add(EXPORT_ENTRY_BASE_SIZE))
            .ok_or_else(err)?;
        let raw = data
            .get(offset..offset.checked_add(size).ok_or_else(err)?)
            .ok_or_else(err)?
            .to_vec();

        let entry = ExportEntry {
            class_index: int_at(0)?,
            super_index: int_at(4)?,
            link: int_at(8)?,
            object_name: NameReference::read(data, offset + 12).ok_or_else(err)?,
            archetype: int_at(20)?,
            object_flags: read_u64(data, offset + 24).ok_or_else(err)?,
            data_size: read_u32(data, offset + EXPORT_DATA_SIZE_FIELD).ok_or_else(err)?,
            data_offset: read_u32(data, offset + EXPORT_DATA_OFFSET_FIELD).ok_or_else(err)?,
            table_offset: offset,
            raw,
            data: Vec::new(),
            changed: false,
        };
        Ok((entry, size))
    }

    /// Pack the table entry with the given data placement
    pub fn pack(&self, data_size: u32, data_offset: u32) -> Vec<u8> {
        let mut bytes = self.raw.clone();
        bytes[EXPORT_DATA_SIZE_FIELD..EXPORT_DATA_SIZE_FIELD + 4]
            .copy_from_slice(&data_size.to_le_bytes());
        bytes[EXPORT_DATA_OFFSET_FIELD..EXPORT_DATA_OFFSET_FIELD + 4]
            .copy_from_slice(&data_offset.to_le_bytes());
        bytes
    }

    /// Size of this entry inside the export table
    pub fn entry_size(&self) -> usize {
        self.raw.len()
    }

    /// Where this entry lives in the loaded file
    pub fn table_offset(&self) -> usize {
        self.table_offset
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn has_stack(&self) -> bool {
        self.object_flags & OBJECT_FLAG_HAS_STACK != 0
    }

    pub fn has_changed(&self) -> bool {
        self.changed
    }

    /// Attach the buffer read at load time
    pub(crate) fn attach_data(&mut self, data: Vec<u8>) {
        self.data = data;
    }

    /// Replace the buffer wholesale and mark the export dirty
    pub(crate) fn set_data(&mut self, data: Vec<u8>) {
        self.data = data;
        self.changed = true;
    }
}
