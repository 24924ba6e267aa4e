// Package directory: name, import and export tables plus export buffers

use log::{debug, trace};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

use super::bytes::read_fstring;
use super::constants::{
    CLASS_CLASS_NAME, EXPORT_ENTRY_BASE_SIZE, IMPORT_ENTRY_SIZE, MIN_NAME_ENTRY_SIZE,
};
use super::names::{NameLookup, NameReference, NameTable};
use super::tables::{ExportEntry, ImportEntry, PackageHeader};
use crate::exceptions::{PathContext, Result, TransplantError};

/// An opened package.
///
/// Owns every table and every export buffer. Callers borrow export data
/// for decoding and replace it wholesale through `replace_export_data`.
#[derive(Clone)]
pub struct Package {
    path: PathBuf,
    header: PackageHeader,
    names: NameTable,
    name_table_size: usize,
    imports: Vec<ImportEntry>,
    exports: Vec<ExportEntry>,
    image: Vec<u8>,
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("path", &self.path)
            .field("names", &self.names.len())
            .field("imports", &self.imports.len())
            .field("exports", &self.exports.len())
            .field("image", &format!("<{} bytes>", self.image.len()))
            .finish()
    }
}

fn table_range(data: &[u8], what: &str, offset: u32, len: usize) -> Result<usize> {
    let start = offset as usize;
    match start.checked_add(len) {
        Some(end) if end <= data.len() => Ok(end),
        _ => Err(TransplantError::CorruptPackage(format!(
            "{what} at {start:#x} (+{len}) runs past end of file ({} bytes)",
            data.len()
        ))),
    }
}

/// Reject a table count that cannot fit in the rest of the image
fn check_count(data: &[u8], what: &str, count: u32, offset: u32, min_entry: usize) -> Result<()> {
    let room = data.len().saturating_sub(offset as usize) / min_entry;
    if count as usize > room {
        return Err(TransplantError::CorruptPackage(format!(
            "{what} count {count} at {offset:#x} exceeds the {} byte file",
            data.len()
        )));
    }
    Ok(())
}

impl Package {
    /// Open and fully parse a package file
    pub fn load(path: &Path) -> Result<Self> {
        let timer = Instant::now();
        trace!("Loading package: {:?}", path);
        let image = fs::read(path).with_path(path)?;
        let package = Self::from_bytes(path, image)?;
        debug!(
            "Loaded {:?}: {} names, {} imports, {} exports in {:?}",
            path,
            package.names.len(),
            package.imports.len(),
            package.exports.len(),
            timer.elapsed()
        );
        Ok(package)
    }

    /// Parse a package image already in memory
    pub fn from_bytes(path: &Path, image: Vec<u8>) -> Result<Self> {
        let header = PackageHeader::unpack(&image)?;

        check_count(&image, "name", header.name_count, header.name_offset, MIN_NAME_ENTRY_SIZE)?;
        check_count(
            &image,
            "export",
            header.export_count,
            header.export_offset,
            EXPORT_ENTRY_BASE_SIZE,
        )?;

        // Name table
        let mut names = Vec::with_capacity(header.name_count as usize);
        let mut cursor = header.name_offset as usize;
        for i in 0..header.name_count {
            let (name, consumed) = read_fstring(&image, cursor).ok_or_else(|| {
                TransplantError::CorruptPackage(format!("name #{i} truncated at {cursor:#x}"))
            })?;
            names.push(name);
            cursor += consumed;
        }
        let name_table_size = cursor - header.name_offset as usize;
        let names = NameTable::new(names);

        // Import table
        let import_len = header.import_count as usize * IMPORT_ENTRY_SIZE;
        table_range(&image, "import table", header.import_offset, import_len)?;
        let imports = (0..header.import_count as usize)
            .map(|i| ImportEntry::unpack(&image, header.import_offset as usize + i * IMPORT_ENTRY_SIZE))
            .collect::<Result<Vec<_>>>()?;

        // Export table and buffers
        let mut exports = Vec::with_capacity(header.export_count as usize);
        let mut cursor = header.export_offset as usize;
        for _ in 0..header.export_count {
            let (mut entry, size) = ExportEntry::unpack(&image, cursor)?;
            let end = table_range(&image, "export data", entry.data_offset, entry.data_size as usize)?;
            entry.attach_data(image[entry.data_offset as usize..end].to_vec());
            exports.push(entry);
            cursor += size;
        }

        let package = Package {
            path: path.to_path_buf(),
            header,
            names,
            name_table_size,
            imports,
            exports,
            image,
        };
        package.validate_references()?;
        Ok(package)
    }

    /// Every name reference and object index in the tables must resolve
    fn validate_references(&self) -> Result<()> {
        for (i, import) in self.imports.iter().enumerate() {
            for name in [import.package_file, import.class_name, import.object_name] {
                if !self.is_valid_name(name.index) {
                    return Err(TransplantError::CorruptPackage(format!(
                        "import #{i} references name {} of {}",
                        name.index,
                        self.names.len()
                    )));
                }
            }
            if !self.is_valid_object(import.link) {
                return Err(TransplantError::CorruptPackage(format!(
                    "import #{i} links to missing object {}",
                    import.link
                )));
            }
        }

        for (i, export) in self.exports.iter().enumerate() {
            if !self.is_valid_name(export.object_name.index) {
                return Err(TransplantError::CorruptPackage(format!(
                    "export #{i} references name {} of {}",
                    export.object_name.index,
                    self.names.len()
                )));
            }
            for index in [export.class_index, export.super_index, export.link, export.archetype] {
                if !self.is_valid_object(index) {
                    return Err(TransplantError::CorruptPackage(format!(
                        "export #{i} references missing object {index}"
                    )));
                }
            }
        }
        Ok(())
    }

    fn is_valid_object(&self, index: i32) -> bool {
        match index {
            0 => true,
            i if i > 0 => (i as usize) <= self.exports.len(),
            i => (i.unsigned_abs() as usize) <= self.imports.len(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn header(&self) -> &PackageHeader {
        &self.header
    }

    pub fn names(&self) -> &NameTable {
        &self.names
    }

    pub fn imports(&self) -> &[ImportEntry] {
        &self.imports
    }

    pub fn exports(&self) -> &[ExportEntry] {
        &self.exports
    }

    /// The file bytes as loaded; untouched by `replace_export_data`
    pub fn image(&self) -> &[u8] {
        &self.image
    }

    /// Byte length of the name table as stored on disk
    pub fn name_table_size(&self) -> usize {
        self.name_table_size
    }

    /// Display name of an object index (export, import or none)
    pub fn object_name(&self, index: i32) -> Option<String> {
        match index {
            0 => None,
            i if i > 0 => {
                let export = self.exports.get(i as usize - 1)?;
                export.object_name.resolve(self)
            }
            i => {
                let import = self.imports.get(i.unsigned_abs() as usize - 1)?;
                import.object_name.resolve(self)
            }
        }
    }

    fn link_of(&self, index: i32) -> i32 {
        match index {
            0 => 0,
            i if i > 0 => self.exports.get(i as usize - 1).map_or(0, |e| e.link),
            i => self
                .imports
                .get(i.unsigned_abs() as usize - 1)
                .map_or(0, |imp| imp.link),
        }
    }

    /// Dotted path of the outer chain starting at `link`, outermost first
    pub fn package_full_name(&self, link: i32) -> String {
        let mut parts = Vec::new();
        let mut current = link;
        // A malformed link cycle must not hang the walk
        let max_depth = self.imports.len() + self.exports.len();
        while current != 0 && parts.len() <= max_depth {
            parts.push(self.object_name(current).unwrap_or_default());
            current = self.link_of(current);
        }
        parts.reverse();
        parts.join(".")
    }

    pub fn class_name(&self, export: &ExportEntry) -> String {
        self.object_name(export.class_index)
            .unwrap_or_else(|| CLASS_CLASS_NAME.to_string())
    }

    pub fn super_class_name(&self, export: &ExportEntry) -> Option<String> {
        self.object_name(export.super_index)
    }

    pub fn archetype_name(&self, export: &ExportEntry) -> Option<String> {
        self.object_name(export.archetype)
    }

    pub fn export_object_name(&self, export: &ExportEntry) -> String {
        export.object_name.resolve(self).unwrap_or_default()
    }

    /// `<package path>.<object name>`, or the bare object name at top level
    pub fn qualified_name(&self, export: &ExportEntry) -> String {
        let package = self.package_full_name(export.link);
        let object = self.export_object_name(export);
        if package.is_empty() {
            object
        } else {
            format!("{package}.{object}")
        }
    }

    pub fn import_class_name(&self, import: &ImportEntry) -> String {
        import.class_name.resolve(self).unwrap_or_default()
    }

    pub fn import_package_file(&self, import: &ImportEntry) -> String {
        import.package_file.resolve(self).unwrap_or_default()
    }

    pub fn import_qualified_name(&self, import: &ImportEntry) -> String {
        let package = self.package_full_name(import.link);
        let object = import.object_name.resolve(self).unwrap_or_default();
        if package.is_empty() {
            object
        } else {
            format!("{package}.{object}")
        }
    }

    /// Whether any export has the given object and class name
    pub fn has_export(&self, object_name: &str, class_name: &str) -> bool {
        self.exports.iter().any(|export| {
            self.export_object_name(export) == object_name && self.class_name(export) == class_name
        })
    }

    /// Replace one export's buffer wholesale
    pub fn replace_export_data(&mut self, index: usize, data: Vec<u8>) -> Result<()> {
        let count = self.exports.len();
        let export = self.exports.get_mut(index).ok_or_else(|| {
            TransplantError::Generic(format!("export #{index} out of range ({count} exports)"))
        })?;
        trace!(
            "Export #{index}: {} -> {} bytes",
            export.data().len(),
            data.len()
        );
        export.set_data(data);
        Ok(())
    }

    /// Indices of exports whose buffer was replaced since load
    pub fn changed_exports(&self) -> Vec<usize> {
        self.exports
            .iter()
            .enumerate()
            .filter(|(_, e)| e.has_changed())
            .map(|(i, _)| i)
            .collect()
    }
}

impl NameLookup for Package {
    fn name_at(&self, index: i32) -> Option<&str> {
        self.names.name_at(index)
    }
}
