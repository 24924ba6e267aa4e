//! Writing modified packages back to disk
//!
//! Two save strategies share the [`SaveStrategy`] interface. [`commit`] wraps
//! the chosen one in the backup/verify envelope:
//!
//! 1. nothing changed: return without touching the filesystem
//! 2. move the destination aside to `<dest>.<suffix>`
//! 3. write the new image through a temporary file in the same directory
//! 4. reopen the written file and compare every export buffer
//!
//! A failure at step 3 or 4 leaves the backup in place.

use log::{debug, info, warn};
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

use super::bytes::write_u32;
use super::constants::{
    EXPORT_DATA_OFFSET_FIELD, EXPORT_DATA_SIZE_FIELD, IMPORT_ENTRY_SIZE, SHADER_CACHE_CLASS,
    SHADER_CACHE_OBJECT,
};
use super::package::Package;
use super::verifier::{VerifyReport, verify_matches};
use crate::exceptions::{PathContext, Result, TransplantError};

/// A way of turning an in-memory package into a file
pub trait SaveStrategy: fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Whether this strategy can be used for `package`
    fn applies(&self, package: &Package) -> bool;

    /// Serialize `package` to a complete file image
    fn render(&self, package: &Package) -> Result<Vec<u8>>;

    fn save(&self, package: &Package, dest: &Path) -> Result<()> {
        let image = self.render(package)?;
        write_atomically(dest, &image)
    }
}

fn offset_u32(value: usize, what: &str) -> Result<u32> {
    u32::try_from(value).map_err(|_| {
        TransplantError::Generic(format!("{what} {value:#x} does not fit a 32-bit offset"))
    })
}

/// Patch changed exports into a copy of the loaded image.
///
/// Used when the package carries a seek-free shader cache, where the loader
/// tolerates export data anywhere in the file. Data that still fits its old
/// slot is written there; larger data is appended at the end. Only the
/// changed export's own size and offset fields are rewritten.
#[derive(Debug, Default, Clone, Copy)]
pub struct InPlaceSave;

impl SaveStrategy for InPlaceSave {
    fn name(&self) -> &'static str {
        "in-place"
    }

    fn applies(&self, package: &Package) -> bool {
        package.has_export(SHADER_CACHE_OBJECT, SHADER_CACHE_CLASS)
    }

    fn render(&self, package: &Package) -> Result<Vec<u8>> {
        let mut image = package.image().to_vec();

        for index in package.changed_exports() {
            let export = &package.exports()[index];
            let data = export.data();
            let old_offset = export.data_offset as usize;

            let offset = if data.len() <= export.data_size as usize {
                image[old_offset..old_offset + data.len()].copy_from_slice(data);
                old_offset
            } else {
                let end = image.len();
                image.extend_from_slice(data);
                end
            };

            let entry = export.table_offset();
            let size = offset_u32(data.len(), "export size")?;
            let offset_field = offset_u32(offset, "export offset")?;
            write_u32(&mut image, entry + EXPORT_DATA_SIZE_FIELD, size)
                .and_then(|()| write_u32(&mut image, entry + EXPORT_DATA_OFFSET_FIELD, offset_field))
                .ok_or_else(|| {
                    TransplantError::CorruptPackage(format!(
                        "export entry #{} at {entry:#x} is outside the image",
                        index + 1
                    ))
                })?;
            debug!(
                "In-place: export #{} now {} bytes at {:#x}",
                index + 1,
                data.len(),
                offset
            );
        }

        Ok(image)
    }
}

/// Rebuild the whole file with freshly computed offsets
#[derive(Debug, Default, Clone, Copy)]
pub struct ReconstructSave;

impl SaveStrategy for ReconstructSave {
    fn name(&self) -> &'static str {
        "reconstruct"
    }

    fn applies(&self, _package: &Package) -> bool {
        true
    }

    fn render(&self, package: &Package) -> Result<Vec<u8>> {
        let image = package.image();
        let old = package.header();

        // Original table extents
        let names_start = old.name_offset as usize;
        let names_end = names_start + package.name_table_size();
        let imports_start = old.import_offset as usize;
        let imports_end = imports_start + package.imports().len() * IMPORT_ENTRY_SIZE;
        let exports_start = old.export_offset as usize;
        let export_table_len: usize = package.exports().iter().map(|e| e.entry_size()).sum();
        let exports_end = exports_start + export_table_len;
        let tables_end = names_end.max(imports_end).max(exports_end);

        // Original data extents
        let data_start = package
            .exports()
            .iter()
            .filter(|e| e.data_size > 0)
            .map(|e| e.data_offset as usize)
            .min()
            .unwrap_or(tables_end.max(old.header_size as usize));
        let data_end = package
            .exports()
            .iter()
            .map(|e| e.data_offset as usize + e.data_size as usize)
            .max()
            .unwrap_or(data_start)
            .max(data_start);
        if data_start < tables_end || data_end > image.len() {
            return Err(TransplantError::UnsupportedFormat(format!(
                "export data at {data_start:#x} overlaps the tables ending at {tables_end:#x}"
            )));
        }
        let between_tables = &image[tables_end..data_start];
        let trailing = &image[data_end..];

        // New layout
        let mut header = old.clone();
        let name_offset = header.len();
        let import_offset = name_offset + package.name_table_size();
        let export_offset = import_offset + package.imports().len() * IMPORT_ENTRY_SIZE;
        let new_tables_end = export_offset + export_table_len;
        let new_data_start = new_tables_end + between_tables.len();

        header.name_offset = offset_u32(name_offset, "name table")?;
        header.import_offset = offset_u32(import_offset, "import table")?;
        header.export_offset = offset_u32(export_offset, "export table")?;
        header.header_size = offset_u32(new_data_start, "header size")?;
        let depends = old.depends_offset as usize;
        if (tables_end..=data_start).contains(&depends) {
            header.depends_offset = offset_u32(depends - tables_end + new_tables_end, "depends table")?;
        }

        // Physical order of the original data
        let mut order: Vec<usize> = (0..package.exports().len()).collect();
        order.sort_by_key(|&i| package.exports()[i].data_offset);

        let mut placement = vec![(0u32, 0u32); package.exports().len()];
        let mut cursor = new_data_start;
        for &i in &order {
            let len = package.exports()[i].data().len();
            placement[i] = (offset_u32(len, "export size")?, offset_u32(cursor, "export offset")?);
            cursor += len;
        }

        let mut out = Vec::with_capacity(cursor + trailing.len());
        out.extend_from_slice(&header.pack());
        out.extend_from_slice(&image[names_start..names_end]);
        for import in package.imports() {
            out.extend_from_slice(&import.pack());
        }
        for (export, (size, offset)) in package.exports().iter().zip(&placement) {
            out.extend_from_slice(&export.pack(*size, *offset));
        }
        out.extend_from_slice(between_tables);
        for &i in &order {
            out.extend_from_slice(package.exports()[i].data());
        }
        out.extend_from_slice(trailing);

        debug!(
            "Reconstructed {:?}: {} -> {} bytes",
            package.path(),
            image.len(),
            out.len()
        );
        Ok(out)
    }
}

static STRATEGIES: [&dyn SaveStrategy; 2] = [&InPlaceSave, &ReconstructSave];

/// First strategy that applies to `package`
pub fn select_strategy(package: &Package) -> &'static dyn SaveStrategy {
    STRATEGIES
        .iter()
        .copied()
        .find(|s| s.applies(package))
        .unwrap_or(&ReconstructSave)
}

/// Write `bytes` to a temporary file next to `dest`, then move it over `dest`
pub fn write_atomically(dest: &Path, bytes: &[u8]) -> Result<()> {
    let parent = match dest.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    fs::create_dir_all(parent).with_path(parent)?;

    let mut temp = NamedTempFile::new_in(parent).with_path(parent)?;
    temp.write_all(bytes).with_path(temp.path())?;
    temp.as_file().sync_all().with_path(temp.path())?;
    temp.persist(dest).map_err(|e| TransplantError::Io {
        path: dest.to_path_buf(),
        source: e.error,
    })?;
    Ok(())
}

/// `<dest>.<suffix>`, keeping the original extension
pub fn backup_path(dest: &Path, suffix: &str) -> PathBuf {
    let mut name = dest.as_os_str().to_owned();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// What [`commit`] did
#[derive(Debug, Clone, Serialize)]
pub enum CommitOutcome {
    /// No export was changed; nothing was written
    NoMatches,
    Committed {
        replaced: usize,
        strategy: &'static str,
        backup: Option<PathBuf>,
        report: VerifyReport,
    },
}

/// Save a modified package to `dest` inside the backup/verify envelope
pub fn commit(package: &Package, dest: &Path, backup_suffix: &str) -> Result<CommitOutcome> {
    commit_with(package, dest, backup_suffix, select_strategy(package))
}

/// [`commit`] with an explicit save strategy
pub fn commit_with(
    package: &Package,
    dest: &Path,
    backup_suffix: &str,
    strategy: &'static dyn SaveStrategy,
) -> Result<CommitOutcome> {
    let replaced = package.changed_exports().len();
    if replaced == 0 {
        info!("No exports replaced, leaving {:?} untouched", dest);
        return Ok(CommitOutcome::NoMatches);
    }

    let backup = if dest.exists() {
        let backup = backup_path(dest, backup_suffix);
        if backup.exists() {
            fs::remove_file(&backup).with_path(&backup)?;
        }
        fs::rename(dest, &backup).with_path(dest)?;
        debug!("Backed up {:?} to {:?}", dest, backup);
        Some(backup)
    } else {
        None
    };

    info!(
        "Saving {:?} ({} replaced, {} strategy)",
        dest,
        replaced,
        strategy.name()
    );

    let result = strategy
        .save(package, dest)
        .and_then(|()| verify_matches(dest, package));
    match result {
        Ok(report) => Ok(CommitOutcome::Committed {
            replaced,
            strategy: strategy.name(),
            backup,
            report,
        }),
        Err(e) => {
            if let Some(backup) = &backup {
                warn!("Save of {:?} failed, original kept at {:?}", dest, backup);
            }
            Err(e)
        }
    }
}
