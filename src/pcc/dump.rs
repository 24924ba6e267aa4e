//! Plain-text package reports

use log::{error, info};
use serde::Deserialize;
use std::fmt::{self, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use super::constants::IMPORT_ENTRY_SIZE;
use super::package::Package;
use super::properties::{property_to_text, read_properties};
use crate::exceptions::{PathContext, Result};
use crate::utils::{file_stem, find_files, relative_parent};

/// Which sections to include in a report
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DumpOptions {
    pub imports: bool,
    pub exports: bool,
    pub data: bool,
    pub names: bool,
    pub properties: bool,
    /// Put a rule line between exports
    pub separate_exports: bool,
}

impl DumpOptions {
    /// Whether at least one section is selected
    pub fn any(&self) -> bool {
        self.imports || self.exports || self.data || self.names || self.properties
    }
}

const PROPERTY_RULE: &str = "=================================================Properties=================================================";
const PROPERTY_END: &str = "==================================================================================================";
const EXPORT_RULE: &str = "=======================================================================";

/// Render the selected sections of `package`
pub fn dump_package(package: &Package, options: &DumpOptions) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail
    let _ = render(package, options, &mut out);
    out
}

fn render(package: &Package, options: &DumpOptions, out: &mut String) -> fmt::Result {
    if options.imports {
        writeln!(out, "--Imports")?;
        let table = package.header().import_offset as usize;
        for (i, import) in package.imports().iter().enumerate() {
            writeln!(
                out,
                "#{}: {}(From: {}) (Offset: 0x{:04X})",
                -(i as i64 + 1),
                package.import_qualified_name(import),
                package.import_package_file(import),
                table + i * IMPORT_ENTRY_SIZE
            )?;
        }
        writeln!(out, "--End of Imports")?;
    }

    if options.exports || options.data || options.properties {
        let mut sets = Vec::new();
        if options.exports {
            sets.push("Exports");
        }
        if options.properties {
            sets.push("Properties");
        }
        if options.data {
            sets.push("Data");
        }
        let sets = sets.join(" ");
        writeln!(out, "--Start of {sets}")?;

        for (i, export) in package.exports().iter().enumerate() {
            if options.separate_exports {
                writeln!(out, "{EXPORT_RULE}")?;
            }
            write!(out, "#{} ", i + 1)?;
            writeln!(
                out,
                "{}({}) (Superclass: {}) (Data Offset: 0x{:04X})",
                package.qualified_name(export),
                package.class_name(export),
                package.super_class_name(export).unwrap_or_default(),
                export.data_offset
            )?;

            if options.properties {
                let stream = read_properties(package, export.data());
                if !stream.is_empty() {
                    writeln!(out, "{PROPERTY_RULE}")?;
                    writeln!(
                        out,
                        "|{:>40}|{:>15}|{:>10}|{:>30}|",
                        "Name", "Type", "Size", "Value"
                    )?;
                    for property in stream.iter() {
                        writeln!(out, "{}", property_to_text(property, package))?;
                    }
                    writeln!(out, "{PROPERTY_END}")?;
                }
            }

            if options.data {
                writeln!(out, "==============Data==============")?;
                writeln!(out, "{}", hex::encode_upper(export.data()))?;
            }
        }
        writeln!(out, "--End of {sets}")?;
    }

    if options.names {
        writeln!(out, "--Names")?;
        for (i, name) in package.names().iter().enumerate() {
            writeln!(out, "{i} : {name}")?;
        }
        writeln!(out, "--End of Names")?;
    }
    Ok(())
}

/// Dump one package to `<out_dir>/<stem>.txt` (default: next to the package)
pub fn dump_file(path: &Path, options: &DumpOptions, out_dir: Option<&Path>) -> Result<PathBuf> {
    let package = Package::load(path)?;
    let out_dir = match out_dir {
        Some(dir) => dir.to_path_buf(),
        None => path.parent().map(Path::to_path_buf).unwrap_or_default(),
    };
    fs::create_dir_all(&out_dir).with_path(&out_dir)?;

    let target = out_dir.join(format!("{}.txt", file_stem(path)));
    fs::write(&target, dump_package(&package, options)).with_path(&target)?;
    Ok(target)
}

/// Dump every package under `root`, mirroring subdirectories into `out_root`.
/// Files that fail to load are logged and skipped. Returns the reports written.
pub fn dump_folder(
    root: &Path,
    package_ext: &str,
    options: &DumpOptions,
    out_root: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let files = find_files(root, package_ext)?;
    let mut written = Vec::with_capacity(files.len());

    for (i, file) in files.iter().enumerate() {
        info!("[{}/{}] Dumping {}", i + 1, files.len(), file_stem(file));
        let out_dir = out_root.map(|out| out.join(relative_parent(root, file)));
        match dump_file(file, options, out_dir.as_deref()) {
            Ok(target) => written.push(target),
            Err(e) => error!("Failed to dump {:?}: {}", file, e),
        }
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcc::fixtures::PackageFixture;
    use tempfile::TempDir;

    fn all() -> DumpOptions {
        DumpOptions {
            imports: true,
            exports: true,
            data: true,
            names: true,
            properties: true,
            separate_exports: false,
        }
    }

    #[test]
    fn test_dump_sections() {
        let package =
            Package::from_bytes(Path::new("mem.pcc"), PackageFixture::movie_package().build())
                .unwrap();
        let text = dump_package(&package, &all());

        assert!(text.contains("--Imports"));
        assert!(text.contains("#-2: GFxUI.GFxMovieInfo(From: Core)"));
        assert!(text.contains("#2 GUI_Menu.MainMenu(GFxMovieInfo)"));
        assert!(text.contains("--Start of Exports Properties Data"));
        assert!(text.contains("0 : None"));
        assert!(text.trim_end().ends_with("--End of Names"));
    }

    #[test]
    fn test_dump_only_names() {
        let package =
            Package::from_bytes(Path::new("mem.pcc"), PackageFixture::movie_package().build())
                .unwrap();
        let options = DumpOptions {
            names: true,
            ..DumpOptions::default()
        };
        let text = dump_package(&package, &options);
        assert!(text.starts_with("--Names"));
        assert!(!text.contains("--Imports"));
        assert!(options.any());
        assert!(!DumpOptions::default().any());
    }

    #[test]
    fn test_dump_folder_mirrors_tree_and_skips_bad_files() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("in");
        let out = temp.path().join("out");
        fs::create_dir_all(root.join("gui")).unwrap();
        PackageFixture::movie_package().write_to(&root.join("gui").join("Menu.pcc"));
        fs::write(root.join("Broken.pcc"), b"garbage").unwrap();

        let written = dump_folder(&root, "pcc", &all(), Some(&out)).unwrap();
        assert_eq!(written, vec![out.join("gui").join("Menu.txt")]);
        assert!(fs::read_to_string(&written[0]).unwrap().contains("--Names"));
    }
}
