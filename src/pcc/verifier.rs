//! Post-write verification.
//!
//! Reopening runs the full [`Package`] load, which bounds-checks every table
//! entry, export buffer, name reference and object index. On top of that the
//! written export buffers are compared with the in-memory package and every
//! property stream is decoded.

use log::debug;
use serde::Serialize;
use std::path::{Path, PathBuf};

use super::package::Package;
use super::properties::read_export_properties;
use crate::exceptions::{Result, TransplantError};

/// Summary of a successful verification walk
#[derive(Debug, Clone, Serialize)]
pub struct VerifyReport {
    pub path: PathBuf,
    pub names: usize,
    pub imports: usize,
    pub exports: usize,
    pub data_bytes: usize,
    pub properties: usize,
}

fn failed(path: &Path, reason: impl Into<String>) -> TransplantError {
    TransplantError::VerificationFailed {
        path: path.to_path_buf(),
        reason: reason.into(),
    }
}

/// Reopen `path` and require every export buffer to equal `expected`'s
pub fn verify_matches(path: &Path, expected: &Package) -> Result<VerifyReport> {
    let package = Package::load(path).map_err(|e| failed(path, e.to_string()))?;

    if package.exports().len() != expected.exports().len() {
        return Err(failed(
            path,
            format!(
                "expected {} exports, found {}",
                expected.exports().len(),
                package.exports().len()
            ),
        ));
    }
    for (i, (written, wanted)) in package.exports().iter().zip(expected.exports()).enumerate() {
        if written.data() != wanted.data() {
            return Err(failed(
                path,
                format!(
                    "export #{} ({}) holds {} bytes, expected {}",
                    i + 1,
                    package.qualified_name(written),
                    written.data().len(),
                    wanted.data().len()
                ),
            ));
        }
    }

    Ok(walk(&package))
}

fn walk(package: &Package) -> VerifyReport {
    let mut data_bytes = 0;
    let mut properties = 0;
    for export in package.exports() {
        data_bytes += export.data().len();
        properties += read_export_properties(package, export).len();
    }

    let report = VerifyReport {
        path: package.path().to_path_buf(),
        names: package.names().len(),
        imports: package.imports().len(),
        exports: package.exports().len(),
        data_bytes,
        properties,
    };
    debug!(
        "Verified {:?}: {} imports, {} exports, {} data bytes",
        report.path, report.imports, report.exports, report.data_bytes
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pcc::fixtures::PackageFixture;
    use tempfile::TempDir;

    #[test]
    fn test_verify_counts_tables() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("menu.pcc");
        PackageFixture::movie_package().write_to(&path);

        let expected = Package::load(&path).unwrap();
        let report = verify_matches(&path, &expected).unwrap();
        assert_eq!(report.imports, 3);
        assert_eq!(report.exports, 3);
        assert!(report.data_bytes > 0);
    }

    #[test]
    fn test_unreadable_file_fails_verification() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("broken.pcc");
        std::fs::write(&path, b"not a package").unwrap();

        let fixture = temp.path().join("menu.pcc");
        PackageFixture::movie_package().write_to(&fixture);
        let expected = Package::load(&fixture).unwrap();

        assert!(matches!(
            verify_matches(&path, &expected),
            Err(TransplantError::VerificationFailed { .. })
        ));
        assert!(verify_matches(&temp.path().join("missing.pcc"), &expected).is_err());
    }

    #[test]
    fn test_verify_matches_detects_different_data() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("menu.pcc");
        PackageFixture::movie_package().write_to(&path);

        let mut expected = Package::load(&path).unwrap();
        assert!(verify_matches(&path, &expected).is_ok());

        expected.replace_export_data(1, vec![1, 2, 3]).unwrap();
        assert!(matches!(
            verify_matches(&path, &expected),
            Err(TransplantError::VerificationFailed { .. })
        ));
    }
}
