//! Utility functions for transplanter

use glob::MatchOptions;
use std::path::{Path, PathBuf};

use crate::exceptions::{Result, TransplantError};

/// Accepts: "1", "true", "on", "yes", "t" (case insensitive)
/// Every file under `root` (recursively) with extension `ext`, sorted.
/// The extension match is case-insensitive.
pub fn find_files(root: &Path, ext: &str) -> Result<Vec<PathBuf>> {
    let pattern = root.join("**").join(format!("*.{ext}"));
    let pattern = pattern.to_string_lossy();
    let options = MatchOptions {
        case_sensitive: false,
        ..MatchOptions::new()
    };

    let entries = glob::glob_with(&pattern, options).map_err(|e| {
        TransplantError::Generic(format!("Invalid search pattern '{pattern}': {e}"))
    })?;

    let mut files = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) if path.is_file() => files.push(path),
            Ok(_) => {}
            Err(e) => log::warn!("Skipping unreadable path {:?}: {}", e.path(), e.error()),
        }
    }
    files.sort();
    Ok(files)
}

/// Directory of `file` relative to `root`; empty when `file` sits directly in `root`
pub fn relative_parent(root: &Path, file: &Path) -> PathBuf {
    file.parent()
        .and_then(|parent| parent.strip_prefix(root).ok())
        .map(Path::to_path_buf)
        .unwrap_or_default()
}

/// `file` relative to `root`, falling back to its file name
pub fn relative_path(root: &Path, file: &Path) -> PathBuf {
    file.strip_prefix(root)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| file.file_name().map(PathBuf::from).unwrap_or_default())
}

/// File name without extension, as an owned string
pub fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Whether two paths name the same file on disk
pub fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => a == b,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_find_files_recurses_and_ignores_case() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        fs::create_dir_all(root.join("a/b")).unwrap();
        fs::write(root.join("top.pcc"), b"").unwrap();
        fs::write(root.join("a/b/deep.PCC"), b"").unwrap();
        fs::write(root.join("a/skip.txt"), b"").unwrap();

        let files = find_files(root, "pcc").unwrap();
        assert_eq!(files.len(), 2);
        assert!(files.iter().any(|f| f.ends_with("a/b/deep.PCC")));
        assert!(files.iter().any(|f| f.ends_with("top.pcc")));
    }

    #[test]
    fn test_relative_helpers() {
        let root = Path::new("/data/cooked");
        let file = Path::new("/data/cooked/gui/menus/Startup.pcc");
        assert_eq!(relative_parent(root, file), PathBuf::from("gui/menus"));
        assert_eq!(relative_path(root, file), PathBuf::from("gui/menus/Startup.pcc"));
        assert_eq!(relative_parent(root, Path::new("/data/cooked/x.pcc")), PathBuf::new());
        assert_eq!(file_stem(file), "Startup");
    }

    #[test]
    fn test_same_file_through_different_spellings() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("one.pcc");
        fs::write(&file, b"x").unwrap();
        let dotted = temp.path().join(".").join("one.pcc");
        assert!(same_file(&file, &dotted));
        assert!(!same_file(&file, &temp.path().join("two.pcc")));
    }
}
