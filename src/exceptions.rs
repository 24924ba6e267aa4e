//! Error types for transplanter

use std::fmt;
use std::path::{Path, PathBuf};

/// Main error type for transplanter operations
#[derive(Debug)]
pub enum TransplantError {
    /// File is not a package this crate can read (bad magic, compressed)
    UnsupportedFormat(String),

    /// Package tables are truncated or inconsistent
    CorruptPackage(String),

    /// An export buffer does not have the payload shape
    MalformedExport(String),

    /// A freshly written package failed to reopen
    VerificationFailed { path: PathBuf, reason: String },

    /// The same file was given as source and destination
    SameSourceAndDestination(PathBuf),

    /// IO error tied to a specific file
    Io { path: PathBuf, source: std::io::Error },

    /// IO error without path context
    IoError(std::io::Error),

    /// JSON parsing error
    JsonError(serde_json::Error),

    /// Generic error with message
    Generic(String),
}

impl fmt::Display for TransplantError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransplantError::UnsupportedFormat(msg) => write!(f, "Unsupported format: {msg}"),
            TransplantError::CorruptPackage(msg) => write!(f, "Corrupt package: {msg}"),
            TransplantError::MalformedExport(msg) => write!(f, "Malformed export: {msg}"),
            TransplantError::VerificationFailed { path, reason } => {
                write!(f, "Verification failed for {}: {reason}", path.display())
            }
            TransplantError::SameSourceAndDestination(path) => write!(
                f,
                "Cannot transplant a package into itself: {}",
                path.display()
            ),
            TransplantError::Io { path, source } => {
                write!(f, "IO error on {}: {source}", path.display())
            }
            TransplantError::IoError(err) => write!(f, "IO error: {err}"),
            TransplantError::JsonError(err) => write!(f, "JSON error: {err}"),
            TransplantError::Generic(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for TransplantError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TransplantError::Io { source, .. } => Some(source),
            TransplantError::IoError(err) => Some(err),
            TransplantError::JsonError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for TransplantError {
    fn from(err: std::io::Error) -> Self {
        TransplantError::IoError(err)
    }
}

impl From<serde_json::Error> for TransplantError {
    fn from(err: serde_json::Error) -> Self {
        TransplantError::JsonError(err)
    }
}

impl From<anyhow::Error> for TransplantError {
    fn from(err: anyhow::Error) -> Self {
        TransplantError::Generic(err.to_string())
    }
}

impl TransplantError {
    /// Whether this failure came from the filesystem rather than the data
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            TransplantError::Io { .. } | TransplantError::IoError(_)
        )
    }
}

/// Attach the offending path to an IO result
pub trait PathContext<T> {
    fn with_path(self, path: &Path) -> Result<T>;
}

impl<T> PathContext<T> for std::io::Result<T> {
    fn with_path(self, path: &Path) -> Result<T> {
        self.map_err(|source| TransplantError::Io {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Result type for transplanter operations
pub type Result<T> = std::result::Result<T, TransplantError>;
