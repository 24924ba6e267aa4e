//! Uncompressed package (`.pcc`) reading, movie splicing and writing

pub mod bytes;
pub mod constants;
pub mod dump;
pub mod names;
pub mod package;
pub mod payload;
pub mod persistence;
pub mod properties;
pub mod tables;
pub mod verifier;

#[cfg(test)]
pub(crate) mod fixtures;

pub use names::{NameLookup, NameReference, NameTable};
pub use package::Package;
pub use persistence::{CommitOutcome, InPlaceSave, ReconstructSave, SaveStrategy};
pub use properties::{Property, PropertyStream, PropertyType, PropertyValue, StopReason};
pub use tables::{ExportEntry, ImportEntry, PackageHeader};
