//! Transplanter - GFx movie extraction and replacement for ME3 packages
//!
//! This crate reads uncompressed `.pcc` packages, decodes export property
//! streams, splices movie payloads in and out of `GFxMovieInfo` exports and
//! writes the modified package back with a backup and a verification pass.

// Enforce strict code quality and reliability
#![deny(
    // Safety
    unsafe_code,

    // Future compatibility
    future_incompatible,

    // Rust 2018 idioms
    rust_2018_idioms,
)]
#![warn(
    // Correctness
    missing_debug_implementations,
    unreachable_pub,

    // Error handling best practices
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    clippy::unimplemented,
    clippy::todo,

    // Performance
    clippy::inefficient_to_string,
    clippy::large_enum_variant,

    // Code clarity and maintainability
    clippy::cognitive_complexity,
    clippy::too_many_arguments,
    clippy::type_complexity,

    // Best practices
    clippy::clone_on_ref_ptr,
    clippy::wildcard_imports,
    clippy::enum_glob_use,
    clippy::if_not_else,
    clippy::needless_continue,
    clippy::explicit_iter_loop,
    clippy::explicit_into_iter_loop,
)]
#![cfg_attr(
    test,
    allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)
)]

pub mod api;
pub mod config;
pub mod exceptions;
pub mod exit_codes;
pub mod logger;
pub mod pcc;
pub mod utils;
pub mod version;

// Re-export main API types
pub use api::{FileReport, FileStatus, Progress, Transplanter};
pub use config::TransplantConfig;
pub use exceptions::TransplantError;
pub use pcc::{CommitOutcome, Package};
