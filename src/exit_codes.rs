//! Standard exit codes for the transplanter binary
//!
//! Codes 9-15 keep the numbering older transplanter front ends reported so
//! scripts that check them keep working.

/// Successful execution
pub const EXIT_SUCCESS: i32 = 0;

/// Generic error (avoid using - be more specific)
pub const EXIT_ERROR: i32 = 1;

/// Neither --inputfile nor --inputfolder was given
pub const EXIT_NO_INPUT: i32 = 9;

/// No operation switch was given
pub const EXIT_NO_OPERATION: i32 = 10;

/// --inputfile does not exist
pub const EXIT_INPUT_FILE_NOT_FOUND: i32 = 11;

/// --inputfolder does not exist
pub const EXIT_INPUT_FOLDER_NOT_FOUND: i32 = 12;

/// --transplantfile does not exist
pub const EXIT_NO_TRANSPLANT_FILE: i32 = 13;

/// --extract was given without anything to dump
pub const EXIT_NO_DATA_TO_DUMP: i32 = 14;

/// Source and destination of a transplant are the same file
pub const EXIT_SAME_IN_OUT_FILE: i32 = 15;

/// Panic or unrecoverable error
pub const EXIT_PANIC: i32 = 101;

/// Package format error (bad magic, compressed, corrupt tables)
pub const EXIT_FORMAT_ERROR: i32 = 102;

/// Invalid command-line arguments
pub const EXIT_INVALID_ARGS: i32 = 105;

/// I/O error (file not found, permission denied, disk error)
pub const EXIT_IO_ERROR: i32 = 106;

/// Written package failed to reopen
pub const EXIT_VERIFY_ERROR: i32 = 107;

/// At least one file in a batch failed
pub const EXIT_BATCH_ERROR: i32 = 108;

/// Configuration error (unreadable or invalid config file)
pub const EXIT_CONFIG_ERROR: i32 = 109;
