// Core package format constants that never change
// For tool-level defaults, see config.rs

// Package signature
pub const PACKAGE_MAGIC: u32 = 0x9E2A83C1;

// Package flag marking a compressed body (unsupported)
pub const PACKAGE_FLAG_COMPRESSED: u32 = 0x0200_0000;

// Object flag: export buffer starts with a script stack frame
pub const OBJECT_FLAG_HAS_STACK: u64 = 0x0200_0000_0000_0000;

// Fixed table entry sizes
pub const IMPORT_ENTRY_SIZE: usize = 28;
pub const MIN_NAME_ENTRY_SIZE: usize = 4; // FString length prefix
pub const EXPORT_ENTRY_BASE_SIZE: usize = 68; // plus 4 bytes per generation

// Field positions inside an export table entry
pub const EXPORT_DATA_SIZE_FIELD: usize = 32;
pub const EXPORT_DATA_OFFSET_FIELD: usize = 36;
pub const EXPORT_GENERATION_COUNT_FIELD: usize = 44;

// Header field positions (relative to the start of the file)
pub const HEADER_SIZE_FIELD: usize = 8;
pub const FOLDER_NAME_FIELD: usize = 12;

// Well-known names
pub const NONE_NAME: &str = "None";
pub const CLASS_CLASS_NAME: &str = "Class";
pub const SHADER_CACHE_OBJECT: &str = "SeekFreeShaderCache";
pub const SHADER_CACHE_CLASS: &str = "ShaderCache";

// Payload-bearing export layout
pub const PAYLOAD_HEADER_LEN: usize = 20;
pub const PAYLOAD_TOTAL_LEN_OFFSET: usize = 20;
pub const PAYLOAD_FILLER_OFFSET: usize = 24;
pub const PAYLOAD_LEN_OFFSET: usize = 28;
pub const PAYLOAD_DATA_OFFSET: usize = 32;

// Property stream start offsets
pub const PROPERTY_START_DEFAULT: usize = 8;
pub const PROPERTY_START_SHORT: usize = 4;
pub const PROPERTY_START_STACK: usize = 30;

// Property tag layout: name(8) type(8) size(4) array index(4)
pub const PROPERTY_TAG_SIZE: usize = 24;
