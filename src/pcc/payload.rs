//! Length-prefixed payload inside movie exports
//!
//! Buffer shape:
//!
//! ```text
//! [0..20)   header, opaque
//! [20..24)  total length (payload length + 4)
//! [24..28)  filler, opaque
//! [28..32)  payload length
//! [32..32+n) payload
//! [32+n..)  footer, opaque
//! ```

use super::bytes::read_i32;
use super::constants::{
    PAYLOAD_DATA_OFFSET, PAYLOAD_FILLER_OFFSET, PAYLOAD_HEADER_LEN, PAYLOAD_LEN_OFFSET,
    PAYLOAD_TOTAL_LEN_OFFSET,
};
use super::package::Package;
use super::tables::ExportEntry;
use crate::exceptions::{Result, TransplantError};

/// Range of the payload inside `buffer`
fn payload_range(buffer: &[u8]) -> Result<std::ops::Range<usize>> {
    let len = read_i32(buffer, PAYLOAD_LEN_OFFSET).ok_or_else(|| {
        TransplantError::MalformedExport(format!(
            "buffer of {} bytes is too short for a payload header",
            buffer.len()
        ))
    })?;
    let len = usize::try_from(len).map_err(|_| {
        TransplantError::MalformedExport(format!("negative payload length {len}"))
    })?;
    let end = PAYLOAD_DATA_OFFSET + len;
    if end > buffer.len() {
        return Err(TransplantError::MalformedExport(format!(
            "payload of {len} bytes runs past the {} byte buffer",
            buffer.len()
        )));
    }
    Ok(PAYLOAD_DATA_OFFSET..end)
}

/// Copy the payload out of an export buffer
pub fn extract(buffer: &[u8]) -> Result<Vec<u8>> {
    let range = payload_range(buffer)?;
    Ok(buffer[range].to_vec())
}

/// Build a new buffer carrying `payload`, keeping header, filler and footer
pub fn splice(buffer: &[u8], payload: &[u8]) -> Result<Vec<u8>> {
    let range = payload_range(buffer)?;
    let payload_len = i32::try_from(payload.len()).map_err(|_| {
        TransplantError::MalformedExport(format!("payload of {} bytes is too large", payload.len()))
    })?;
    let total_len = payload_len.checked_add(4).ok_or_else(|| {
        TransplantError::MalformedExport(format!("payload of {} bytes is too large", payload.len()))
    })?;

    let footer = &buffer[range.end..];
    let mut out = Vec::with_capacity(PAYLOAD_DATA_OFFSET + payload.len() + footer.len());
    out.extend_from_slice(&buffer[..PAYLOAD_HEADER_LEN]);
    out.extend_from_slice(&total_len.to_le_bytes());
    out.extend_from_slice(&buffer[PAYLOAD_FILLER_OFFSET..PAYLOAD_LEN_OFFSET]);
    out.extend_from_slice(&payload_len.to_le_bytes());
    out.extend_from_slice(payload);
    out.extend_from_slice(footer);

    debug_assert_eq!(out.len() - PAYLOAD_TOTAL_LEN_OFFSET, payload.len() + 12 + footer.len());
    Ok(out)
}

/// Whether `export` is of the movie marker class
pub fn is_payload_bearing(package: &Package, export: &ExportEntry, marker_class: &str) -> bool {
    package.class_name(export) == marker_class
}

/// Indices of every payload-bearing export, optionally only the one named `target`
pub fn payload_exports(package: &Package, marker_class: &str, target: Option<&str>) -> Vec<usize> {
    package
        .exports()
        .iter()
        .enumerate()
        .filter(|(_, export)| is_payload_bearing(package, export, marker_class))
        .filter(|(_, export)| target.is_none_or(|t| package.qualified_name(export) == t))
        .map(|(i, _)| i)
        .collect()
}
