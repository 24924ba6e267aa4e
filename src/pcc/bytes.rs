//! Little-endian field access over raw package bytes
//!
//! Every reader returns `None` instead of panicking when the field runs past
//! the end of the slice; callers decide whether that is fatal.

pub fn read_u16(data: &[u8], offset: usize) -> Option<u16> {
    let bytes = data.get(offset..offset.checked_add(2)?)?;
    Some(u16::from_le_bytes(bytes.try_into().ok()?))
}

pub fn read_i32(data: &[u8], offset: usize) -> Option<i32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(i32::from_le_bytes(bytes.try_into().ok()?))
}

pub fn read_u32(data: &[u8], offset: usize) -> Option<u32> {
    let bytes = data.get(offset..offset.checked_add(4)?)?;
    Some(u32::from_le_bytes(bytes.try_into().ok()?))
}

pub fn read_u64(data: &[u8], offset: usize) -> Option<u64> {
    let bytes = data.get(offset..offset.checked_add(8)?)?;
    Some(u64::from_le_bytes(bytes.try_into().ok()?))
}

/// Overwrite a 4-byte field in place
pub fn write_u32(data: &mut [u8], offset: usize, value: u32) -> Option<()> {
    let slot = data.get_mut(offset..offset.checked_add(4)?)?;
    slot.copy_from_slice(&value.to_le_bytes());
    Some(())
}

/// Decode a length-prefixed engine string at `offset`.
///
/// Negative lengths count UTF-16 units, positive lengths count narrow bytes;
/// both include a trailing NUL which is stripped. Returns the string and the
/// total number of bytes consumed (prefix included).
pub fn read_fstring(data: &[u8], offset: usize) -> Option<(String, usize)> {
    let len = read_i32(data, offset)?;
    let body = offset + 4;

    if len < 0 {
        let units = len.unsigned_abs() as usize;
        let byte_len = units.checked_mul(2)?;
        let raw = data.get(body..body.checked_add(byte_len)?)?;
        let wide: Vec<u16> = raw
            .chunks_exact(2)
            .map(|pair| u16::from_le_bytes([pair[0], pair[1]]))
            .take_while(|&unit| unit != 0)
            .collect();
        Some((String::from_utf16_lossy(&wide), 4 + byte_len))
    } else {
        let byte_len = len as usize;
        let raw = data.get(body..body.checked_add(byte_len)?)?;
        let text: String = raw
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| b as char)
            .collect();
        Some((text, 4 + byte_len))
    }
}
