//! Varint and length-delimited field primitives

use crate::{Error, Result};

/// Read a protobuf varint at `cursor`, advancing it past the field.
///
/// 7 data bits per byte, least significant group first, continuation via the
/// high bit. Fails with [`Error::TruncatedInput`] if the terminating byte
/// (high bit clear) is not found within the buffer or within the 64-bit
/// limit (10 bytes).
pub fn read_varint(buf: &[u8], cursor: &mut usize) -> Result<u64> {
    let mut value: u64 = 0;
    let mut shift: u32 = 0;

    while *cursor < buf.len() && shift < 64 {
        let byte = buf[*cursor];
        *cursor += 1;
        value |= u64::from(byte & 0x7F) << shift;
        if byte & 0x80 == 0 {
            return Ok(value);
        }
        shift += 7;
    }

    Err(Error::TruncatedInput(*cursor))
}

/// Read a length-delimited field at `cursor`, advancing it past the field.
///
/// Reads a varint length, then returns the exact byte slice. Fails with
/// [`Error::TruncatedInput`] if the declared length exceeds the buffer.
pub fn read_length_delimited<'a>(buf: &'a [u8], cursor: &mut usize) -> Result<&'a [u8]> {
    let length = read_varint(buf, cursor)? as usize;

    let end = cursor
        .checked_add(length)
        .ok_or(Error::TruncatedInput(*cursor))?;
    if end > buf.len() {
        return Err(Error::TruncatedInput(*cursor));
    }

    let slice = &buf[*cursor..end];
    *cursor = end;
    Ok(slice)
}

/// Append a varint encoding of `value` to `out`.
pub fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    loop {
        let byte = (value & 0x7F) as u8;
        value >>= 7;
        if value == 0 {
            out.push(byte);
            return;
        }
        out.push(byte | 0x80);
    }
}
