//! Skipping of unknown protobuf fields by wire type

use super::varint::read_varint;
use crate::{Error, Result};

/// Skip one field of the given raw wire type, advancing `cursor` past it.
///
/// Unknown field numbers are tolerated by the decoder, but only for the four
/// wire types the schema can produce; anything else fails with
/// [`Error::UnsupportedWireType`].
pub fn skip_field(raw_wire_type: u32, buf: &[u8], cursor: &mut usize) -> Result<()> {
    match raw_wire_type {
        // varint
        0 => {
            read_varint(buf, cursor)?;
            Ok(())
        }
        // 64-bit
        1 => advance(buf, cursor, 8),
        // length-delimited
        2 => {
            let length = read_varint(buf, cursor)? as usize;
            advance(buf, cursor, length)
        }
        // 32-bit
        5 => advance(buf, cursor, 4),
        other => Err(Error::UnsupportedWireType(other)),
    }
}

fn advance(buf: &[u8], cursor: &mut usize, count: usize) -> Result<()> {
    let end = cursor
        .checked_add(count)
        .ok_or(Error::TruncatedInput(*cursor))?;
    if end > buf.len() {
        return Err(Error::TruncatedInput(*cursor));
    }
    *cursor = end;
    Ok(())
}
