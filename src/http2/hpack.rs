//! HPACK-lite header block encoding
//!
//! A fixed, non-dynamic, non-Huffman subset of HPACK: two static-table
//! references (`:method: POST`, `:scheme: http`) and literal encodings for
//! everything else. Sufficient only for the hardcoded gRPC request header
//! set, and kept bit-compatible with what the paired server accepts.

use crate::{Error, Result};

/// HPACK static table index for `:method: POST`, indexed representation.
const IDX_METHOD_POST: u8 = 0x83;
/// HPACK static table index for `:scheme: http`, indexed representation.
const IDX_SCHEME_HTTP: u8 = 0x86;
/// Literal value for the `:path` static name entry.
const NAME_IDX_PATH: u8 = 0x04;
/// Literal value for the `:authority` static name entry.
const NAME_IDX_AUTHORITY: u8 = 0x01;
/// Literal header with incremental indexing, new name.
const LITERAL_WITH_INDEXING: u8 = 0x40;

/// Header values are length-prefixed with a single byte (no HPACK integer
/// continuation), so each string must fit 7 bits.
const MAX_LITERAL_LEN: usize = 127;

/// Encode the fixed gRPC request header block.
///
/// Produces, in order: `:method: POST`, `:path: <path>`, `:scheme: http`,
/// `:authority: <authority>`, `content-type: application/grpc`,
/// `grpc-encoding: identity`, `te: trailers`, `user-agent: <user_agent>`.
pub fn encode_request_headers(path: &str, authority: &str, user_agent: &str) -> Result<Vec<u8>> {
    for (name, value) in [("path", path), ("authority", authority), ("user-agent", user_agent)] {
        if value.len() > MAX_LITERAL_LEN {
            return Err(Error::Config(format!(
                "{name} too long for single-byte HPACK length: {} bytes",
                value.len()
            )));
        }
    }

    let mut block = Vec::with_capacity(96 + path.len() + authority.len() + user_agent.len());

    block.push(IDX_METHOD_POST);

    block.push(NAME_IDX_PATH);
    block.push(path.len() as u8);
    block.extend_from_slice(path.as_bytes());

    block.push(IDX_SCHEME_HTTP);

    block.push(NAME_IDX_AUTHORITY);
    block.push(authority.len() as u8);
    block.extend_from_slice(authority.as_bytes());

    put_literal(&mut block, "content-type", "application/grpc");
    put_literal(&mut block, "grpc-encoding", "identity");
    put_literal(&mut block, "te", "trailers");
    put_literal(&mut block, "user-agent", user_agent);

    Ok(block)
}

fn put_literal(block: &mut Vec<u8>, name: &str, value: &str) {
    block.push(LITERAL_WITH_INDEXING);
    block.push(name.len() as u8);
    block.extend_from_slice(name.as_bytes());
    block.push(value.len() as u8);
    block.extend_from_slice(value.as_bytes());
}

/// Decode a header block produced by [`encode_request_headers`].
///
/// Reference decoder for exactly the encoder's subset of HPACK; it exists so
/// the emitted header set can be asserted against, not as a general HPACK
/// implementation.
pub fn decode_header_block(block: &[u8]) -> Result<Vec<(String, String)>> {
    let mut headers = Vec::new();
    let mut cursor = 0;

    while cursor < block.len() {
        let rep = block[cursor];
        cursor += 1;

        match rep {
            IDX_METHOD_POST => headers.push((":method".to_string(), "POST".to_string())),
            IDX_SCHEME_HTTP => headers.push((":scheme".to_string(), "http".to_string())),
            NAME_IDX_PATH => {
                let value = read_literal(block, &mut cursor)?;
                headers.push((":path".to_string(), value));
            }
            NAME_IDX_AUTHORITY => {
                let value = read_literal(block, &mut cursor)?;
                headers.push((":authority".to_string(), value));
            }
            LITERAL_WITH_INDEXING => {
                let name = read_literal(block, &mut cursor)?;
                let value = read_literal(block, &mut cursor)?;
                headers.push((name, value));
            }
            other => {
                return Err(Error::Config(format!(
                    "unrecognized header representation byte 0x{other:02x}"
                )));
            }
        }
    }

    Ok(headers)
}

fn read_literal(block: &[u8], cursor: &mut usize) -> Result<String> {
    if *cursor >= block.len() {
        return Err(Error::TruncatedInput(*cursor));
    }
    let len = block[*cursor] as usize;
    *cursor += 1;

    let end = *cursor + len;
    if end > block.len() {
        return Err(Error::TruncatedInput(*cursor));
    }

    let value = String::from_utf8_lossy(&block[*cursor..end]).into_owned();
    *cursor = end;
    Ok(value)
}
