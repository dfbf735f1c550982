//! Protobuf wire-format primitives
//!
//! A minimal decoder for the flat trade schema: varints, length-delimited
//! fields, fixed64 doubles. No reflection, no nested messages, no repeated
//! fields.

mod request;
mod skip;
mod trade;
mod varint;

pub use request::TradeStreamRequest;
pub use skip::skip_field;
pub use trade::TradeRecord;
pub use varint::{read_length_delimited, read_varint, write_varint};

/// Protobuf wire type, the low 3 bits of every field tag.
///
/// Wire types 3 and 4 (deprecated groups) are never produced by the trade
/// schema and are treated as hard decode failures, not skippable data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireType {
    Varint = 0,
    Fixed64 = 1,
    LengthDelimited = 2,
    Fixed32 = 5,
}

impl WireType {
    /// Interpret a raw 3-bit wire type, `None` for the unsupported values.
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Varint),
            1 => Some(Self::Fixed64),
            2 => Some(Self::LengthDelimited),
            5 => Some(Self::Fixed32),
            _ => None,
        }
    }
}
