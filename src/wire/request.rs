//! Outbound stream request message

use super::varint::write_varint;
use super::WireType;

/// The request that opens the trade stream and doubles as its keep-alive
/// heartbeat.
///
/// Schema: `source` (field 1, string), `open_positions` (field 2, int32).
/// Matching the server's decoder, an empty source and a non-positive
/// position count are omitted rather than encoded as defaults.
#[derive(Debug, Clone)]
pub struct TradeStreamRequest {
    pub source: String,
    pub open_positions: i32,
}

impl Default for TradeStreamRequest {
    fn default() -> Self {
        Self {
            source: "hedgebot".to_string(),
            open_positions: 0,
        }
    }
}

impl TradeStreamRequest {
    pub fn new(source: impl Into<String>, open_positions: i32) -> Self {
        Self {
            source: source.into(),
            open_positions,
        }
    }

    /// Encode as protobuf bytes.
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();

        if !self.source.is_empty() {
            write_varint(&mut out, 1 << 3 | WireType::LengthDelimited as u64);
            write_varint(&mut out, self.source.len() as u64);
            out.extend_from_slice(self.source.as_bytes());
        }

        if self.open_positions > 0 {
            write_varint(&mut out, 2 << 3 | WireType::Varint as u64);
            write_varint(&mut out, self.open_positions as u64);
        }

        out
    }
}
