//! Outbound frame construction

use super::{FLAG_ACK, FLAG_END_HEADERS, FRAME_TYPE_DATA, FRAME_TYPE_HEADERS, FRAME_TYPE_SETTINGS};
use crate::Result;
use bytes::{BufMut, Bytes, BytesMut};

/// The fixed 24-byte HTTP/2 client connection preface.
pub const CONNECTION_PREFACE: &[u8; 24] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// 9-byte HTTP/2 frame header.
///
/// Layout: 24-bit big-endian length, type, flags, then the reserved bit and
/// 31-bit stream id. Built and parsed per frame, never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameHeader {
    pub length: u32,
    pub frame_type: u8,
    pub flags: u8,
    pub stream_id: u32,
}

impl FrameHeader {
    /// Size of the encoded header.
    pub const SIZE: usize = 9;

    pub fn new(length: u32, frame_type: u8, flags: u8, stream_id: u32) -> Self {
        Self {
            length,
            frame_type,
            flags,
            stream_id,
        }
    }

    pub fn encode(&self) -> [u8; Self::SIZE] {
        let mut out = [0u8; Self::SIZE];
        out[0] = (self.length >> 16) as u8;
        out[1] = (self.length >> 8) as u8;
        out[2] = self.length as u8;
        out[3] = self.frame_type;
        out[4] = self.flags;
        out[5..9].copy_from_slice(&(self.stream_id & 0x7FFF_FFFF).to_be_bytes());
        out
    }

    /// Parse a header from the start of `buf`; `None` if fewer than 9 bytes
    /// are available. The reserved top bit of the stream id is ignored.
    pub fn parse(buf: &[u8]) -> Option<Self> {
        if buf.len() < Self::SIZE {
            return None;
        }

        let length =
            u32::from(buf[0]) << 16 | u32::from(buf[1]) << 8 | u32::from(buf[2]);
        let stream_id =
            u32::from_be_bytes([buf[5], buf[6], buf[7], buf[8]]) & 0x7FFF_FFFF;

        Some(Self {
            length,
            frame_type: buf[3],
            flags: buf[4],
            stream_id,
        })
    }
}

/// Build the outbound SETTINGS frame: HEADER_TABLE_SIZE=4096, ENABLE_PUSH=0,
/// MAX_FRAME_SIZE=16384, on stream 0.
pub fn settings_frame() -> Bytes {
    let mut frame = BytesMut::with_capacity(FrameHeader::SIZE + 18);
    frame.put_slice(&FrameHeader::new(18, FRAME_TYPE_SETTINGS, 0, 0).encode());

    // SETTINGS_HEADER_TABLE_SIZE = 4096
    frame.put_u16(0x0001);
    frame.put_u32(4096);
    // SETTINGS_ENABLE_PUSH = 0
    frame.put_u16(0x0002);
    frame.put_u32(0);
    // SETTINGS_MAX_FRAME_SIZE = 16384
    frame.put_u16(0x0005);
    frame.put_u32(16_384);

    frame.freeze()
}

/// Build the zero-length SETTINGS ACK frame.
///
/// Sent unconditionally after our own SETTINGS. The peer's SETTINGS frame is
/// neither awaited nor validated; the paired server tolerates this.
pub fn settings_ack() -> Bytes {
    Bytes::copy_from_slice(&FrameHeader::new(0, FRAME_TYPE_SETTINGS, FLAG_ACK, 0).encode())
}

/// Build the HEADERS frame opening the gRPC request stream.
///
/// Stream id is fixed to 1 (a single logical stream per connection) and
/// END_HEADERS is always set: the block must fit one frame, CONTINUATION is
/// not supported.
pub fn headers_frame(
    service: &str,
    method: &str,
    authority: &str,
    user_agent: &str,
) -> Result<Bytes> {
    let path = format!("/{service}/{method}");
    let block = super::hpack::encode_request_headers(&path, authority, user_agent)?;

    let mut frame = BytesMut::with_capacity(FrameHeader::SIZE + block.len());
    frame.put_slice(
        &FrameHeader::new(block.len() as u32, FRAME_TYPE_HEADERS, FLAG_END_HEADERS, 1).encode(),
    );
    frame.put_slice(&block);

    Ok(frame.freeze())
}

/// Wrap a protobuf payload in the 5-byte gRPC message envelope:
/// compression flag (0 = identity) then big-endian length.
pub fn grpc_envelope(payload: &[u8]) -> Bytes {
    let mut message = BytesMut::with_capacity(5 + payload.len());
    message.put_u8(0);
    message.put_u32(payload.len() as u32);
    message.put_slice(payload);
    message.freeze()
}

/// Wrap a gRPC message in a DATA frame on stream 1.
///
/// Flags stay 0: the logical request stream is held open for the life of the
/// session, END_STREAM is never sent.
pub fn data_frame(message: &[u8]) -> Bytes {
    let mut frame = BytesMut::with_capacity(FrameHeader::SIZE + message.len());
    frame.put_slice(&FrameHeader::new(message.len() as u32, FRAME_TYPE_DATA, 0, 1).encode());
    frame.put_slice(message);
    frame.freeze()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preface_literal() {
        assert_eq!(CONNECTION_PREFACE, b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n");
        assert_eq!(CONNECTION_PREFACE.len(), 24);
    }

    #[test]
    fn test_settings_frame_bytes() {
        let frame = settings_frame();
        assert_eq!(
            frame.as_ref(),
            &[
                0x00, 0x00, 0x12, // length 18
                0x04, // SETTINGS
                0x00, // flags
                0x00, 0x00, 0x00, 0x00, // stream 0
                0x00, 0x01, 0x00, 0x00, 0x10, 0x00, // HEADER_TABLE_SIZE=4096
                0x00, 0x02, 0x00, 0x00, 0x00, 0x00, // ENABLE_PUSH=0
                0x00, 0x05, 0x00, 0x00, 0x40, 0x00, // MAX_FRAME_SIZE=16384
            ]
        );
    }

    #[test]
    fn test_settings_ack_bytes() {
        assert_eq!(
            settings_ack().as_ref(),
            &[0x00, 0x00, 0x00, 0x04, 0x01, 0x00, 0x00, 0x00, 0x00]
        );
    }

    #[test]
    fn test_frame_header_roundtrip() {
        let header = FrameHeader::new(16_383, FRAME_TYPE_DATA, 0x05, 1);
        let parsed = FrameHeader::parse(&header.encode()).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn test_frame_header_reserved_bit_ignored() {
        let mut raw = FrameHeader::new(0, FRAME_TYPE_DATA, 0, 1).encode();
        raw[5] |= 0x80;

        assert_eq!(FrameHeader::parse(&raw).unwrap().stream_id, 1);
    }

    #[test]
    fn test_frame_header_short_buffer() {
        assert_eq!(FrameHeader::parse(&[0u8; 8]), None);
    }

    #[test]
    fn test_grpc_envelope() {
        let message = grpc_envelope(b"abc");
        assert_eq!(message.as_ref(), &[0x00, 0x00, 0x00, 0x00, 0x03, b'a', b'b', b'c']);
    }

    #[test]
    fn test_data_frame() {
        let frame = data_frame(&grpc_envelope(b"x"));
        let header = FrameHeader::parse(&frame).unwrap();

        assert_eq!(header.frame_type, FRAME_TYPE_DATA);
        assert_eq!(header.flags, 0);
        assert_eq!(header.stream_id, 1);
        assert_eq!(header.length, 6);
        assert_eq!(&frame[FrameHeader::SIZE..], &[0x00, 0x00, 0x00, 0x00, 0x01, b'x']);
    }

    #[test]
    fn test_headers_frame_decodes_to_expected_set() {
        let frame = headers_frame(
            "trading.TradingService",
            "GetTrades",
            "127.0.0.1:50051",
            "mt5-grpc-client",
        )
        .unwrap();

        let header = FrameHeader::parse(&frame).unwrap();
        assert_eq!(header.frame_type, FRAME_TYPE_HEADERS);
        assert_eq!(header.flags, FLAG_END_HEADERS);
        assert_eq!(header.stream_id, 1);
        assert_eq!(header.length as usize, frame.len() - FrameHeader::SIZE);

        let headers = super::super::hpack::decode_header_block(&frame[FrameHeader::SIZE..]).unwrap();
        let path = headers
            .iter()
            .find(|(name, _)| name == ":path")
            .map(|(_, value)| value.as_str());
        assert_eq!(path, Some("/trading.TradingService/GetTrades"));
    }
}
