//! Hand-rolled HTTP/2 framing for the gRPC client path
//!
//! This is deliberately not a full HTTP/2 implementation: no flow control,
//! no multiplexing (everything rides stream 1), no server push, no dynamic
//! HPACK table. It covers exactly the frames the paired gRPC server needs to
//! accept a long-lived streaming request.

pub mod frames;
pub mod hpack;
pub mod parser;

pub use frames::{
    CONNECTION_PREFACE, FrameHeader, data_frame, grpc_envelope, headers_frame, settings_ack,
    settings_frame,
};
pub use parser::FrameAccumulator;

/// Frame type byte for DATA frames.
pub const FRAME_TYPE_DATA: u8 = 0x00;
/// Frame type byte for HEADERS frames.
pub const FRAME_TYPE_HEADERS: u8 = 0x01;
/// Frame type byte for SETTINGS frames.
pub const FRAME_TYPE_SETTINGS: u8 = 0x04;

/// SETTINGS ACK flag.
pub const FLAG_ACK: u8 = 0x01;
/// END_HEADERS flag.
pub const FLAG_END_HEADERS: u8 = 0x04;

/// Advertised SETTINGS_MAX_FRAME_SIZE, also the plausibility bound when
/// scanning received bytes for frame headers.
pub const MAX_FRAME_SIZE: u32 = 16_384;
