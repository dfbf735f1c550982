//! # Trade Bridge
//!
//! Minimal gRPC-over-HTTP/2 streaming client for trade bridging.
//!
//! Instead of pulling in a full gRPC stack, this crate hand-rolls the small
//! protocol subset one specific server pairing needs:
//!
//! - HTTP/2 connection preface, SETTINGS and HEADERS frames with a fixed
//!   HPACK-lite header block (no dynamic table, no Huffman)
//! - the 5-byte gRPC message envelope inside DATA frames
//! - a varint/length-delimited protobuf decoder for a flat trade schema
//! - a worker-thread session with keep-alive requests and
//!   reconnect-with-backoff
//!
//! ## Quick Start
//!
//! ```no_run
//! use trade_bridge::{BridgeClient, SessionConfig};
//!
//! let mut client = BridgeClient::new(SessionConfig::default())?;
//! client.start()?;
//!
//! while let Some(trade_json) = client.next_trade() {
//!     println!("{trade_json}");
//! }
//!
//! client.stop();
//! # Ok::<(), trade_bridge::Error>(())
//! ```

pub mod client;
pub mod http2;
pub mod session;
pub mod wire;

// Re-exports
pub use client::BridgeClient;
pub use http2::{CONNECTION_PREFACE, FrameAccumulator, FrameHeader};
pub use session::{SessionConfig, StreamSession, TradeQueue};
pub use wire::{TradeRecord, TradeStreamRequest, WireType};

/// Common result type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types
///
/// Decode-layer errors (`TruncatedInput`, `UnsupportedWireType`,
/// `WireTypeMismatch`) abort only the message being decoded; socket-layer
/// errors abort the session and trigger a reconnect. None of them escape the
/// session worker.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input truncated at offset {0}")]
    TruncatedInput(usize),

    #[error("Unsupported wire type {0}")]
    UnsupportedWireType(u32),

    #[error("Field {field}: expected wire type {expected:?}, got {actual}")]
    WireTypeMismatch {
        field: u32,
        expected: wire::WireType,
        actual: u32,
    },

    #[error("Connect failed: {0}")]
    ConnectFailed(String),

    #[error("Send failed: {0}")]
    SendFailed(String),

    #[error("Receive failed: {0}")]
    RecvFailed(String),

    #[error("Handshake failed: {0}")]
    HandshakeFailed(String),
}
