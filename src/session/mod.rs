//! Streaming session: connection lifecycle, worker thread and trade queue

mod config;
mod queue;
mod stream;
mod submit;

pub use config::SessionConfig;
pub use queue::TradeQueue;
pub use stream::{SessionPhase, StreamSession};
pub use submit::submit_payload;
