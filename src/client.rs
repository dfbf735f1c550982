//! Bridge client facade
//!
//! The boundary handed to the wrapper layer: start/stop the stream, poll for
//! the next serialized record, submit outbound payloads, query connection
//! state and the last error. No error from the protocol core ever crosses
//! this boundary as a panic or exception; failures surface as state.

use crate::session::{SessionConfig, StreamSession, TradeQueue, submit_payload};
use crate::{Error, Result};
use std::sync::Arc;
use std::time::Duration;

/// Client over one streaming session and its trade queue.
pub struct BridgeClient {
    config: SessionConfig,
    queue: Arc<TradeQueue>,
    session: StreamSession,
}

impl BridgeClient {
    /// Create a client from a validated configuration.
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;

        let queue = Arc::new(TradeQueue::new(config.queue_capacity));
        let session = StreamSession::new(config.clone(), Arc::clone(&queue))?;

        Ok(Self {
            config,
            queue,
            session,
        })
    }

    /// Start streaming trades into the queue.
    pub fn start(&mut self) -> Result<()> {
        self.session.start()
    }

    /// Stop streaming and join the worker. Queued records stay available.
    pub fn stop(&mut self) {
        self.session.stop();
    }

    /// Whether the stream connection is currently established.
    pub fn is_connected(&self) -> bool {
        self.session.is_connected()
    }

    /// Next decoded trade as canonical JSON, or `None` if the queue is
    /// empty. Never blocks.
    pub fn next_trade(&self) -> Option<String> {
        self.queue.try_pop()
    }

    /// Like [`next_trade`](Self::next_trade) but waits up to `timeout` for a
    /// record to arrive.
    pub fn next_trade_wait(&self, timeout: Duration) -> Option<String> {
        self.queue.pop_wait(timeout)
    }

    /// Number of records waiting in the queue.
    pub fn queue_len(&self) -> usize {
        self.queue.len()
    }

    /// Submit an encoded protobuf payload to a unary method over a fresh
    /// short-lived connection (fire-and-forget).
    pub fn submit(&self, method: &str, payload: &[u8]) -> Result<()> {
        if method.is_empty() {
            return Err(Error::Config("Method must not be empty".to_string()));
        }
        submit_payload(&self.config, method, payload)
    }

    /// Most recent session error message, if any.
    pub fn last_error(&self) -> Option<String> {
        self.session.last_error()
    }

    /// The configuration this client was built with.
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }
}
