//! Session configuration

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Streaming session configuration
///
/// The cadence values (keep-alive interval, receive poll, reconnect backoff,
/// loop tick) are part of the contract with the paired server and default to
/// the values it was tuned against; they are configurable rather than
/// hardcoded so tests can shrink them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Server host (IP or name)
    pub host: String,

    /// Server port
    pub port: u16,

    /// gRPC service, e.g. `trading.TradingService`
    pub service: String,

    /// Streaming method opened on the persistent connection
    pub method: String,

    /// `user-agent` header value
    pub client_id: String,

    /// `source` field of the stream-open/keep-alive request
    pub source: String,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// Socket write timeout
    pub io_timeout: Duration,

    /// Receive poll timeout in the streaming loop
    pub recv_poll_timeout: Duration,

    /// Interval between keep-alive requests on the open stream
    pub keepalive_interval: Duration,

    /// Delay before reconnecting after a failed or dropped connection
    pub reconnect_backoff: Duration,

    /// Sleep between streaming loop iterations
    pub loop_tick: Duration,

    /// Trade queue bound; the oldest record is dropped beyond this
    pub queue_capacity: usize,

    /// Socket receive buffer size
    pub recv_buffer_size: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 50051,
            service: "trading.TradingService".to_string(),
            method: "GetTrades".to_string(),
            client_id: "mt5-grpc-client".to_string(),
            source: "hedgebot".to_string(),
            connect_timeout: Duration::from_secs(30),
            io_timeout: Duration::from_secs(30),
            recv_poll_timeout: Duration::from_secs(1),
            keepalive_interval: Duration::from_secs(5),
            reconnect_backoff: Duration::from_secs(3),
            loop_tick: Duration::from_millis(100),
            queue_capacity: 1024,
            recv_buffer_size: 8192,
        }
    }
}

impl SessionConfig {
    /// Address string used for connecting and as the `:authority` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Validate configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.host.is_empty() {
            return Err(crate::Error::Config("Host must not be empty".to_string()));
        }

        if self.port == 0 {
            return Err(crate::Error::Config("Port must be non-zero".to_string()));
        }

        if self.service.is_empty() || self.method.is_empty() {
            return Err(crate::Error::Config(
                "Service and method must not be empty".to_string(),
            ));
        }

        if self.queue_capacity == 0 {
            return Err(crate::Error::Config(
                "Queue capacity must be non-zero".to_string(),
            ));
        }

        if self.recv_buffer_size == 0 {
            return Err(crate::Error::Config(
                "Receive buffer size must be non-zero".to_string(),
            ));
        }

        if self.recv_poll_timeout.is_zero() {
            return Err(crate::Error::Config(
                "Receive poll timeout must be non-zero".to_string(),
            ));
        }

        Ok(())
    }
}
