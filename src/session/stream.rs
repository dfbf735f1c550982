//! Streaming session worker and state machine
//!
//! One session owns one TCP connection and one worker thread. The worker
//! drives the handshake (preface, SETTINGS, SETTINGS-ACK, HEADERS), opens
//! the logical gRPC stream with an initial request, then polls: keep-alive
//! request every interval, timed receive, frame parse, queue push. Socket
//! failures tear the connection down and reconnect after a fixed backoff,
//! forever, until the session is stopped.

use super::config::SessionConfig;
use super::queue::TradeQueue;
use crate::http2::{CONNECTION_PREFACE, FrameAccumulator, data_frame, grpc_envelope};
use crate::wire::{TradeRecord, TradeStreamRequest};
use crate::{Error, Result};
use log::{debug, error, info, warn};
use parking_lot::Mutex;
use std::io::{ErrorKind, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Connection phase, observable for logging and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SessionPhase {
    Disconnected = 0,
    Handshaking = 1,
    Streaming = 2,
    Draining = 3,
}

impl SessionPhase {
    fn from_raw(raw: u8) -> Self {
        match raw {
            1 => Self::Handshaking,
            2 => Self::Streaming,
            3 => Self::Draining,
            _ => Self::Disconnected,
        }
    }
}

/// State shared between the worker thread and the owning handle.
///
/// The atomic flags and the error slot are the only cross-thread mutable
/// state besides the queue itself.
struct Shared {
    active: AtomicBool,
    connected: AtomicBool,
    phase: AtomicU8,
    last_error: Mutex<Option<String>>,
    // Clone of the live socket, kept so stop() can unblock a pending read
    socket: Mutex<Option<TcpStream>>,
}

impl Shared {
    fn new() -> Self {
        Self {
            active: AtomicBool::new(false),
            connected: AtomicBool::new(false),
            phase: AtomicU8::new(SessionPhase::Disconnected as u8),
            last_error: Mutex::new(None),
            socket: Mutex::new(None),
        }
    }

    fn is_active(&self) -> bool {
        self.active.load(Ordering::Acquire)
    }

    fn set_phase(&self, phase: SessionPhase) {
        self.phase.store(phase as u8, Ordering::Release);
    }

    fn record_error(&self, err: &Error) {
        error!("session error: {err}");
        *self.last_error.lock() = Some(err.to_string());
    }
}

/// One streaming session: owning handle plus worker thread.
///
/// Sessions are plain values; any number of independent instances can exist,
/// each with its own connection and queue.
pub struct StreamSession {
    config: SessionConfig,
    queue: Arc<TradeQueue>,
    shared: Arc<Shared>,
    worker: Option<JoinHandle<()>>,
}

impl StreamSession {
    /// Create a session over a validated configuration.
    pub fn new(config: SessionConfig, queue: Arc<TradeQueue>) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            config,
            queue,
            shared: Arc::new(Shared::new()),
            worker: None,
        })
    }

    /// Spawn the worker thread. Idempotent while running.
    pub fn start(&mut self) -> Result<()> {
        if self.worker.is_some() {
            return Ok(());
        }

        info!("starting stream session to {}", self.config.authority());
        self.shared.active.store(true, Ordering::Release);

        let config = self.config.clone();
        let queue = Arc::clone(&self.queue);
        let shared = Arc::clone(&self.shared);
        self.worker = Some(thread::spawn(move || run_worker(&config, &queue, &shared)));

        Ok(())
    }

    /// Signal the worker to stop and join it.
    ///
    /// The stop flag is observed at loop boundaries; shutting the socket
    /// down unblocks any pending read so the join stays prompt. The stream
    /// is not half-closed gracefully, the connection is simply dropped.
    pub fn stop(&mut self) {
        self.shared.active.store(false, Ordering::Release);
        self.shared.set_phase(SessionPhase::Draining);

        if let Some(socket) = self.shared.socket.lock().take() {
            let _ = socket.shutdown(Shutdown::Both);
        }

        if let Some(worker) = self.worker.take() {
            if worker.join().is_err() {
                error!("session worker panicked");
            }
        }

        self.shared.connected.store(false, Ordering::Release);
        self.shared.set_phase(SessionPhase::Disconnected);
        info!("stream session stopped");
    }

    /// Whether the worker currently holds an established connection.
    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::Acquire)
    }

    /// Current connection phase.
    pub fn phase(&self) -> SessionPhase {
        SessionPhase::from_raw(self.shared.phase.load(Ordering::Acquire))
    }

    /// Most recent session error, if any.
    pub fn last_error(&self) -> Option<String> {
        self.shared.last_error.lock().clone()
    }
}

impl Drop for StreamSession {
    fn drop(&mut self) {
        self.stop();
    }
}

fn run_worker(config: &SessionConfig, queue: &TradeQueue, shared: &Shared) {
    while shared.is_active() {
        shared.set_phase(SessionPhase::Handshaking);

        match open_stream(config, shared) {
            Ok(mut stream) => {
                shared.connected.store(true, Ordering::Release);
                shared.set_phase(SessionPhase::Streaming);
                info!("stream established to {}", config.authority());

                if let Err(err) = streaming_loop(&mut stream, config, queue, shared) {
                    // Errors provoked by our own shutdown are not session errors
                    if shared.is_active() {
                        shared.record_error(&err);
                    }
                }

                shared.connected.store(false, Ordering::Release);
                shared.socket.lock().take();
            }
            Err(err) => shared.record_error(&err),
        }

        shared.set_phase(SessionPhase::Disconnected);

        if shared.is_active() {
            debug!(
                "reconnecting in {:?}",
                config.reconnect_backoff
            );
            backoff_sleep(shared, config.reconnect_backoff);
        }
    }

    shared.set_phase(SessionPhase::Disconnected);
}

/// Connect and run the handshake, returning the established stream.
fn open_stream(config: &SessionConfig, shared: &Shared) -> Result<TcpStream> {
    let stream = connect(config)?;

    // Keep a clone so stop() can force a pending read to return
    match stream.try_clone() {
        Ok(clone) => *shared.socket.lock() = Some(clone),
        Err(e) => warn!("could not clone session socket: {e}"),
    }

    handshake(&stream, config)?;
    Ok(stream)
}

fn connect(config: &SessionConfig) -> Result<TcpStream> {
    let authority = config.authority();
    let addrs = authority
        .to_socket_addrs()
        .map_err(|e| Error::ConnectFailed(format!("resolve {authority}: {e}")))?;

    let mut last_err = Error::ConnectFailed(format!("no addresses for {authority}"));
    for addr in addrs {
        match TcpStream::connect_timeout(&addr, config.connect_timeout) {
            Ok(stream) => {
                stream
                    .set_nodelay(true)
                    .map_err(|e| Error::ConnectFailed(format!("set nodelay: {e}")))?;
                stream
                    .set_read_timeout(Some(config.recv_poll_timeout))
                    .map_err(|e| Error::ConnectFailed(format!("set read timeout: {e}")))?;
                stream
                    .set_write_timeout(Some(config.io_timeout))
                    .map_err(|e| Error::ConnectFailed(format!("set write timeout: {e}")))?;
                return Ok(stream);
            }
            Err(e) => last_err = Error::ConnectFailed(format!("{addr}: {e}")),
        }
    }

    Err(last_err)
}

/// Preface, SETTINGS, SETTINGS-ACK, HEADERS in that order, no waiting for
/// the peer's SETTINGS in between.
fn handshake(mut stream: &TcpStream, config: &SessionConfig) -> Result<()> {
    let headers = crate::http2::headers_frame(
        &config.service,
        &config.method,
        &config.authority(),
        &config.client_id,
    )?;
    let settings = crate::http2::settings_frame();
    let ack = crate::http2::settings_ack();

    for (step, bytes) in [
        ("preface", CONNECTION_PREFACE.as_slice()),
        ("SETTINGS", settings.as_ref()),
        ("SETTINGS ACK", ack.as_ref()),
        ("HEADERS", headers.as_ref()),
    ] {
        stream
            .write_all(bytes)
            .map_err(|e| Error::HandshakeFailed(format!("send {step}: {e}")))?;
    }

    Ok(())
}

fn streaming_loop(
    stream: &mut TcpStream,
    config: &SessionConfig,
    queue: &TradeQueue,
    shared: &Shared,
) -> Result<()> {
    let request = TradeStreamRequest::new(config.source.clone(), 0);
    let request_frame = data_frame(&grpc_envelope(&request.encode()));

    // Open the logical stream immediately after the headers
    stream
        .write_all(&request_frame)
        .map_err(|e| Error::SendFailed(format!("initial request: {e}")))?;

    let mut acc = FrameAccumulator::new();
    let mut buf = vec![0u8; config.recv_buffer_size];
    let mut last_keepalive = Instant::now();

    while shared.is_active() {
        // Request-heartbeat, not a protocol PING: the server treats a fresh
        // request on the open stream as a liveness signal
        if last_keepalive.elapsed() >= config.keepalive_interval {
            stream
                .write_all(&request_frame)
                .map_err(|e| Error::SendFailed(format!("keep-alive: {e}")))?;
            last_keepalive = Instant::now();
        }

        match stream.read(&mut buf) {
            Ok(0) => return Err(Error::RecvFailed("connection closed by server".to_string())),
            Ok(n) => {
                acc.extend(&buf[..n]);
                for payload in acc.drain_messages() {
                    // Empty messages are stream chatter, not trades
                    if payload.is_empty() {
                        continue;
                    }
                    push_decoded(&payload, queue);
                }
            }
            Err(e)
                if matches!(
                    e.kind(),
                    ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
                ) => {}
            Err(e) => return Err(Error::RecvFailed(e.to_string())),
        }

        thread::sleep(config.loop_tick);
    }

    Ok(())
}

/// Decode one gRPC message payload and queue it as JSON. A corrupt message
/// is dropped; it never tears down the session.
fn push_decoded(payload: &[u8], queue: &TradeQueue) {
    match TradeRecord::decode(payload) {
        Ok(record) => match serde_json::to_string(&record) {
            Ok(json) => {
                debug!("queued trade record ({} bytes)", json.len());
                queue.push(json);
            }
            Err(e) => warn!("failed to serialize trade record: {e}"),
        },
        Err(e) => warn!("dropping undecodable message ({} bytes): {e}", payload.len()),
    }
}

/// Sleep for `backoff` in short slices so a stop request stays prompt.
fn backoff_sleep(shared: &Shared, backoff: Duration) {
    let start = Instant::now();
    while shared.is_active() && start.elapsed() < backoff {
        thread::sleep(Duration::from_millis(50).min(backoff));
    }
}
