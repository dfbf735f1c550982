//! Integration tests
//!
//! Each test runs a fake bridge server on a loopback listener, points a
//! session at it and asserts on what comes out of the trade queue.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};
use trade_bridge::http2::{data_frame, grpc_envelope};
use trade_bridge::{BridgeClient, SessionConfig, TradeRecord};

fn test_config(port: u16) -> SessionConfig {
    SessionConfig {
        port,
        connect_timeout: Duration::from_secs(1),
        recv_poll_timeout: Duration::from_millis(50),
        keepalive_interval: Duration::from_secs(10),
        reconnect_backoff: Duration::from_millis(100),
        loop_tick: Duration::from_millis(10),
        ..SessionConfig::default()
    }
}

fn trade(id: &str, instrument: &str, price: f64) -> TradeRecord {
    TradeRecord {
        id: Some(id.to_string()),
        instrument: Some(instrument.to_string()),
        price: Some(price),
        action: Some("BUY".to_string()),
        ..TradeRecord::default()
    }
}

fn trade_frame(record: &TradeRecord) -> Vec<u8> {
    data_frame(&grpc_envelope(&record.encode())).to_vec()
}

/// Read whatever handshake bytes the client has sent so far.
fn drain_client(socket: &mut TcpStream) {
    socket
        .set_read_timeout(Some(Duration::from_millis(200)))
        .unwrap();
    let mut buf = [0u8; 4096];
    let _ = socket.read(&mut buf);
}

struct FakeServer {
    port: u16,
    accepted: Arc<AtomicUsize>,
    done: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl FakeServer {
    /// Accept connections forever, running `on_accept` for each.
    fn spawn<F>(on_accept: F) -> Self
    where
        F: Fn(TcpStream) + Send + Sync + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        listener
            .set_nonblocking(true)
            .expect("nonblocking listener");

        let accepted = Arc::new(AtomicUsize::new(0));
        let done = Arc::new(AtomicBool::new(false));

        let thread_accepted = Arc::clone(&accepted);
        let thread_done = Arc::clone(&done);
        let handle = thread::spawn(move || {
            while !thread_done.load(Ordering::Acquire) {
                match listener.accept() {
                    Ok((socket, _)) => {
                        thread_accepted.fetch_add(1, Ordering::Release);
                        on_accept(socket);
                    }
                    Err(_) => thread::sleep(Duration::from_millis(10)),
                }
            }
        });

        Self {
            port,
            accepted,
            done,
            handle: Some(handle),
        }
    }

    fn accepted(&self) -> usize {
        self.accepted.load(Ordering::Acquire)
    }
}

impl Drop for FakeServer {
    fn drop(&mut self) {
        self.done.store(true, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

#[test]
fn test_trades_stream_end_to_end_in_order() {
    let frames: Vec<Vec<u8>> = vec![
        trade_frame(&trade("T1", "NQ 12-25", 20_950.25)),
        trade_frame(&trade("T2", "ES 12-25", 5_987.50)),
        trade_frame(&trade("T3", "NQ 12-25", 20_951.00)),
    ];

    let server = FakeServer::spawn(move |mut socket| {
        drain_client(&mut socket);
        for frame in &frames {
            socket.write_all(frame).unwrap();
        }
        // Hold the connection open so the client does not reconnect mid-test
        thread::sleep(Duration::from_secs(2));
    });

    let mut client = BridgeClient::new(test_config(server.port)).unwrap();
    client.start().unwrap();

    let mut received = Vec::new();
    let deadline = Instant::now() + Duration::from_secs(5);
    while received.len() < 3 && Instant::now() < deadline {
        if let Some(json) = client.next_trade_wait(Duration::from_millis(100)) {
            received.push(json);
        }
    }

    client.stop();

    assert_eq!(received.len(), 3, "expected 3 trades, got {received:?}");
    for (json, id) in received.iter().zip(["T1", "T2", "T3"]) {
        let record: TradeRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.id.as_deref(), Some(id));
        assert!(record.price.is_some());
        // Absent fields must not appear at all
        assert!(!json.contains("mt5_ticket"));
        assert!(!json.contains("timestamp"));
    }
}

#[test]
fn test_trade_split_across_writes_is_reassembled() {
    let frame = trade_frame(&trade("SPLIT", "GC 02-26", 2_650.10));
    let split_at = frame.len() / 2;

    let server = FakeServer::spawn(move |mut socket| {
        drain_client(&mut socket);
        socket.write_all(&frame[..split_at]).unwrap();
        socket.flush().unwrap();
        thread::sleep(Duration::from_millis(150));
        socket.write_all(&frame[split_at..]).unwrap();
        thread::sleep(Duration::from_secs(2));
    });

    let mut client = BridgeClient::new(test_config(server.port)).unwrap();
    client.start().unwrap();

    let json = client
        .next_trade_wait(Duration::from_secs(5))
        .expect("reassembled trade");
    client.stop();

    let record: TradeRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(record.id.as_deref(), Some("SPLIT"));
}

#[test]
fn test_server_close_triggers_reconnect_without_spurious_records() {
    // Server drops every connection right after the handshake bytes arrive
    let server = FakeServer::spawn(|mut socket| {
        drain_client(&mut socket);
    });

    let mut client = BridgeClient::new(test_config(server.port)).unwrap();
    client.start().unwrap();

    thread::sleep(Duration::from_millis(800));
    client.stop();

    assert!(
        server.accepted() >= 2,
        "expected repeated reconnects, saw {}",
        server.accepted()
    );
    assert_eq!(client.queue_len(), 0);
    assert_eq!(client.next_trade(), None);
    assert!(!client.is_connected());
}

#[test]
fn test_corrupt_message_does_not_kill_session() {
    // Field 1 (string) mis-sent as varint, then a good trade
    let corrupt = data_frame(&grpc_envelope(&[0x08, 0x05])).to_vec();
    let good = trade_frame(&trade("GOOD", "CL 01-26", 71.30));

    let server = FakeServer::spawn(move |mut socket| {
        drain_client(&mut socket);
        socket.write_all(&corrupt).unwrap();
        socket.write_all(&good).unwrap();
        thread::sleep(Duration::from_secs(2));
    });

    let mut client = BridgeClient::new(test_config(server.port)).unwrap();
    client.start().unwrap();

    let json = client
        .next_trade_wait(Duration::from_secs(5))
        .expect("good trade after corrupt one");
    client.stop();

    let record: TradeRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(record.id.as_deref(), Some("GOOD"));
    assert_eq!(client.next_trade(), None);
}

#[test]
fn test_stop_joins_promptly_while_connected() {
    let server = FakeServer::spawn(|mut socket| {
        drain_client(&mut socket);
        // Say nothing, keep the connection open
        thread::sleep(Duration::from_secs(10));
    });

    let mut client = BridgeClient::new(test_config(server.port)).unwrap();
    client.start().unwrap();
    thread::sleep(Duration::from_millis(300));

    let start = Instant::now();
    client.stop();

    assert!(
        start.elapsed() < Duration::from_secs(2),
        "stop took {:?}",
        start.elapsed()
    );
}
