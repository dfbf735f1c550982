//! Fire-and-forget unary submissions
//!
//! Trade results, hedge-close notifications and elastic/trailing updates go
//! out over a fresh short-lived connection per call, never over the
//! persistent trade stream. The caller gets send-success, not a response;
//! the server's reply (if any) is discarded with the connection.

use super::config::SessionConfig;
use crate::http2::{CONNECTION_PREFACE, data_frame, grpc_envelope, headers_frame, settings_ack, settings_frame};
use crate::{Error, Result};
use log::debug;
use std::io::Write;
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

/// Send one encoded protobuf payload to `method` on a fresh connection.
pub fn submit_payload(config: &SessionConfig, method: &str, payload: &[u8]) -> Result<()> {
    let authority = config.authority();
    let addr = authority
        .to_socket_addrs()
        .map_err(|e| Error::ConnectFailed(format!("resolve {authority}: {e}")))?
        .next()
        .ok_or_else(|| Error::ConnectFailed(format!("no addresses for {authority}")))?;

    let mut stream = TcpStream::connect_timeout(&addr, config.connect_timeout)
        .map_err(|e| Error::ConnectFailed(format!("{addr}: {e}")))?;
    stream
        .set_write_timeout(Some(config.io_timeout))
        .map_err(|e| Error::ConnectFailed(format!("set write timeout: {e}")))?;

    let headers = headers_frame(&config.service, method, &authority, &config.client_id)?;
    let settings = settings_frame();
    let ack = settings_ack();

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

    stream
        .write_all(&data_frame(&grpc_envelope(payload)))
        .map_err(|e| Error::SendFailed(format!("submit {method}: {e}")))?;

    debug!("submitted {} byte payload to {method}", payload.len());
    let _ = stream.shutdown(Shutdown::Both);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use std::net::TcpListener;
    use std::thread;
    use std::time::Duration;

    #[test]
    fn test_submit_writes_handshake_and_payload() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let server = thread::spawn(move || {
            let (mut socket, _) = listener.accept().unwrap();
            socket
                .set_read_timeout(Some(Duration::from_secs(2)))
                .unwrap();

            let mut received = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                match socket.read(&mut buf) {
                    Ok(0) => break,
                    Ok(n) => received.extend_from_slice(&buf[..n]),
                    Err(_) => break,
                }
            }
            received
        });

        let config = SessionConfig {
            port,
            ..SessionConfig::default()
        };

        submit_payload(&config, "SubmitTradeResult", b"\x0A\x02ok").unwrap();

        let received = server.join().unwrap();
        assert!(received.starts_with(CONNECTION_PREFACE));
        // The payload rides the last DATA frame, envelope-wrapped
        let envelope = grpc_envelope(b"\x0A\x02ok");
        assert!(received.ends_with(&data_frame(&envelope)));
    }

    #[test]
    fn test_submit_connect_failure() {
        let config = SessionConfig {
            port: 1,
            connect_timeout: Duration::from_millis(200),
            ..SessionConfig::default()
        };

        assert!(matches!(
            submit_payload(&config, "SubmitTradeResult", b""),
            Err(Error::ConnectFailed(_))
        ));
    }
}
