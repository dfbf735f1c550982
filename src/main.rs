//! Trade bridge binary
//!
//! Streams trades from a bridge server and prints each record as JSON.

use anyhow::Context;
use std::time::Duration;
use trade_bridge::{BridgeClient, SessionConfig};

fn main() -> anyhow::Result<()> {
    // Initialize logger
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args
        .next()
        .unwrap_or_else(|| "50051".to_string())
        .parse()
        .context("port must be a number")?;

    let config = SessionConfig {
        host,
        port,
        ..SessionConfig::default()
    };

    println!("╔════════════════════════════════════════════════╗");
    println!("║   Trade Bridge Streaming Client v0.1.0         ║");
    println!("╚════════════════════════════════════════════════╝\n");
    println!("Streaming from {} (press Enter to stop)\n", config.authority());

    let mut client = BridgeClient::new(config)?;
    client.start()?;

    // Drain the queue on a worker so the main thread can wait on stdin
    let stop = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let printer_stop = std::sync::Arc::clone(&stop);
    let printer = std::thread::spawn(move || {
        let mut count: usize = 0;
        while !printer_stop.load(std::sync::atomic::Ordering::Acquire) {
            match client.next_trade_wait(Duration::from_millis(250)) {
                Some(trade_json) => {
                    count += 1;
                    println!("{trade_json}");
                }
                None => {
                    if !client.is_connected() {
                        if let Some(err) = client.last_error() {
                            log::debug!("waiting for connection: {err}");
                        }
                    }
                }
            }
        }
        client.stop();
        count
    });

    let mut input = String::new();
    std::io::stdin()
        .read_line(&mut input)
        .context("failed to read stdin")?;

    stop.store(true, std::sync::atomic::Ordering::Release);
    let count = printer
        .join()
        .map_err(|_| anyhow::anyhow!("printer thread panicked"))?;

    println!("\nReceived {count} trades");
    Ok(())
}
