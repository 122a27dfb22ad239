// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Raw TCP transmission of a print file to a machine.
//
// The simplest possible transport: open a socket to the machine's print
// port and stream the job bytes. Fire-and-forget — no handshake, no job
// tracking, no retry. The machine interprets the PJL framing itself.

use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::{debug, info};

use laserwerk_core::config::EngineConfig;
use laserwerk_core::error::{LaserwerkError, Result};
use laserwerk_core::types::Machine;

/// Write size for streaming the payload; small enough for progress logs.
const SEND_CHUNK: usize = 8192;

/// Send a finished print file to the machine at `ip`.
///
/// Connection, writes, flush and shutdown together are bounded by the
/// configured send timeout.
pub async fn send_print_file(
    machine: Machine,
    payload: &[u8],
    ip: &str,
    config: &EngineConfig,
) -> Result<()> {
    let addr = format!("{}:{}", ip, config.send_port);
    info!(
        addr = %addr,
        machine = machine.display_name(),
        total = payload.len(),
        "connecting to machine"
    );

    let timeout = Duration::from_secs(config.send_timeout_secs);
    tokio::time::timeout(timeout, transmit(&addr, payload))
        .await
        .map_err(|_| {
            LaserwerkError::Send(format!(
                "transmission to {} timed out after {}s",
                addr, config.send_timeout_secs
            ))
        })?
}

async fn transmit(addr: &str, payload: &[u8]) -> Result<()> {
    let mut stream = TcpStream::connect(addr)
        .await
        .map_err(|e| LaserwerkError::Send(format!("connect to {addr}: {e}")))?;

    let mut sent = 0usize;
    for chunk in payload.chunks(SEND_CHUNK) {
        stream
            .write_all(chunk)
            .await
            .map_err(|e| LaserwerkError::Send(format!("write failed at byte {sent}: {e}")))?;
        sent += chunk.len();
        debug!(sent, total = payload.len(), "transmission progress");
    }

    stream
        .flush()
        .await
        .map_err(|e| LaserwerkError::Send(format!("flush: {e}")))?;
    stream
        .shutdown()
        .await
        .map_err(|e| LaserwerkError::Send(format!("shutdown: {e}")))?;

    info!(total = payload.len(), "print file sent");
    Ok(())
}

/// Blocking facade for callers without a runtime (the C boundary).
///
/// Spins up a current-thread runtime for the duration of the call; nothing
/// outlives the call.
pub fn send_print_file_blocking(
    machine: Machine,
    payload: &[u8],
    ip: &str,
    config: &EngineConfig,
) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| LaserwerkError::Send(format!("runtime: {e}")))?;
    runtime.block_on(send_print_file(machine, payload, ip, config))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncReadExt;
    use tokio::net::TcpListener;

    fn trace_init() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    async fn capture_one_connection(listener: TcpListener) -> Vec<u8> {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        socket.read_to_end(&mut received).await.unwrap();
        received
    }

    #[tokio::test]
    async fn payload_arrives_byte_for_byte() {
        trace_init();
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = tokio::spawn(capture_one_connection(listener));

        let payload: Vec<u8> = (0..40_000).map(|i| (i % 251) as u8).collect();
        let config = EngineConfig {
            send_port: port,
            ..EngineConfig::default()
        };
        send_print_file(Machine::Maker24, &payload, "127.0.0.1", &config)
            .await
            .unwrap();

        let received = server.await.unwrap();
        assert_eq!(received, payload);
    }

    #[tokio::test]
    async fn refused_connection_is_a_send_error() {
        // Bind-then-drop guarantees nothing is listening on the port.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let config = EngineConfig {
            send_port: port,
            ..EngineConfig::default()
        };
        let err = send_print_file(Machine::Zing16, b"job", "127.0.0.1", &config)
            .await
            .unwrap_err();
        assert!(matches!(err, LaserwerkError::Send(_)));
    }

    #[test]
    fn blocking_facade_round_trips() {
        let runtime = tokio::runtime::Runtime::new().unwrap();
        let (port, server) = runtime.block_on(async {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let port = listener.local_addr().unwrap().port();
            (port, tokio::spawn(capture_one_connection(listener)))
        });

        let config = EngineConfig {
            send_port: port,
            ..EngineConfig::default()
        };
        // The blocking facade builds its own runtime on this thread.
        let handle = std::thread::spawn(move || {
            send_print_file_blocking(Machine::Pro24, b"framed job bytes", "127.0.0.1", &config)
        });
        handle.join().unwrap().unwrap();

        let received = runtime.block_on(server).unwrap();
        assert_eq!(received, b"framed job bytes");
    }
}
