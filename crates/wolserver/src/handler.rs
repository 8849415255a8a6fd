//! Per-connection handler tasks, one flavor per service.
//!
//! Each task owns its connection's read half and delivers three kinds of
//! events into the owning service: received bytes, the one-second tick,
//! and teardown. Side effects happen synchronously inside the engine
//! call for the event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::io::AsyncReadExt;
use tokio::time::MissedTickBehavior;
use wolserver_protocol::{LineFramer, gameres};
use wolserver_transport::{ByteSink, TcpConnection};

use crate::ServerConfig;
use crate::server::SharedEngine;

/// Read buffer size for every service.
const READ_BUF_BYTES: usize = 4096;

/// Upper bound on an accumulated gameres report.
const GAMERES_MAX_BYTES: usize = 64 * 1024;

/// Drives one chat connection: reads feed the engine, a one-second
/// interval drives the idle policy, and the close signal ends the task.
pub(crate) async fn run_chat_connection(
    conn: TcpConnection,
    engine: SharedEngine,
) {
    let (mut reader, handle) = conn.split();
    let id = handle.id();

    engine
        .lock()
        .await
        .on_connect(id, handle.clone(), Instant::now());

    let mut buf = vec![0u8; READ_BUF_BYTES];
    let mut tick = tokio::time::interval(Duration::from_secs(1));
    tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            result = reader.read(&mut buf) => match result {
                Ok(0) => break,
                Ok(n) => {
                    engine.lock().await.on_bytes(id, &buf[..n], Instant::now());
                }
                Err(e) => {
                    tracing::debug!(%id, error = %e, "read failed");
                    break;
                }
            },
            _ = handle.closed() => break,
            _ = tick.tick() => {
                engine.lock().await.on_tick(id, Instant::now());
            }
        }
    }

    engine.lock().await.on_disconnect(id);
    handle.close(false);
}

/// Accumulates one gameres report until the peer disconnects, then
/// decodes it. No reply is ever sent.
pub(crate) async fn run_gameres_connection(conn: TcpConnection) {
    let (mut reader, handle) = conn.split();
    let id = handle.id();
    let peer = handle.peer_addr();

    let mut report = Vec::new();
    let mut buf = vec![0u8; READ_BUF_BYTES];
    loop {
        match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => {
                report.extend_from_slice(&buf[..n]);
                if report.len() > GAMERES_MAX_BYTES {
                    tracing::warn!(%id, %peer, "gameres report too large, dropping");
                    handle.close(false);
                    return;
                }
            }
            Err(e) => {
                tracing::debug!(%id, error = %e, "gameres read failed");
                break;
            }
        }
    }

    tracing::debug!(%id, %peer, bytes = report.len(), "gameres report received");
    match gameres::parse(&report) {
        Ok(values) => {
            tracing::info!(%id, %peer, records = values.len(), "gameres report decoded");
            for (tag, value) in &values {
                tracing::debug!(%id, %tag, ?value, "gameres record");
            }
        }
        Err(e) => {
            tracing::warn!(%id, %peer, error = %e, "gameres report rejected");
        }
    }
    handle.close(false);
}

/// The fixed-reply bootstrap responder: tells a client which ports the
/// real services live on, then hangs up.
pub(crate) async fn run_bootstrap_connection(
    conn: TcpConnection,
    config: Arc<ServerConfig>,
) {
    let (mut reader, handle) = conn.split();
    let id = handle.id();
    let mut framer = LineFramer::new();
    let mut buf = vec![0u8; READ_BUF_BYTES];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        let lines = match framer.push(&buf[..n]) {
            Ok(lines) => lines,
            Err(_) => {
                handle.close(false);
                return;
            }
        };
        for line in lines {
            if line.starts_with("whereto") {
                tracing::debug!(%id, "bootstrap redirect requested");
                let host = &config.hostname;
                let replies = [
                    format!(":{host} 610 UserName 1"),
                    format!(
                        ":{host} 605 UserName :{host} {} 'Live chat server' 0 0.0000 0.0000",
                        config.chat_port
                    ),
                    format!(
                        ":{host} 608 UserName :{host} {} 'Gameres server' 0 0.0000 0.0000",
                        config.gameres_port
                    ),
                    format!(
                        ":{host} 609 UserName :{host} {} 'Ladder server' 0 0.0000 0.0000",
                        config.ladder_port
                    ),
                    format!(":{host} 607"),
                ];
                for reply in replies {
                    let _ = handle.try_send(format!("{reply}\r\n").into_bytes());
                }
                handle.close(true);
                return;
            }
        }
    }
    handle.close(false);
}

/// The ladder responder: a fixed no-result service. Reads the request
/// line and closes.
pub(crate) async fn run_ladder_connection(conn: TcpConnection) {
    let (mut reader, handle) = conn.split();
    let id = handle.id();
    let mut framer = LineFramer::new();
    let mut buf = vec![0u8; READ_BUF_BYTES];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(_) => break,
        };
        let lines = match framer.push(&buf[..n]) {
            Ok(lines) => lines,
            Err(_) => break,
        };
        if let Some(request) = lines.first() {
            tracing::debug!(%id, %request, "ladder request, closing without data");
            break;
        }
    }
    handle.close(true);
}
