//! Health & Status API endpoints
//!
//! Provides HTTP endpoints for monitoring:
//! - GET /health - Simple health check
//! - GET /metrics - Prometheus metrics
//! - GET /status - Uptime and session dedup cache sizes

use alloy::primitives::B256;
use chrono::{DateTime, Utc};
use eyre::Result;
use prometheus::{Encoder, TextEncoder};
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpListener;
use tokio::sync::Mutex;

use crate::metrics;
use crate::seen_events::SeenEventCache;

/// Shared read handles for the status endpoint.
#[derive(Clone)]
pub struct StatusHandles {
    started: Instant,
    started_at: DateTime<Utc>,
    ethereum_seen: Arc<Mutex<SeenEventCache<(B256, u64)>>>,
    cosmos_seen: Arc<Mutex<SeenEventCache<(String, u64)>>>,
}

impl StatusHandles {
    pub fn new(
        ethereum_seen: Arc<Mutex<SeenEventCache<(B256, u64)>>>,
        cosmos_seen: Arc<Mutex<SeenEventCache<(String, u64)>>>,
    ) -> Self {
        Self {
            started: Instant::now(),
            started_at: Utc::now(),
            ethereum_seen,
            cosmos_seen,
        }
    }
}

/// Status response
#[derive(Serialize)]
struct StatusResponse {
    status: String,
    started_at: DateTime<Utc>,
    uptime_seconds: u64,
    seen_events: SeenEvents,
}

#[derive(Serialize)]
struct SeenEvents {
    ethereum: usize,
    cosmos: usize,
}

/// Start the API server (combines metrics and status endpoints)
pub async fn start_api_server(addr: SocketAddr, handles: StatusHandles) -> Result<()> {
    let listener = TcpListener::bind(addr).await?;
    tracing::info!(%addr, "API server started");

    // Mark relayer as up
    metrics::UP.set(1.0);

    loop {
        let (mut socket, _) = listener.accept().await?;
        let handles = handles.clone();

        tokio::spawn(async move {
            let mut buf = [0u8; 1024];
            if socket.readable().await.is_ok() {
                let _ = socket.try_read(&mut buf);
            }

            let request = String::from_utf8_lossy(&buf);

            if request.contains("GET /metrics") {
                // Prometheus metrics
                let encoder = TextEncoder::new();
                let metric_families = prometheus::gather();
                let mut buffer = Vec::new();
                let _ = encoder.encode(&metric_families, &mut buffer);

                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain; charset=utf-8\r\nContent-Length: {}\r\n\r\n",
                    buffer.len()
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.write_all(&buffer).await;
            } else if request.contains("GET /health") {
                let response =
                    "HTTP/1.1 200 OK\r\nContent-Type: text/plain\r\nContent-Length: 2\r\n\r\nOK";
                let _ = socket.write_all(response.as_bytes()).await;
            } else if request.contains("GET /status") {
                let status = build_status_response(&handles).await;
                let body = serde_json::to_string(&status).unwrap_or_else(|_| "{}".to_string());
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\n\r\n{}",
                    body.len(),
                    body
                );
                let _ = socket.write_all(response.as_bytes()).await;
            } else {
                let response = "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\n\r\n";
                let _ = socket.write_all(response.as_bytes()).await;
            }
        });
    }
}

async fn build_status_response(handles: &StatusHandles) -> StatusResponse {
    let ethereum = handles.ethereum_seen.lock().await.len();
    let cosmos = handles.cosmos_seen.lock().await.len();
    metrics::set_seen_events("ethereum", ethereum);
    metrics::set_seen_events("cosmos", cosmos);

    StatusResponse {
        status: "ok".to_string(),
        started_at: handles.started_at,
        uptime_seconds: handles.started.elapsed().as_secs(),
        seen_events: SeenEvents { ethereum, cosmos },
    }
}
