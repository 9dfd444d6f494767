//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`] which builds a config pointed at a local mock
//! upstream and a full [`AppContext`]. The [`TestHarness::serve`] constructor
//! starts Axum on a random port for HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use reelgate::config::{CatalogEntry, Config};
use reelgate::server::{create_router, AppContext};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// Config allowing only the loopback host, with a short upstream deadline.
pub fn test_config() -> Config {
    let mut config = Config::default();
    config.proxy.allowed_hosts = vec!["127.0.0.1".to_string()];
    config.proxy.upstream_timeout_secs = 2;
    config
}

pub fn movie(id: &str, remote_url: impl Into<String>) -> CatalogEntry {
    CatalogEntry {
        id: id.to_string(),
        title: format!("Movie {id}"),
        year: Some(2024),
        remote_url: remote_url.into(),
    }
}

/// Test harness wrapping a fully-constructed [`AppContext`].
pub struct TestHarness {
    pub ctx: AppContext,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_config(test_config())
    }

    pub fn with_config(config: Config) -> Self {
        let ctx = AppContext::from_config(config).expect("failed to build app context");
        Self { ctx }
    }

    /// Router without connect info; every request shares one rate limit key.
    pub fn router(&self) -> Router {
        create_router(self.ctx.clone(), None)
    }

    /// Start an Axum server on a random port and return its base URL.
    pub async fn serve(config: Config) -> (Self, String) {
        let harness = Self::with_config(config);
        let app = harness.router();

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(
                listener,
                app.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .await
            .ok();
        });

        (harness, format!("http://{addr}"))
    }
}

/// `/api/stream?url=` link for `target`.
pub fn stream_link(base: &str, target: &str) -> String {
    format!("{base}/api/stream?url={}", urlencoding::encode(target))
}

/// Raw HTTP/1.1 upstream answering one request with an endless chunked body.
///
/// Each frame carries `chunk` and is followed by `pause`. The receiver yields
/// the number of frames written once a write to the peer fails.
pub async fn spawn_endless_upstream(
    content_type: &'static str,
    chunk: Vec<u8>,
    pause: Duration,
) -> (String, oneshot::Receiver<usize>) {
    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind upstream");
    let addr = listener.local_addr().expect("failed to get upstream addr");
    let (closed_tx, closed_rx) = oneshot::channel();

    tokio::spawn(async move {
        let Ok((mut socket, _)) = listener.accept().await else {
            return;
        };

        let mut request = Vec::new();
        let mut buf = [0u8; 4096];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            match socket.read(&mut buf).await {
                Ok(0) | Err(_) => return,
                Ok(n) => request.extend_from_slice(&buf[..n]),
            }
        }

        let head = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: {content_type}\r\nTransfer-Encoding: chunked\r\n\r\n"
        );
        if socket.write_all(head.as_bytes()).await.is_err() {
            return;
        }

        let frame = [
            format!("{:x}\r\n", chunk.len()).into_bytes(),
            chunk,
            b"\r\n".to_vec(),
        ]
        .concat();

        let mut written = 0;
        loop {
            if socket.write_all(&frame).await.is_err() {
                let _ = closed_tx.send(written);
                return;
            }
            written += 1;
            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }
    });

    (format!("http://{addr}"), closed_rx)
}
