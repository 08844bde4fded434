//! Shared harness for the socket-level tests.
//!
//! Starts a relay on an ephemeral localhost port and offers a bare-bones
//! HTTP GET so page and status routes can be checked without an HTTP client.

use std::net::SocketAddr;

use anyhow::Context;
use squares_client::ws_url;
use squares_server::server::bind_ephemeral;
use squares_shared::config::ServerConfig;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
};
use tracing::info;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("info")
        .with_test_writer()
        .try_init();
}

/// Running relay under test.
pub struct TestServer {
    pub addr: SocketAddr,
    pub cfg: ServerConfig,
}

impl TestServer {
    pub fn ws_url(&self) -> String {
        ws_url(self.addr)
    }
}

/// Binds before returning, so clients may connect immediately.
pub async fn start_server(cfg: ServerConfig) -> anyhow::Result<TestServer> {
    init_tracing();
    let (server, cfg) = bind_ephemeral(cfg).await?;
    let addr = server.local_addr()?;
    tokio::spawn(server.serve());
    info!(%addr, "test server started");
    Ok(TestServer { addr, cfg })
}

/// Minimal HTTP/1.1 GET. Returns the status code and the body.
pub async fn http_get(addr: SocketAddr, path: &str) -> anyhow::Result<(u16, String)> {
    let mut stream = TcpStream::connect(addr).await.context("tcp connect")?;
    let request = format!("GET {path} HTTP/1.1\r\nHost: {addr}\r\nConnection: close\r\n\r\n");
    stream
        .write_all(request.as_bytes())
        .await
        .context("write request")?;

    let mut raw = Vec::new();
    stream.read_to_end(&mut raw).await.context("read response")?;
    let text = String::from_utf8_lossy(&raw).into_owned();

    let status = text
        .split_whitespace()
        .nth(1)
        .context("missing status line")?
        .parse()
        .context("parse status code")?;
    let body = text
        .split_once("\r\n\r\n")
        .map(|(_, body)| body.to_string())
        .unwrap_or_default();
    Ok((status, body))
}
