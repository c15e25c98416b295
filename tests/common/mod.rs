//! Shared utilities for integration tests.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;
use storefront_guard::http::AppState;
use storefront_guard::{GuardConfig, HttpServer, Shutdown};
use tokio::net::TcpListener;

pub const ADMIN_PASSWORD: &str = "correct-horse";
pub const ADMIN_API_KEY: &str = "test-admin-key";

/// A running server plus handles to drive and inspect it.
pub struct TestServer {
    pub addr: SocketAddr,
    pub state: AppState,
    pub shutdown: Shutdown,
    pub client: reqwest::Client,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn test_config() -> GuardConfig {
    let mut config = GuardConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.admin.password = ADMIN_PASSWORD.into();
    config.admin.api_key = ADMIN_API_KEY.into();
    config
}

/// Start the server on an ephemeral port.
pub async fn start_server(config: GuardConfig) -> TestServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(config);
    let state = server.state().clone();
    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();

    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    let client = reqwest::Client::builder()
        .no_proxy()
        .build()
        .unwrap();

    TestServer {
        addr,
        state,
        shutdown,
        client,
    }
}
