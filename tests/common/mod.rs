//! Test server harness.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use sightline::cache::ResultCache;
use sightline::gateway::{HandlerState, create_router_with_state};
use sightline::pipeline::{IdentifyPipeline, PipelineSettings};
use sightline::providers::MockProviders;
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

const STARTUP_WAIT_TIMEOUT_SECS: u64 = 5;
const STARTUP_POLL_INTERVAL_MS: u64 = 50;

pub const TEST_MAX_IMAGE_BYTES: usize = 64 * 1024;
pub const TEST_CACHE_TTL: Duration = Duration::from_secs(3600);

pub struct TestServer {
    pub addr: SocketAddr,
    pub cache: ResultCache,
    _server_handle: JoinHandle<()>,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerStartupError {
    #[error("Server failed to start within timeout")]
    Timeout,
    #[error("Failed to bind to address: {0}")]
    BindError(#[from] std::io::Error),
}

async fn wait_for_server_ready(addr: SocketAddr) -> Result<(), ServerStartupError> {
    let start = std::time::Instant::now();
    loop {
        if start.elapsed() > Duration::from_secs(STARTUP_WAIT_TIMEOUT_SECS) {
            return Err(ServerStartupError::Timeout);
        }
        match tokio::net::TcpStream::connect(addr).await {
            Ok(_) => return Ok(()),
            Err(_) => tokio::time::sleep(Duration::from_millis(STARTUP_POLL_INTERVAL_MS)).await,
        }
    }
}

/// Spawns a server on an ephemeral port with every provider scripted by `mocks`.
pub async fn spawn_test_server(mocks: &MockProviders) -> Result<TestServer, ServerStartupError> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let cache = ResultCache::new(TEST_CACHE_TTL);
    let pipeline = IdentifyPipeline::new(
        mocks.providers(),
        cache.clone(),
        PipelineSettings::default(),
    );
    let app = create_router_with_state(HandlerState::new(pipeline, TEST_MAX_IMAGE_BYTES));

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let server_handle = tokio::spawn(async move {
        let _ = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await;
    });

    wait_for_server_ready(addr).await?;

    Ok(TestServer {
        addr,
        cache,
        _server_handle: server_handle,
        shutdown_tx: Some(shutdown_tx),
    })
}

/// Multipart form with a JPEG-looking `image` part and optional text fields.
pub fn identify_form(image: &[u8], fields: &[(&str, &str)]) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(image.to_vec())
        .file_name("photo.jpg")
        .mime_str("image/jpeg")
        .unwrap_or_else(|_| reqwest::multipart::Part::bytes(image.to_vec()));
    fields
        .iter()
        .fold(reqwest::multipart::Form::new().part("image", part), |form, (k, v)| {
            form.text(k.to_string(), v.to_string())
        })
}

pub const JPEG_BYTES: &[u8] = b"\xFF\xD8\xFF\xE0\x00\x10JFIF";
