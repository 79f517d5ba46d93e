//! Test helpers: build AppState and router for integration tests.
//!
//! Run from workspace root: `cargo test -p imgrelay-api`. No external services
//! are needed: the object store is `object_store::memory::InMemory` behind
//! `S3Storage`, and the image host and callback endpoint are mockito servers.

#![allow(dead_code)]

use axum_test::TestServer;
use imgrelay_api::setup::{build_state, routes, server};
use imgrelay_api::{AppState, Pipeline};
use imgrelay_core::constants::DEFAULT_S3_REGION;
use imgrelay_core::{
    CallbackConfig, Config, ImagePutRequest, LogFormat, PipelineConfig, ServerConfig,
    StorageBackend, StorageConfig,
};
use imgrelay_storage::{S3Storage, Storage};
use object_store::memory::InMemory;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{oneshot, Notify};
use tokio::task::JoinHandle;

pub const ENDPOINT: &str = "minio:9000";
pub const BUCKET: &str = "images";

/// Prefix every internal URL must start with.
pub fn bucket_url() -> String {
    format!("http://{}/{}", ENDPOINT, BUCKET)
}

pub fn test_config(callback_url: &str, work_dir: &Path) -> Config {
    Config {
        server: ServerConfig {
            port: 0,
            log_format: LogFormat::Compact,
        },
        storage: StorageConfig {
            backend: StorageBackend::S3,
            endpoint: ENDPOINT.to_string(),
            bucket: BUCKET.to_string(),
            access_key_id: "test-access".to_string(),
            secret_access_key: "test-secret".to_string(),
            region: DEFAULT_S3_REGION.to_string(),
            use_ssl: false,
            local_storage_path: None,
        },
        callback: CallbackConfig {
            url: callback_url.to_string(),
            timeout: Duration::from_secs(5),
        },
        pipeline: PipelineConfig {
            work_dir: work_dir.to_path_buf(),
            fetch_timeout: Duration::from_secs(5),
            upload_timeout: Duration::from_secs(5),
            detached: false,
        },
    }
}

pub fn memory_storage() -> Arc<dyn Storage> {
    Arc::new(S3Storage::with_store(
        Arc::new(InMemory::new()),
        BUCKET,
        bucket_url(),
    ))
}

/// Test application: server, state, and owned resources.
pub struct TestApp {
    pub server: TestServer,
    pub state: Arc<AppState>,
    pub storage: Arc<dyn Storage>,
    pub work_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Wait for every spawned pipeline, including detached ones.
    pub async fn wait_for_pipelines(&self) {
        self.state.tasks.close();
        self.state.tasks.wait().await;
    }

    pub fn work_dir_entries(&self) -> Vec<PathBuf> {
        work_dir_entries(self.work_dir.path())
    }
}

pub async fn setup_test_app(callback_url: &str) -> TestApp {
    setup_test_app_with(callback_url, |_| {}).await
}

/// Setup test app with an in-memory object store and a fresh work directory.
pub async fn setup_test_app_with(callback_url: &str, customize: impl FnOnce(&mut Config)) -> TestApp {
    let work_dir = TempDir::new().unwrap();
    let mut config = test_config(callback_url, work_dir.path());
    customize(&mut config);

    let storage = memory_storage();
    let state = build_state(config, storage.clone()).await.unwrap();
    let router = routes::setup_routes(state.clone());
    let server = TestServer::new(router).unwrap();

    TestApp {
        server,
        state,
        storage,
        work_dir,
    }
}

/// A pipeline wired to `storage` with the given callback URL and work directory.
pub fn pipeline(callback_url: &str, work_dir: &Path, storage: Arc<dyn Storage>) -> Pipeline {
    pipeline_with(test_config(callback_url, work_dir), storage)
}

pub fn pipeline_with(config: Config, storage: Arc<dyn Storage>) -> Pipeline {
    Pipeline::new(Arc::new(config), storage, reqwest::Client::new())
}

pub fn work_dir_entries(path: &Path) -> Vec<PathBuf> {
    std::fs::read_dir(path)
        .unwrap()
        .map(|entry| entry.unwrap().path())
        .collect()
}

/// Last path segment of an internal URL, i.e. the generated filename.
pub fn filename_of(internal_url: &str) -> &str {
    internal_url.rsplit('/').next().unwrap()
}

pub type Recorded = Arc<Mutex<Vec<ImagePutRequest>>>;

/// Mock the callback endpoint and record every payload it receives.
pub async fn record_callbacks(
    server: &mut mockito::ServerGuard,
    status: usize,
) -> (mockito::Mock, Recorded) {
    let recorded: Recorded = Arc::new(Mutex::new(Vec::new()));
    let sink = recorded.clone();

    let mock = server
        .mock("PUT", "/callback")
        .match_header("content-type", "application/json")
        .with_status(status)
        .with_body_from_request(move |request| {
            if let Ok(body) = request.body() {
                if let Ok(payload) = serde_json::from_slice::<ImagePutRequest>(body) {
                    sink.lock().unwrap().push(payload);
                }
            }
            Vec::new()
        })
        .create_async()
        .await;

    (mock, recorded)
}

/// Serve `body` at `path` on the mock image host.
pub async fn serve_image(server: &mut mockito::ServerGuard, path: &str, body: &[u8]) -> mockito::Mock {
    server
        .mock("GET", path)
        .with_status(200)
        .with_header("content-type", "image/jpeg")
        .with_body(body)
        .create_async()
        .await
}

/// Minimal JPEG-looking payload with a distinguishing tail.
pub fn fake_jpeg(tag: u8) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00];
    data.extend(std::iter::repeat(tag).take(4096));
    data.extend([0xFF, 0xD9]);
    data
}

/// App served on a real socket, stopped through `serve`'s shutdown signal.
pub struct ServedApp {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
    pub storage: Arc<dyn Storage>,
    pub work_dir: TempDir,
    stop: Option<oneshot::Sender<()>>,
    server: Option<JoinHandle<anyhow::Result<()>>>,
}

impl ServedApp {
    pub fn work_dir_entries(&self) -> Vec<PathBuf> {
        work_dir_entries(self.work_dir.path())
    }

    /// Fire the shutdown signal and wait for `serve` to return.
    pub async fn shutdown(&mut self) -> anyhow::Result<()> {
        if let Some(stop) = self.stop.take() {
            let _ = stop.send(());
        }
        match self.server.take() {
            Some(server) => server.await.unwrap(),
            None => Ok(()),
        }
    }
}

pub async fn serve_test_app(callback_url: &str) -> ServedApp {
    let work_dir = TempDir::new().unwrap();
    let config = test_config(callback_url, work_dir.path());
    let storage = memory_storage();
    let state = build_state(config, storage.clone()).await.unwrap();
    let router = routes::setup_routes(state.clone());

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();
    let server = tokio::spawn(server::serve(state.clone(), listener, router, async move {
        let _ = stopped.await;
    }));

    ServedApp {
        addr,
        state,
        storage,
        work_dir,
        stop: Some(stop),
        server: Some(server),
    }
}

/// Write a relay request on a fresh connection and hand back the socket.
pub async fn send_relay_request(addr: SocketAddr, external_url: &str) -> TcpStream {
    let body = serde_json::json!({ "externalImageUrl": external_url }).to_string();
    let request = format!(
        "POST / HTTP/1.1\r\nHost: {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        addr,
        body.len(),
        body
    );

    let mut socket = TcpStream::connect(addr).await.unwrap();
    socket.write_all(request.as_bytes()).await.unwrap();
    socket
}

pub async fn read_response(mut socket: TcpStream) -> String {
    let mut raw = Vec::new();
    tokio::time::timeout(Duration::from_secs(5), socket.read_to_end(&mut raw))
        .await
        .unwrap()
        .unwrap();
    String::from_utf8(raw).unwrap()
}

/// Image host that sends headers and half the body, then stalls.
pub struct StalledImageHost {
    pub base_url: String,
    /// Notified once per request received.
    pub requested: Arc<Notify>,
    task: JoinHandle<()>,
}

impl Drop for StalledImageHost {
    fn drop(&mut self) {
        self.task.abort();
    }
}

pub async fn stalled_image_host(body: Vec<u8>, stall: Duration) -> StalledImageHost {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let requested = Arc::new(Notify::new());
    let notify = requested.clone();
    let body = Arc::new(body);

    let task = tokio::spawn(async move {
        while let Ok((socket, _)) = listener.accept().await {
            tokio::spawn(serve_stalled(socket, body.clone(), notify.clone(), stall));
        }
    });

    StalledImageHost {
        base_url,
        requested,
        task,
    }
}

async fn serve_stalled(mut socket: TcpStream, body: Arc<Vec<u8>>, notify: Arc<Notify>, stall: Duration) {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        match socket.read(&mut buf).await {
            Ok(0) | Err(_) => return,
            Ok(n) => head.extend_from_slice(&buf[..n]),
        }
    }
    notify.notify_one();

    let header = format!(
        "HTTP/1.1 200 OK\r\nContent-Type: image/jpeg\r\nContent-Length: {}\r\n\r\n",
        body.len()
    );
    let half = body.len() / 2;
    if socket.write_all(header.as_bytes()).await.is_err() || socket.write_all(&body[..half]).await.is_err() {
        return;
    }
    let _ = socket.flush().await;

    tokio::time::sleep(stall).await;
    let _ = socket.write_all(&body[half..]).await;
    let _ = socket.flush().await;
}

/// Poll until the work directory holds a temp file.
pub async fn wait_for_temp_file(work_dir: &Path) {
    for _ in 0..100 {
        if !work_dir_entries(work_dir).is_empty() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no temp file appeared in {}", work_dir.display());
}
