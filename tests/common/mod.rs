//! Mock upload service and fixtures shared by the integration tests.

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};
use std::collections::HashMap;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use upbench::common::config::KeyValue;
use upbench::common::RunConfig;

/// Headers and payload captured from one chunk-upload request.
pub struct CapturedChunk {
    pub index: u32,
    pub total: u32,
    pub request_id: Option<String>,
    pub authorization: Option<String>,
    pub payload: Vec<u8>,
}

/// Shared state of the mock service. Failure injection is fixed per test.
#[derive(Default)]
pub struct MockService {
    pub single_uploads: AtomicUsize,
    pub chunk_uploads: AtomicUsize,
    pub merges: AtomicUsize,
    pub issuances: AtomicUsize,
    pub chunks: Mutex<Vec<CapturedChunk>>,
    pub merge_bodies: Mutex<Vec<Value>>,
    pub merge_request_ids: Mutex<Vec<Option<String>>>,
    pub fail_single: bool,
    pub fail_chunk_index: Option<u32>,
    pub fail_merge: bool,
}

impl MockService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Chunk payloads of the most recent repetition, keyed by index.
    pub fn chunk_payloads(&self) -> HashMap<u32, Vec<u8>> {
        let mut payloads = HashMap::new();
        for chunk in self.chunks.lock().unwrap().iter() {
            payloads.insert(chunk.index, chunk.payload.clone());
        }
        payloads
    }
}

/// Bind the mock service on an ephemeral port and return its origin URL.
pub async fn spawn_service(service: Arc<MockService>) -> String {
    let app = Router::new()
        .route("/upload", post(single_upload))
        .route("/upload-chunk", post(chunk_upload))
        .route("/merge-chunks", post(merge_chunks))
        .route("/issue", post(issue_id))
        .layer(DefaultBodyLimit::max(64 * 1024 * 1024))
        .with_state(service);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind mock service");
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

async fn single_upload(
    State(service): State<Arc<MockService>>,
    mut multipart: Multipart,
) -> StatusCode {
    service.single_uploads.fetch_add(1, Ordering::SeqCst);
    while let Ok(Some(field)) = multipart.next_field().await {
        let _ = field.bytes().await;
    }
    if service.fail_single {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn chunk_upload(
    State(service): State<Arc<MockService>>,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> StatusCode {
    service.chunk_uploads.fetch_add(1, Ordering::SeqCst);

    let index: u32 = header_value(&headers, "x-chunk-index")
        .and_then(|v| v.parse().ok())
        .expect("chunk upload without x-chunk-index");
    let total: u32 = header_value(&headers, "x-chunk-total")
        .and_then(|v| v.parse().ok())
        .expect("chunk upload without x-chunk-total");

    let mut payload = Vec::new();
    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() == Some("file") {
            payload = field.bytes().await.unwrap().to_vec();
        } else {
            let _ = field.bytes().await;
        }
    }

    service.chunks.lock().unwrap().push(CapturedChunk {
        index,
        total,
        request_id: header_value(&headers, "x-request-id"),
        authorization: header_value(&headers, "authorization"),
        payload,
    });

    if service.fail_chunk_index == Some(index) {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn merge_chunks(
    State(service): State<Arc<MockService>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> StatusCode {
    service.merges.fetch_add(1, Ordering::SeqCst);
    service
        .merge_request_ids
        .lock()
        .unwrap()
        .push(header_value(&headers, "x-request-id"));
    service.merge_bodies.lock().unwrap().push(body);

    if service.fail_merge {
        StatusCode::INTERNAL_SERVER_ERROR
    } else {
        StatusCode::OK
    }
}

async fn issue_id(State(service): State<Arc<MockService>>) -> Json<Value> {
    let n = service.issuances.fetch_add(1, Ordering::SeqCst);
    Json(json!({ "data": { "request_id": format!("req-{n}") } }))
}

fn header_value(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(String::from)
}

/// Config pointing at the mock service: 1 MiB chunks, defaults otherwise.
pub fn test_config(origin: &str) -> RunConfig {
    RunConfig {
        api_origin: origin.to_string(),
        chunk_size_mib: 1,
        ..RunConfig::default()
    }
}

pub fn with_correlation(mut config: RunConfig) -> RunConfig {
    config.correlation_path = Some("/issue".to_string());
    config
}

pub fn with_extras(mut config: RunConfig) -> RunConfig {
    config.bearer_token = Some("benchmark-token".to_string());
    config.extra_fields = vec![KeyValue {
        key: "project".to_string(),
        value: "upbench".to_string(),
    }];
    config.extra_headers = vec![KeyValue {
        key: "x-team".to_string(),
        value: "perf".to_string(),
    }];
    config
}

/// Write `size` patterned bytes into `dir` and return the path.
pub fn patterned_file(dir: &TempDir, name: &str, size: usize) -> PathBuf {
    let path = dir.path().join(name);
    let mut file = std::fs::File::create(&path).unwrap();
    let payload: Vec<u8> = (0..size).map(|i| (i % 241) as u8).collect();
    file.write_all(&payload).unwrap();
    path
}
