//! Shared fixtures: a local mock of the OpenAI and Ollama HTTP APIs.
//!
//! Embeddings are keyword vectors over (curling, skiing, swimming), so the
//! ranking of the fixture corpus is known in advance.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use serde_json::{json, Value};

pub const DIMS: usize = 3;

/// Queue entry that lets one request through normally.
pub const PASS: u16 = 200;
/// Status code that makes the mock answer 200 with a body that is not JSON.
pub const BAD_BODY: u16 = 0;
/// Status code that makes the mock stall for three seconds before answering.
pub const STALL: u16 = 1;

pub const CORPUS_CSV: &str = "title,heading,content,tokens\n\
Curling at the 2020 Summer Olympics,Summary,\"Italy won the mixed doubles curling gold.\nThe final was in Tokyo.\",10\n\
Alpine skiing,Summary,Skiing races were held on steep courses.,8\n\
Swimming at the 2020 Summer Olympics,Summary,Caeleb Dressel won five swimming golds.,9\n";

pub const CURLING_ANSWER: &str = "Italy won the mixed doubles curling gold.";

/// Unit-length keyword vector for `text`.
pub fn keyword_vector(text: &str) -> Vec<f32> {
    let lower = text.to_lowercase();
    let mut v: Vec<f32> = ["curling", "ski", "swim"]
        .iter()
        .map(|k| {
            let hit = if lower.contains(k) { 1.0 } else { 0.0 };
            hit + 0.1
        })
        .collect();
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    for x in v.iter_mut() {
        *x /= norm;
    }
    v
}

/// The mock's canned answer for a rendered prompt.
pub fn answer_for(prompt: &str) -> &'static str {
    if prompt.contains(CURLING_ANSWER) {
        " Italy.\n"
    } else {
        "\n I don't know.  \n"
    }
}

#[derive(Default)]
pub struct MockState {
    /// Statuses returned, in order, by the embedding endpoints.
    pub embed_failures: Mutex<VecDeque<u16>>,
    /// Statuses returned, in order, by the completion endpoints.
    pub completion_failures: Mutex<VecDeque<u16>>,
    pub embed_calls: AtomicUsize,
    pub completion_calls: AtomicUsize,
    pub requests: Mutex<Vec<Value>>,
    pub last_auth: Mutex<Option<String>>,
    /// When set, embeddings are padded to this many components.
    pub dims_override: Mutex<Option<usize>>,
}

impl MockState {
    pub fn fail_next_embeddings(&self, statuses: &[u16]) {
        self.embed_failures
            .lock()
            .unwrap()
            .extend(statuses.iter().copied());
    }

    pub fn fail_next_completions(&self, statuses: &[u16]) {
        self.completion_failures
            .lock()
            .unwrap()
            .extend(statuses.iter().copied());
    }

    pub fn embed_calls(&self) -> usize {
        self.embed_calls.load(Ordering::SeqCst)
    }

    pub fn completion_calls(&self) -> usize {
        self.completion_calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<Value> {
        self.requests.lock().unwrap().last().cloned()
    }
}

pub struct MockServer {
    pub url: String,
    pub state: Arc<MockState>,
}

fn router(state: Arc<MockState>) -> Router {
    Router::new()
        .route("/v1/embeddings", post(openai_embeddings))
        .route("/v1/completions", post(openai_completions))
        .route("/api/embed", post(ollama_embed))
        .route("/api/generate", post(ollama_generate))
        .with_state(state)
}

/// Start the mock on the current tokio runtime.
pub async fn spawn_mock() -> MockServer {
    let state = Arc::new(MockState::default());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = router(state.clone());
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    MockServer {
        url: format!("http://{}", addr),
        state,
    }
}

/// Start the mock on a background thread with its own runtime, for
/// synchronous tests that drive the `cqa` binary.
pub fn spawn_mock_blocking() -> MockServer {
    let (tx, rx) = std::sync::mpsc::channel();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let state = Arc::new(MockState::default());
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tx.send((format!("http://{}", addr), state.clone())).unwrap();
            axum::serve(listener, router(state)).await.unwrap();
        });
    });
    let (url, state) = rx.recv().unwrap();
    MockServer { url, state }
}

async fn injected_failure(queue: &Mutex<VecDeque<u16>>) -> Option<Response> {
    let next = queue.lock().unwrap().pop_front();
    match next {
        None | Some(PASS) => None,
        Some(BAD_BODY) => Some((StatusCode::OK, "this is not json").into_response()),
        Some(STALL) => {
            tokio::time::sleep(Duration::from_secs(3)).await;
            Some((StatusCode::OK, "too late").into_response())
        }
        Some(code) => {
            let status = StatusCode::from_u16(code).unwrap();
            Some((status, format!("mock failure {}", code)).into_response())
        }
    }
}

fn record(state: &MockState, headers: &HeaderMap, body: &Value) {
    state.requests.lock().unwrap().push(body.clone());
    *state.last_auth.lock().unwrap() = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
}

fn vector_for(state: &MockState, input: &str) -> Vec<f32> {
    let mut v = keyword_vector(input);
    if let Some(dims) = *state.dims_override.lock().unwrap() {
        v.resize(dims, 0.0);
    }
    v
}

async fn openai_embeddings(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.embed_calls.fetch_add(1, Ordering::SeqCst);
    record(&state, &headers, &body);
    if let Some(resp) = injected_failure(&state.embed_failures).await {
        return resp;
    }
    let input = body["input"].as_str().unwrap_or_default();
    Json(json!({
        "object": "list",
        "data": [{ "object": "embedding", "index": 0, "embedding": vector_for(&state, input) }],
        "model": body["model"],
    }))
    .into_response()
}

async fn openai_completions(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.completion_calls.fetch_add(1, Ordering::SeqCst);
    record(&state, &headers, &body);
    if let Some(resp) = injected_failure(&state.completion_failures).await {
        return resp;
    }
    let prompt = body["prompt"].as_str().unwrap_or_default();
    Json(json!({
        "object": "text_completion",
        "choices": [{ "text": answer_for(prompt), "index": 0, "finish_reason": "stop" }],
        "model": body["model"],
    }))
    .into_response()
}

async fn ollama_embed(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.embed_calls.fetch_add(1, Ordering::SeqCst);
    record(&state, &headers, &body);
    if let Some(resp) = injected_failure(&state.embed_failures).await {
        return resp;
    }
    let input = body["input"].as_str().unwrap_or_default();
    Json(json!({
        "model": body["model"],
        "embeddings": [vector_for(&state, input)],
    }))
    .into_response()
}

async fn ollama_generate(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    state.completion_calls.fetch_add(1, Ordering::SeqCst);
    record(&state, &headers, &body);
    if let Some(resp) = injected_failure(&state.completion_failures).await {
        return resp;
    }
    let prompt = body["prompt"].as_str().unwrap_or_default();
    Json(json!({
        "model": body["model"],
        "response": answer_for(prompt),
        "done": true,
    }))
    .into_response()
}
