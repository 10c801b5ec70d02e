//! In-process stand-in for the classification backend
//!
//! Serves the backend's endpoints on an ephemeral port with canned answers
//! and records what it received, so tests can assert on the wire traffic.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    body::Body,
    extract::{Multipart, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Json, Router,
};
use bytes::Bytes;
use futures::StreamExt;
use serde_json::{json, Value};

/// Canned answers
#[derive(Debug, Clone)]
pub struct FakeConfig {
    pub text_pred: String,
    pub text_status: u16,
    pub audio_label: String,
    pub audio_status: u16,
    pub video_label: String,
    pub stop_label: String,
    pub signin_status: u16,
    pub signup_status: u16,
    pub recommend: Value,
    /// Chunks of the `/video_feed` body
    pub feed_chunks: Vec<Vec<u8>>,
    /// Keep `/video_feed` open after the last chunk
    pub feed_hangs: bool,
}

impl Default for FakeConfig {
    fn default() -> Self {
        Self {
            text_pred: "happy".to_string(),
            text_status: 200,
            audio_label: "\"sad\"\n".to_string(),
            audio_status: 200,
            video_label: "angry".to_string(),
            stop_label: "surprise".to_string(),
            signin_status: 200,
            signup_status: 200,
            recommend: json!({
                "recomendation": "Go for a walk",
                "description": "Fresh air and a change of scenery can lift your mood."
            }),
            feed_chunks: vec![jpeg(1), jpeg(2)],
            feed_hangs: false,
        }
    }
}

/// A minimal JPEG-shaped frame: SOI, one payload byte, EOI
pub fn jpeg(payload: u8) -> Vec<u8> {
    vec![0xFF, 0xD8, payload, 0xFF, 0xD9]
}

/// What the fake backend has seen
#[derive(Debug, Default)]
pub struct Calls {
    pub stop: AtomicUsize,
    pub clear: AtomicUsize,
    pub text: AtomicUsize,
    pub recommend: AtomicUsize,
    pub last_text_form: Mutex<Option<HashMap<String, String>>>,
    pub last_upload_field: Mutex<Option<(String, String)>>,
    pub last_recommend: Mutex<Option<(String, Value)>>,
}

impl Calls {
    pub fn stop_count(&self) -> usize {
        self.stop.load(Ordering::SeqCst)
    }

    pub fn clear_count(&self) -> usize {
        self.clear.load(Ordering::SeqCst)
    }

    pub fn text_count(&self) -> usize {
        self.text.load(Ordering::SeqCst)
    }

    /// Poll until `/stop` has been called `expected` times or give up
    pub async fn wait_for_stops(&self, expected: usize) -> usize {
        for _ in 0..100 {
            if self.stop_count() >= expected {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        self.stop_count()
    }
}

#[derive(Clone)]
struct FakeState {
    config: Arc<FakeConfig>,
    calls: Arc<Calls>,
}

/// Running fake backend
pub struct FakeBackend {
    pub base_url: String,
    pub calls: Arc<Calls>,
}

impl FakeBackend {
    pub async fn start(config: FakeConfig) -> Self {
        let calls = Arc::new(Calls::default());
        let state = FakeState {
            config: Arc::new(config),
            calls: calls.clone(),
        };

        let app = Router::new()
            .route("/text_classification", post(text_classification))
            .route("/audio_classification", post(audio_classification))
            .route("/upload_video", post(upload_video))
            .route("/video_feed", get(video_feed))
            .route("/stop", post(stop))
            .route("/recommend", post(recommend))
            .route("/signin", post(signin))
            .route("/signup", post(signup))
            .route("/clear", get(clear))
            .with_state(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind fake backend");
        let addr = listener.local_addr().expect("fake backend address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("fake backend server");
        });

        Self {
            base_url: format!("http://{}", addr),
            calls,
        }
    }
}

/// Base URL of a port nothing listens on
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

pub fn profile(email: &str) -> Value {
    json!({
        "name": "Sam",
        "email": email,
        "age": 30,
        "likes": "hiking",
        "notes": []
    })
}

fn status(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

async fn text_classification(
    State(state): State<FakeState>,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    state.calls.text.fetch_add(1, Ordering::SeqCst);
    *state.calls.last_text_form.lock().unwrap() = Some(form.clone());

    if state.config.text_status != 200 {
        return status(state.config.text_status).into_response();
    }

    let email = form.get("email").cloned().unwrap_or_default();
    let mut user = profile(&email);
    user["notes"] = json!([
        {"text": "older entry", "emotion": "sad", "date_created": "2024-11-04T09:00:00"},
        {
            "text": form.get("input_text").cloned().unwrap_or_default(),
            "emotion": state.config.text_pred,
            "date_created": "2024-11-05T10:30:00"
        }
    ]);

    Json(json!({
        "pred": state.config.text_pred,
        "confs": {"joy": 81.5, "sadness": 12.0, "love": 6.5},
        "user_data": user
    }))
    .into_response()
}

async fn record_upload(state: &FakeState, mut multipart: Multipart) -> Option<(String, String)> {
    let field = multipart.next_field().await.ok()??;
    let name = field.name().unwrap_or_default().to_string();
    let file_name = field.file_name().unwrap_or_default().to_string();
    let _ = field.bytes().await;
    let seen = (name, file_name);
    *state.calls.last_upload_field.lock().unwrap() = Some(seen.clone());
    Some(seen)
}

async fn audio_classification(State(state): State<FakeState>, multipart: Multipart) -> Response {
    match record_upload(&state, multipart).await {
        Some((field, _)) if field == "audio_file" => {
            if state.config.audio_status != 200 {
                return status(state.config.audio_status).into_response();
            }
            state.config.audio_label.clone().into_response()
        }
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn upload_video(State(state): State<FakeState>, multipart: Multipart) -> Response {
    match record_upload(&state, multipart).await {
        Some((field, _)) if field == "file" => state.config.video_label.clone().into_response(),
        _ => StatusCode::BAD_REQUEST.into_response(),
    }
}

async fn video_feed(State(state): State<FakeState>) -> Response {
    let chunks: Vec<Result<Bytes, std::io::Error>> = state
        .config
        .feed_chunks
        .iter()
        .map(|c| Ok(Bytes::from(c.clone())))
        .collect();
    let stream = futures::stream::iter(chunks);

    let body = if state.config.feed_hangs {
        Body::from_stream(stream.chain(futures::stream::pending()))
    } else {
        Body::from_stream(stream)
    };
    (
        [("content-type", "multipart/x-mixed-replace; boundary=frame")],
        body,
    )
        .into_response()
}

async fn stop(State(state): State<FakeState>) -> String {
    state.calls.stop.fetch_add(1, Ordering::SeqCst);
    state.config.stop_label.clone()
}

async fn recommend(
    State(state): State<FakeState>,
    Query(query): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Json<Value> {
    state.calls.recommend.fetch_add(1, Ordering::SeqCst);
    let emotion = query.get("emotion").cloned().unwrap_or_default();
    *state.calls.last_recommend.lock().unwrap() = Some((emotion, body));
    Json(state.config.recommend.clone())
}

async fn signin(State(state): State<FakeState>, Form(form): Form<HashMap<String, String>>) -> Response {
    if state.config.signin_status != 200 {
        return status(state.config.signin_status).into_response();
    }
    let email = form.get("email").cloned().unwrap_or_default();
    Json(json!({ "user_data": profile(&email) })).into_response()
}

async fn signup(State(state): State<FakeState>, Form(form): Form<HashMap<String, String>>) -> Response {
    if state.config.signup_status != 200 {
        return status(state.config.signup_status).into_response();
    }
    let email = form.get("email").cloned().unwrap_or_default();
    let mut user = profile(&email);
    user["name"] = json!(form.get("name").cloned().unwrap_or_default());
    Json(json!({ "user_data": user })).into_response()
}

async fn clear(State(state): State<FakeState>) -> StatusCode {
    state.calls.clear.fetch_add(1, Ordering::SeqCst);
    StatusCode::OK
}
