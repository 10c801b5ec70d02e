//! moodmate-ui library - MoodMate web front end
//!
//! Serves the MoodMate pages and forwards every classification,
//! recommendation and account request to the classification backend.

use axum::{
    extract::DefaultBodyLimit,
    middleware,
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Utc};
use tower_http::trace::TraceLayer;

pub mod api;
pub mod client;
pub mod error;
pub mod pages;
pub mod sessions;

use client::BackendClient;
use sessions::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Client for the classification backend
    pub backend: BackendClient,
    /// Browser sessions
    pub sessions: SessionStore,
    /// Largest accepted request body (uploads)
    pub max_upload_bytes: usize,
    pub startup_time: DateTime<Utc>,
}

impl AppState {
    pub fn new(backend: BackendClient, max_upload_bytes: usize) -> Self {
        Self {
            backend,
            sessions: SessionStore::new(),
            max_upload_bytes,
            startup_time: Utc::now(),
        }
    }
}

/// Build application router
///
/// Pages run behind the session middleware; `/health` does not.
pub fn build_router(state: AppState) -> Router {
    let pages = Router::new()
        .route("/", get(pages::home::home_page))
        .route("/signin", get(pages::auth::signin_page).post(pages::auth::signin))
        .route("/signup", post(pages::auth::signup))
        .route("/logout", post(pages::auth::logout))
        .route("/text", get(pages::text::text_page).post(pages::text::submit_text))
        .route("/audio", get(pages::audio::audio_page).post(pages::audio::submit_audio))
        .route("/video", get(pages::video::video_page))
        .route("/video/upload", post(pages::video::upload_video))
        .route("/video/live", get(pages::video::live_feed))
        .route("/video/stop", post(pages::video::stop_live))
        .route(
            "/recommend",
            get(pages::recommend::recommend_page).post(pages::recommend::submit_recommend),
        )
        .layer(middleware::from_fn_with_state(
            state.clone(),
            sessions::session_middleware,
        ));

    Router::new()
        .merge(pages)
        .merge(api::health_routes())
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
