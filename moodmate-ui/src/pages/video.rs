//! "Express your thoughts": live webcam feed and video upload

use axum::{
    body::Body,
    extract::{Extension, Multipart, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use bytes::{BufMut, Bytes, BytesMut};
use futures::StreamExt;
use serde::Deserialize;
use tracing::{debug, info, warn};

use moodmate_common::{Modality, SessionContext};

use crate::client::{Upload, UploadKind};
use crate::error::{failure_status, UiError, UiResult};
use crate::sessions::{FeedStop, SessionId};
use crate::AppState;

use super::{page_response, read_upload, recommendations_link, render_notices, require_signed_in, Notice};

pub const MJPEG_CONTENT_TYPE: &str = "multipart/x-mixed-replace; boundary=frame";

#[derive(Debug, Default, Deserialize)]
pub struct VideoQuery {
    #[serde(default)]
    pub live: Option<u8>,
}

fn render(ctx: &SessionContext, status: StatusCode, live: bool, notices: &[Notice], classified: bool) -> Response {
    let webcam = if live {
        r#"<img src="/video/live" alt="Live webcam feed" width="640">
    <form method="post" action="/video/stop"><input type="submit" value="Stop webcam"></form>"#
    } else {
        r#"<form method="get" action="/video"><input type="hidden" name="live" value="1"><input type="submit" value="Start webcam"></form>"#
    };

    let body = format!(
        r#"<h1>🧑 Express your thoughts</h1>
<div class="columns">
<section>
    <h2>Live webcam</h2>
    {webcam}
</section>
<section>
    <h2>Upload a video</h2>
    <form method="post" action="/video/upload" enctype="multipart/form-data">
        <label>Video file <input type="file" name="file" accept="{accept}" required></label>
        <input type="submit" value="Classify">
    </form>
</section>
</div>
{notices}
{link}"#,
        webcam = webcam,
        accept = UploadKind::Video.accept_attr(),
        notices = render_notices(notices),
        link = if classified { recommendations_link() } else { "" },
    );
    page_response(status, "Express your thoughts", ctx, &body)
}

fn detected(label: &moodmate_common::EmotionLabel) -> [Notice; 2] {
    [
        Notice::Success(format!("Emotion detected: {}", label.decorated())),
        Notice::Info(label.encouragement().to_string()),
    ]
}

pub async fn video_page(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Query(query): Query<VideoQuery>,
) -> Response {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return redirect;
    }
    render(&ctx, StatusCode::OK, query.live == Some(1), &[], false)
}

pub async fn upload_video(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    mut multipart: Multipart,
) -> UiResult<Response> {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return Ok(redirect);
    }

    let Some((file_name, bytes)) = read_upload(&mut multipart, "file").await? else {
        let notice = Notice::Warning("Please choose a video file to upload.".to_string());
        return Ok(render(&ctx, StatusCode::BAD_REQUEST, false, &[notice], false));
    };

    let result = match Upload::new(UploadKind::Video, &file_name, bytes) {
        Ok(upload) => state.backend.classify_video(upload).await,
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(raw) => {
            let label = state
                .sessions
                .update(session, |ctx| ctx.record_classification(Modality::Video, &raw))
                .await;
            let ctx = state.sessions.context(session).await;
            render(&ctx, StatusCode::OK, false, &detected(&label), true)
        }
        Err(e) => render(&ctx, failure_status(&e), false, &[Notice::Error(e.user_message())], false),
    };
    Ok(response)
}

/// Wrap one JPEG frame as a part of the MJPEG response
pub fn mjpeg_part(frame: &[u8]) -> Bytes {
    let mut part = BytesMut::with_capacity(frame.len() + 64);
    part.put_slice(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n");
    part.put_slice(frame);
    part.put_slice(b"\r\n");
    part.freeze()
}

/// Proxy the backend's webcam feed to the browser as MJPEG
///
/// Starting a feed cancels any feed already running for the session. If
/// the browser goes away the stream is dropped and the session store sends
/// the backend `/stop`, keeping the answer for a Stop that follows.
pub async fn live_feed(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Response {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return redirect;
    }

    let cancel = state.sessions.start_live_feed(session).await;
    let on_abort = {
        let sessions = state.sessions.clone();
        let backend = state.backend.clone();
        let feed = cancel.clone();
        move || {
            let Ok(runtime) = tokio::runtime::Handle::try_current() else {
                warn!(session = %session.0, "Live feed dropped outside a runtime; backend not stopped");
                return;
            };
            runtime.spawn(async move {
                sessions.stop_abandoned_feed(session, &feed, &backend).await;
            });
        }
    };

    match state.backend.live_feed_with_abort(cancel.clone(), on_abort).await {
        Ok(frames) => {
            info!(session = %session.0, "Streaming live feed to browser");
            let parts = frames.map(|frame| frame.map(|f| mjpeg_part(&f)));
            (
                [
                    (header::CONTENT_TYPE, MJPEG_CONTENT_TYPE),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                Body::from_stream(parts),
            )
                .into_response()
        }
        Err(e) => {
            cancel.cancel();
            (failure_status(&e), e.user_message()).into_response()
        }
    }
}

/// Stop the live feed and record the backend's aggregated label
///
/// The backend sees exactly one `/stop` per feed: if the browser already
/// dropped the feed, the stop sent then is awaited instead of a new one.
pub async fn stop_live(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
) -> UiResult<Response> {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return Ok(redirect);
    }

    let result = match state.sessions.finish_live_feed(session).await {
        FeedStop::Cancelled => state.backend.stop_live().await,
        FeedStop::InFlight(pending) => {
            debug!(session = %session.0, "Using the stop sent when the feed was dropped");
            pending
                .await
                .map_err(|e| UiError::Internal(format!("Stop request did not complete: {}", e)))?
        }
        FeedStop::Idle => {
            warn!(session = %session.0, "Stop requested with no live feed running");
            state.backend.stop_live().await
        }
    };

    let response = match result {
        Ok(raw) => {
            let label = state
                .sessions
                .update(session, |ctx| ctx.record_classification(Modality::Video, &raw))
                .await;
            let ctx = state.sessions.context(session).await;
            render(&ctx, StatusCode::OK, false, &detected(&label), true)
        }
        Err(e) => render(&ctx, failure_status(&e), false, &[Notice::Error(e.user_message())], false),
    };
    Ok(response)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mjpeg_part_framing() {
        let part = mjpeg_part(&[0xFF, 0xD8, 0x01, 0xFF, 0xD9]);
        assert!(part.starts_with(b"--frame\r\nContent-Type: image/jpeg\r\n\r\n"));
        assert!(part.ends_with(&[0xFF, 0xD9, b'\r', b'\n']));
    }
}
