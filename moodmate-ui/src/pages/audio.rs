//! "Speak your thoughts": audio upload classification

use axum::{
    extract::{Extension, Multipart, State},
    http::StatusCode,
    response::Response,
};

use moodmate_common::{Modality, SessionContext};

use crate::client::{Upload, UploadKind};
use crate::error::{failure_status, UiResult};
use crate::sessions::SessionId;
use crate::AppState;

use super::{page_response, read_upload, recommendations_link, render_notices, require_signed_in, Notice};

fn render(ctx: &SessionContext, status: StatusCode, notices: &[Notice], classified: bool) -> Response {
    let body = format!(
        r#"<h1>🎙️ Speak your thoughts</h1>
<p>Upload a recording of yourself talking about your day.</p>
<form method="post" action="/audio" enctype="multipart/form-data">
    <label>Audio file <input type="file" name="audio_file" accept="{accept}" required></label>
    <input type="submit" value="Classify">
</form>
{notices}
{link}"#,
        accept = UploadKind::Audio.accept_attr(),
        notices = render_notices(notices),
        link = if classified { recommendations_link() } else { "" },
    );
    page_response(status, "Speak your thoughts", ctx, &body)
}

pub async fn audio_page(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Response {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return redirect;
    }
    render(&ctx, StatusCode::OK, &[], false)
}

pub async fn submit_audio(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    mut multipart: Multipart,
) -> UiResult<Response> {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return Ok(redirect);
    }

    let Some((file_name, bytes)) = read_upload(&mut multipart, "audio_file").await? else {
        let notice = Notice::Warning("Please choose an audio file to upload.".to_string());
        return Ok(render(&ctx, StatusCode::BAD_REQUEST, &[notice], false));
    };

    let result = match Upload::new(UploadKind::Audio, &file_name, bytes) {
        Ok(upload) => state.backend.classify_audio(upload).await,
        Err(e) => Err(e),
    };

    let response = match result {
        Ok(raw) => {
            let label = state
                .sessions
                .update(session, |ctx| ctx.record_classification(Modality::Audio, &raw))
                .await;
            let ctx = state.sessions.context(session).await;
            let notices = [
                Notice::Success(format!("Emotion detected: {}", label.decorated())),
                Notice::Info(label.encouragement().to_string()),
            ];
            render(&ctx, StatusCode::OK, &notices, true)
        }
        Err(e) => render(&ctx, failure_status(&e), &[Notice::Error(e.user_message())], false),
    };
    Ok(response)
}
