//! Activity recommendation for the current mood

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Response,
    Form,
};
use serde::Deserialize;

use moodmate_common::{MoodVerdict, SessionContext};

use crate::error::failure_status;
use crate::sessions::SessionId;
use crate::AppState;

use super::{escape, page_response, render_notices, require_signed_in, Notice};

pub const NO_RECOMMENDATION: &str = "No recommendations found for the given emotion.";

#[derive(Debug, Deserialize)]
pub struct RecommendForm {
    #[serde(default)]
    pub emotion: String,
}

fn render(ctx: &SessionContext, status: StatusCode, emotion: &str, notices: &[Notice], result: &str) -> Response {
    let verdict = ctx.dominant_mood();
    let body = format!(
        r#"<h1>🏃 Recommendations for you</h1>
<p>Your mood across text, audio and video: <strong>{verdict}</strong></p>
<form method="post" action="/recommend">
    <label>Emotion <input type="text" name="emotion" value="{emotion}" placeholder="How are you feeling?"></label>
    <input type="submit" value="Get recommendation">
</form>
{notices}
{result}"#,
        verdict = escape(&verdict.to_string()),
        emotion = escape(emotion),
        notices = render_notices(notices),
        result = result,
    );
    page_response(status, "Recommendations", ctx, &body)
}

pub async fn recommend_page(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Response {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return redirect;
    }
    let prefill = match ctx.dominant_mood() {
        MoodVerdict::Detected(label) => label.as_str().to_string(),
        MoodVerdict::NoneDetected => String::new(),
    };
    render(&ctx, StatusCode::OK, &prefill, &[], "")
}

pub async fn submit_recommend(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<RecommendForm>,
) -> Response {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return redirect;
    }

    let emotion = form.emotion.trim();
    if emotion.is_empty() {
        let notice = Notice::Warning("Please enter an emotion.".to_string());
        return render(&ctx, StatusCode::BAD_REQUEST, "", &[notice], "");
    }

    let Some(profile) = ctx.user() else {
        return render(&ctx, StatusCode::OK, emotion, &[], "");
    };

    match state.backend.recommend(profile, emotion).await {
        Ok(recommendation) => match recommendation.suggestion() {
            Some((title, description)) => {
                let result = format!(
                    "<div class=\"card\"><h3>{}</h3><p>{}</p></div>",
                    escape(title),
                    escape(description)
                );
                render(&ctx, StatusCode::OK, emotion, &[], &result)
            }
            None => render(
                &ctx,
                StatusCode::OK,
                emotion,
                &[Notice::Warning(NO_RECOMMENDATION.to_string())],
                "",
            ),
        },
        Err(e) => render(&ctx, failure_status(&e), emotion, &[Notice::Error(e.user_message())], ""),
    }
}
