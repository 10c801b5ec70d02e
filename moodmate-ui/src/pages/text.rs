//! "Type your thoughts": diary entry classification, trend chart and diary

use axum::{
    extract::{Extension, State},
    http::StatusCode,
    response::Response,
    Form,
};
use serde::Deserialize;
use tracing::debug;

use moodmate_common::api::TextModel;
use moodmate_common::{Modality, SessionContext};

use crate::error::failure_status;
use crate::sessions::SessionId;
use crate::AppState;

use super::chart::{confidence_bars, mood_trend_svg};
use super::{escape, page_response, recommendations_link, render_notices, require_signed_in, Notice};

/// Bars shown before anything has been classified
const PLACEHOLDER_LABELS: [&str; 6] = ["sadness", "joy", "love", "anger", "fear", "surprise"];

#[derive(Debug, Deserialize)]
pub struct DiaryForm {
    #[serde(default)]
    pub input_text: String,
    #[serde(default = "default_model")]
    pub model_select: String,
}

fn default_model() -> String {
    TextModel::default().as_str().to_string()
}

struct TextView<'a> {
    notices: Vec<Notice>,
    confidences: Option<Vec<(String, f64)>>,
    input_text: &'a str,
    model: TextModel,
    classified: bool,
}

fn model_options(selected: TextModel) -> String {
    TextModel::ALL
        .iter()
        .map(|m| {
            format!(
                "<option value=\"{0}\"{1}>{0}</option>",
                m.as_str(),
                if *m == selected { " selected" } else { "" }
            )
        })
        .collect()
}

fn diary(ctx: &SessionContext) -> String {
    let timeline = ctx.timeline();
    if timeline.is_empty() {
        return "<p>Your diary is empty. Start writing to see your mood history here.</p>".to_string();
    }

    let chart = mood_trend_svg(&timeline).unwrap_or_default();
    let entries: String = timeline
        .newest_first()
        .into_iter()
        .map(|entry| {
            format!(
                "<details><summary>{} · {}</summary><p>{}</p></details>",
                escape(&entry.date_label()),
                escape(&entry.emotion.decorated()),
                escape(&entry.text)
            )
        })
        .collect();

    format!("<h2>📈 Mood trend</h2>{}<h2>📔 Your diary</h2>{}", chart, entries)
}

fn render(ctx: &SessionContext, status: StatusCode, view: TextView<'_>) -> Response {
    let bars = match &view.confidences {
        Some(ranked) => confidence_bars(ranked),
        None => {
            let placeholders: Vec<(String, f64)> =
                PLACEHOLDER_LABELS.iter().map(|l| (l.to_string(), 0.0)).collect();
            confidence_bars(&placeholders)
        }
    };
    let link = if view.classified { recommendations_link() } else { "" };

    let body = format!(
        r#"<h1>🖋️ Type your thoughts</h1>
<div class="columns">
<section>
    <form method="post" action="/text">
        <label>Dear diary... <textarea name="input_text" rows="8" placeholder="Write how your day went">{text}</textarea></label>
        <label>Model <select name="model_select">{models}</select></label>
        <input type="submit" value="Save entry">
    </form>
    {notices}
    {link}
</section>
<section>
    <h2>Confidence</h2>
    {bars}
</section>
</div>
{diary}"#,
        text = escape(view.input_text),
        models = model_options(view.model),
        notices = render_notices(&view.notices),
        link = link,
        bars = bars,
        diary = diary(ctx),
    );
    page_response(status, "Type your thoughts", ctx, &body)
}

pub async fn text_page(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Response {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return redirect;
    }
    render(
        &ctx,
        StatusCode::OK,
        TextView {
            notices: Vec::new(),
            confidences: None,
            input_text: "",
            model: TextModel::default(),
            classified: false,
        },
    )
}

pub async fn submit_text(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<DiaryForm>,
) -> Response {
    let ctx = state.sessions.context(session).await;
    if let Err(redirect) = require_signed_in(&ctx) {
        return redirect;
    }

    let model = match form.model_select.parse::<TextModel>() {
        Ok(model) => model,
        Err(e) => {
            let view = TextView {
                notices: vec![Notice::Error(e.to_string())],
                confidences: None,
                input_text: &form.input_text,
                model: TextModel::default(),
                classified: false,
            };
            return render(&ctx, StatusCode::BAD_REQUEST, view);
        }
    };

    let input_text = form.input_text.trim();
    if input_text.is_empty() {
        debug!("Empty diary entry rejected");
        let view = TextView {
            notices: vec![Notice::Warning("Please enter your text.".to_string())],
            confidences: None,
            input_text: "",
            model,
            classified: false,
        };
        return render(&ctx, StatusCode::BAD_REQUEST, view);
    }

    match state.backend.classify_text(input_text, model, ctx.user_email()).await {
        Ok(result) => {
            let ranked = result.ranked_confidences();
            let profile = result.user_data.clone();
            let label = state
                .sessions
                .update(session, |ctx| {
                    ctx.update_profile(profile);
                    ctx.record_classification(Modality::Text, &result.pred)
                })
                .await;
            let ctx = state.sessions.context(session).await;
            let view = TextView {
                notices: vec![
                    Notice::Success(format!("Emotion detected: {}", label.decorated())),
                    Notice::Info(label.encouragement().to_string()),
                ],
                confidences: Some(ranked),
                input_text: "",
                model,
                classified: true,
            };
            render(&ctx, StatusCode::OK, view)
        }
        Err(e) => {
            let view = TextView {
                notices: vec![Notice::Error(e.user_message())],
                confidences: None,
                input_text,
                model,
                classified: false,
            };
            render(&ctx, failure_status(&e), view)
        }
    }
}
