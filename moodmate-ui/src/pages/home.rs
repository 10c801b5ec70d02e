//! Landing page

use axum::{
    extract::{Extension, State},
    response::Html,
};

use crate::sessions::SessionId;
use crate::AppState;

use super::{escape, layout};

const CARDS: [(&str, &str, &str); 4] = [
    ("/text", "🖋️ Type your thoughts", "Write a diary entry and let MoodMate classify how you feel."),
    ("/audio", "🎙️ Speak your thoughts", "Upload a voice recording to detect the emotion in your speech."),
    ("/video", "🧑 Express your thoughts", "Use your webcam or upload a video to read your facial expressions."),
    ("/recommend", "🏃 Recommendations for you", "Get an activity suggestion that fits your current mood."),
];

pub async fn home_page(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Html<String> {
    let ctx = state.sessions.context(session).await;

    let body = if let Some(user) = ctx.user().filter(|_| ctx.is_authenticated()) {
        let cards: String = CARDS
            .iter()
            .map(|(href, title, blurb)| {
                format!(
                    "<div class=\"card\"><h3>{}</h3><p>{}</p><a class=\"button\" href=\"{}\">Open</a></div>",
                    title, blurb, href
                )
            })
            .collect();
        format!(
            "<h1>Welcome back, {}!</h1>\
             <p>How are you feeling today? Pick a way to tell MoodMate.</p>\
             <div class=\"cards\">{}</div>",
            escape(user.display_name()),
            cards
        )
    } else {
        "<h1>Welcome to MoodMate 😎</h1>\
         <p>MoodMate reads the emotion in what you write, say and show, and suggests \
         something that fits your mood.</p>\
         <p><a class=\"button\" href=\"/signin\">Sign in or register</a> to get started.</p>"
            .to_string()
    };

    layout("Home", &ctx, &body)
}
