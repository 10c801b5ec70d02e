//! Server-rendered pages
//!
//! Every page shares the same shell: sidebar navigation, help text and a
//! logout button, with the page body in the main column. Handlers render
//! the whole page on every request, including the outcome of a form post.

pub mod audio;
pub mod auth;
pub mod chart;
pub mod home;
pub mod recommend;
pub mod text;
pub mod video;

use axum::{
    extract::Multipart,
    http::StatusCode,
    response::{Html, IntoResponse, Redirect, Response},
};
use bytes::Bytes;

use moodmate_common::SessionContext;

use crate::error::UiResult;

const STYLE: &str = r#"
    * { box-sizing: border-box; }
    body { margin: 0; font-family: 'Segoe UI', Tahoma, Geneva, Verdana, sans-serif;
           background-color: #1a1a1a; color: #e0e0e0; line-height: 1.6; display: flex; min-height: 100vh; }
    nav { width: 260px; background-color: #2a2a2a; border-right: 1px solid #3a3a3a; padding: 20px; }
    nav a { display: block; color: #e0e0e0; text-decoration: none; padding: 6px 0; }
    nav a:hover { color: #4a9eff; }
    nav .help { font-size: 13px; color: #aaa; background: #22303f; border-radius: 8px; padding: 10px; }
    nav footer { margin-top: 20px; font-size: 12px; color: #888; }
    main { flex: 1; padding: 30px; max-width: 1100px; }
    h1 { color: #4a9eff; }
    .notice { padding: 12px 16px; border-radius: 8px; margin: 16px 0; }
    .notice.info { background: #1d3557; }
    .notice.success { background: #1e4620; }
    .notice.warning { background: #5c4a00; }
    .notice.error { background: #5c1a1a; }
    .cards { display: flex; gap: 20px; flex-wrap: wrap; }
    .card { flex: 1; min-width: 240px; border: 1px solid #3a3a3a; border-radius: 15px; padding: 20px; background: #242424; }
    .card a.button, button, input[type=submit] { display: inline-block; background: #4a9eff; color: #fff;
           border: none; border-radius: 6px; padding: 8px 16px; cursor: pointer; text-decoration: none; }
    button.secondary { background: #555; }
    textarea, input, select { width: 100%; padding: 8px; margin: 4px 0 12px; background: #2a2a2a;
           color: #e0e0e0; border: 1px solid #3a3a3a; border-radius: 6px; }
    progress { width: 100%; }
    details { background: #242424; border-radius: 8px; padding: 8px 12px; margin: 8px 0; }
    .columns { display: flex; gap: 30px; flex-wrap: wrap; }
    .columns > section { flex: 1; min-width: 320px; }
"#;

/// Escape text for HTML element content and attribute values
pub fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Message box shown above or below a form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    Info(String),
    Success(String),
    Warning(String),
    Error(String),
}

impl Notice {
    pub fn render(&self) -> String {
        let (class, text) = match self {
            Notice::Info(t) => ("info", t),
            Notice::Success(t) => ("success", t),
            Notice::Warning(t) => ("warning", t),
            Notice::Error(t) => ("error", t),
        };
        format!("<div class=\"notice {}\">{}</div>", class, escape(text))
    }
}

pub fn render_notices(notices: &[Notice]) -> String {
    notices.iter().map(Notice::render).collect()
}

/// Link shown after a successful classification
pub fn recommendations_link() -> &'static str {
    "<p><a href=\"/recommend\">👉 Recommendations for you</a></p>"
}

fn sidebar(ctx: &SessionContext) -> String {
    let account = if ctx.is_authenticated() {
        let name = ctx.user().map(|u| u.display_name()).unwrap_or_default();
        format!(
            "<p>Signed in as <strong>{}</strong></p>\
             <form method=\"post\" action=\"/logout\"><button class=\"secondary\" type=\"submit\">Logout</button></form>",
            escape(name)
        )
    } else {
        "<p><a href=\"/signin\">🔓 Sign in</a></p>".to_string()
    };

    format!(
        r#"<nav>
    <h2>😎 MoodMate</h2>
    <hr>
    <a href="/">Home</a>
    <a href="/text">🖋️ Type your thoughts</a>
    <a href="/audio">🎙️ Speak your thoughts</a>
    <a href="/video">🧑 Express your thoughts</a>
    <a href="/recommend">🏃 Recommendations for you</a>
    <hr>
    <h3>Help</h3>
    <div class="help">
        <p><strong>Home</strong>: Overview of the application.</p>
        <p><strong>Enter Text</strong>: Input your text for classification.</p>
        <p><strong>Upload Audio</strong>: Upload your audio files for analysis.</p>
        <p><strong>Upload Video</strong>: Analyze video content by uploading files.</p>
        <p><strong>Get Recommendations</strong>: Get suggestions based on your input.</p>
    </div>
    <hr>
    {account}
    <footer>Made with ❤️ /RP030<br>v{version} [{git}]</footer>
</nav>"#,
        account = account,
        version = env!("CARGO_PKG_VERSION"),
        git = env!("GIT_HASH"),
    )
}

/// Wrap `body` in the shared page shell
pub fn layout(title: &str, ctx: &SessionContext, body: &str) -> Html<String> {
    Html(format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>{title} · MoodMate</title>
    <style>{style}</style>
</head>
<body>
{sidebar}
<main>
{body}
</main>
</body>
</html>"#,
        title = escape(title),
        style = STYLE,
        sidebar = sidebar(ctx),
        body = body,
    ))
}

/// Full-page response with an explicit status
pub fn page_response(status: StatusCode, title: &str, ctx: &SessionContext, body: &str) -> Response {
    (status, layout(title, ctx, body)).into_response()
}

/// Redirect anonymous sessions to the sign-in page
pub fn require_signed_in(ctx: &SessionContext) -> Result<(), Response> {
    if ctx.is_authenticated() {
        Ok(())
    } else {
        Err(Redirect::to("/signin").into_response())
    }
}

/// Read the file in multipart field `field`
///
/// Returns `None` when the field is missing or the browser sent it without
/// choosing a file (empty file name).
pub async fn read_upload(multipart: &mut Multipart, field: &str) -> UiResult<Option<(String, Bytes)>> {
    while let Some(part) = multipart.next_field().await? {
        if part.name() != Some(field) {
            continue;
        }
        let file_name = part.file_name().unwrap_or_default().to_string();
        if file_name.is_empty() {
            return Ok(None);
        }
        let bytes = part.bytes().await?;
        return Ok(Some((file_name, bytes)));
    }
    Ok(None)
}
