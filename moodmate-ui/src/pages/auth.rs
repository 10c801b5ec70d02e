//! Sign in, sign up and logout

use axum::{
    extract::{Extension, State},
    http::{header, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tracing::{info, warn};

use moodmate_common::api::{SigninForm, SignupForm};
use moodmate_common::SessionContext;

use crate::error::failure_status;
use crate::sessions::{expired_session_cookie, SessionId};
use crate::AppState;

use super::{escape, page_response, render_notices, Notice};

/// Sign-up form as posted by the browser
///
/// Numbers arrive as text; they are parsed in [`SignupInput::into_form`] so a
/// bad value re-renders the page instead of failing extraction.
#[derive(Debug, Default, Deserialize)]
pub struct SignupInput {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub age: String,
    #[serde(default)]
    pub sex: String,
    #[serde(default)]
    pub location: String,
    #[serde(default)]
    pub relationship_status: String,
    #[serde(default)]
    pub designation: String,
    #[serde(default)]
    pub salary: String,
    #[serde(default)]
    pub likes: String,
    #[serde(default)]
    pub dislikes: String,
    #[serde(default)]
    pub strengths: String,
    #[serde(default)]
    pub weaknesses: String,
}

impl SignupInput {
    pub fn into_form(self) -> moodmate_common::Result<SignupForm> {
        let age = self
            .age
            .trim()
            .parse::<u32>()
            .map_err(|_| moodmate_common::Error::InvalidInput("age must be a whole number".into()))?;
        let salary = self
            .salary
            .trim()
            .parse::<u64>()
            .map_err(|_| {
                moodmate_common::Error::InvalidInput("salary must be a non-negative whole number".into())
            })?;

        let form = SignupForm {
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            password: self.password,
            age,
            sex: self.sex,
            location: self.location.trim().to_string(),
            relationship_status: self.relationship_status,
            designation: self.designation.trim().to_string(),
            salary,
            likes: self.likes,
            dislikes: self.dislikes,
            strengths: self.strengths,
            weaknesses: self.weaknesses,
        };
        form.validate()?;
        Ok(form)
    }
}

fn options(values: &[&str]) -> String {
    values
        .iter()
        .map(|v| format!("<option value=\"{0}\">{0}</option>", escape(v)))
        .collect()
}

fn render(ctx: &SessionContext, status: StatusCode, signin: &[Notice], signup: &[Notice]) -> Response {
    let body = format!(
        r#"<h1>🔓 Sign in</h1>
<div class="columns">
<section>
    <h2>Sign in</h2>
    {signin_notices}
    <form method="post" action="/signin">
        <label>Email <input type="email" name="email" required></label>
        <label>Password <input type="password" name="password" required></label>
        <input type="submit" value="Sign in">
    </form>
</section>
<section>
    <h2>Register</h2>
    {signup_notices}
    <form method="post" action="/signup">
        <label>Name <input type="text" name="name" required></label>
        <label>Email <input type="email" name="email" required></label>
        <label>Password <input type="password" name="password" required></label>
        <label>Age <input type="number" name="age" min="1" value="18" required></label>
        <label>Sex <select name="sex">{sex}</select></label>
        <label>Location <input type="text" name="location"></label>
        <label>Relationship status <select name="relationship_status">{relationship}</select></label>
        <label>Designation <input type="text" name="designation"></label>
        <label>Salary <input type="number" name="salary" min="0" value="0" required></label>
        <label>Likes <textarea name="likes"></textarea></label>
        <label>Dislikes <textarea name="dislikes"></textarea></label>
        <label>Strengths <textarea name="strengths"></textarea></label>
        <label>Weaknesses <textarea name="weaknesses"></textarea></label>
        <input type="submit" value="Sign up">
    </form>
</section>
</div>"#,
        signin_notices = render_notices(signin),
        signup_notices = render_notices(signup),
        sex = options(&SignupForm::SEX_OPTIONS),
        relationship = options(&SignupForm::RELATIONSHIP_OPTIONS),
    );
    page_response(status, "Sign in", ctx, &body)
}

pub async fn signin_page(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Response {
    let ctx = state.sessions.context(session).await;
    if ctx.is_authenticated() {
        return Redirect::to("/").into_response();
    }
    render(&ctx, StatusCode::OK, &[], &[])
}

pub async fn signin(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(form): Form<SigninForm>,
) -> Response {
    match state.backend.sign_in(&form).await {
        Ok(profile) => {
            state.sessions.update(session, |ctx| ctx.sign_in(profile)).await;
            Redirect::to("/").into_response()
        }
        Err(e) => {
            let ctx = state.sessions.context(session).await;
            render(&ctx, failure_status(&e), &[Notice::Error(e.user_message())], &[])
        }
    }
}

pub async fn signup(
    State(state): State<AppState>,
    Extension(session): Extension<SessionId>,
    Form(input): Form<SignupInput>,
) -> Response {
    let form = match input.into_form() {
        Ok(form) => form,
        Err(e) => {
            let ctx = state.sessions.context(session).await;
            let message = match e {
                moodmate_common::Error::InvalidInput(msg) => msg,
                other => other.to_string(),
            };
            return render(&ctx, StatusCode::BAD_REQUEST, &[], &[Notice::Error(message)]);
        }
    };

    match state.backend.sign_up(&form).await {
        Ok(profile) => {
            info!(email = %profile.email, "User registered");
            state.sessions.update(session, |ctx| ctx.sign_in(profile)).await;
            Redirect::to("/").into_response()
        }
        Err(e) => {
            let ctx = state.sessions.context(session).await;
            render(&ctx, failure_status(&e), &[], &[Notice::Error(e.user_message())])
        }
    }
}

/// End the session here and on the backend
pub async fn logout(State(state): State<AppState>, Extension(session): Extension<SessionId>) -> Response {
    if let Err(e) = state.backend.clear_session().await {
        warn!(error = %e, "Backend session not cleared on logout");
    }
    state.sessions.end(session).await;
    info!(session = %session.0, "Logged out");

    (
        [(header::SET_COOKIE, expired_session_cookie())],
        Redirect::to("/signin"),
    )
        .into_response()
}
