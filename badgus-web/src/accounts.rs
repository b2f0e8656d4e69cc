//! Registration, login and logout backed by server-side sessions.

use axum::Form;
use axum::extract::{Query, State};
use axum::http::{HeaderMap, header};
use axum::response::{Html, IntoResponse, Redirect, Response};
use cookie::{Cookie, SameSite};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use badgus_core::ValidationError;
use badgus_core::validation::{clean_password, clean_username};
use badgus_database::impls::accounts;
use badgus_database::model::user::{NewUser, User};
use badgus_utils::formatting::local_redirect_target;

use crate::error::WebError;
use crate::extract::Viewer;
use crate::forms::{FormErrors, rejected};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "badgus_session";

const DEFAULT_LANDING: &str = "/teams/";

#[derive(Debug, Default, Deserialize)]
pub struct NextQuery {
    pub next: Option<String>,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct LoginForm {
    #[serde(default)]
    pub username: String,
    #[serde(default, skip_serializing)]
    pub password: String,
    #[serde(default)]
    pub next: String,
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct RegisterForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing)]
    pub password: String,
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .build()
}

/// Session token sent by the browser, if any.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(Cookie::split_parse)
        .filter_map(Result::ok)
        .find(|cookie| cookie.name() == SESSION_COOKIE && !cookie.value().is_empty())
        .map(|cookie| cookie.value().to_owned())
}

/// Redirect to `landing` while replacing the session cookie.
fn redirect_with_cookie(cookie: Cookie<'static>, landing: &str) -> Response {
    (
        [(header::SET_COOKIE, cookie.to_string())],
        Redirect::to(landing),
    )
        .into_response()
}

/// Open a session for `user` and send them on.
async fn start_session(state: &AppState, user: &User, landing: &str) -> Result<Response, WebError> {
    let token = accounts::create_session(&state.data.db, user.id, state.data.settings.session_ttl).await?;
    info!(user_id = user.id, "user logged in");
    Ok(redirect_with_cookie(session_cookie(token), landing))
}

fn render_login(
    state: &AppState,
    viewer: &Viewer,
    form: &LoginForm,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let mut ctx = state.context(viewer);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    state.render("accounts/login.html", &ctx)
}

pub async fn login_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<NextQuery>,
) -> Result<Html<String>, WebError> {
    let form = LoginForm {
        next: query.next.unwrap_or_default(),
        ..LoginForm::default()
    };
    render_login(&state, &viewer, &form, &FormErrors::default())
}

pub async fn login(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<LoginForm>,
) -> Result<Response, WebError> {
    let user = accounts::authenticate(&state.data.db, form.username.trim(), &form.password).await?;
    let Some(user) = user else {
        debug!(username = %form.username, "rejected login");
        let errors = FormErrors::from(ValidationError::InvalidCredentials);
        return Ok(rejected(render_login(&state, &viewer, &form, &errors)?));
    };

    let landing = local_redirect_target(Some(form.next.as_str())).unwrap_or(DEFAULT_LANDING);
    start_session(&state, &user, landing).await
}

pub async fn logout(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, WebError> {
    if let Some(token) = session_token(&headers) {
        accounts::delete_session(&state.data.db, &token).await?;
    }
    let mut cookie = session_cookie(String::new());
    cookie.make_removal();
    Ok(redirect_with_cookie(cookie, DEFAULT_LANDING))
}

fn render_register(
    state: &AppState,
    viewer: &Viewer,
    form: &RegisterForm,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let mut ctx = state.context(viewer);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    state.render("accounts/register.html", &ctx)
}

pub async fn register_form(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Response, WebError> {
    if let Some(user) = viewer.user() {
        return Ok(Redirect::to(&user.profile_url()).into_response());
    }
    Ok(render_register(&state, &viewer, &RegisterForm::default(), &FormErrors::default())?
        .into_response())
}

pub async fn register(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<RegisterForm>,
) -> Result<Response, WebError> {
    let mut errors = FormErrors::default();
    let username = errors.check(clean_username(&form.username));
    let password = errors.check(clean_password(&form.password));

    let (Some(username), Some(password)) = (username, password) else {
        return Ok(rejected(render_register(&state, &viewer, &form, &errors)?));
    };

    let new_user = NewUser::regular(&username, form.email.trim(), password);
    let Some(user) = accounts::create_user(&state.data.db, new_user).await? else {
        let errors = FormErrors::from(ValidationError::UsernameTaken);
        return Ok(rejected(render_register(&state, &viewer, &form, &errors)?));
    };

    start_session(&state, &user, &user.profile_url()).await
}

#[cfg(test)]
mod tests {
    use axum::http::{HeaderMap, HeaderValue, header};
    use cookie::SameSite;

    use super::{SESSION_COOKIE, session_cookie, session_token};

    #[test]
    fn session_cookie_is_scoped_to_the_site() {
        let cookie = session_cookie("abc".to_owned());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.value(), "abc");
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
    }

    #[test]
    fn session_token_is_read_from_any_cookie_header() {
        let mut headers = HeaderMap::new();
        headers.append(header::COOKIE, HeaderValue::from_static("theme=dark"));
        assert_eq!(session_token(&headers), None);

        headers.append(
            header::COOKIE,
            HeaderValue::from_static("lang=en; badgus_session=abc123"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn blank_session_cookie_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(header::COOKIE, HeaderValue::from_static("badgus_session="));
        assert_eq!(session_token(&headers), None);
    }
}
