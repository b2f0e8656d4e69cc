use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;

use badgus_database::impls::accounts;
use badgus_database::model::user::User;

use crate::accounts::session_token;
use crate::error::WebError;
use crate::state::AppState;

/// The logged-in user, if any, plus the path they requested.
#[derive(Clone, Debug)]
pub struct Viewer {
    pub user: Option<User>,
    pub path: String,
}

/// What templates know about the viewer.
#[derive(Debug, Serialize)]
pub struct ViewerSummary<'a> {
    pub authenticated: bool,
    pub username: Option<&'a str>,
    pub is_staff: bool,
}

impl Viewer {
    pub fn anonymous(path: impl Into<String>) -> Self {
        Self {
            user: None,
            path: path.into(),
        }
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn is_staff(&self) -> bool {
        self.user
            .as_ref()
            .is_some_and(|user| user.is_staff || user.is_superuser)
    }

    /// The logged-in user, or a redirect to the login page.
    pub fn require_login(&self) -> Result<&User, WebError> {
        self.user.as_ref().ok_or_else(|| WebError::LoginRequired {
            next: self.path.clone(),
        })
    }

    pub fn summary(&self) -> ViewerSummary<'_> {
        ViewerSummary {
            authenticated: self.user.is_some(),
            username: self.user.as_ref().map(|user| user.username.as_str()),
            is_staff: self.is_staff(),
        }
    }
}

impl FromRequestParts<AppState> for Viewer {
    type Rejection = WebError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let path = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_owned())
            .unwrap_or_else(|| parts.uri.path().to_owned());

        let user = match session_token(&parts.headers) {
            Some(token) => accounts::user_for_session(&state.data.db, &token).await?,
            None => None,
        };

        Ok(Self { user, path })
    }
}
