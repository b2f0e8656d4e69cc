use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{Html, IntoResponse, Redirect, Response};
use tracing::error;

use badgus_utils::formatting::encode_query_component;

#[derive(Debug, thiserror::Error)]
pub enum WebError {
    #[error("not found")]
    NotFound,
    #[error("permission denied")]
    PermissionDenied,
    #[error("login required")]
    LoginRequired { next: String },
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl From<MultipartError> for WebError {
    fn from(err: MultipartError) -> Self {
        Self::BadRequest(err.body_text())
    }
}

impl WebError {
    pub fn login_url(next: &str) -> String {
        format!("/accounts/login?next={}", encode_query_component(next))
    }
}

fn error_page(status: StatusCode, message: &str) -> Response {
    let title = status.canonical_reason().unwrap_or("Error");
    let body = format!(
        "<!DOCTYPE html>\n<html><head><meta charset=\"utf-8\"><title>{code} {title}</title></head>\
         <body><h1>{title}</h1><p class=\"error\">{message}</p><p><a href=\"/teams/\">Back to teams</a></p></body></html>",
        code = status.as_u16(),
        message = tera::escape_html(message),
    );
    (status, Html(body)).into_response()
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match self {
            Self::NotFound => error_page(StatusCode::NOT_FOUND, "Nothing matches that address."),
            Self::PermissionDenied => error_page(
                StatusCode::FORBIDDEN,
                "You do not have permission to do that.",
            ),
            Self::LoginRequired { next } => Redirect::to(&Self::login_url(&next)).into_response(),
            Self::BadRequest(message) => error_page(StatusCode::BAD_REQUEST, &message),
            Self::Internal(err) => {
                error!(?err, "request failed");
                error_page(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Something went wrong while handling this request.",
                )
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::{StatusCode, header};
    use axum::response::IntoResponse;
    use rstest::rstest;

    use super::WebError;

    #[rstest]
    #[case::missing(WebError::NotFound, StatusCode::NOT_FOUND)]
    #[case::forbidden(WebError::PermissionDenied, StatusCode::FORBIDDEN)]
    #[case::bad_request(WebError::BadRequest("nope <b>".into()), StatusCode::BAD_REQUEST)]
    #[case::internal(WebError::Internal(anyhow::anyhow!("boom")), StatusCode::INTERNAL_SERVER_ERROR)]
    fn statuses_match_variants(#[case] err: WebError, #[case] status: StatusCode) {
        assert_eq!(err.into_response().status(), status);
    }

    #[test]
    fn login_required_redirects_with_next() {
        let response = WebError::LoginRequired {
            next: "/teams/new?x=1".into(),
        }
        .into_response();
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers()[header::LOCATION],
            "/accounts/login?next=%2Fteams%2Fnew%3Fx%3D1"
        );
    }
}
