//! HTTP surface: router, extractors, handlers and templates.

pub mod accounts;
pub mod admin;
pub mod affordance;
pub mod badges;
pub mod error;
pub mod extract;
pub mod forms;
pub mod profiles;
pub mod render;
pub mod state;
pub mod teams;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::response::Redirect;
use axum::routing::{get, post};
use tower_http::services::ServeDir;

pub use error::WebError;
pub use state::AppState;

/// Largest accepted request body; uploads are scaled down after decoding.
pub const MAX_BODY_BYTES: usize = 8 * 1024 * 1024;

pub fn router(state: AppState) -> Router {
    let settings = state.data.settings.clone();

    let mut router = Router::new()
        .route("/", get(|| async { Redirect::to("/teams/") }))
        .route("/teams/", get(teams::list::list))
        .route("/teams/new", get(teams::edit::new_form).post(teams::edit::create))
        .route("/teams/{slug}", get(teams::detail::detail))
        .route(
            "/teams/{slug}/edit",
            get(teams::edit::edit_form).post(teams::edit::update),
        )
        .route(
            "/teams/{slug}/delete",
            get(teams::edit::delete_confirm).post(teams::edit::delete),
        )
        .route("/teams/{slug}/applications/", get(teams::applications::list))
        .route(
            "/teams/{slug}/applications/new",
            get(teams::applications::new_form).post(teams::applications::create),
        )
        .route(
            "/teams/{slug}/applications/{id}",
            get(teams::applications::detail),
        )
        .route(
            "/teams/{slug}/applications/{id}/delete",
            get(teams::applications::delete_confirm).post(teams::applications::delete),
        )
        .route(
            "/teams/{slug}/applications/{id}/approve",
            post(teams::applications::approve),
        )
        .route(
            "/teams/{slug}/members/{username}/delete",
            get(teams::members::remove_confirm).post(teams::members::remove),
        )
        .route(
            "/teams/{slug}/members/{username}/promote",
            get(teams::members::promote_confirm).post(teams::members::promote),
        )
        .route(
            "/teams/{slug}/members/{username}/demote",
            get(teams::members::demote_confirm).post(teams::members::demote),
        )
        .route("/profiles/{username}", get(profiles::detail))
        .route(
            "/profiles/{username}/edit",
            get(profiles::edit_form).post(profiles::update),
        )
        .route(
            "/profiles/{username}/username",
            get(profiles::username_form).post(profiles::change_username),
        )
        .route(
            "/accounts/register",
            get(accounts::register_form).post(accounts::register),
        )
        .route(
            "/accounts/login",
            get(accounts::login_form).post(accounts::login),
        )
        .route("/accounts/logout", post(accounts::logout))
        .route("/badges/new", get(badges::new_form).post(badges::create))
        .route("/badges/{slug}", get(badges::detail))
        .route("/badges/{slug}/awards", post(badges::award))
        .route("/badges/{slug}/nominations", post(badges::nominate))
        .route(
            "/badges/{slug}/nominations/{id}/approve",
            post(badges::approve_nomination),
        )
        .route(
            "/badges/{slug}/nominations/{id}/reject",
            post(badges::reject_nomination),
        )
        .route("/admin/teams", get(admin::teams))
        .route("/admin/applications", get(admin::applications));

    let uploads_mount = settings.uploads_url.trim_end_matches('/');
    if uploads_mount.starts_with('/') && uploads_mount.len() > 1 {
        router = router.nest_service(uploads_mount, ServeDir::new(&settings.uploads_root));
    }

    router
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(state)
}
