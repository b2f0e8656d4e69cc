//! Staff-only listings of teams and applications.

use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;

use badgus_database::impls::{applications, teams};
use badgus_utils::formatting::truncate_chars;

use crate::error::WebError;
use crate::extract::Viewer;
use crate::state::AppState;

const ADMIN_LIST_LIMIT: u32 = 200;
const COMMENT_PREVIEW_CHARS: usize = 80;

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

fn require_staff(viewer: &Viewer) -> Result<(), WebError> {
    viewer.require_login()?;
    if viewer.is_staff() {
        Ok(())
    } else {
        Err(WebError::PermissionDenied)
    }
}

pub async fn teams(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, WebError> {
    require_staff(&viewer)?;
    let rows = teams::search_teams_admin(&state.data.db, query.q.as_deref(), ADMIN_LIST_LIMIT).await?;

    let mut ctx = state.context(&viewer);
    ctx.insert("teams", &rows);
    ctx.insert("q", query.q.as_deref().unwrap_or_default());
    state.render("admin/teams.html", &ctx)
}

pub async fn applications(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<SearchQuery>,
) -> Result<Html<String>, WebError> {
    require_staff(&viewer)?;
    let mut rows =
        applications::search_applications_admin(&state.data.db, query.q.as_deref(), ADMIN_LIST_LIMIT)
            .await?;
    for row in &mut rows {
        row.comment = truncate_chars(&row.comment, COMMENT_PREVIEW_CHARS);
    }

    let mut ctx = state.context(&viewer);
    ctx.insert("applications", &rows);
    ctx.insert("q", query.q.as_deref().unwrap_or_default());
    state.render("admin/applications.html", &ctx)
}

#[cfg(test)]
mod tests {
    use badgus_database::model::user::User;

    use super::require_staff;
    use crate::error::WebError;
    use crate::extract::Viewer;

    fn viewer(is_staff: bool) -> Viewer {
        Viewer {
            user: Some(User {
                id: 1,
                username: "alice".to_owned(),
                email: String::new(),
                is_staff,
                is_superuser: false,
                is_active: true,
                date_joined: 0,
            }),
            path: "/admin/teams".to_owned(),
        }
    }

    #[test]
    fn only_staff_pass() {
        assert!(require_staff(&viewer(true)).is_ok());
        assert!(matches!(
            require_staff(&viewer(false)),
            Err(WebError::PermissionDenied)
        ));
        assert!(matches!(
            require_staff(&Viewer::anonymous("/admin/teams")),
            Err(WebError::LoginRequired { .. })
        ));
    }
}
