use axum::extract::{Query, State};
use axum::response::Html;
use serde::Deserialize;

use badgus_database::impls::teams;
use badgus_utils::pagination::{clamp_page, page_links, page_offset, total_pages};
use badgus_utils::permissions::{ADD_BADGETEAM, LIST_BADGETEAM};

use crate::error::WebError;
use crate::extract::Viewer;
use crate::forms::require_site;
use crate::state::AppState;
use crate::teams::TEAMS_PAGE_SIZE;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub page: Option<usize>,
}

pub async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Query(query): Query<ListQuery>,
) -> Result<Html<String>, WebError> {
    let perms = require_site(viewer.user(), LIST_BADGETEAM)?;
    let db = &state.data.db;

    let total = total_pages(teams::count_teams(db).await?, TEAMS_PAGE_SIZE);
    let page = clamp_page(query.page, total);
    let rows = teams::list_teams(db, page_offset(page, TEAMS_PAGE_SIZE), TEAMS_PAGE_SIZE).await?;

    let mut ctx = state.context(&viewer);
    ctx.insert("teams", &rows);
    ctx.insert("pages", &page_links(page, total));
    ctx.insert("can_add", &perms.contains(ADD_BADGETEAM));
    state.render("teams/list.html", &ctx)
}
