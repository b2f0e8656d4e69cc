use axum::extract::{Path, State};
use axum::response::Html;

use badgus_core::authz;
use badgus_database::impls::{applications, badges, teams};
use badgus_utils::permissions::VIEW_BADGETEAM;

use crate::affordance::team_affordances;
use crate::error::WebError;
use crate::extract::Viewer;
use crate::forms::require;
use crate::state::AppState;
use crate::teams::load_team;

pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<Html<String>, WebError> {
    let db = &state.data.db;
    let team = load_team(db, &slug).await?;

    let standing = authz::team_standing(db, team.id, viewer.user()).await?;
    let perms = authz::team_permissions_for(viewer.user(), standing);
    require(&perms, VIEW_BADGETEAM)?;

    let members = teams::list_members(db, team.id).await?;
    let badge_list = badges::list_badges_for_team(db, team.id).await?;
    let existing_application = match viewer.user() {
        Some(user) => applications::find_application_for(db, team.id, user.id).await?,
        None => None,
    };
    let links = team_affordances(&team.slug, standing, &perms, existing_application.as_ref());

    let mut ctx = state.context(&viewer);
    ctx.insert("team", &team);
    ctx.insert("members", &members);
    ctx.insert("badges", &badge_list);
    ctx.insert("links", &links);
    state.render("teams/detail.html", &ctx)
}
