use axum::extract::{Path, State};
use axum::response::{Html, Redirect};
use tracing::info;

use badgus_core::authz;
use badgus_database::impls::{accounts, teams};
use badgus_database::model::team::{BadgeTeam, TeamMember};
use badgus_database::model::user::User;
use badgus_utils::permissions::{DEMOTE_MEMBER, PROMOTE_MEMBER, REMOVE_MEMBER};

use crate::error::WebError;
use crate::extract::Viewer;
use crate::forms::require;
use crate::state::AppState;
use crate::teams::load_team;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum MemberAction {
    Remove,
    Promote,
    Demote,
}

impl MemberAction {
    fn permission(self) -> &'static str {
        match self {
            Self::Remove => REMOVE_MEMBER,
            Self::Promote => PROMOTE_MEMBER,
            Self::Demote => DEMOTE_MEMBER,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::Remove => "remove",
            Self::Promote => "promote",
            Self::Demote => "demote",
        }
    }

    fn path_segment(self) -> &'static str {
        match self {
            Self::Remove => "delete",
            Self::Promote => "promote",
            Self::Demote => "demote",
        }
    }
}

struct Target {
    team: BadgeTeam,
    user: User,
    member: TeamMember,
}

/// Resolve team, user and membership, then check `action` is allowed.
async fn load_target(
    state: &AppState,
    viewer: &Viewer,
    slug: &str,
    username: &str,
    action: MemberAction,
) -> Result<Target, WebError> {
    viewer.require_login()?;
    let db = &state.data.db;
    let team = load_team(db, slug).await?;
    let user = accounts::get_user_by_username(db, username)
        .await?
        .ok_or(WebError::NotFound)?;
    let member = teams::get_member(db, team.id, user.id)
        .await?
        .ok_or(WebError::NotFound)?;

    let perms = authz::team_permissions(db, &team, viewer.user()).await?;
    require(&perms, action.permission())?;
    Ok(Target { team, user, member })
}

async fn confirm(
    state: AppState,
    viewer: Viewer,
    slug: String,
    username: String,
    action: MemberAction,
) -> Result<Html<String>, WebError> {
    let target = load_target(&state, &viewer, &slug, &username, action).await?;

    let mut ctx = state.context(&viewer);
    ctx.insert("team", &target.team);
    ctx.insert("member_user", &target.user);
    ctx.insert("member", &target.member);
    ctx.insert("action", action.name());
    ctx.insert(
        "action_url",
        &format!(
            "{}/members/{}/{}",
            target.team.url(),
            target.user.username,
            action.path_segment()
        ),
    );
    state.render("teams/member_confirm.html", &ctx)
}

pub async fn remove_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, username)): Path<(String, String)>,
) -> Result<Html<String>, WebError> {
    confirm(state, viewer, slug, username, MemberAction::Remove).await
}

/// Revoke membership and land on the former member's profile.
pub async fn remove(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, username)): Path<(String, String)>,
) -> Result<Redirect, WebError> {
    let target = load_target(&state, &viewer, &slug, &username, MemberAction::Remove).await?;
    teams::remove_member(&state.data.db, target.team.id, target.user.id).await?;
    Ok(Redirect::to(&target.user.profile_url()))
}

pub async fn promote_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, username)): Path<(String, String)>,
) -> Result<Html<String>, WebError> {
    confirm(state, viewer, slug, username, MemberAction::Promote).await
}

pub async fn promote(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, username)): Path<(String, String)>,
) -> Result<Redirect, WebError> {
    set_owner(state, viewer, slug, username, MemberAction::Promote).await
}

pub async fn demote_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, username)): Path<(String, String)>,
) -> Result<Html<String>, WebError> {
    confirm(state, viewer, slug, username, MemberAction::Demote).await
}

pub async fn demote(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, username)): Path<(String, String)>,
) -> Result<Redirect, WebError> {
    set_owner(state, viewer, slug, username, MemberAction::Demote).await
}

async fn set_owner(
    state: AppState,
    viewer: Viewer,
    slug: String,
    username: String,
    action: MemberAction,
) -> Result<Redirect, WebError> {
    let target = load_target(&state, &viewer, &slug, &username, action).await?;
    let is_owner = action == MemberAction::Promote;
    teams::set_member_owner(&state.data.db, target.team.id, target.user.id, is_owner).await?;

    info!(
        team_id = target.team.id,
        user_id = target.user.id,
        is_owner,
        "member ownership changed"
    );
    Ok(Redirect::to(&target.team.url()))
}
