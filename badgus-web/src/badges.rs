//! Badge creation, awarding and nominations.

use axum::Form;
use axum::extract::{Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use badgus_core::ValidationError;
use badgus_core::authz;
use badgus_core::validation::clean_badge_title;
use badgus_database::impls::{accounts, badges, profiles, teams};
use badgus_database::model::badge::{AwardOutcome, Badge, NewBadge, Nomination};
use badgus_database::model::team::{BadgeTeam, Membership};
use badgus_database::model::user::User;
use badgus_utils::permissions::{
    ADD_BADGE, APPROVE_NOMINATION, AWARD_BADGE, NOMINATE_BADGE, PermissionSet, REJECT_NOMINATION,
};

use crate::error::WebError;
use crate::extract::Viewer;
use crate::forms::{FormErrors, optional_text, rejected, require, require_site};
use crate::state::AppState;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct BadgeForm {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    /// Slug of the owning team; blank for none.
    #[serde(default)]
    pub team: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct AwardForm {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub description: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct NominateForm {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RejectForm {
    #[serde(default)]
    pub reason: String,
}

#[derive(Debug, Serialize)]
struct BadgeLinks {
    award: bool,
    nominate: bool,
    approve_nomination: bool,
    reject_nomination: bool,
}

impl BadgeLinks {
    fn new(badge: &Badge, perms: &PermissionSet) -> Self {
        Self {
            award: perms.contains(AWARD_BADGE),
            nominate: badge.nominations_accepted && perms.contains(NOMINATE_BADGE),
            approve_nomination: perms.contains(APPROVE_NOMINATION),
            reject_nomination: perms.contains(REJECT_NOMINATION),
        }
    }
}

async fn load_badge(state: &AppState, slug: &str) -> Result<Badge, WebError> {
    badges::get_badge_by_slug(&state.data.db, slug)
        .await?
        .ok_or(WebError::NotFound)
}

async fn load_nomination(
    state: &AppState,
    badge: &Badge,
    nomination_id: i64,
) -> Result<Nomination, WebError> {
    badges::get_nomination(&state.data.db, badge.id, nomination_id)
        .await?
        .ok_or(WebError::NotFound)
}

/// Resolve a username typed into a form.
async fn find_recipient(state: &AppState, username: &str) -> Result<Result<User, ValidationError>, WebError> {
    let username = username.trim();
    if username.is_empty() {
        return Ok(Err(ValidationError::Required { field: "username" }));
    }
    let user = accounts::get_user_by_username(&state.data.db, username).await?;
    Ok(user.ok_or_else(|| ValidationError::UnknownUser(username.to_owned())))
}

fn render_form(
    state: &AppState,
    viewer: &Viewer,
    memberships: &[Membership],
    form: &BadgeForm,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let mut ctx = state.context(viewer);
    ctx.insert("teams", memberships);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    state.render("badges/form.html", &ctx)
}

pub async fn new_form(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Html<String>, WebError> {
    let user = viewer.require_login()?;
    require_site(viewer.user(), ADD_BADGE)?;
    let memberships = profiles::list_memberships(&state.data.db, user.id).await?;
    render_form(&state, &viewer, &memberships, &BadgeForm::default(), &FormErrors::default())
}

/// The team named by the form, if the creator may attach badges to it.
async fn resolve_team(
    state: &AppState,
    user: &User,
    slug: &str,
) -> Result<Result<Option<BadgeTeam>, ValidationError>, WebError> {
    let Some(slug) = optional_text(slug) else {
        return Ok(Ok(None));
    };
    let db = &state.data.db;
    let Some(team) = teams::get_team_by_slug(db, slug).await? else {
        return Ok(Err(ValidationError::NotTeamMember));
    };
    if !user.is_superuser && !teams::has_member(db, team.id, user.id).await? {
        return Ok(Err(ValidationError::NotTeamMember));
    }
    Ok(Ok(Some(team)))
}

pub async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    Form(form): Form<BadgeForm>,
) -> Result<Response, WebError> {
    let user = viewer.require_login()?;
    require_site(viewer.user(), ADD_BADGE)?;
    let db = &state.data.db;

    let mut errors = FormErrors::default();
    let title = errors.check(clean_badge_title(&form.title));
    let team = errors.check(resolve_team(&state, user, &form.team).await?);

    let (Some(title), Some(team)) = (title, team) else {
        let memberships = profiles::list_memberships(db, user.id).await?;
        return Ok(rejected(render_form(&state, &viewer, &memberships, &form, &errors)?));
    };

    let input = NewBadge {
        title: &title,
        description: form.description.trim(),
        creator_id: user.id,
        team_id: team.as_ref().map(|team| team.id),
    };
    let Some(badge) = badges::create_badge(db, input).await? else {
        let memberships = profiles::list_memberships(db, user.id).await?;
        let errors = FormErrors::from(ValidationError::BadgeTitleTaken);
        return Ok(rejected(render_form(&state, &viewer, &memberships, &form, &errors)?));
    };

    Ok(Redirect::to(&badge.url()).into_response())
}

async fn render_detail(
    state: &AppState,
    viewer: &Viewer,
    badge: &Badge,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let db = &state.data.db;
    let perms = authz::badge_permissions(db, badge, viewer.user()).await?;
    let team = match badge.team_id {
        Some(team_id) => teams::get_team(db, team_id).await?,
        None => None,
    };
    let creator = match badge.creator_id {
        Some(id) => accounts::get_user(db, id).await?,
        None => None,
    };
    let awards = badges::list_awards_for_badge(db, badge.id).await?;
    let nominations = badges::list_nominations_for_badge(db, badge.id).await?;

    let mut ctx = state.context(viewer);
    ctx.insert("badge", badge);
    ctx.insert("team", &team);
    ctx.insert("creator", &creator);
    ctx.insert("awards", &awards);
    ctx.insert("nominations", &nominations);
    ctx.insert("links", &BadgeLinks::new(badge, &perms));
    ctx.insert("errors", errors);
    state.render("badges/detail.html", &ctx)
}

pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<Html<String>, WebError> {
    let badge = load_badge(&state, &slug).await?;
    render_detail(&state, &viewer, &badge, &FormErrors::default()).await
}

pub async fn award(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Form(form): Form<AwardForm>,
) -> Result<Response, WebError> {
    let awarder = viewer.require_login()?;
    let badge = load_badge(&state, &slug).await?;
    let perms = authz::badge_permissions(&state.data.db, &badge, viewer.user()).await?;
    require(&perms, AWARD_BADGE)?;

    let recipient = match find_recipient(&state, &form.username).await? {
        Ok(user) => user,
        Err(err) => {
            let errors = FormErrors::from(err);
            return Ok(rejected(render_detail(&state, &viewer, &badge, &errors).await?));
        }
    };

    let outcome = badges::award_badge(
        &state.data.db,
        &badge,
        recipient.id,
        Some(awarder.id),
        form.description.trim(),
    )
    .await?;
    if outcome == AwardOutcome::AlreadyAwarded {
        let errors = FormErrors::from(ValidationError::AlreadyAwarded);
        return Ok(rejected(render_detail(&state, &viewer, &badge, &errors).await?));
    }
    Ok(Redirect::to(&badge.url()).into_response())
}

pub async fn nominate(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Form(form): Form<NominateForm>,
) -> Result<Response, WebError> {
    let nominator = viewer.require_login()?;
    let badge = load_badge(&state, &slug).await?;
    let perms = authz::badge_permissions(&state.data.db, &badge, viewer.user()).await?;
    require(&perms, NOMINATE_BADGE)?;

    let nominee = match find_recipient(&state, &form.username).await? {
        Ok(user) => user,
        Err(err) => {
            let errors = FormErrors::from(err);
            return Ok(rejected(render_detail(&state, &viewer, &badge, &errors).await?));
        }
    };

    if badges::create_nomination(&state.data.db, &badge, nominee.id, nominator.id)
        .await?
        .is_none()
    {
        let errors = FormErrors::from(ValidationError::NominationsClosed);
        return Ok(rejected(render_detail(&state, &viewer, &badge, &errors).await?));
    }
    Ok(Redirect::to(&badge.url()).into_response())
}

pub async fn approve_nomination(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, nomination_id)): Path<(String, i64)>,
) -> Result<Redirect, WebError> {
    let approver = viewer.require_login()?;
    let badge = load_badge(&state, &slug).await?;
    let perms = authz::badge_permissions(&state.data.db, &badge, viewer.user()).await?;
    require(&perms, APPROVE_NOMINATION)?;
    let nomination = load_nomination(&state, &badge, nomination_id).await?;

    match badges::approve_nomination(&state.data.db, &badge, &nomination, approver.id).await? {
        Some(AwardOutcome::AlreadyAwarded) => {
            info!(nomination_id, "nominee already holds this badge; no new award");
        }
        Some(AwardOutcome::Awarded(_)) => {}
        None => info!(nomination_id, "nomination already decided; nothing to do"),
    }
    Ok(Redirect::to(&badge.url()))
}

pub async fn reject_nomination(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, nomination_id)): Path<(String, i64)>,
    Form(form): Form<RejectForm>,
) -> Result<Redirect, WebError> {
    let rejecter = viewer.require_login()?;
    let badge = load_badge(&state, &slug).await?;
    let perms = authz::badge_permissions(&state.data.db, &badge, viewer.user()).await?;
    require(&perms, REJECT_NOMINATION)?;
    let nomination = load_nomination(&state, &badge, nomination_id).await?;

    if !badges::reject_nomination(&state.data.db, &nomination, rejecter.id, &form.reason).await? {
        info!(nomination_id, "nomination already decided; nothing to do");
    }
    Ok(Redirect::to(&badge.url()))
}

#[cfg(test)]
mod tests {
    use badgus_database::model::badge::Badge;
    use badgus_utils::permissions::{AWARD_BADGE, NOMINATE_BADGE, PermissionSet};

    use super::BadgeLinks;

    fn badge(nominations_accepted: bool) -> Badge {
        Badge {
            id: 1,
            title: "Helper".to_owned(),
            slug: "Helper".to_owned(),
            description: String::new(),
            image: None,
            creator_id: None,
            team_id: Some(1),
            is_unique: false,
            nominations_accepted,
            nominations_autoapproved: false,
            created_at: 0,
            modified_at: 0,
        }
    }

    #[test]
    fn nominate_link_needs_open_nominations() {
        let perms = PermissionSet::from_codenames(&[AWARD_BADGE, NOMINATE_BADGE]);
        let open = BadgeLinks::new(&badge(true), &perms);
        assert!(open.award);
        assert!(open.nominate);
        assert!(!open.approve_nomination);

        let closed = BadgeLinks::new(&badge(false), &perms);
        assert!(!closed.nominate);
    }
}
