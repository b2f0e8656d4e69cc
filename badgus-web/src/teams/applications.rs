use std::collections::HashMap;

use axum::Form;
use axum::extract::{Path, Query, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};
use tracing::info;

use badgus_core::ValidationError;
use badgus_core::authz;
use badgus_core::validation::clean_comment;
use badgus_database::impls::{accounts, applications, teams};
use badgus_database::model::application::TeamApplication;
use badgus_database::model::team::BadgeTeam;
use badgus_utils::permissions::{
    APPROVE_APPLICATION, DELETE_APPLICATION, LIST_APPLICATION, VIEW_APPLICATION,
};

use crate::affordance::can_approve;
use crate::error::WebError;
use crate::extract::Viewer;
use crate::forms::{FormErrors, rejected, require};
use crate::state::AppState;
use crate::teams::load_team;

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct ApplicationForm {
    #[serde(default)]
    pub comment: String,
}

async fn load_application(
    state: &AppState,
    team: &BadgeTeam,
    application_id: i64,
) -> Result<TeamApplication, WebError> {
    applications::get_application(&state.data.db, team.id, application_id)
        .await?
        .ok_or(WebError::NotFound)
}

/// Pending applications, or approved ones with `?approved`.
pub async fn list(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Query(query): Query<HashMap<String, String>>,
) -> Result<Html<String>, WebError> {
    let db = &state.data.db;
    let team = load_team(db, &slug).await?;
    let perms = authz::team_permissions(db, &team, viewer.user()).await?;
    require(&perms, LIST_APPLICATION)?;

    let approved = query.contains_key("approved");
    let rows = applications::list_applications(db, team.id, approved).await?;

    let mut ctx = state.context(&viewer);
    ctx.insert("team", &team);
    ctx.insert("applications", &rows);
    ctx.insert("approved", &approved);
    state.render("applications/list.html", &ctx)
}

fn render_form(
    state: &AppState,
    viewer: &Viewer,
    team: &BadgeTeam,
    form: &ApplicationForm,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let mut ctx = state.context(viewer);
    ctx.insert("team", team);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    state.render("applications/form.html", &ctx)
}

/// Members are refused; a pending application sends the user back to it.
async fn precheck(
    state: &AppState,
    team: &BadgeTeam,
    user_id: i64,
) -> Result<Option<Result<String, ValidationError>>, WebError> {
    let db = &state.data.db;
    if teams::has_member(db, team.id, user_id).await? {
        return Ok(Some(Err(ValidationError::AlreadyMember)));
    }
    let existing = applications::find_application_for(db, team.id, user_id).await?;
    Ok(existing
        .filter(TeamApplication::is_pending)
        .map(|application| Ok(application.url(&team.slug))))
}

pub async fn new_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<Response, WebError> {
    let user = viewer.require_login()?;
    let team = load_team(&state.data.db, &slug).await?;

    let errors = match precheck(&state, &team, user.id).await? {
        Some(Ok(existing_url)) => return Ok(Redirect::to(&existing_url).into_response()),
        Some(Err(err)) => FormErrors::from(err),
        None => FormErrors::default(),
    };
    Ok(render_form(&state, &viewer, &team, &ApplicationForm::default(), &errors)?.into_response())
}

pub async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    Form(form): Form<ApplicationForm>,
) -> Result<Response, WebError> {
    let user = viewer.require_login()?;
    let team = load_team(&state.data.db, &slug).await?;

    match precheck(&state, &team, user.id).await? {
        Some(Ok(existing_url)) => return Ok(Redirect::to(&existing_url).into_response()),
        Some(Err(err)) => {
            let errors = FormErrors::from(err);
            return Ok(rejected(render_form(&state, &viewer, &team, &form, &errors)?));
        }
        None => {}
    }

    let comment = match clean_comment(&form.comment) {
        Ok(comment) => comment,
        Err(err) => {
            let errors = FormErrors::from(err);
            return Ok(rejected(render_form(&state, &viewer, &team, &form, &errors)?));
        }
    };

    let application =
        applications::create_application(&state.data.db, team.id, user.id, &comment).await?;
    Ok(Redirect::to(&application.url(&team.slug)).into_response())
}

pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, application_id)): Path<(String, i64)>,
) -> Result<Html<String>, WebError> {
    viewer.require_login()?;
    let db = &state.data.db;
    let team = load_team(db, &slug).await?;
    let application = load_application(&state, &team, application_id).await?;
    let perms = authz::application_permissions(db, &team, &application, viewer.user()).await?;
    require(&perms, VIEW_APPLICATION)?;

    let creator = match application.creator_id {
        Some(id) => accounts::get_user(db, id).await?,
        None => None,
    };
    let approver = match application.approver_id {
        Some(id) => accounts::get_user(db, id).await?,
        None => None,
    };

    let mut ctx = state.context(&viewer);
    ctx.insert("team", &team);
    ctx.insert("application", &application);
    ctx.insert("creator", &creator);
    ctx.insert("approver", &approver);
    ctx.insert("pending", &application.is_pending());
    ctx.insert("can_approve", &can_approve(&application, &perms));
    ctx.insert("can_delete", &perms.contains(DELETE_APPLICATION));
    state.render("applications/detail.html", &ctx)
}

pub async fn delete_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, application_id)): Path<(String, i64)>,
) -> Result<Html<String>, WebError> {
    viewer.require_login()?;
    let db = &state.data.db;
    let team = load_team(db, &slug).await?;
    let application = load_application(&state, &team, application_id).await?;
    let perms = authz::application_permissions(db, &team, &application, viewer.user()).await?;
    require(&perms, DELETE_APPLICATION)?;

    let mut ctx = state.context(&viewer);
    ctx.insert("team", &team);
    ctx.insert("application", &application);
    state.render("applications/delete.html", &ctx)
}

pub async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, application_id)): Path<(String, i64)>,
) -> Result<Redirect, WebError> {
    viewer.require_login()?;
    let db = &state.data.db;
    let team = load_team(db, &slug).await?;
    let application = load_application(&state, &team, application_id).await?;
    let perms = authz::application_permissions(db, &team, &application, viewer.user()).await?;
    require(&perms, DELETE_APPLICATION)?;

    applications::delete_application(db, &application).await?;
    Ok(Redirect::to(&team.url()))
}

pub async fn approve(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((slug, application_id)): Path<(String, i64)>,
) -> Result<Redirect, WebError> {
    let user = viewer.require_login()?;
    let db = &state.data.db;
    let team = load_team(db, &slug).await?;
    let application = load_application(&state, &team, application_id).await?;
    let perms = authz::application_permissions(db, &team, &application, viewer.user()).await?;
    require(&perms, APPROVE_APPLICATION)?;

    if !applications::approve_application(db, &application, user.id).await? {
        info!(application_id, "application already approved; nothing to do");
    }
    Ok(Redirect::to(&application.url(&team.slug)))
}
