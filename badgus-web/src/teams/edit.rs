use axum::extract::{Multipart, Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::Serialize;
use tracing::info;

use badgus_core::ValidationError;
use badgus_core::authz;
use badgus_core::validation::clean_team_name;
use badgus_database::impls::teams;
use badgus_database::model::team::{BadgeTeam, TeamInput};
use badgus_utils::permissions::{ADD_BADGETEAM, CHANGE_BADGETEAM, DELETE_BADGETEAM};
use badgus_utils::time::now_unix_secs;
use badgus_utils::upload::store_upload;

use crate::error::WebError;
use crate::extract::Viewer;
use crate::forms::{
    FormErrors, MultipartForm, optional_text, rejected, require, require_site, scale_upload,
};
use crate::state::AppState;
use crate::teams::load_team;

#[derive(Debug, Default, Serialize)]
struct TeamFormValues {
    name: String,
    description: String,
}

impl From<&BadgeTeam> for TeamFormValues {
    fn from(team: &BadgeTeam) -> Self {
        Self {
            name: team.name.clone(),
            description: team.description.clone().unwrap_or_default(),
        }
    }
}

/// A validated submission; `image` holds already-scaled PNG bytes.
struct CleanTeamForm {
    name: String,
    description: Option<String>,
    image: Option<Vec<u8>>,
}

async fn clean_team_form(
    state: &AppState,
    mut form: MultipartForm,
) -> Result<Result<CleanTeamForm, (TeamFormValues, FormErrors)>, WebError> {
    let values = TeamFormValues {
        name: form.text("name").to_owned(),
        description: form.text("description").to_owned(),
    };
    let mut errors = FormErrors::default();

    let name = errors.check(clean_team_name(&values.name));
    let image = match form.take_file("image") {
        Some(bytes) => {
            let size = state.data.settings.team_img_max_size;
            errors.check(scale_upload(bytes, size, "image").await?)
        }
        None => None,
    };

    match name {
        Some(name) if errors.is_empty() => Ok(Ok(CleanTeamForm {
            name,
            description: optional_text(&values.description).map(str::to_owned),
            image,
        })),
        _ => Ok(Err((values, errors))),
    }
}

async fn store_team_image(state: &AppState, team: &BadgeTeam, png: &[u8]) -> Result<(), WebError> {
    let relative = team.upload_meta().path_for("team.png", now_unix_secs());
    store_upload(&state.data.settings.uploads_root, &relative, png).await?;
    teams::set_team_image(&state.data.db, team, &relative).await?;
    Ok(())
}

fn render_form(
    state: &AppState,
    viewer: &Viewer,
    team: Option<&BadgeTeam>,
    values: &TeamFormValues,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let mut ctx = state.context(viewer);
    ctx.insert("team", &team);
    ctx.insert("form", values);
    ctx.insert("errors", errors);
    state.render("teams/form.html", &ctx)
}

pub async fn new_form(
    State(state): State<AppState>,
    viewer: Viewer,
) -> Result<Html<String>, WebError> {
    viewer.require_login()?;
    require_site(viewer.user(), ADD_BADGETEAM)?;
    render_form(&state, &viewer, None, &TeamFormValues::default(), &FormErrors::default())
}

pub async fn create(
    State(state): State<AppState>,
    viewer: Viewer,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let user = viewer.require_login()?;
    require_site(viewer.user(), ADD_BADGETEAM)?;

    let form = MultipartForm::read(multipart).await?;
    let clean = match clean_team_form(&state, form).await? {
        Ok(clean) => clean,
        Err((values, errors)) => {
            return Ok(rejected(render_form(&state, &viewer, None, &values, &errors)?));
        }
    };

    let input = TeamInput {
        name: &clean.name,
        description: clean.description.as_deref(),
    };
    let Some(team) = teams::create_team(&state.data.db, input, user.id).await? else {
        let values = TeamFormValues {
            name: clean.name.clone(),
            description: clean.description.clone().unwrap_or_default(),
        };
        let errors = FormErrors::from(ValidationError::TeamNameTaken);
        return Ok(rejected(render_form(&state, &viewer, None, &values, &errors)?));
    };

    info!(team_id = team.id, owner_id = user.id, "team founded");
    if let Some(png) = &clean.image {
        store_team_image(&state, &team, png).await?;
    }
    Ok(Redirect::to(&team.url()).into_response())
}

pub async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<Html<String>, WebError> {
    viewer.require_login()?;
    let team = load_team(&state.data.db, &slug).await?;
    let perms = authz::team_permissions(&state.data.db, &team, viewer.user()).await?;
    require(&perms, CHANGE_BADGETEAM)?;

    render_form(
        &state,
        &viewer,
        Some(&team),
        &TeamFormValues::from(&team),
        &FormErrors::default(),
    )
}

pub async fn update(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
    multipart: Multipart,
) -> Result<Response, WebError> {
    viewer.require_login()?;
    let team = load_team(&state.data.db, &slug).await?;
    let perms = authz::team_permissions(&state.data.db, &team, viewer.user()).await?;
    require(&perms, CHANGE_BADGETEAM)?;

    let form = MultipartForm::read(multipart).await?;
    let clean = match clean_team_form(&state, form).await? {
        Ok(clean) => clean,
        Err((values, errors)) => {
            return Ok(rejected(render_form(&state, &viewer, Some(&team), &values, &errors)?));
        }
    };

    let input = TeamInput {
        name: &clean.name,
        description: clean.description.as_deref(),
    };
    let Some(saved) = teams::update_team(&state.data.db, &team, input).await? else {
        let values = TeamFormValues {
            name: clean.name.clone(),
            description: clean.description.clone().unwrap_or_default(),
        };
        let errors = FormErrors::from(ValidationError::TeamNameTaken);
        return Ok(rejected(render_form(&state, &viewer, Some(&team), &values, &errors)?));
    };

    if let Some(png) = &clean.image {
        store_team_image(&state, &saved, png).await?;
    }
    Ok(Redirect::to(&saved.url()).into_response())
}

pub async fn delete_confirm(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<Html<String>, WebError> {
    viewer.require_login()?;
    let team = load_team(&state.data.db, &slug).await?;
    let perms = authz::team_permissions(&state.data.db, &team, viewer.user()).await?;
    require(&perms, DELETE_BADGETEAM)?;

    let mut ctx = state.context(&viewer);
    ctx.insert("team", &team);
    state.render("teams/delete.html", &ctx)
}

pub async fn delete(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(slug): Path<String>,
) -> Result<Redirect, WebError> {
    viewer.require_login()?;
    let team = load_team(&state.data.db, &slug).await?;
    let perms = authz::team_permissions(&state.data.db, &team, viewer.user()).await?;
    require(&perms, DELETE_BADGETEAM)?;

    teams::delete_team(&state.data.db, &team).await?;
    Ok(Redirect::to("/teams/"))
}
