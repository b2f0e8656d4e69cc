use axum::Form;
use axum::extract::{Multipart, Path, State};
use axum::response::{Html, IntoResponse, Redirect, Response};
use serde::{Deserialize, Serialize};

use badgus_core::ValidationError;
use badgus_core::validation::{
    clean_display_name, clean_location, clean_organization, clean_username,
};
use badgus_database::impls::{accounts, badges, profiles};
use badgus_database::model::profile::{ProfileUpdate, UserProfile, UsernameChange};
use badgus_database::model::user::{User, profile_url};
use badgus_utils::time::now_unix_secs;
use badgus_utils::upload::store_upload;

use crate::error::WebError;
use crate::extract::Viewer;
use crate::forms::{FormErrors, MultipartForm, rejected, scale_upload};
use crate::state::AppState;

#[derive(Debug, Default, Serialize)]
struct ProfileFormValues {
    display_name: String,
    bio: String,
    organization: String,
    location: String,
}

impl From<&UserProfile> for ProfileFormValues {
    fn from(profile: &UserProfile) -> Self {
        Self {
            display_name: profile.display_name.clone().unwrap_or_default(),
            bio: profile.bio.clone(),
            organization: profile.organization.clone(),
            location: profile.location.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize, Serialize)]
pub struct UsernameForm {
    #[serde(default)]
    pub username: String,
}

async fn load_user(state: &AppState, username: &str) -> Result<User, WebError> {
    accounts::get_user_by_username(&state.data.db, username)
        .await?
        .ok_or(WebError::NotFound)
}

/// The profile's user and profile, if the viewer may edit it.
async fn load_editable(
    state: &AppState,
    viewer: &Viewer,
    username: &str,
) -> Result<(User, UserProfile), WebError> {
    let editor = viewer.require_login()?;
    let user = load_user(state, username).await?;
    let profile = profiles::get_or_create_profile(&state.data.db, user.id).await?;
    if !profile.allows_edit(editor) {
        return Err(WebError::PermissionDenied);
    }
    Ok((user, profile))
}

pub async fn detail(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> Result<Html<String>, WebError> {
    let db = &state.data.db;
    let user = load_user(&state, &username).await?;
    let profile = profiles::get_or_create_profile(db, user.id).await?;
    let memberships = profiles::list_memberships(db, user.id).await?;
    let awards = badges::list_awards_for_user(db, user.id).await?;

    let vouched = match &state.data.vouch {
        Some(vouch) => vouch.is_vouched(db.cache(), &user.email).await,
        None => false,
    };
    let can_edit = viewer.user().is_some_and(|editor| profile.allows_edit(editor));
    let max_changes = state.data.settings.profile_max_username_changes;

    let mut ctx = state.context(&viewer);
    ctx.insert("display_name", profile.display_name(&user.username));
    ctx.insert("profile_user", &user);
    ctx.insert("profile", &profile);
    ctx.insert("teams", &memberships);
    ctx.insert("awards", &awards);
    ctx.insert("vouched", &vouched);
    ctx.insert("can_edit", &can_edit);
    ctx.insert(
        "username_changes_remaining",
        &profile.username_changes_remaining(max_changes).max(0),
    );
    state.render("profiles/detail.html", &ctx)
}

fn render_edit(
    state: &AppState,
    viewer: &Viewer,
    user: &User,
    profile: &UserProfile,
    values: &ProfileFormValues,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let mut ctx = state.context(viewer);
    ctx.insert("profile_user", user);
    ctx.insert("profile", profile);
    ctx.insert("form", values);
    ctx.insert("errors", errors);
    state.render("profiles/edit.html", &ctx)
}

pub async fn edit_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> Result<Html<String>, WebError> {
    let (user, profile) = load_editable(&state, &viewer, &username).await?;
    let values = ProfileFormValues::from(&profile);
    render_edit(&state, &viewer, &user, &profile, &values, &FormErrors::default())
}

pub async fn update(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    multipart: Multipart,
) -> Result<Response, WebError> {
    let (user, profile) = load_editable(&state, &viewer, &username).await?;

    let mut form = MultipartForm::read(multipart).await?;
    let values = ProfileFormValues {
        display_name: form.text("display_name").to_owned(),
        bio: form.text("bio").trim().to_owned(),
        organization: form.text("organization").trim().to_owned(),
        location: form.text("location").trim().to_owned(),
    };

    let mut errors = FormErrors::default();
    let display_name = errors.check(clean_display_name(&values.display_name));
    let organization = errors.check(clean_organization(&values.organization));
    let location = errors.check(clean_location(&values.location));
    let avatar = match form.take_file("avatar") {
        Some(bytes) => {
            let size = state.data.settings.profile_img_max_size;
            errors.check(scale_upload(bytes, size, "avatar").await?)
        }
        None => None,
    };

    let (Some(display_name), Some(organization), Some(location), true) =
        (display_name, organization, location, errors.is_empty())
    else {
        return Ok(rejected(render_edit(&state, &viewer, &user, &profile, &values, &errors)?));
    };

    let db = &state.data.db;
    let update = ProfileUpdate {
        display_name: display_name.as_deref(),
        bio: &values.bio,
        organization: &organization,
        location: &location,
    };
    profiles::update_profile(db, user.id, update).await?;

    if let Some(png) = avatar {
        let relative = UserProfile::upload_meta(&user.username).path_for("avatar.png", now_unix_secs());
        store_upload(&state.data.settings.uploads_root, &relative, &png).await?;
        profiles::set_avatar(db, user.id, &relative).await?;
    }

    Ok(Redirect::to(&user.profile_url()).into_response())
}

fn render_username(
    state: &AppState,
    viewer: &Viewer,
    user: &User,
    profile: &UserProfile,
    form: &UsernameForm,
    errors: &FormErrors,
) -> Result<Html<String>, WebError> {
    let max_changes = state.data.settings.profile_max_username_changes;
    let mut ctx = state.context(viewer);
    ctx.insert("profile_user", user);
    ctx.insert("form", form);
    ctx.insert("errors", errors);
    ctx.insert(
        "username_changes_remaining",
        &profile.username_changes_remaining(max_changes).max(0),
    );
    state.render("profiles/username.html", &ctx)
}

pub async fn username_form(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
) -> Result<Html<String>, WebError> {
    let (user, profile) = load_editable(&state, &viewer, &username).await?;
    let form = UsernameForm {
        username: user.username.clone(),
    };

    let mut errors = FormErrors::default();
    if !profile.can_change_username(state.data.settings.profile_max_username_changes) {
        errors.add(&ValidationError::UsernameChangeLimit);
    }
    render_username(&state, &viewer, &user, &profile, &form, &errors)
}

pub async fn change_username(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(username): Path<String>,
    Form(form): Form<UsernameForm>,
) -> Result<Response, WebError> {
    let (user, profile) = load_editable(&state, &viewer, &username).await?;

    let new_username = match clean_username(&form.username) {
        Ok(name) => name,
        Err(err) => {
            let errors = FormErrors::from(err);
            return Ok(rejected(render_username(&state, &viewer, &user, &profile, &form, &errors)?));
        }
    };

    let max_changes = state.data.settings.profile_max_username_changes;
    let outcome = profiles::change_username(&state.data.db, user.id, &new_username, max_changes).await?;
    let err = match outcome {
        UsernameChange::Changed => return Ok(Redirect::to(&profile_url(&new_username)).into_response()),
        UsernameChange::Unchanged => return Ok(Redirect::to(&user.profile_url()).into_response()),
        UsernameChange::LimitReached => ValidationError::UsernameChangeLimit,
        UsernameChange::Taken => ValidationError::UsernameTaken,
    };
    let errors = FormErrors::from(err);
    Ok(rejected(render_username(&state, &viewer, &user, &profile, &form, &errors)?))
}
