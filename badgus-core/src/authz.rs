//! Resolve what a viewer may do, site-wide or on a specific object.

use badgus_database::Database;
use badgus_database::impls::teams;
use badgus_database::model::application::TeamApplication;
use badgus_database::model::badge::Badge;
use badgus_database::model::team::BadgeTeam;
use badgus_database::model::user::User;
use badgus_utils::permissions::{
    self, BADGE_TEAM_POLICY, PermissionSet, Standing, site_permissions,
};

/// Permissions that do not depend on any object.
pub fn site_permissions_for(viewer: Option<&User>) -> PermissionSet {
    match viewer {
        Some(user) if user.is_superuser => PermissionSet::all(),
        Some(_) => site_permissions(true),
        None => site_permissions(false),
    }
}

/// Team permissions for a viewer whose standing is already known.
pub fn team_permissions_for(viewer: Option<&User>, standing: Standing) -> PermissionSet {
    match viewer {
        Some(user) if user.is_superuser => PermissionSet::all(),
        _ => BADGE_TEAM_POLICY.filter_permissions(standing, site_permissions_for(viewer)),
    }
}

pub async fn team_standing(
    db: &Database,
    team_id: i64,
    viewer: Option<&User>,
) -> anyhow::Result<Standing> {
    let Some(user) = viewer else {
        return Ok(Standing::ANONYMOUS);
    };
    let standing = match teams::get_member(db, team_id, user.id).await? {
        Some(member) if member.is_owner => Standing::owner(),
        Some(_) => Standing::member(),
        None => Standing::outsider(),
    };
    Ok(standing)
}

pub async fn team_permissions(
    db: &Database,
    team: &BadgeTeam,
    viewer: Option<&User>,
) -> anyhow::Result<PermissionSet> {
    let standing = team_standing(db, team.id, viewer).await?;
    Ok(team_permissions_for(viewer, standing))
}

/// Team grants plus the applicant's own view/withdraw rights.
pub fn application_permissions_for(
    viewer: Option<&User>,
    team_permissions: PermissionSet,
    application: &TeamApplication,
) -> PermissionSet {
    let is_creator = viewer.is_some_and(|user| application.has_owner(user.id));
    permissions::application_permissions(team_permissions, viewer.is_some(), is_creator)
}

pub async fn application_permissions(
    db: &Database,
    team: &BadgeTeam,
    application: &TeamApplication,
    viewer: Option<&User>,
) -> anyhow::Result<PermissionSet> {
    let team_perms = team_permissions(db, team, viewer).await?;
    Ok(application_permissions_for(viewer, team_perms, application))
}

/// Badges inherit their team's policy, if they still have a team.
pub async fn badge_permissions(
    db: &Database,
    badge: &Badge,
    viewer: Option<&User>,
) -> anyhow::Result<PermissionSet> {
    let standing = match badge.team_id {
        Some(team_id) => Some(team_standing(db, team_id, viewer).await?),
        None => None,
    };
    Ok(badge_permissions_for(viewer, badge, standing))
}

pub fn badge_permissions_for(
    viewer: Option<&User>,
    badge: &Badge,
    team_standing: Option<Standing>,
) -> PermissionSet {
    let base = match team_standing {
        Some(standing) => team_permissions_for(viewer, standing),
        None => site_permissions_for(viewer),
    };
    let is_creator = viewer.is_some_and(|user| badge.is_created_by(user.id));
    permissions::badge_permissions(base, viewer.is_some(), is_creator)
}
