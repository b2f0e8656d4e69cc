use tracing::info;

use crate::database::Database;
use crate::impls::{is_unique_violation, now_i64};
use crate::model::profile::{ProfileUpdate, UserProfile, UsernameChange};
use crate::model::team::Membership;

const PROFILE_COLUMNS: &str = "user_id, username_changes, is_confirmed, display_name, avatar, bio, organization, location, created_at, modified_at";

/// Fetch a user's profile, creating an empty one on first access.
pub async fn get_or_create_profile(db: &Database, user_id: i64) -> anyhow::Result<UserProfile> {
    let now = now_i64()?;

    sqlx::query(
        "INSERT INTO user_profiles (user_id, created_at, modified_at)
         VALUES ($1, $2, $2)
         ON CONFLICT (user_id) DO NOTHING",
    )
    .bind(user_id)
    .bind(now)
    .execute(db.pool())
    .await?;

    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1"
    ))
    .bind(user_id)
    .fetch_one(db.pool())
    .await?;

    Ok(profile)
}

pub async fn update_profile(
    db: &Database,
    user_id: i64,
    update: ProfileUpdate<'_>,
) -> anyhow::Result<UserProfile> {
    get_or_create_profile(db, user_id).await?;
    let now = now_i64()?;

    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "UPDATE user_profiles
         SET display_name = $1, bio = $2, organization = $3, location = $4, modified_at = $5
         WHERE user_id = $6
         RETURNING {PROFILE_COLUMNS}"
    ))
    .bind(update.display_name)
    .bind(update.bio)
    .bind(update.organization)
    .bind(update.location)
    .bind(now)
    .bind(user_id)
    .fetch_one(db.pool())
    .await?;

    Ok(profile)
}

pub async fn set_avatar(db: &Database, user_id: i64, avatar: &str) -> anyhow::Result<()> {
    get_or_create_profile(db, user_id).await?;
    let now = now_i64()?;

    sqlx::query("UPDATE user_profiles SET avatar = $1, modified_at = $2 WHERE user_id = $3")
        .bind(avatar)
        .bind(now)
        .bind(user_id)
        .execute(db.pool())
        .await?;

    Ok(())
}

/// Rename a user, spending one of their limited username changes.
///
/// The profile row stays locked from the allowance check to the counter
/// bump, so concurrent renames cannot overspend it.
pub async fn change_username(
    db: &Database,
    user_id: i64,
    new_username: &str,
    max_changes: u32,
) -> anyhow::Result<UsernameChange> {
    get_or_create_profile(db, user_id).await?;
    let mut tx = db.pool().begin().await?;

    let profile = sqlx::query_as::<_, UserProfile>(&format!(
        "SELECT {PROFILE_COLUMNS} FROM user_profiles WHERE user_id = $1 FOR UPDATE"
    ))
    .bind(user_id)
    .fetch_one(&mut *tx)
    .await?;
    if !profile.can_change_username(max_changes) {
        tx.rollback().await?;
        return Ok(UsernameChange::LimitReached);
    }

    let current: String = sqlx::query_scalar("SELECT username FROM users WHERE id = $1")
        .bind(user_id)
        .fetch_one(&mut *tx)
        .await?;
    if current == new_username {
        tx.rollback().await?;
        return Ok(UsernameChange::Unchanged);
    }

    let renamed = sqlx::query("UPDATE users SET username = $1 WHERE id = $2")
        .bind(new_username)
        .bind(user_id)
        .execute(&mut *tx)
        .await;
    match renamed {
        Ok(_) => {}
        Err(err) if is_unique_violation(&err) => return Ok(UsernameChange::Taken),
        Err(err) => return Err(err.into()),
    }

    sqlx::query(
        "UPDATE user_profiles
         SET username_changes = username_changes + 1, modified_at = $1
         WHERE user_id = $2",
    )
    .bind(now_i64()?)
    .bind(user_id)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;

    info!(user_id, from = %current, to = %new_username, "username changed");
    Ok(UsernameChange::Changed)
}

/// Teams a user belongs to, by team name.
pub async fn list_memberships(db: &Database, user_id: i64) -> anyhow::Result<Vec<Membership>> {
    let rows = sqlx::query_as::<_, Membership>(
        "SELECT t.id AS team_id, t.name AS team_name, t.slug AS team_slug, t.image AS team_image, m.is_owner
         FROM team_members m
         JOIN badge_teams t ON t.id = m.team_id
         WHERE m.user_id = $1
         ORDER BY t.name ASC",
    )
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}
