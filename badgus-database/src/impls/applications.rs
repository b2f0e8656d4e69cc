use tracing::info;

use crate::database::Database;
use crate::impls::now_i64;
use crate::impls::teams::{escape_like, upsert_member};
use crate::model::application::{ApplicationListing, TeamApplication};

const APPLICATION_COLUMNS: &str =
    "id, team_id, creator_id, approver_id, comment, created_at, modified_at";

const LISTING_SELECT: &str = "SELECT a.id, a.team_id, t.name AS team_name, t.slug AS team_slug,
        c.username AS creator_username, ap.username AS approver_username,
        a.comment, a.created_at
     FROM team_applications a
     JOIN badge_teams t ON t.id = a.team_id
     LEFT JOIN users c ON c.id = a.creator_id
     LEFT JOIN users ap ON ap.id = a.approver_id";

pub async fn create_application(
    db: &Database,
    team_id: i64,
    creator_id: i64,
    comment: &str,
) -> anyhow::Result<TeamApplication> {
    let now = now_i64()?;
    let application = sqlx::query_as::<_, TeamApplication>(&format!(
        "INSERT INTO team_applications (team_id, creator_id, comment, created_at, modified_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {APPLICATION_COLUMNS}"
    ))
    .bind(team_id)
    .bind(creator_id)
    .bind(comment)
    .bind(now)
    .fetch_one(db.pool())
    .await?;

    info!(application_id = application.id, team_id, creator_id, "team application created");
    Ok(application)
}

/// Fetch an application that belongs to `team_id`.
pub async fn get_application(
    db: &Database,
    team_id: i64,
    application_id: i64,
) -> anyhow::Result<Option<TeamApplication>> {
    let application = sqlx::query_as::<_, TeamApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS} FROM team_applications WHERE team_id = $1 AND id = $2"
    ))
    .bind(team_id)
    .bind(application_id)
    .fetch_optional(db.pool())
    .await?;
    Ok(application)
}

/// The most recent application `creator_id` made to the team, if any.
pub async fn find_application_for(
    db: &Database,
    team_id: i64,
    creator_id: i64,
) -> anyhow::Result<Option<TeamApplication>> {
    let application = sqlx::query_as::<_, TeamApplication>(&format!(
        "SELECT {APPLICATION_COLUMNS}
         FROM team_applications
         WHERE team_id = $1 AND creator_id = $2
         ORDER BY created_at DESC, id DESC
         LIMIT 1"
    ))
    .bind(team_id)
    .bind(creator_id)
    .fetch_optional(db.pool())
    .await?;
    Ok(application)
}

/// Pending applications, or approved ones when `approved` is set.
pub async fn list_applications(
    db: &Database,
    team_id: i64,
    approved: bool,
) -> anyhow::Result<Vec<ApplicationListing>> {
    let rows = sqlx::query_as::<_, ApplicationListing>(&format!(
        "{LISTING_SELECT}
         WHERE a.team_id = $1 AND ((a.approver_id IS NOT NULL) = $2)
         ORDER BY a.created_at ASC, a.id ASC"
    ))
    .bind(team_id)
    .bind(approved)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Record the approver and make the applicant a member, atomically.
///
/// Returns `false` when the application was already approved.
pub async fn approve_application(
    db: &Database,
    application: &TeamApplication,
    approver_id: i64,
) -> anyhow::Result<bool> {
    let now = now_i64()?;
    let mut tx = db.pool().begin().await?;

    let approved: Option<Option<i64>> = sqlx::query_scalar(
        "UPDATE team_applications
         SET approver_id = $1, modified_at = $2
         WHERE id = $3 AND approver_id IS NULL
         RETURNING creator_id",
    )
    .bind(approver_id)
    .bind(now)
    .bind(application.id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(creator_id) = approved else {
        tx.rollback().await?;
        return Ok(false);
    };

    if let Some(creator_id) = creator_id {
        upsert_member(&mut *tx, application.team_id, creator_id, false, now).await?;
    }

    tx.commit().await?;

    info!(
        application_id = application.id,
        team_id = application.team_id,
        approver_id,
        "team application approved"
    );
    Ok(true)
}

pub async fn delete_application(db: &Database, application: &TeamApplication) -> anyhow::Result<bool> {
    let deleted = sqlx::query("DELETE FROM team_applications WHERE id = $1")
        .bind(application.id)
        .execute(db.pool())
        .await?
        .rows_affected();
    Ok(deleted > 0)
}

/// Admin listing, optionally filtered by creator or approver username.
pub async fn search_applications_admin(
    db: &Database,
    query: Option<&str>,
    limit: u32,
) -> anyhow::Result<Vec<ApplicationListing>> {
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)));
    let limit_i64 = i64::from(limit.clamp(1, 500));

    let rows = sqlx::query_as::<_, ApplicationListing>(&format!(
        "{LISTING_SELECT}
         WHERE ($1::TEXT IS NULL OR c.username ILIKE $1 OR ap.username ILIKE $1)
         ORDER BY a.created_at DESC, a.id DESC
         LIMIT $2"
    ))
    .bind(pattern)
    .bind(limit_i64)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}
