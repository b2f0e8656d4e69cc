use sqlx::{Postgres, Transaction};
use tracing::info;

use badgus_utils::slug::slugify;

use crate::database::Database;
use crate::impls::{is_unique_violation, now_i64};
use crate::model::badge::{
    Award, AwardListing, AwardOutcome, Badge, NewBadge, Nomination, NominationListing,
};

const BADGE_COLUMNS: &str = "id, title, slug, description, image, creator_id, team_id, is_unique,
    nominations_accepted, nominations_autoapproved, created_at, modified_at";
const AWARD_COLUMNS: &str =
    "id, badge_id, user_id, creator_id, description, hidden, created_at, modified_at";
const NOMINATION_COLUMNS: &str = "id, badge_id, nominee_id, creator_id, approver_id, rejected_by_id,
    rejected_reason, accepted, award_id, created_at, modified_at";

const AWARD_LISTING_SELECT: &str = "SELECT a.id, b.title AS badge_title, b.slug AS badge_slug,
        u.username, c.username AS creator_username, a.description, a.created_at
     FROM awards a
     JOIN badges b ON b.id = a.badge_id
     JOIN users u ON u.id = a.user_id
     LEFT JOIN users c ON c.id = a.creator_id";

/// Insert a badge with a slug derived from its title.
///
/// Returns `None` when the title or slug is taken.
pub async fn create_badge(db: &Database, input: NewBadge<'_>) -> anyhow::Result<Option<Badge>> {
    let slug = slugify(input.title);
    let now = now_i64()?;

    let inserted = sqlx::query_as::<_, Badge>(&format!(
        "INSERT INTO badges (title, slug, description, creator_id, team_id, created_at, modified_at)
         VALUES ($1, $2, $3, $4, $5, $6, $6)
         RETURNING {BADGE_COLUMNS}"
    ))
    .bind(input.title.trim())
    .bind(&slug)
    .bind(input.description)
    .bind(input.creator_id)
    .bind(input.team_id)
    .bind(now)
    .fetch_one(db.pool())
    .await;

    match inserted {
        Ok(badge) => {
            info!(badge_id = badge.id, slug = %badge.slug, team_id = ?badge.team_id, "badge created");
            Ok(Some(badge))
        }
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub async fn get_badge_by_slug(db: &Database, slug: &str) -> anyhow::Result<Option<Badge>> {
    let badge = sqlx::query_as::<_, Badge>(&format!(
        "SELECT {BADGE_COLUMNS} FROM badges WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(db.pool())
    .await?;
    Ok(badge)
}

pub async fn list_badges_for_team(db: &Database, team_id: i64) -> anyhow::Result<Vec<Badge>> {
    let badges = sqlx::query_as::<_, Badge>(&format!(
        "SELECT {BADGE_COLUMNS} FROM badges WHERE team_id = $1 ORDER BY title ASC"
    ))
    .bind(team_id)
    .fetch_all(db.pool())
    .await?;
    Ok(badges)
}

/// Award `badge` to `user_id`, refusing duplicates of unique badges.
pub async fn award_badge(
    db: &Database,
    badge: &Badge,
    user_id: i64,
    creator_id: Option<i64>,
    description: &str,
) -> anyhow::Result<AwardOutcome> {
    let mut tx = db.pool().begin().await?;
    let outcome = award_in_tx(&mut tx, badge, user_id, creator_id, description).await?;
    tx.commit().await?;

    if let AwardOutcome::Awarded(award) = &outcome {
        info!(award_id = award.id, badge_id = badge.id, user_id, "badge awarded");
    }
    Ok(outcome)
}

/// Locks the badge row so concurrent awards of a unique badge serialize.
async fn award_in_tx(
    tx: &mut Transaction<'_, Postgres>,
    badge: &Badge,
    user_id: i64,
    creator_id: Option<i64>,
    description: &str,
) -> anyhow::Result<AwardOutcome> {
    sqlx::query("SELECT id FROM badges WHERE id = $1 FOR UPDATE")
        .bind(badge.id)
        .execute(&mut **tx)
        .await?;

    if badge.is_unique {
        let held: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM awards WHERE badge_id = $1 AND user_id = $2)",
        )
        .bind(badge.id)
        .bind(user_id)
        .fetch_one(&mut **tx)
        .await?;
        if held {
            return Ok(AwardOutcome::AlreadyAwarded);
        }
    }

    let now = now_i64()?;
    let award = sqlx::query_as::<_, Award>(&format!(
        "INSERT INTO awards (badge_id, user_id, creator_id, description, created_at, modified_at)
         VALUES ($1, $2, $3, $4, $5, $5)
         RETURNING {AWARD_COLUMNS}"
    ))
    .bind(badge.id)
    .bind(user_id)
    .bind(creator_id)
    .bind(description)
    .bind(now)
    .fetch_one(&mut **tx)
    .await?;
    Ok(AwardOutcome::Awarded(award))
}

pub async fn list_awards_for_badge(db: &Database, badge_id: i64) -> anyhow::Result<Vec<AwardListing>> {
    let rows = sqlx::query_as::<_, AwardListing>(&format!(
        "{AWARD_LISTING_SELECT}
         WHERE a.badge_id = $1
         ORDER BY a.created_at DESC, a.id DESC"
    ))
    .bind(badge_id)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Visible awards held by `user_id`.
pub async fn list_awards_for_user(db: &Database, user_id: i64) -> anyhow::Result<Vec<AwardListing>> {
    let rows = sqlx::query_as::<_, AwardListing>(&format!(
        "{AWARD_LISTING_SELECT}
         WHERE a.user_id = $1 AND NOT a.hidden
         ORDER BY a.created_at DESC, a.id DESC"
    ))
    .bind(user_id)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Nominate `nominee_id` for `badge`. Returns `None` when the badge does not
/// accept nominations. Auto-approving badges are accepted immediately.
pub async fn create_nomination(
    db: &Database,
    badge: &Badge,
    nominee_id: i64,
    creator_id: i64,
) -> anyhow::Result<Option<Nomination>> {
    if !badge.nominations_accepted {
        return Ok(None);
    }

    let now = now_i64()?;
    let nomination = sqlx::query_as::<_, Nomination>(&format!(
        "INSERT INTO nominations (badge_id, nominee_id, creator_id, created_at, modified_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {NOMINATION_COLUMNS}"
    ))
    .bind(badge.id)
    .bind(nominee_id)
    .bind(creator_id)
    .bind(now)
    .fetch_one(db.pool())
    .await?;

    info!(nomination_id = nomination.id, badge_id = badge.id, nominee_id, "nomination created");

    if badge.nominations_autoapproved {
        approve_nomination(db, badge, &nomination, creator_id).await?;
        return get_nomination(db, badge.id, nomination.id).await;
    }
    Ok(Some(nomination))
}

pub async fn get_nomination(
    db: &Database,
    badge_id: i64,
    nomination_id: i64,
) -> anyhow::Result<Option<Nomination>> {
    let nomination = sqlx::query_as::<_, Nomination>(&format!(
        "SELECT {NOMINATION_COLUMNS} FROM nominations WHERE badge_id = $1 AND id = $2"
    ))
    .bind(badge_id)
    .bind(nomination_id)
    .fetch_optional(db.pool())
    .await?;
    Ok(nomination)
}

/// Accept a pending nomination and award the badge, linking the award.
///
/// Returns `None` when the nomination was already decided. A unique badge
/// the nominee already holds is accepted without a new award.
pub async fn approve_nomination(
    db: &Database,
    badge: &Badge,
    nomination: &Nomination,
    approver_id: i64,
) -> anyhow::Result<Option<AwardOutcome>> {
    let now = now_i64()?;
    let mut tx = db.pool().begin().await?;

    let claimed: Option<i64> = sqlx::query_scalar(
        "UPDATE nominations
         SET approver_id = $1, accepted = TRUE, modified_at = $2
         WHERE id = $3 AND NOT accepted AND rejected_by_id IS NULL
         RETURNING nominee_id",
    )
    .bind(approver_id)
    .bind(now)
    .bind(nomination.id)
    .fetch_optional(&mut *tx)
    .await?;

    let Some(nominee_id) = claimed else {
        tx.rollback().await?;
        return Ok(None);
    };

    let outcome = award_in_tx(&mut tx, badge, nominee_id, nomination.creator_id, "").await?;
    if let AwardOutcome::Awarded(award) = &outcome {
        sqlx::query("UPDATE nominations SET award_id = $1 WHERE id = $2")
            .bind(award.id)
            .bind(nomination.id)
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;

    info!(nomination_id = nomination.id, badge_id = badge.id, approver_id, "nomination approved");
    Ok(Some(outcome))
}

/// Reject a pending nomination. Returns `false` when it was already decided.
pub async fn reject_nomination(
    db: &Database,
    nomination: &Nomination,
    rejected_by_id: i64,
    reason: &str,
) -> anyhow::Result<bool> {
    let now = now_i64()?;
    let updated = sqlx::query(
        "UPDATE nominations
         SET rejected_by_id = $1, rejected_reason = $2, modified_at = $3
         WHERE id = $4 AND NOT accepted AND rejected_by_id IS NULL",
    )
    .bind(rejected_by_id)
    .bind(reason.trim())
    .bind(now)
    .bind(nomination.id)
    .execute(db.pool())
    .await?
    .rows_affected();

    if updated > 0 {
        info!(nomination_id = nomination.id, rejected_by_id, "nomination rejected");
    }
    Ok(updated > 0)
}

pub async fn list_nominations_for_badge(
    db: &Database,
    badge_id: i64,
) -> anyhow::Result<Vec<NominationListing>> {
    let rows = sqlx::query_as::<_, NominationListing>(
        "SELECT n.id, u.username AS nominee_username, c.username AS creator_username,
                n.accepted, (n.rejected_by_id IS NOT NULL) AS rejected, n.rejected_reason,
                n.created_at
         FROM nominations n
         JOIN users u ON u.id = n.nominee_id
         LEFT JOIN users c ON c.id = n.creator_id
         WHERE n.badge_id = $1
         ORDER BY n.created_at DESC, n.id DESC",
    )
    .bind(badge_id)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}
