use anyhow::Context as _;
use sqlx::PgConnection;
use tracing::{info, warn};

use badgus_utils::slug::slugify;

use crate::cache::{TEAM_CACHE_TTL, invalidate_team_slug, team_slug_key};
use crate::database::Database;
use crate::impls::{is_unique_violation, now_i64};
use crate::model::team::{BadgeTeam, MemberListing, TeamAdminRow, TeamInput, TeamMember};

const TEAM_COLUMNS: &str = "id, name, slug, description, image, created_at, modified_at";
const MEMBER_COLUMNS: &str = "id, team_id, user_id, is_owner, created_at, modified_at";

/// Insert a team, deriving its slug from the name, with `owner_id` as its
/// owning member. Both rows are written in one transaction.
///
/// Returns `None` when the name or slug is already used by another team.
pub async fn create_team(
    db: &Database,
    input: TeamInput<'_>,
    owner_id: i64,
) -> anyhow::Result<Option<BadgeTeam>> {
    let slug = slugify(input.name);
    let now = now_i64()?;
    let mut tx = db.pool().begin().await?;

    let inserted = sqlx::query_as::<_, BadgeTeam>(&format!(
        "INSERT INTO badge_teams (name, slug, description, created_at, modified_at)
         VALUES ($1, $2, $3, $4, $4)
         RETURNING {TEAM_COLUMNS}"
    ))
    .bind(input.name.trim())
    .bind(&slug)
    .bind(input.description)
    .bind(now)
    .fetch_one(&mut *tx)
    .await;

    let team = match inserted {
        Ok(team) => team,
        Err(err) if is_unique_violation(&err) => {
            tx.rollback().await?;
            return Ok(None);
        }
        Err(err) => return Err(err.into()),
    };

    upsert_member(&mut *tx, team.id, owner_id, true, now).await?;
    tx.commit().await?;

    info!(team_id = team.id, slug = %team.slug, owner_id, "team created");
    Ok(Some(team))
}

/// Save new name/description, regenerating the slug.
///
/// Returns `None` when the new name or slug collides with another team.
pub async fn update_team(
    db: &Database,
    team: &BadgeTeam,
    input: TeamInput<'_>,
) -> anyhow::Result<Option<BadgeTeam>> {
    let slug = slugify(input.name);
    let now = now_i64()?;

    let updated = sqlx::query_as::<_, BadgeTeam>(&format!(
        "UPDATE badge_teams
         SET name = $1, slug = $2, description = $3, modified_at = $4
         WHERE id = $5
         RETURNING {TEAM_COLUMNS}"
    ))
    .bind(input.name.trim())
    .bind(&slug)
    .bind(input.description)
    .bind(now)
    .bind(team.id)
    .fetch_one(db.pool())
    .await;

    match updated {
        Ok(saved) => {
            invalidate_team_slug(db.cache(), &team.slug).await;
            if saved.slug != team.slug {
                info!(team_id = saved.id, from = %team.slug, to = %saved.slug, "team slug regenerated");
            }
            Ok(Some(saved))
        }
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub async fn set_team_image(db: &Database, team: &BadgeTeam, image: &str) -> anyhow::Result<()> {
    let now = now_i64()?;
    sqlx::query("UPDATE badge_teams SET image = $1, modified_at = $2 WHERE id = $3")
        .bind(image)
        .bind(now)
        .bind(team.id)
        .execute(db.pool())
        .await?;
    invalidate_team_slug(db.cache(), &team.slug).await;
    Ok(())
}

/// Delete a team. Memberships and applications go with it; badges stay,
/// detached from the team.
pub async fn delete_team(db: &Database, team: &BadgeTeam) -> anyhow::Result<bool> {
    let deleted = sqlx::query("DELETE FROM badge_teams WHERE id = $1")
        .bind(team.id)
        .execute(db.pool())
        .await?
        .rows_affected();
    invalidate_team_slug(db.cache(), &team.slug).await;

    if deleted > 0 {
        info!(team_id = team.id, slug = %team.slug, "team deleted");
    }
    Ok(deleted > 0)
}

pub async fn get_team(db: &Database, team_id: i64) -> anyhow::Result<Option<BadgeTeam>> {
    let team = sqlx::query_as::<_, BadgeTeam>(&format!(
        "SELECT {TEAM_COLUMNS} FROM badge_teams WHERE id = $1"
    ))
    .bind(team_id)
    .fetch_optional(db.pool())
    .await?;
    Ok(team)
}

/// Look a team up by slug, serving hits from the cache.
pub async fn get_team_by_slug(db: &Database, slug: &str) -> anyhow::Result<Option<BadgeTeam>> {
    let cache_key = team_slug_key(db.cache(), slug);
    match db.cache().get_json::<BadgeTeam>(&cache_key).await {
        Ok(Some(team)) => return Ok(Some(team)),
        Ok(None) => {}
        Err(e) => warn!(?e, cache_key = %cache_key, "cache get failed; falling back to database"),
    }

    let team = sqlx::query_as::<_, BadgeTeam>(&format!(
        "SELECT {TEAM_COLUMNS} FROM badge_teams WHERE slug = $1"
    ))
    .bind(slug)
    .fetch_optional(db.pool())
    .await?;

    if let Some(team) = &team
        && let Err(e) = db.cache().set_json(&cache_key, team, TEAM_CACHE_TTL).await
    {
        warn!(?e, cache_key = %cache_key, "cache set failed; returning database value");
    }

    Ok(team)
}

pub async fn count_teams(db: &Database) -> anyhow::Result<usize> {
    let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM badge_teams")
        .fetch_one(db.pool())
        .await?;
    usize::try_from(total).context("team count out of usize range")
}

/// One page of teams ordered by name.
pub async fn list_teams(db: &Database, offset: usize, limit: usize) -> anyhow::Result<Vec<BadgeTeam>> {
    let offset_i64 = i64::try_from(offset).context("offset out of i64 range")?;
    let limit_i64 = i64::try_from(limit).context("limit out of i64 range")?;

    let teams = sqlx::query_as::<_, BadgeTeam>(&format!(
        "SELECT {TEAM_COLUMNS} FROM badge_teams ORDER BY name ASC, id ASC LIMIT $1 OFFSET $2"
    ))
    .bind(limit_i64)
    .bind(offset_i64)
    .fetch_all(db.pool())
    .await?;
    Ok(teams)
}

/// Admin listing with member counts, optionally filtered by name/description.
pub async fn search_teams_admin(
    db: &Database,
    query: Option<&str>,
    limit: u32,
) -> anyhow::Result<Vec<TeamAdminRow>> {
    let pattern = query
        .map(str::trim)
        .filter(|q| !q.is_empty())
        .map(|q| format!("%{}%", escape_like(q)));
    let limit_i64 = i64::from(limit.clamp(1, 500));

    let rows = sqlx::query_as::<_, TeamAdminRow>(
        "SELECT t.id, t.name, t.slug, t.image, COUNT(m.id) AS member_count
         FROM badge_teams t
         LEFT JOIN team_members m ON m.team_id = t.id
         WHERE ($1::TEXT IS NULL OR t.name ILIKE $1 OR COALESCE(t.description, '') ILIKE $1)
         GROUP BY t.id
         ORDER BY t.name ASC
         LIMIT $2",
    )
    .bind(pattern)
    .bind(limit_i64)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Membership upsert on an open connection or transaction. An existing row
/// is kept and only ever promoted.
pub(crate) async fn upsert_member(
    conn: &mut PgConnection,
    team_id: i64,
    user_id: i64,
    is_owner: bool,
    now: i64,
) -> anyhow::Result<TeamMember> {
    let member = sqlx::query_as::<_, TeamMember>(&format!(
        "INSERT INTO team_members (team_id, user_id, is_owner, created_at, modified_at)
         VALUES ($1, $2, $3, $4, $4)
         ON CONFLICT (team_id, user_id) DO UPDATE
            SET is_owner = team_members.is_owner OR EXCLUDED.is_owner,
                modified_at = EXCLUDED.modified_at
         RETURNING {MEMBER_COLUMNS}"
    ))
    .bind(team_id)
    .bind(user_id)
    .bind(is_owner)
    .bind(now)
    .fetch_one(conn)
    .await?;
    Ok(member)
}

/// Add `user_id` to the team. Re-adding keeps the existing row, promoting it
/// when `is_owner` is set.
pub async fn add_member(
    db: &Database,
    team_id: i64,
    user_id: i64,
    is_owner: bool,
) -> anyhow::Result<TeamMember> {
    let now = now_i64()?;
    let mut conn = db.pool().acquire().await?;
    upsert_member(&mut *conn, team_id, user_id, is_owner, now).await
}

/// Revoke membership and detach the badges this member created for the team.
pub async fn remove_member(db: &Database, team_id: i64, user_id: i64) -> anyhow::Result<bool> {
    let now = now_i64()?;
    let mut tx = db.pool().begin().await?;

    let removed = sqlx::query("DELETE FROM team_members WHERE team_id = $1 AND user_id = $2")
        .bind(team_id)
        .bind(user_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

    let detached = sqlx::query(
        "UPDATE badges SET team_id = NULL, modified_at = $1 WHERE team_id = $2 AND creator_id = $3",
    )
    .bind(now)
    .bind(team_id)
    .bind(user_id)
    .execute(&mut *tx)
    .await?
    .rows_affected();

    tx.commit().await?;

    info!(team_id, user_id, removed, detached_badges = detached, "member removed");
    Ok(removed > 0)
}

pub async fn get_member(
    db: &Database,
    team_id: i64,
    user_id: i64,
) -> anyhow::Result<Option<TeamMember>> {
    let member = sqlx::query_as::<_, TeamMember>(&format!(
        "SELECT {MEMBER_COLUMNS} FROM team_members WHERE team_id = $1 AND user_id = $2"
    ))
    .bind(team_id)
    .bind(user_id)
    .fetch_optional(db.pool())
    .await?;
    Ok(member)
}

pub async fn has_member(db: &Database, team_id: i64, user_id: i64) -> anyhow::Result<bool> {
    Ok(get_member(db, team_id, user_id).await?.is_some())
}

pub async fn has_owner(db: &Database, team_id: i64, user_id: i64) -> anyhow::Result<bool> {
    Ok(get_member(db, team_id, user_id)
        .await?
        .is_some_and(|member| member.is_owner))
}

/// Promote or demote an existing member. Returns `false` when not a member.
pub async fn set_member_owner(
    db: &Database,
    team_id: i64,
    user_id: i64,
    is_owner: bool,
) -> anyhow::Result<bool> {
    let now = now_i64()?;
    let updated = sqlx::query(
        "UPDATE team_members SET is_owner = $1, modified_at = $2 WHERE team_id = $3 AND user_id = $4",
    )
    .bind(is_owner)
    .bind(now)
    .bind(team_id)
    .bind(user_id)
    .execute(db.pool())
    .await?
    .rows_affected();
    Ok(updated > 0)
}

/// Members with owners first, then by username.
pub async fn list_members(db: &Database, team_id: i64) -> anyhow::Result<Vec<MemberListing>> {
    let rows = sqlx::query_as::<_, MemberListing>(
        "SELECT u.id AS user_id, u.username, p.display_name, p.avatar, m.is_owner
         FROM team_members m
         JOIN users u ON u.id = m.user_id
         LEFT JOIN user_profiles p ON p.user_id = u.id
         WHERE m.team_id = $1
         ORDER BY m.is_owner DESC, u.username ASC",
    )
    .bind(team_id)
    .fetch_all(db.pool())
    .await?;
    Ok(rows)
}

/// Escape `%`, `_` and `\` for use inside an `ILIKE` pattern.
pub(crate) fn escape_like(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::escape_like;

    #[test]
    fn like_wildcards_are_escaped() {
        assert_eq!(escape_like("50%_off\\"), "50\\%\\_off\\\\");
        assert_eq!(escape_like("plain"), "plain");
    }
}
