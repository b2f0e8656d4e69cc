use std::time::Duration;

use anyhow::Context as _;
use argon2::Argon2;
use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use tracing::info;
use uuid::Uuid;

use crate::database::Database;
use crate::impls::{is_unique_violation, now_i64};
use crate::model::user::{NewUser, User};

const USER_COLUMNS: &str = "id, username, email, is_staff, is_superuser, is_active, date_joined";

#[derive(sqlx::FromRow)]
struct CredentialRow {
    #[sqlx(flatten)]
    user: User,
    password_hash: String,
}

pub fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| anyhow::anyhow!("failed to hash password: {e}"))
}

pub fn verify_password(password: &str, password_hash: &str) -> bool {
    PasswordHash::new(password_hash)
        .map(|parsed| {
            Argon2::default()
                .verify_password(password.as_bytes(), &parsed)
                .is_ok()
        })
        .unwrap_or(false)
}

/// Create an account. Returns `None` when the username is taken.
pub async fn create_user(db: &Database, new_user: NewUser<'_>) -> anyhow::Result<Option<User>> {
    let password = new_user.password.to_owned();
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .context("password hashing task panicked")??;
    let now = now_i64()?;

    let inserted = sqlx::query_as::<_, User>(&format!(
        "INSERT INTO users (username, email, password_hash, is_staff, is_superuser, date_joined)
         VALUES ($1, $2, $3, $4, $5, $6)
         RETURNING {USER_COLUMNS}"
    ))
    .bind(new_user.username)
    .bind(new_user.email)
    .bind(password_hash)
    .bind(new_user.is_staff)
    .bind(new_user.is_superuser)
    .bind(now)
    .fetch_one(db.pool())
    .await;

    match inserted {
        Ok(user) => {
            info!(user_id = user.id, username = %user.username, "user created");
            Ok(Some(user))
        }
        Err(err) if is_unique_violation(&err) => Ok(None),
        Err(err) => Err(err.into()),
    }
}

pub async fn get_user(db: &Database, user_id: i64) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1"))
        .bind(user_id)
        .fetch_optional(db.pool())
        .await?;
    Ok(user)
}

pub async fn get_user_by_username(db: &Database, username: &str) -> anyhow::Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(&format!(
        "SELECT {USER_COLUMNS} FROM users WHERE username = $1"
    ))
    .bind(username)
    .fetch_optional(db.pool())
    .await?;
    Ok(user)
}

/// Check credentials of an active account.
pub async fn authenticate(
    db: &Database,
    username: &str,
    password: &str,
) -> anyhow::Result<Option<User>> {
    let row: Option<CredentialRow> = sqlx::query_as(&format!(
        "SELECT {USER_COLUMNS}, password_hash FROM users WHERE username = $1 AND is_active"
    ))
    .bind(username)
    .fetch_optional(db.pool())
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };

    let password = password.to_owned();
    let password_hash = row.password_hash;
    let valid = tokio::task::spawn_blocking(move || verify_password(&password, &password_hash))
        .await
        .context("password verification task panicked")?;

    Ok(valid.then_some(row.user))
}

/// Start a login session and return its opaque token.
pub async fn create_session(db: &Database, user_id: i64, ttl: Duration) -> anyhow::Result<String> {
    let token = Uuid::new_v4().simple().to_string();
    let now = now_i64()?;
    let ttl_secs = i64::try_from(ttl.as_secs()).context("session ttl out of i64 range")?;

    sqlx::query(
        "INSERT INTO sessions (token, user_id, created_at, expires_at) VALUES ($1, $2, $3, $4)",
    )
    .bind(&token)
    .bind(user_id)
    .bind(now)
    .bind(now.saturating_add(ttl_secs))
    .execute(db.pool())
    .await?;

    Ok(token)
}

/// Resolve an unexpired session token to its active user.
pub async fn user_for_session(db: &Database, token: &str) -> anyhow::Result<Option<User>> {
    let now = now_i64()?;
    let user = sqlx::query_as::<_, User>(
        "SELECT u.id, u.username, u.email, u.is_staff, u.is_superuser, u.is_active, u.date_joined
         FROM sessions s
         JOIN users u ON u.id = s.user_id
         WHERE s.token = $1 AND s.expires_at > $2 AND u.is_active",
    )
    .bind(token)
    .bind(now)
    .fetch_optional(db.pool())
    .await?;
    Ok(user)
}

pub async fn delete_session(db: &Database, token: &str) -> anyhow::Result<bool> {
    let deleted = sqlx::query("DELETE FROM sessions WHERE token = $1")
        .bind(token)
        .execute(db.pool())
        .await?
        .rows_affected();
    Ok(deleted > 0)
}

pub async fn purge_expired_sessions(db: &Database) -> anyhow::Result<u64> {
    let now = now_i64()?;
    let deleted = sqlx::query("DELETE FROM sessions WHERE expires_at <= $1")
        .bind(now)
        .execute(db.pool())
        .await?
        .rows_affected();
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password};

    #[test]
    fn password_hash_round_trip() {
        let hash = hash_password("correct horse").unwrap();
        assert_ne!(hash, "correct horse");
        assert!(verify_password("correct horse", &hash));
        assert!(!verify_password("wrong horse", &hash));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("anything", "not-a-phc-string"));
    }
}
