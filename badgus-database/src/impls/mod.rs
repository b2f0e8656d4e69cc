pub mod accounts;
pub mod applications;
pub mod badges;
pub mod profiles;
pub mod teams;

use anyhow::Context as _;

use badgus_utils::time::now_unix_secs;

/// Current unix time as stored in `BIGINT` timestamp columns.
pub(crate) fn now_i64() -> anyhow::Result<i64> {
    i64::try_from(now_unix_secs()).context("now out of i64 range")
}

/// Whether `err` is a Postgres unique-constraint violation.
pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.is_unique_violation())
}
