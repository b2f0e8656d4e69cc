use std::env;
use std::path::PathBuf;
use std::time::Duration;

use badgus_utils::imaging::Dimensions;
use tracing::warn;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_REDIS_KEY_PREFIX: &str = "badgus:prod";
pub const DEFAULT_IMG_MAX_SIZE: Dimensions = (256, 256);
pub const DEFAULT_MAX_USERNAME_CHANGES: u32 = 3;
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(14 * 24 * 60 * 60);

/// Runtime configuration read from the environment.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Settings {
    pub bind_addr: String,
    pub database_max_connections: u32,
    pub auto_run_migrations: bool,
    pub redis_enabled: bool,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub uploads_root: PathBuf,
    pub uploads_url: String,
    pub team_img_max_size: Dimensions,
    pub profile_img_max_size: Dimensions,
    pub profile_max_username_changes: u32,
    pub session_ttl: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_lookup(|_| None)
    }
}

impl Settings {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build settings from any key lookup; unset or malformed values fall
    /// back to their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let lookup = &lookup;
        let text = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
        };
        let flag = |key: &str, default: bool| match lookup(key) {
            Some(value) => parse_bool(&value),
            None => default,
        };
        let number = |key: &str, default: u64| match lookup(key) {
            Some(value) => value.trim().parse::<u64>().unwrap_or(default),
            None => default,
        };
        let dimensions = |key: &str| match text(key) {
            Some(raw) => parse_dimensions(&raw).unwrap_or_else(|| {
                warn!(key, value = %raw, "expected WIDTHxHEIGHT; using default image size");
                DEFAULT_IMG_MAX_SIZE
            }),
            None => DEFAULT_IMG_MAX_SIZE,
        };

        let mut uploads_url = text("UPLOADS_URL").unwrap_or_else(|| "/media/uploads/".to_owned());
        if !uploads_url.ends_with('/') {
            uploads_url.push('/');
        }

        Self {
            bind_addr: text("BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_owned()),
            database_max_connections: u32::try_from(number("DATABASE_MAX_CONNECTIONS", 5))
                .unwrap_or(5),
            auto_run_migrations: flag("AUTO_RUN_MIGRATIONS", true),
            redis_enabled: flag("REDIS_ENABLED", false),
            redis_url: text("REDIS_URL"),
            redis_key_prefix: text("REDIS_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_owned()),
            uploads_root: text("UPLOADS_ROOT")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("media/uploads")),
            uploads_url,
            team_img_max_size: dimensions("TEAM_IMG_MAX_SIZE"),
            profile_img_max_size: dimensions("PROFILE_IMG_MAX_SIZE"),
            profile_max_username_changes: u32::try_from(number(
                "PROFILE_MAX_USERNAME_CHANGES",
                u64::from(DEFAULT_MAX_USERNAME_CHANGES),
            ))
            .unwrap_or(DEFAULT_MAX_USERNAME_CHANGES),
            session_ttl: Duration::from_secs(
                number("SESSION_TTL_SECONDS", DEFAULT_SESSION_TTL.as_secs()).max(60),
            ),
        }
    }
}

pub fn parse_bool(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

/// Parse `WIDTHxHEIGHT`, e.g. `256x256`.
pub fn parse_dimensions(raw: &str) -> Option<Dimensions> {
    let (width, height) = raw.trim().split_once(['x', 'X'])?;
    let width = width.trim().parse::<u32>().ok().filter(|w| *w > 0)?;
    let height = height.trim().parse::<u32>().ok().filter(|h| *h > 0)?;
    Some((width, height))
}
