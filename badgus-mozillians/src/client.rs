use std::env;
use std::time::Duration;

use anyhow::Context as _;
use badgus_database::cache::vouch_response_key;
use badgus_database::CacheService;
use reqwest::Url;
use serde::Deserialize;
use tracing::{error, warn};

const DEFAULT_BASE_URL: &str = "https://mozillians.org/api/v1";
const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(60 * 60);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct UsersResponse {
    #[serde(default)]
    objects: Vec<DirectoryUser>,
}

#[derive(Debug, Deserialize)]
struct DirectoryUser {
    email: String,
    #[serde(default)]
    is_vouched: bool,
}

#[derive(Clone, Debug)]
pub struct VouchService {
    http: reqwest::Client,
    base_url: String,
    app_name: String,
    app_key: String,
    cache_ttl: Duration,
}

impl VouchService {
    pub fn from_env_optional() -> anyhow::Result<Option<Self>> {
        let enabled = env::var("MOZILLIANS_ENABLED")
            .ok()
            .map(|value| {
                matches!(
                    value.trim().to_ascii_lowercase().as_str(),
                    "1" | "true" | "yes" | "on"
                )
            })
            .unwrap_or(false);

        if !enabled {
            return Ok(None);
        }

        Ok(Some(Self::from_env()?))
    }

    pub fn from_env() -> anyhow::Result<Self> {
        let base_url = env::var("MOZILLIANS_API_BASE_URL")
            .ok()
            .map(|value| value.trim().trim_end_matches('/').to_owned())
            .filter(|value| !value.is_empty())
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_owned());
        let app_name = env::var("MOZILLIANS_API_APPNAME")
            .map(|value| value.trim().to_owned())
            .unwrap_or_default();
        let app_key = env::var("MOZILLIANS_API_KEY")
            .map(|value| value.trim().to_owned())
            .unwrap_or_default();
        let cache_ttl = env::var("MOZILLIANS_API_CACHE_TTL_SECONDS")
            .ok()
            .and_then(|value| value.trim().parse::<u64>().ok())
            .map(Duration::from_secs)
            .unwrap_or(DEFAULT_CACHE_TTL);

        Self::new(base_url, app_name, app_key, cache_ttl)
    }

    pub fn new(
        base_url: impl Into<String>,
        app_name: impl Into<String>,
        app_key: impl Into<String>,
        cache_ttl: Duration,
    ) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("failed to build mozillians http client")?;
        Ok(Self {
            http,
            base_url: base_url.into(),
            app_name: app_name.into(),
            app_key: app_key.into(),
            cache_ttl,
        })
    }

    fn users_url(&self, email: &str) -> anyhow::Result<Url> {
        Url::parse_with_params(
            &format!("{}/users/", self.base_url),
            [
                ("app_name", self.app_name.as_str()),
                ("app_key", self.app_key.as_str()),
                ("email", email),
            ],
        )
        .context("invalid mozillians api base url")
    }

    /// Whether the directory lists `email` as a vouched member.
    ///
    /// Lookup failures are logged and reported as not vouched.
    pub async fn is_vouched(&self, cache: &CacheService, email: &str) -> bool {
        if self.app_key.is_empty() {
            warn!("MOZILLIANS_API_KEY not set; treating profiles as unvouched");
            return false;
        }
        if email.trim().is_empty() {
            return false;
        }

        match self.lookup(cache, email).await {
            Ok(body) => vouched_in_response(&body, email),
            Err(e) => {
                error!(?e, "mozillians lookup failed");
                false
            }
        }
    }

    async fn lookup(&self, cache: &CacheService, email: &str) -> anyhow::Result<String> {
        let key = vouch_response_key(cache, email);
        cache
            .get_or_load_json(&key, self.cache_ttl, || async {
                let url = self.users_url(email)?;
                let response = self
                    .http
                    .get(url)
                    .send()
                    .await
                    .context("mozillians request failed")?;
                let status = response.status();
                if !status.is_success() {
                    anyhow::bail!("mozillians api responded with {status}");
                }
                response
                    .text()
                    .await
                    .context("failed to read mozillians response body")
            })
            .await
    }
}

fn vouched_in_response(body: &str, email: &str) -> bool {
    let parsed: UsersResponse = match serde_json::from_str(body) {
        Ok(parsed) => parsed,
        Err(e) => {
            error!(?e, "failed to parse mozillians response");
            return false;
        }
    };
    parsed
        .objects
        .iter()
        .find(|user| user.email.eq_ignore_ascii_case(email.trim()))
        .is_some_and(|user| user.is_vouched)
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use badgus_database::CacheService;

    use super::{VouchService, vouched_in_response};

    #[test]
    fn matches_email_case_insensitively() {
        let body = r#"{"objects": [
            {"email": "other@example.com", "is_vouched": true},
            {"email": "Someone@Example.com", "is_vouched": true}
        ]}"#;
        assert!(vouched_in_response(body, "someone@example.com"));
        assert!(!vouched_in_response(body, "missing@example.com"));
    }

    #[test]
    fn unvouched_and_garbage_responses_are_false() {
        let body = r#"{"objects": [{"email": "a@example.com", "is_vouched": false}]}"#;
        assert!(!vouched_in_response(body, "a@example.com"));
        assert!(!vouched_in_response("not json", "a@example.com"));
        assert!(!vouched_in_response("{}", "a@example.com"));
    }

    #[test]
    fn users_url_carries_credentials_and_email() {
        let service =
            VouchService::new("https://dir.example/api/v1", "badgus", "k3y", Duration::from_secs(1))
                .unwrap();
        let url = service.users_url("a+b@example.com").unwrap();
        assert_eq!(url.path(), "/api/v1/users/");
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert!(pairs.contains(&("app_name".to_owned(), "badgus".to_owned())));
        assert!(pairs.contains(&("app_key".to_owned(), "k3y".to_owned())));
        assert!(pairs.contains(&("email".to_owned(), "a+b@example.com".to_owned())));
    }

    #[tokio::test]
    async fn missing_key_short_circuits() {
        let service =
            VouchService::new("https://dir.example/api/v1", "badgus", "", Duration::from_secs(1))
                .unwrap();
        let cache = CacheService::disabled("badgus:test");
        assert!(!service.is_vouched(&cache, "a@example.com").await);
    }
}
