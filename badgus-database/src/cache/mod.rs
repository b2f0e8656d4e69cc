mod store;

use std::future::Future;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::warn;

use store::CacheStore;

/// How long a team looked up by slug stays cached.
pub const TEAM_CACHE_TTL: Duration = Duration::from_secs(5 * 60);

/// JSON cache with a key prefix; falls back to the loader whenever the
/// backend misbehaves.
#[derive(Clone, Debug)]
pub struct CacheService {
    key_prefix: String,
    store: CacheStore,
}

impl CacheService {
    pub fn disabled(prefix: impl Into<String>) -> Self {
        Self {
            key_prefix: prefix.into(),
            store: CacheStore::Disabled,
        }
    }

    pub fn redis(redis_url: &str, prefix: impl Into<String>) -> anyhow::Result<Self> {
        Ok(Self {
            key_prefix: prefix.into(),
            store: CacheStore::redis(redis_url)?,
        })
    }

    pub fn is_redis_enabled(&self) -> bool {
        matches!(self.store, CacheStore::Redis(_))
    }

    pub async fn ping(&self) -> anyhow::Result<()> {
        self.store.ping().await
    }

    pub fn key(&self, suffix: impl AsRef<str>) -> String {
        format!("{}:{}", self.key_prefix, suffix.as_ref())
    }

    pub async fn get_json<T>(&self, key: &str) -> anyhow::Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let Some(bytes) = self.store.get(key).await? else {
            return Ok(None);
        };
        let parsed = serde_json::from_slice(&bytes)
            .map_err(|e| anyhow::anyhow!("failed to deserialize cache value for `{key}`: {e}"))?;
        Ok(Some(parsed))
    }

    pub async fn set_json<T>(&self, key: &str, value: &T, ttl: Duration) -> anyhow::Result<()>
    where
        T: Serialize,
    {
        let payload = serde_json::to_vec(value)
            .map_err(|e| anyhow::anyhow!("failed to serialize cache value for `{key}`: {e}"))?;
        self.store.set(key, payload, ttl.as_secs().max(1)).await
    }

    pub async fn del(&self, key: &str) -> anyhow::Result<()> {
        self.store.del(key).await
    }

    pub async fn get_or_load_json<T, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        loader: F,
    ) -> anyhow::Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        match self.get_json::<T>(key).await {
            Ok(Some(cached)) => return Ok(cached),
            Ok(None) => {}
            Err(e) => warn!(?e, cache_key = key, "cache get failed; falling back to loader"),
        }

        let loaded = loader().await?;

        if let Err(e) = self.set_json(key, &loaded, ttl).await {
            warn!(?e, cache_key = key, "cache set failed; returning loaded value");
        }

        Ok(loaded)
    }
}

pub fn team_slug_key(cache: &CacheService, slug: &str) -> String {
    cache.key(format!("team:slug:{slug}"))
}

pub fn vouch_response_key(cache: &CacheService, email: &str) -> String {
    cache.key(format!("mozillians:{}", email.trim().to_ascii_lowercase()))
}

/// Drop the cached lookup for `slug`; failures are logged, not returned.
pub async fn invalidate_team_slug(cache: &CacheService, slug: &str) {
    let key = team_slug_key(cache, slug);
    if let Err(e) = cache.del(&key).await {
        warn!(?e, cache_key = %key, "failed to invalidate cached team");
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::{CacheService, team_slug_key, vouch_response_key};

    #[test]
    fn keys_are_prefixed() {
        let cache = CacheService::disabled("badgus:test");
        assert_eq!(team_slug_key(&cache, "Alpha-Team"), "badgus:test:team:slug:Alpha-Team");
        assert_eq!(
            vouch_response_key(&cache, " Someone@Example.com "),
            "badgus:test:mozillians:someone@example.com"
        );
    }

    #[tokio::test]
    async fn disabled_cache_always_loads() {
        let cache = CacheService::disabled("badgus:test");
        assert!(!cache.is_redis_enabled());
        cache.set_json("k", &1_u32, Duration::from_secs(1)).await.unwrap();
        assert_eq!(cache.get_json::<u32>("k").await.unwrap(), None);

        let value = cache
            .get_or_load_json("k", Duration::from_secs(1), || async { Ok(7_u32) })
            .await
            .unwrap();
        assert_eq!(value, 7);
    }
}
