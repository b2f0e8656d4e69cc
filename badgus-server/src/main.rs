use std::env;
use std::sync::Arc;

use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;

use badgus_core::{Data, Settings};
use badgus_database::impls::accounts;
use badgus_database::{CacheService, Database, MIGRATOR};
use badgus_mozillians::VouchService;
use badgus_web::{AppState, router};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        if !within_info_level {
            return false;
        }

        !metadata.target().starts_with("sqlx::query")
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    dotenvy::dotenv().ok();

    let database_url = env::var("DATABASE_URL")?;
    let settings = Settings::from_env();

    let db_pool = Database::connect(&database_url, settings.database_max_connections).await?;
    info!("PostgreSQL connection established.");

    let cache = build_cache(&settings);
    if cache.is_redis_enabled() {
        if let Err(err) = cache.ping().await {
            warn!(
                ?err,
                "Redis cache ping failed; cache operations will continue with fallback behavior."
            );
        } else {
            info!("Redis cache health check passed.");
        }
    }

    let db = Database::with_cache(db_pool, cache);

    let vouch = VouchService::from_env_optional()?;
    if vouch.is_some() {
        info!("Mozillians vouch lookups enabled.");
    } else {
        info!("Mozillians vouch lookups disabled (set MOZILLIANS_ENABLED=true to enable).");
    }

    if settings.auto_run_migrations {
        MIGRATOR.run(db.pool()).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let purged = accounts::purge_expired_sessions(&db).await?;
    if purged > 0 {
        info!(purged, "Expired sessions removed.");
    }

    let bind_addr = settings.bind_addr.clone();
    let data = Data {
        db,
        settings: Arc::new(settings),
        vouch,
    };
    let app = router(AppState::new(data)?).layer(TraceLayer::new_for_http());

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!(addr = %listener.local_addr()?, "badgus is listening.");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

fn build_cache(settings: &Settings) -> CacheService {
    let key_prefix = settings.redis_key_prefix.clone();

    if !settings.redis_enabled {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(key_prefix);
    }

    match &settings.redis_url {
        Some(redis_url) => match CacheService::redis(redis_url, key_prefix.clone()) {
            Ok(cache) => {
                info!(key_prefix = %key_prefix, "Redis cache enabled.");
                cache
            }
            Err(err) => {
                warn!(?err, key_prefix = %key_prefix, "Failed to initialize Redis cache; continuing with DB-only mode.");
                CacheService::disabled(key_prefix)
            }
        },
        None => {
            warn!(key_prefix = %key_prefix, "REDIS_ENABLED=true but REDIS_URL is missing; continuing with DB-only mode.");
            CacheService::disabled(key_prefix)
        }
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(?err, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested.");
}
