pub mod cache;
pub mod config;
pub mod controllers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod store;

use std::sync::Arc;
use tracing::{info, warn};

use cache::CacheService;
use config::{Config, StorageBackend};
use services::{BookingEngine, CatalogService};
use store::{MemoryStore, PgStore, Store};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("DATABASE_URL must be set for postgres storage")]
    MissingDatabaseUrl,
    #[error("database connection failed: {0}")]
    Database(#[from] sqlx::Error),
    #[error("migration failed: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

// Shared state для всего приложения
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub engine: BookingEngine,
    pub catalog: CatalogService,
    pub cache: CacheService,
    pub config: Config,
}

impl AppState {
    /// Connects the configured store and, if `REDIS_URL` is set, the cache. A Redis that
    /// cannot be reached at startup leaves caching off rather than failing the boot.
    pub async fn new(config: Config) -> Result<Arc<Self>, StartupError> {
        let store: Arc<dyn Store> = match config.storage {
            StorageBackend::Postgres => {
                let url = config
                    .database
                    .url
                    .as_deref()
                    .ok_or(StartupError::MissingDatabaseUrl)?;
                let store = PgStore::connect(url, config.database.pool_size).await?;
                info!("Database connected");
                store.run_migrations().await?;
                Arc::new(store)
            }
            StorageBackend::Memory => {
                info!("Using in-memory storage; data is lost on restart");
                Arc::new(MemoryStore::new())
            }
        };

        let cache = match config.redis.url.as_deref() {
            Some(url) => match CacheService::connect(url, config.redis.availability_ttl_seconds).await {
                Ok(cache) => cache,
                Err(e) => {
                    warn!("Redis unavailable, availability cache disabled: {}", e);
                    CacheService::disabled()
                }
            },
            None => CacheService::disabled(),
        };
        if !cache.is_enabled() {
            info!("Availability counts are read from the store on every request");
        }

        Ok(Self::with_store(store, cache, config))
    }

    pub fn with_store(store: Arc<dyn Store>, cache: CacheService, config: Config) -> Arc<Self> {
        let engine = BookingEngine::new(store.clone(), config.booking.clone());
        let catalog = CatalogService::new(store.clone(), engine.availability().clone(), cache.clone());
        Arc::new(Self {
            store,
            engine,
            catalog,
            cache,
            config,
        })
    }
}
