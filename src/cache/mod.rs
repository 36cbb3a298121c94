use redis::aio::ConnectionManager;
use redis::Client;
use tracing::info;

pub mod availability;

pub use availability::{CacheSlot, CachedAvailable};

/// Redis cache in front of the store. Every method is best-effort: a missing or failing
/// Redis never fails a request, it only sends reads to the store.
#[derive(Clone)]
pub struct CacheService {
    conn: Option<ConnectionManager>,
    availability_ttl_seconds: u64,
}

impl CacheService {
    pub async fn connect(redis_url: &str, availability_ttl_seconds: u64) -> redis::RedisResult<Self> {
        let client = Client::open(redis_url)?;
        let conn = ConnectionManager::new(client).await?;
        info!("Redis connected");
        Ok(Self {
            conn: Some(conn),
            availability_ttl_seconds,
        })
    }

    /// No Redis configured; all lookups miss.
    pub fn disabled() -> Self {
        Self {
            conn: None,
            availability_ttl_seconds: 0,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.conn.is_some()
    }
}
