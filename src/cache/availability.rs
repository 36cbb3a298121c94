use redis::AsyncCommands;
use tracing::{debug, warn};

use crate::cache::CacheService;

fn generation_key(showtime_id: i64) -> String {
    format!("showtime:{}:gen", showtime_id)
}

fn available_key(showtime_id: i64, generation: i64) -> String {
    format!("showtime:{}:available:{}", showtime_id, generation)
}

/// Where a freshly counted value may be written. The generation is read before counting,
/// so a count that raced with a booking lands under a generation nobody reads any more.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheSlot {
    showtime_id: i64,
    generation: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedAvailable {
    Hit(i64),
    /// `None` when the cache is off or Redis failed; there is nothing to fill then.
    Miss(Option<CacheSlot>),
}

impl CacheService {
    // Число свободных мест для текущего поколения сеанса
    pub async fn lookup_available(&self, showtime_id: i64) -> CachedAvailable {
        let Some(mut conn) = self.conn.clone() else {
            return CachedAvailable::Miss(None);
        };
        let generation: redis::RedisResult<Option<i64>> = conn.get(generation_key(showtime_id)).await;
        let generation = match generation {
            Ok(generation) => generation.unwrap_or(0),
            Err(e) => {
                warn!("Redis read for showtime {} failed: {:?}", showtime_id, e);
                return CachedAvailable::Miss(None);
            }
        };
        let value: redis::RedisResult<Option<i64>> =
            conn.get(available_key(showtime_id, generation)).await;
        match value {
            Ok(Some(available)) => CachedAvailable::Hit(available),
            Ok(None) => CachedAvailable::Miss(Some(CacheSlot { showtime_id, generation })),
            Err(e) => {
                warn!("Redis read for showtime {} failed: {:?}", showtime_id, e);
                CachedAvailable::Miss(None)
            }
        }
    }

    // Записать посчитанное значение под поколением, прочитанным до подсчёта
    pub async fn fill_available(&self, slot: CacheSlot, available: i64) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let key = available_key(slot.showtime_id, slot.generation);
        let result: redis::RedisResult<()> = conn.set_ex(key, available, self.availability_ttl_seconds).await;
        match result {
            Ok(()) => debug!(
                "Cached {} available seats for showtime {} (generation {})",
                available, slot.showtime_id, slot.generation
            ),
            Err(e) => warn!("Redis write for showtime {} failed: {:?}", slot.showtime_id, e),
        }
    }

    // Инвалидировать кеш сеанса: новое поколение, старые значения больше не читаются
    pub async fn invalidate_showtime(&self, showtime_id: i64) {
        let Some(mut conn) = self.conn.clone() else {
            return;
        };
        let result: redis::RedisResult<i64> = conn.incr(generation_key(showtime_id), 1).await;
        match result {
            Ok(generation) => debug!("Showtime {} cache moved to generation {}", showtime_id, generation),
            Err(e) => warn!("Redis invalidate for showtime {} failed: {:?}", showtime_id, e),
        }
    }
}
