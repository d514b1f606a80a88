//! Caché de insights por rango de fechas
//!
//! Caché explícita en memoria con TTL y reloj inyectado. Al llenarse se
//! descarta la entrada más antigua.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::cache_config::InsightCacheConfig;
use crate::models::{DateRange, Insight};
use crate::utils::clock::Clock;

struct CacheEntry {
    insights: Vec<Insight>,
    stored_at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct InsightCache {
    config: InsightCacheConfig,
    clock: Arc<dyn Clock>,
    entries: Arc<RwLock<HashMap<DateRange, CacheEntry>>>,
}

impl InsightCache {
    pub fn new(config: InsightCacheConfig, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            clock,
            entries: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    fn ttl(&self) -> Duration {
        Duration::seconds(self.config.ttl_secs as i64)
    }

    pub async fn get(&self, range: &DateRange) -> Option<Vec<Insight>> {
        let now = self.clock.now();
        {
            let entries = self.entries.read().await;
            match entries.get(range) {
                Some(entry) if now < entry.stored_at + self.ttl() => {
                    debug!("📦 Cache hit insights {}..{}", range.start, range.end);
                    return Some(entry.insights.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }

        // Expirada
        self.entries.write().await.remove(range);
        None
    }

    pub async fn put(&self, range: DateRange, insights: Vec<Insight>) {
        if self.config.max_entries == 0 {
            return;
        }
        let mut entries = self.entries.write().await;
        if !entries.contains_key(&range) && entries.len() >= self.config.max_entries {
            let oldest = entries
                .iter()
                .min_by_key(|(_, entry)| entry.stored_at)
                .map(|(key, _)| *key);
            if let Some(oldest) = oldest {
                entries.remove(&oldest);
            }
        }
        entries.insert(
            range,
            CacheEntry {
                insights,
                stored_at: self.clock.now(),
            },
        );
    }

    pub async fn invalidate_all(&self) {
        self.entries.write().await.clear();
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::clock::ManualClock;
    use chrono::NaiveDate;

    fn range(day: u32) -> DateRange {
        DateRange::new(
            NaiveDate::from_ymd_opt(2024, 1, day).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
    }

    #[tokio::test]
    async fn test_entries_expire_after_ttl() {
        let clock = ManualClock::new(Utc::now());
        let cache = InsightCache::new(
            InsightCacheConfig { ttl_secs: 60, max_entries: 4 },
            Arc::new(clock.clone()),
        );

        cache.put(range(1), Vec::new()).await;
        assert!(cache.get(&range(1)).await.is_some());

        clock.advance(Duration::seconds(61));
        assert!(cache.get(&range(1)).await.is_none());
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_oldest_entry_is_evicted() {
        let clock = ManualClock::new(Utc::now());
        let cache = InsightCache::new(
            InsightCacheConfig { ttl_secs: 600, max_entries: 2 },
            Arc::new(clock.clone()),
        );

        cache.put(range(1), Vec::new()).await;
        clock.advance(Duration::seconds(1));
        cache.put(range(2), Vec::new()).await;
        clock.advance(Duration::seconds(1));
        cache.put(range(3), Vec::new()).await;

        assert_eq!(cache.len().await, 2);
        assert!(cache.get(&range(1)).await.is_none());
        assert!(cache.get(&range(3)).await.is_some());
    }
}
