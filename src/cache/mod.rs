//! Cache
//!
//! Este módulo contiene la caché en memoria de insights.

pub mod cache_config;
pub mod insight_cache;

pub use cache_config::InsightCacheConfig;
pub use insight_cache::InsightCache;
