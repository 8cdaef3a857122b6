pub mod cache;
pub mod catalog;
pub mod postgres;
pub mod redis;

pub use cache::{Cache, CacheBackend, CacheKey, RECOMMENDATIONS_PREFIX};
pub use catalog::{CatalogStore, PgCatalogStore};
pub use postgres::create_pool;
pub use redis::{create_redis_client, CacheWriterHandle, RedisBackend};
