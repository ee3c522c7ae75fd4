pub mod postgres;
pub mod redis;

pub use postgres::create_pool;
pub use redis::Cache;
pub use redis::CacheKey;
