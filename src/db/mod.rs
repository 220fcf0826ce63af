pub mod redis;

pub use redis::Cache;
pub use redis::CacheKey;
pub use redis::CacheWriterHandle;
