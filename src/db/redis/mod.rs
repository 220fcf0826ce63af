pub mod cache;

mod macros;

pub use cache::create_redis_client;
pub use cache::Cache;
pub use cache::CacheKey;
pub use cache::CacheWriterHandle;
pub use cache::{AVAIL_CACHE_TTL, DETAILS_CACHE_TTL, GENRES_CACHE_TTL, SEARCH_CACHE_TTL};
