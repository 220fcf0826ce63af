use redis::AsyncCommands;
use redis::Client;
use std::fmt::Display;
use tokio::sync::mpsc;

use crate::error::AppResult;
use crate::models::{MediaType, SearchScope};

/// Cache TTLs in seconds
pub const SEARCH_CACHE_TTL: u64 = 3600; // 1 hour
pub const DETAILS_CACHE_TTL: u64 = 86400; // 1 day
pub const GENRES_CACHE_TTL: u64 = 604800; // 1 week
pub const AVAIL_CACHE_TTL: u64 = 86400; // 1 day

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Search {
        scope: SearchScope,
        page: u32,
        query: String,
    },
    Discover {
        media_type: MediaType,
        genre_id: Option<u32>,
        year: Option<i32>,
        page: u32,
    },
    Details(MediaType, u64),
    Genres(MediaType),
    Availability(String),
    ImdbToWatchmode(String),
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CacheKey::Search { scope, page, query } => write!(
                f,
                "search:{}:{}:{}",
                scope.as_str(),
                page,
                query.trim().to_lowercase()
            ),
            CacheKey::Discover {
                media_type,
                genre_id,
                year,
                page,
            } => write!(
                f,
                "discover:{}:{}:{}:{}",
                media_type,
                genre_id.map(|g| g.to_string()).unwrap_or_else(|| "-".into()),
                year.map(|y| y.to_string()).unwrap_or_else(|| "-".into()),
                page
            ),
            CacheKey::Details(media_type, id) => write!(f, "details:{}-{}", media_type, id),
            CacheKey::Genres(media_type) => write!(f, "genres:{}", media_type),
            CacheKey::Availability(id) => write!(f, "avail:{}", id),
            CacheKey::ImdbToWatchmode(imdb_id) => write!(f, "imdb2wm:{}", imdb_id),
        }
    }
}

/// Creates a Redis client for caching
///
/// Opening the client does not connect; connections are made per operation.
pub fn create_redis_client(redis_url: &str) -> anyhow::Result<Client> {
    let client = Client::open(redis_url)?;
    Ok(client)
}

/// Message for asynchronous cache writes
struct CacheWriteMessage {
    key: String,
    value: String,
    ttl: u64,
}

#[derive(Clone)]
struct CacheBackend {
    redis_client: Client,
    write_tx: mpsc::UnboundedSender<CacheWriteMessage>,
}

/// Read-through cache backed by Redis, or a no-op when disabled
#[derive(Clone)]
pub struct Cache {
    backend: Option<CacheBackend>,
}

/// Handle for gracefully shutting down the cache writer
pub struct CacheWriterHandle {
    shutdown_tx: Option<mpsc::Sender<()>>,
    task: Option<tokio::task::JoinHandle<()>>,
}

impl CacheWriterHandle {
    /// Signals the writer to stop and waits until pending writes are flushed
    pub async fn shutdown(self) {
        let (Some(shutdown_tx), Some(task)) = (self.shutdown_tx, self.task) else {
            return;
        };
        let _ = shutdown_tx.send(()).await;
        tracing::info!("Cache writer shutdown signal sent");
        if let Err(e) = task.await {
            tracing::error!(error = %e, "Cache writer task panicked");
        }
    }
}

impl Cache {
    /// Creates a new Cache instance with an async write background task
    ///
    /// Writes go through a channel to a spawned task so cache operations never
    /// block API responses.
    pub fn new(redis_client: Client) -> (Self, CacheWriterHandle) {
        let (write_tx, write_rx) = mpsc::unbounded_channel();
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);

        let client = redis_client.clone();
        let task = tokio::spawn(async move {
            Self::cache_writer_task(client, write_rx, shutdown_rx).await;
        });

        let cache = Self {
            backend: Some(CacheBackend {
                redis_client,
                write_tx,
            }),
        };

        let handle = CacheWriterHandle {
            shutdown_tx: Some(shutdown_tx),
            task: Some(task),
        };

        (cache, handle)
    }

    /// A cache that always misses and drops writes
    pub fn disabled() -> (Self, CacheWriterHandle) {
        (
            Self { backend: None },
            CacheWriterHandle {
                shutdown_tx: None,
                task: None,
            },
        )
    }

    /// Builds a Redis cache when a URL is configured, otherwise a disabled one
    pub fn from_url(redis_url: Option<&str>) -> anyhow::Result<(Self, CacheWriterHandle)> {
        match redis_url {
            Some(url) => {
                let client = create_redis_client(url)?;
                tracing::info!("Redis cache enabled");
                Ok(Self::new(client))
            }
            None => {
                tracing::info!("REDIS_URL not set, caching disabled");
                Ok(Self::disabled())
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.backend.is_some()
    }

    /// Background task that processes cache write messages
    ///
    /// On shutdown signal, flushes all remaining messages before exiting.
    async fn cache_writer_task(
        client: Client,
        mut write_rx: mpsc::UnboundedReceiver<CacheWriteMessage>,
        mut shutdown_rx: mpsc::Receiver<()>,
    ) {
        tracing::debug!("Cache writer task started");

        loop {
            tokio::select! {
                Some(msg) = write_rx.recv() => {
                    if let Err(e) = Self::write_to_redis(&client, msg).await {
                        tracing::warn!(error = %e, "Failed to write to Redis cache");
                    }
                }
                _ = shutdown_rx.recv() => {
                    write_rx.close();
                    let mut flushed = 0usize;
                    while let Some(msg) = write_rx.recv().await {
                        if let Err(e) = Self::write_to_redis(&client, msg).await {
                            tracing::warn!(error = %e, "Failed to flush cache write during shutdown");
                        } else {
                            flushed += 1;
                        }
                    }

                    tracing::info!(flushed, "Cache writer task stopped");
                    break;
                }
            }
        }
    }

    /// Writes a single message to Redis
    async fn write_to_redis(client: &Client, msg: CacheWriteMessage) -> AppResult<()> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let _: () = conn.set_ex(msg.key, msg.value, msg.ttl).await?;
        Ok(())
    }

    async fn read_from_redis(client: &Client, key: &str) -> AppResult<Option<String>> {
        let mut conn = client.get_multiplexed_async_connection().await?;
        let cached: Option<String> = conn.get(key).await?;
        Ok(cached)
    }

    /// Retrieves a value from the cache by key
    ///
    /// Connection failures and undecodable entries are logged and reported as
    /// a miss, so an unavailable Redis only costs an upstream call.
    pub async fn get_from_cache<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let backend = self.backend.as_ref()?;
        let key = key.to_string();

        let json = match Self::read_from_redis(&backend.redis_client, &key).await {
            Ok(Some(json)) => json,
            Ok(None) => {
                tracing::debug!(key = %key, "Cache miss");
                return None;
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&json) {
            Ok(value) => {
                tracing::debug!(key = %key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cache deserialization error");
                None
            }
        }
    }

    /// Stores a value in the cache without waiting for the write
    pub fn set_in_background<T: serde::Serialize>(&self, key: &CacheKey, value: &T, ttl: u64) {
        let Some(backend) = self.backend.as_ref() else {
            return;
        };

        let json = match serde_json::to_string(value) {
            Ok(j) => j,
            Err(e) => {
                tracing::error!(error = %e, "Cache serialization error");
                return;
            }
        };

        let msg = CacheWriteMessage {
            key: key.to_string(),
            value: json,
            ttl,
        };

        if let Err(e) = backend.write_tx.send(msg) {
            tracing::error!(error = %e, "Failed to send cache write message");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_key_display_search() {
        let key = CacheKey::Search {
            scope: SearchScope::Multi,
            page: 1,
            query: "  Stranger Things ".to_string(),
        };
        assert_eq!(format!("{}", key), "search:multi:1:stranger things");
    }

    #[test]
    fn test_cache_key_display_discover() {
        let key = CacheKey::Discover {
            media_type: MediaType::Movie,
            genre_id: Some(878),
            year: None,
            page: 2,
        };
        assert_eq!(format!("{}", key), "discover:movie:878:-:2");
    }

    #[test]
    fn test_cache_key_display_details_and_genres() {
        assert_eq!(
            CacheKey::Details(MediaType::Tv, 1396).to_string(),
            "details:tv-1396"
        );
        assert_eq!(CacheKey::Genres(MediaType::Movie).to_string(), "genres:movie");
    }

    #[test]
    fn test_cache_key_display_availability() {
        let key = CacheKey::Availability("movie-603".to_string());
        assert_eq!(format!("{}", key), "avail:movie-603");
    }

    #[test]
    fn test_cache_key_display_imdb_to_watchmode() {
        let key = CacheKey::ImdbToWatchmode("tt1375666".to_string());
        assert_eq!(format!("{}", key), "imdb2wm:tt1375666");
    }

    #[test]
    fn test_disabled_cache_always_misses() {
        let (cache, handle) = Cache::disabled();
        assert!(!cache.is_enabled());

        let key = CacheKey::Genres(MediaType::Movie);
        cache.set_in_background(&key, &vec!["Action".to_string()], 60);
        let retrieved: Option<Vec<String>> = tokio_test::block_on(cache.get_from_cache(&key));
        assert_eq!(retrieved, None);

        tokio_test::block_on(handle.shutdown());
    }

    #[tokio::test]
    async fn test_unreachable_redis_is_a_miss() {
        // Nothing listens on port 1
        let client = create_redis_client("redis://127.0.0.1:1").unwrap();
        let (cache, handle) = Cache::new(client);

        let key = CacheKey::Details(MediaType::Movie, 603);
        let retrieved: Option<String> = cache.get_from_cache(&key).await;
        assert_eq!(retrieved, None);

        cache.set_in_background(&key, &"value", 60);
        handle.shutdown().await;
    }

    #[tokio::test]
    #[ignore = "requires a running Redis (REDIS_URL)"]
    async fn test_set_in_background_writes_to_cache() {
        let redis_url =
            std::env::var("REDIS_URL").unwrap_or_else(|_| "redis://localhost:6379".to_string());

        let client = create_redis_client(&redis_url).unwrap();
        let (cache, handle) = Cache::new(client.clone());

        let key = CacheKey::Search {
            scope: SearchScope::Movie,
            page: 1,
            query: "test_async_write".to_string(),
        };
        let value = vec!["item1".to_string(), "item2".to_string()];

        cache.set_in_background(&key, &value, 60);

        // Shutdown waits for the flush
        handle.shutdown().await;

        let retrieved: Option<Vec<String>> = cache.get_from_cache(&key).await;
        assert_eq!(retrieved, Some(value));

        let mut conn = client.get_multiplexed_async_connection().await.unwrap();
        let _: () = conn.del(key.to_string()).await.unwrap();
    }
}
