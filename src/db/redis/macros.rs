/// Read-through caching around an async computation.
///
/// Returns the cached value for `$key` when present. Otherwise awaits
/// `$block`, propagating its error with `?`, schedules a background write of
/// the result with `$ttl` seconds to live, and returns it.
///
/// The enclosing function must return `AppResult<_>`.
///
/// # Example
/// ```rust,ignore
/// cached!(self.cache, CacheKey::Genres(media_type), GENRES_CACHE_TTL, async move {
///     self.fetch_genres(media_type).await
/// })
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let key = $key;
        if let Some(cached) = $cache.get_from_cache(&key).await {
            Ok(cached)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&key, &value, $ttl);
            Ok(value)
        }
    }};
}
