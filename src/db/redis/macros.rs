/// A macro to simplify caching logic using Redis.
///
/// Checks the cache first and returns the hit when present. On a miss the
/// provided block computes the value, which is stored in the background
/// and returned. A failed cache read is logged and treated as a miss, so
/// an unreachable Redis never stops the value from being computed.
///
/// # Arguments
/// * `$cache`: The cache instance to use for retrieval and storage. The cache must have
///   `get_from_cache` and `set_in_background` methods.
/// * `$key`: The key to use for caching the value.
/// * `$ttl`: The time-to-live (TTL) for the cached value in seconds.
/// * `$block`: The block of code to execute if the value is not found in cache.
///
/// # Example
/// ```ignore
/// let report = cached!(cache, CacheKey::SuccessReport, 1800, async {
///     // Compute the report if not in cache
///     build_success_report().await
/// });
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        let cached = match $cache.get_from_cache(&$key).await {
            Ok(hit) => hit,
            Err(e) => {
                tracing::warn!(error = %e, key = %$key, "Cache read failed, recomputing");
                None
            }
        };

        if let Some(value) = cached {
            Ok(value)
        } else {
            let value = $block.await?;
            $cache.set_in_background(&$key, &value, $ttl);
            Ok(value)
        }
    }};
}
