/// Read-through caching over an optional [`Cache`](crate::db::Cache).
///
/// * `Some(cache)` with a hit returns the cached value.
/// * A miss computes the value with `$block`, queues it for storage and returns it.
/// * An unavailable backend is logged at warn level; the value is computed and
///   returned without being stored.
/// * `None` (caching disabled) always computes.
///
/// The expression evaluates to `AppResult<T>`; `$block` must be a future
/// resolving to `AppResult<T>` and is awaited at most once.
///
/// # Example
/// ```rust,ignore
/// let key = CacheKey::Film(id);
/// let film: FilmSummary = cached!(state.cache.as_ref(), key, async {
///     load_film(&state, id).await
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $block:expr) => {{
        let key = &$key;
        let result: $crate::error::AppResult<_> = match $cache {
            Some(cache) => match cache.get_from_cache(key).await {
                Ok(Some(hit)) => Ok(hit),
                Ok(None) => match $block.await {
                    Ok(value) => {
                        cache.set_in_background(key, &value);
                        Ok(value)
                    }
                    Err(e) => Err(e),
                },
                Err(e) => {
                    tracing::warn!(error = %e, key = %key, "Cache unavailable, serving uncached");
                    $block.await
                }
            },
            None => $block.await,
        };
        result
    }};
}
