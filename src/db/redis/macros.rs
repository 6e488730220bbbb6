/// Serves a value from the result cache, computing and storing it on a miss.
///
/// `$cache` is an `Option<&Cache>`; with `None` the block is evaluated directly.
/// A failed cache read is logged and treated as a miss, so Redis trouble never
/// fails a request.
///
/// # Arguments
/// * `$cache`: `Option<&Cache>` to read from and write to.
/// * `$key`: the `CacheKey` for the value.
/// * `$ttl`: time-to-live in seconds.
/// * `$block`: expression producing an `AppResult<T>` on a miss.
///
/// # Example
/// ```rust,ignore
/// let recs: Recommendations = cached!(state.cache.as_ref(), key, ttl, {
///     recommender.recommend(&user_id, weight, num_recs)
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $ttl:expr, $block:expr) => {{
        match $cache {
            Some(cache) => match cache.get_from_cache(&$key).await {
                Ok(Some(hit)) => {
                    tracing::debug!(key = %$key, "Cache hit");
                    Ok(hit)
                }
                lookup => {
                    if let Err(e) = lookup {
                        tracing::warn!(key = %$key, error = %e, "Cache read failed");
                    }
                    match $block {
                        Ok(value) => {
                            cache.set_in_background(&$key, &value, $ttl);
                            Ok(value)
                        }
                        Err(e) => Err(e),
                    }
                }
            },
            None => $block,
        }
    }};
}
