/// Serves a value from the recommendation cache, computing it on a miss.
///
/// `$cache` is an `Option<&Cache>`; with no cache configured the value is
/// always computed. A failed cache read is logged and treated as a miss.
/// `$compute` must evaluate to an `AppResult<T>`; errors are returned from
/// the enclosing function without touching the cache.
///
/// # Example
/// ```rust,ignore
/// let recs: Vec<Recommendation> = cached!(state.cache.as_ref(), key, {
///     recommend(&matrix, &user_id, k, metric, &params).map_err(AppError::from)
/// })?;
/// ```
#[macro_export]
macro_rules! cached {
    ($cache:expr, $key:expr, $compute:expr) => {{
        match $cache {
            Some(cache) => {
                match cache.get(&$key).await {
                    Ok(Some(hit)) => {
                        tracing::debug!(key = %$key, "Cache hit");
                        Ok(hit)
                    }
                    miss => {
                        if let Err(e) = miss {
                            tracing::warn!(key = %$key, error = %e, "Cache read failed");
                        }
                        let value = $compute?;
                        cache.put_in_background(&$key, &value);
                        Ok(value)
                    }
                }
            }
            None => $compute,
        }
    }};
}
