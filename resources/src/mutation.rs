use crate::cache::Cache;
use payloads::ClientError;
use std::future::Future;

/// Run a write against the API and, if it succeeds, invalidate every cached
/// key under `affected_paths` so mounted resources refetch.
///
/// A failed mutation leaves the cache untouched and returns the error as-is.
pub async fn mutate<T, Fut>(
    cache: &Cache,
    affected_paths: &[&str],
    mutation: Fut,
) -> Result<T, ClientError>
where
    Fut: Future<Output = Result<T, ClientError>>,
{
    let result = mutation.await;
    match &result {
        Ok(_) => {
            for path in affected_paths {
                cache.invalidate_path(path);
            }
        }
        Err(e) => tracing::warn!(?affected_paths, error = %e, "mutation failed"),
    }
    result
}
