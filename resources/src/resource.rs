//! Eager resources: a collection path plus a filter, loaded through the cache
//! whenever the filter changes.

use crate::cache::{Cache, FetchResult, SharedError, Snapshot, Subscription};
use futures::future::{FutureExt, LocalBoxFuture};
use payloads::{APIClient, CacheKey, ClientError, PageResult, query::Filter};
use serde::de::DeserializeOwned;
use std::{cell::Cell, rc::Rc};

/// Issues the request for a cache key.
pub type Fetcher<T> =
    Rc<dyn Fn(&CacheKey) -> LocalBoxFuture<'static, Result<T, ClientError>>>;

/// Fetcher that GETs the key from the REST API and decodes it as `T`.
pub fn api_fetcher<T: DeserializeOwned + 'static>(client: APIClient) -> Fetcher<T> {
    Rc::new(move |key: &CacheKey| {
        let client = client.clone();
        let key = key.clone();
        async move { client.fetch_key::<T>(&key).await }.boxed_local()
    })
}

/// When a mounted resource revalidates on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    pub revalidate_on_focus: bool,
    pub revalidate_on_reconnect: bool,
    /// Polling interval; 0 disables polling.
    pub refresh_interval_ms: u32,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            revalidate_on_focus: true,
            revalidate_on_reconnect: true,
            refresh_interval_ms: 0,
        }
    }
}

impl RefreshPolicy {
    /// Only revalidate when asked to.
    pub fn manual() -> Self {
        Self {
            revalidate_on_focus: false,
            revalidate_on_reconnect: false,
            refresh_interval_ms: 0,
        }
    }

    pub fn polling(interval_ms: u32) -> Self {
        Self {
            refresh_interval_ms: interval_ms,
            ..Self::default()
        }
    }

    pub fn is_polling(&self) -> bool {
        self.refresh_interval_ms > 0
    }
}

/// The state a screen renders from.
#[derive(Debug)]
pub struct ResourceState<T> {
    pub data: Option<Rc<T>>,
    pub error: Option<SharedError>,
    /// Nothing has been received yet.
    pub is_loading: bool,
    /// A request is in flight; any previous data is still in `data`.
    pub is_validating: bool,
}

impl<T> Clone for ResourceState<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_loading: self.is_loading,
            is_validating: self.is_validating,
        }
    }
}

impl<T> From<Snapshot<T>> for ResourceState<T> {
    fn from(snapshot: Snapshot<T>) -> Self {
        Self {
            is_loading: snapshot.data.is_none() && snapshot.error.is_none(),
            is_validating: snapshot.is_validating,
            data: snapshot.data,
            error: snapshot.error,
        }
    }
}

impl<T> ResourceState<T> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> ResourceState<PageResult<T>> {
    /// Rows of the current page, in server order.
    pub fn items(&self) -> &[T] {
        self.data
            .as_deref()
            .map(|page| page.results.as_slice())
            .unwrap_or_default()
    }

    pub fn total_count(&self) -> Option<u64> {
        self.data.as_ref().and_then(|page| page.total_count)
    }
}

/// A cached view of one collection query.
///
/// The cache key is derived from the path and filter on every call, so a
/// filter change is a key change and the next [`Resource::load`] fetches.
pub struct Resource<T, F> {
    cache: Cache,
    path: &'static str,
    filter: F,
    fetcher: Fetcher<T>,
    pub policy: RefreshPolicy,
}

impl<T, F: Clone> Clone for Resource<T, F> {
    fn clone(&self) -> Self {
        Self {
            cache: self.cache.clone(),
            path: self.path,
            filter: self.filter.clone(),
            fetcher: self.fetcher.clone(),
            policy: self.policy,
        }
    }
}

impl<T: 'static, F: Filter> Resource<T, F> {
    pub fn new(
        cache: Cache,
        path: &'static str,
        filter: F,
        fetcher: Fetcher<T>,
    ) -> Self {
        Self {
            cache,
            path,
            filter,
            fetcher,
            policy: RefreshPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn key(&self) -> CacheKey {
        CacheKey::new(self.path, &self.filter)
    }

    pub fn path(&self) -> &'static str {
        self.path
    }

    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Replace the filter. Returns false when nothing changed.
    pub fn set_filter(&mut self, filter: F) -> bool {
        if self.filter == filter {
            return false;
        }
        tracing::debug!(path = self.path, "filter changed");
        self.filter = filter;
        true
    }

    pub fn update_filter(&mut self, update: impl FnOnce(&mut F)) -> bool {
        let mut filter = self.filter.clone();
        update(&mut filter);
        self.set_filter(filter)
    }

    pub fn load(&self) -> LocalBoxFuture<'static, FetchResult<T>> {
        let key = self.key();
        let fetcher = self.fetcher.clone();
        let fetch_key = key.clone();
        self.cache.load(&key, move || fetcher(&fetch_key))
    }

    pub fn revalidate(&self) -> LocalBoxFuture<'static, FetchResult<T>> {
        let key = self.key();
        let fetcher = self.fetcher.clone();
        let fetch_key = key.clone();
        self.cache.revalidate(&key, move || fetcher(&fetch_key))
    }

    pub fn state(&self) -> ResourceState<T> {
        self.cache.snapshot::<T>(&self.key()).into()
    }

    /// Listen for changes to the current key.
    pub fn subscribe(&self, notify: impl Fn() + 'static) -> Subscription {
        self.cache.subscribe(&self.key(), notify)
    }

    /// Like [`Resource::subscribe`], and also reload the key once each time
    /// it is invalidated. `reload` receives the request future and is
    /// responsible for driving it; a mounted screen spawns it.
    ///
    /// A failed reload is not retried until the key is invalidated again.
    pub fn watch(
        &self,
        notify: impl Fn() + 'static,
        reload: impl Fn(LocalBoxFuture<'static, FetchResult<T>>) + 'static,
    ) -> Subscription {
        let resource = self.clone();
        let key = self.key();
        let reloaded = Cell::new(None);
        let listener_key = key.clone();
        self.cache.subscribe(&listener_key, move || {
            notify();
            let snapshot = resource.cache.snapshot::<T>(&key);
            if !snapshot.is_stale
                || snapshot.is_validating
                || reloaded.get() == Some(snapshot.generation)
            {
                return;
            }
            reloaded.set(Some(snapshot.generation));
            tracing::debug!(%key, "reloading invalidated resource");
            reload(resource.load());
        })
    }
}

impl<T: DeserializeOwned + 'static, F: Filter> Resource<T, F> {
    pub fn with_client(
        cache: Cache,
        client: APIClient,
        path: &'static str,
        filter: F,
    ) -> Self {
        Self::new(cache, path, filter, api_fetcher(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use payloads::{FilterCriteria, paths};
    use std::cell::RefCell;

    /// Records each requested key and answers with a page of one row: the key.
    fn recording(log: &Rc<RefCell<Vec<String>>>) -> Fetcher<PageResult<String>> {
        let log = log.clone();
        Rc::new(move |key: &CacheKey| {
            log.borrow_mut().push(key.to_string());
            let page = PageResult::new(vec![key.to_string()], Some(1));
            futures::future::ready(Ok(page)).boxed_local()
        })
    }

    fn resource(
        log: &Rc<RefCell<Vec<String>>>,
    ) -> Resource<PageResult<String>, FilterCriteria> {
        Resource::new(
            Cache::new(),
            paths::TEST_CONFIG,
            FilterCriteria::page(0, 10),
            recording(log),
        )
    }

    #[test]
    fn loading_state_before_first_response() {
        let log = Rc::default();
        let resource = resource(&log);
        let state = resource.state();
        assert!(state.is_loading);
        assert!(state.items().is_empty());
        assert_eq!(state.total_count(), None);
    }

    #[test]
    fn filter_change_fetches_the_new_key() {
        let log = Rc::default();
        let mut resource = resource(&log);
        block_on(resource.load()).unwrap();

        assert!(resource.update_filter(|f| f.q = Some("cbc".into())));
        block_on(resource.load()).unwrap();

        assert_eq!(
            *log.borrow(),
            vec![
                "labmanagement/testconfig?startIndex=0&limit=10",
                "labmanagement/testconfig?startIndex=0&limit=10&q=cbc",
            ]
        );
        let state = resource.state();
        assert!(!state.is_loading);
        assert_eq!(
            state.items(),
            ["labmanagement/testconfig?startIndex=0&limit=10&q=cbc"]
        );
    }

    #[test]
    fn unchanged_filter_does_not_refetch() {
        let log = Rc::default();
        let mut resource = resource(&log);
        block_on(resource.load()).unwrap();

        assert!(!resource.set_filter(FilterCriteria::page(0, 10)));
        block_on(resource.load()).unwrap();
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn two_resources_with_one_key_share_the_cache() {
        let log = Rc::default();
        let first = resource(&log);
        let second = Resource::new(
            first.cache.clone(),
            paths::TEST_CONFIG,
            FilterCriteria::page(0, 10),
            recording(&log),
        );

        let (a, b) = block_on(futures::future::join(first.load(), second.load()));
        assert!(Rc::ptr_eq(&a.unwrap(), &b.unwrap()));
        assert_eq!(log.borrow().len(), 1);
    }

    #[test]
    fn watched_resource_reloads_once_per_invalidation() {
        let log = Rc::default();
        let resource = resource(&log);
        block_on(resource.load()).unwrap();

        let reloads = Rc::new(RefCell::new(Vec::new()));
        let _watch = resource.watch(|| {}, {
            let reloads = reloads.clone();
            move |reload| reloads.borrow_mut().push(reload)
        });

        resource.cache.invalidate_path(paths::TEST_CONFIG);
        let pending: Vec<_> = reloads.borrow_mut().drain(..).collect();
        assert_eq!(pending.len(), 1);
        for reload in pending {
            block_on(reload).unwrap();
        }
        assert_eq!(log.borrow().len(), 2);
        assert!(!resource.state().is_validating);

        // Settling notifies again but the key is fresh, so nothing reloads.
        assert!(reloads.borrow().is_empty());
    }

    #[test]
    fn failed_reload_waits_for_the_next_invalidation() {
        let calls = Rc::new(Cell::new(0));
        let fetcher: Fetcher<u32> = {
            let calls = calls.clone();
            Rc::new(move |_: &CacheKey| {
                calls.set(calls.get() + 1);
                let result = match calls.get() {
                    1 => Ok(1),
                    _ => Err(ClientError::APIError(
                        payloads::StatusCode::SERVICE_UNAVAILABLE,
                        "down".into(),
                    )),
                };
                futures::future::ready(result).boxed_local()
            })
        };
        let resource = Resource::new(
            Cache::new(),
            paths::STORAGE_UNIT,
            FilterCriteria::default(),
            fetcher,
        );
        block_on(resource.load()).unwrap();

        let _watch = resource.watch(|| {}, |reload| {
            assert!(block_on(reload).is_err());
        });
        resource.cache.invalidate_path(paths::STORAGE_UNIT);
        assert_eq!(calls.get(), 2);
        assert_eq!(resource.state().data.as_deref(), Some(&1));

        resource.cache.invalidate_path(paths::STORAGE_UNIT);
        assert_eq!(calls.get(), 3);
    }

    #[test]
    fn policies() {
        assert!(!RefreshPolicy::default().is_polling());
        let polling = RefreshPolicy::polling(5_000);
        assert!(polling.is_polling());
        assert!(polling.revalidate_on_focus);
        assert!(!RefreshPolicy::manual().revalidate_on_reconnect);
    }
}
