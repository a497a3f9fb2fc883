//! Keyed stale-while-revalidate cache.
//!
//! Entries are keyed by [`CacheKey`] and typed by the response they hold.
//! Concurrent loads of one key share a single request through
//! [`futures::future::Shared`]; the cache keeps only a weak handle to it, so
//! once every consumer is dropped the request is cancelled. Invalidation
//! marks entries stale and bumps their generation, and a response that
//! arrives for an older generation is discarded.

use futures::future::{self, FutureExt, LocalBoxFuture, Shared, WeakShared};
use payloads::{CacheKey, ClientError};
use std::{
    any::Any,
    cell::RefCell,
    collections::HashMap,
    future::Future,
    rc::{Rc, Weak},
};

/// Errors are shared between every consumer of a request.
pub type SharedError = Rc<ClientError>;

pub type FetchResult<T> = Result<Rc<T>, SharedError>;

type InFlight<T> = Shared<LocalBoxFuture<'static, FetchResult<T>>>;
type WeakInFlight<T> = WeakShared<LocalBoxFuture<'static, FetchResult<T>>>;

struct Entry<T> {
    data: Option<Rc<T>>,
    error: Option<SharedError>,
    stale: bool,
    generation: u64,
    in_flight: Option<WeakInFlight<T>>,
}

impl<T> Default for Entry<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            stale: false,
            generation: 0,
            in_flight: None,
        }
    }
}

impl<T> Entry<T> {
    fn in_flight(&self) -> Option<InFlight<T>> {
        self.in_flight.as_ref().and_then(WeakShared::upgrade)
    }
}

/// Type-erased view of an entry for operations that don't need its data.
trait Slot {
    fn mark_stale(&mut self);
    /// Nothing worth keeping once no one watches the key.
    fn is_disposable(&self) -> bool;
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: 'static> Slot for Entry<T> {
    fn mark_stale(&mut self) {
        self.stale = true;
        self.generation += 1;
        self.in_flight = None;
    }

    fn is_disposable(&self) -> bool {
        self.in_flight().is_none() && (self.data.is_none() || self.stale)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

struct Listener {
    id: u64,
    key: CacheKey,
    notify: Rc<dyn Fn()>,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<CacheKey, Box<dyn Slot>>,
    listeners: Vec<Listener>,
    next_listener_id: u64,
}

impl Inner {
    fn with_entry<T: 'static, R>(
        &mut self,
        key: &CacheKey,
        f: impl FnOnce(&mut Entry<T>) -> R,
    ) -> R {
        let slot = self
            .entries
            .entry(key.clone())
            .or_insert_with(|| Box::new(Entry::<T>::default()));
        if let Some(entry) = slot.as_any_mut().downcast_mut::<Entry<T>>() {
            return f(entry);
        }
        tracing::warn!(%key, "cache entry replaced by a different response type");
        let mut entry = Entry::<T>::default();
        let out = f(&mut entry);
        *slot = Box::new(entry);
        out
    }

    fn peek<T: 'static, R>(
        &self,
        key: &CacheKey,
        f: impl FnOnce(&Entry<T>) -> R,
    ) -> Option<R> {
        self.entries
            .get(key)
            .and_then(|slot| slot.as_any().downcast_ref::<Entry<T>>())
            .map(f)
    }
}

/// What a consumer currently sees for a key.
#[derive(Debug)]
pub struct Snapshot<T> {
    /// Last successful response, kept through revalidation and errors.
    pub data: Option<Rc<T>>,
    /// Error from the latest settled request, if it failed.
    pub error: Option<SharedError>,
    /// A request for this key is in flight.
    pub is_validating: bool,
    /// The data was invalidated and should be refetched.
    pub is_stale: bool,
    /// Bumped on every invalidation of the key.
    pub generation: u64,
}

impl<T> Default for Snapshot<T> {
    fn default() -> Self {
        Self {
            data: None,
            error: None,
            is_validating: false,
            is_stale: false,
            generation: 0,
        }
    }
}

impl<T> Clone for Snapshot<T> {
    fn clone(&self) -> Self {
        Self {
            data: self.data.clone(),
            error: self.error.clone(),
            is_validating: self.is_validating,
            is_stale: self.is_stale,
            generation: self.generation,
        }
    }
}

/// Shared handle to the cache. Clones refer to the same entries.
#[derive(Clone, Default)]
pub struct Cache {
    inner: Rc<RefCell<Inner>>,
}

impl PartialEq for Cache {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Cache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot<T: 'static>(&self, key: &CacheKey) -> Snapshot<T> {
        self.inner
            .borrow()
            .peek::<T, _>(key, |entry| Snapshot {
                data: entry.data.clone(),
                error: entry.error.clone(),
                is_validating: entry.in_flight().is_some(),
                is_stale: entry.stale,
                generation: entry.generation,
            })
            .unwrap_or_default()
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        self.inner.borrow().entries.contains_key(key)
    }

    /// Return fresh cached data, join a request already in flight, or start
    /// a new one with `fetch`.
    pub fn load<T, Fut>(
        &self,
        key: &CacheKey,
        fetch: impl FnOnce() -> Fut,
    ) -> LocalBoxFuture<'static, FetchResult<T>>
    where
        T: 'static,
        Fut: Future<Output = Result<T, ClientError>> + 'static,
    {
        self.request(key, fetch, false)
    }

    /// Like [`Cache::load`], but fetches even when the cached data is fresh.
    /// A request already in flight is still joined rather than duplicated.
    pub fn revalidate<T, Fut>(
        &self,
        key: &CacheKey,
        fetch: impl FnOnce() -> Fut,
    ) -> LocalBoxFuture<'static, FetchResult<T>>
    where
        T: 'static,
        Fut: Future<Output = Result<T, ClientError>> + 'static,
    {
        self.request(key, fetch, true)
    }

    fn request<T, Fut>(
        &self,
        key: &CacheKey,
        fetch: impl FnOnce() -> Fut,
        force: bool,
    ) -> LocalBoxFuture<'static, FetchResult<T>>
    where
        T: 'static,
        Fut: Future<Output = Result<T, ClientError>> + 'static,
    {
        enum Plan<T> {
            Cached(Rc<T>),
            Join(InFlight<T>),
            Fetch(u64),
        }

        let plan = self.inner.borrow_mut().with_entry::<T, _>(key, |entry| {
            if let Some(data) = &entry.data {
                if !force && !entry.stale {
                    return Plan::Cached(data.clone());
                }
            }
            match entry.in_flight() {
                Some(shared) => Plan::Join(shared),
                None => Plan::Fetch(entry.generation),
            }
        });

        let generation = match plan {
            Plan::Cached(data) => {
                tracing::trace!(%key, "cache hit");
                return future::ready(Ok(data)).boxed_local();
            }
            Plan::Join(shared) => {
                tracing::debug!(%key, "joining in-flight request");
                return shared.boxed_local();
            }
            Plan::Fetch(generation) => generation,
        };

        tracing::debug!(%key, generation, "fetching");
        let request = fetch();
        let cache = Rc::downgrade(&self.inner);
        let settle_key = key.clone();
        let shared = async move {
            let result = request.await.map(Rc::new).map_err(Rc::new);
            if let Some(inner) = cache.upgrade() {
                Cache { inner }.settle(&settle_key, generation, &result);
            }
            result
        }
        .boxed_local()
        .shared();

        let weak = shared.downgrade();
        self.inner
            .borrow_mut()
            .with_entry::<T, _>(key, |entry| entry.in_flight = weak);
        self.notify(key);
        shared.boxed_local()
    }

    fn settle<T: 'static>(
        &self,
        key: &CacheKey,
        generation: u64,
        result: &FetchResult<T>,
    ) {
        let applied = self.inner.borrow_mut().with_entry::<T, _>(key, |entry| {
            if entry.generation != generation {
                return false;
            }
            entry.in_flight = None;
            match result {
                Ok(data) => {
                    entry.data = Some(data.clone());
                    entry.error = None;
                    entry.stale = false;
                }
                Err(error) => entry.error = Some(error.clone()),
            }
            true
        });

        if !applied {
            tracing::debug!(%key, "discarding response superseded by invalidation");
            return;
        }
        if let Err(error) = result {
            tracing::warn!(%key, %error, "fetch failed");
        }
        self.notify(key);
    }

    /// Mark one key stale. Returns whether the key was cached.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let found = self
            .inner
            .borrow_mut()
            .entries
            .get_mut(key)
            .map(|slot| slot.mark_stale())
            .is_some();
        if found {
            tracing::debug!(%key, "invalidated");
            self.notify(key);
        }
        found
    }

    /// Mark every key under a resource path stale: the collection, any query
    /// over it, and any entity below it. Returns the number of keys touched.
    pub fn invalidate_path(&self, path: &str) -> usize {
        let keys: Vec<CacheKey> = self
            .inner
            .borrow_mut()
            .entries
            .iter_mut()
            .filter(|(key, _)| key.is_under(path))
            .map(|(key, slot)| {
                slot.mark_stale();
                key.clone()
            })
            .collect();
        tracing::debug!(path, count = keys.len(), "invalidated path");
        for key in &keys {
            self.notify(key);
        }
        keys.len()
    }

    /// Call `notify` whenever the entry for `key` changes. The listener is
    /// removed when the returned subscription is dropped; if it was the last
    /// one for `key`, an entry with no data, or only stale data, goes too.
    pub fn subscribe(
        &self,
        key: &CacheKey,
        notify: impl Fn() + 'static,
    ) -> Subscription {
        let mut inner = self.inner.borrow_mut();
        inner.next_listener_id += 1;
        let id = inner.next_listener_id;
        inner.listeners.push(Listener {
            id,
            key: key.clone(),
            notify: Rc::new(notify),
        });
        Subscription {
            id,
            key: key.clone(),
            cache: Rc::downgrade(&self.inner),
        }
    }

    fn notify(&self, key: &CacheKey) {
        // Listeners may call back into the cache, so no borrow is held while
        // they run.
        let listeners: Vec<Rc<dyn Fn()>> = self
            .inner
            .borrow()
            .listeners
            .iter()
            .filter(|listener| &listener.key == key)
            .map(|listener| listener.notify.clone())
            .collect();
        for listener in listeners {
            listener();
        }
    }
}

#[must_use = "the listener is removed when the subscription is dropped"]
pub struct Subscription {
    id: u64,
    key: CacheKey,
    cache: Weak<RefCell<Inner>>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(cache) = self.cache.upgrade() else {
            return;
        };
        let mut inner = cache.borrow_mut();
        inner.listeners.retain(|listener| listener.id != self.id);
        if inner.listeners.iter().any(|listener| listener.key == self.key) {
            return;
        }
        let disposable = inner
            .entries
            .get(&self.key)
            .is_some_and(|slot| slot.is_disposable());
        if disposable {
            inner.entries.remove(&self.key);
            tracing::trace!(key = %self.key, "evicted unwatched entry");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::{channel::oneshot, executor::block_on, future::join};
    use payloads::StatusCode;
    use std::cell::Cell;

    fn key(path: &str) -> CacheKey {
        CacheKey::for_path(path)
    }

    fn counted(
        calls: &Rc<Cell<usize>>,
        value: u32,
    ) -> impl FnOnce() -> future::Ready<Result<u32, ClientError>> {
        let calls = calls.clone();
        move || {
            calls.set(calls.get() + 1);
            future::ready(Ok(value))
        }
    }

    fn failing() -> future::Ready<Result<u32, ClientError>> {
        future::ready(Err(ClientError::APIError(
            StatusCode::INTERNAL_SERVER_ERROR,
            "boom".into(),
        )))
    }

    fn pending(
        receiver: oneshot::Receiver<u32>,
    ) -> impl FnOnce() -> LocalBoxFuture<'static, Result<u32, ClientError>> {
        move || async move { Ok::<_, ClientError>(receiver.await.unwrap_or_default()) }.boxed_local()
    }

    #[test]
    fn concurrent_loads_share_one_request() {
        let cache = Cache::new();
        let calls = Rc::new(Cell::new(0));
        let k = key("labmanagement/worksheet");

        let first = cache.load(&k, counted(&calls, 1));
        let second = cache.load(&k, counted(&calls, 2));
        let (first, second) = block_on(join(first, second));

        assert_eq!(calls.get(), 1);
        assert_eq!(*first.unwrap(), 1);
        assert_eq!(*second.unwrap(), 1);
    }

    #[test]
    fn fresh_data_is_served_without_a_request() {
        let cache = Cache::new();
        let calls = Rc::new(Cell::new(0));
        let k = key("labmanagement/testconfig");

        block_on(cache.load(&k, counted(&calls, 7))).unwrap();
        let again = block_on(cache.load(&k, counted(&calls, 8))).unwrap();

        assert_eq!(calls.get(), 1);
        assert_eq!(*again, 7);
    }

    #[test]
    fn revalidate_fetches_even_when_fresh() {
        let cache = Cache::new();
        let calls = Rc::new(Cell::new(0));
        let k = key("labmanagement/batchjob");

        block_on(cache.load(&k, counted(&calls, 1))).unwrap();
        let refreshed = block_on(cache.revalidate(&k, counted(&calls, 2))).unwrap();

        assert_eq!(calls.get(), 2);
        assert_eq!(*refreshed, 2);
    }

    #[test]
    fn invalidated_data_stays_visible_while_revalidating() {
        let cache = Cache::new();
        let k = key("labmanagement/approvalflow");
        block_on(cache.load(&k, || future::ready(Ok(1u32)))).unwrap();

        assert!(cache.invalidate(&k));
        let (sender, receiver) = oneshot::channel();
        let refetch = cache.load(&k, pending(receiver));

        let snapshot = cache.snapshot::<u32>(&k);
        assert_eq!(snapshot.data.as_deref(), Some(&1));
        assert!(snapshot.is_validating);
        assert!(snapshot.is_stale);

        sender.send(2).unwrap();
        assert_eq!(*block_on(refetch).unwrap(), 2);
        let snapshot = cache.snapshot::<u32>(&k);
        assert_eq!(snapshot.data.as_deref(), Some(&2));
        assert!(!snapshot.is_validating);
        assert!(!snapshot.is_stale);
    }

    #[test]
    fn errors_keep_previous_data() {
        let cache = Cache::new();
        let k = key("labmanagement/storageunit");
        block_on(cache.load(&k, || future::ready(Ok(5u32)))).unwrap();

        cache.invalidate(&k);
        assert!(block_on(cache.load(&k, failing)).is_err());

        let snapshot = cache.snapshot::<u32>(&k);
        assert_eq!(snapshot.data.as_deref(), Some(&5));
        let error = snapshot.error.expect("error is recorded");
        assert_eq!(error.to_string(), "boom");
    }

    #[test]
    fn responses_from_before_invalidation_are_discarded() {
        let cache = Cache::new();
        let k = key("labmanagement/request");

        let (old_sender, old_receiver) = oneshot::channel();
        let old = cache.load(&k, pending(old_receiver));
        cache.invalidate(&k);
        let new = cache.load(&k, || future::ready(Ok(2u32)));

        assert_eq!(*block_on(new).unwrap(), 2);
        old_sender.send(1).unwrap();
        assert_eq!(*block_on(old).unwrap(), 1);

        assert_eq!(cache.snapshot::<u32>(&k).data.as_deref(), Some(&2));
    }

    #[test]
    fn dropping_every_consumer_cancels_the_request() {
        let cache = Cache::new();
        let calls = Rc::new(Cell::new(0));
        let k = key("labmanagement/referrerlocation");

        let (_sender, receiver) = oneshot::channel();
        let abandoned = cache.load(&k, pending(receiver));
        assert!(cache.snapshot::<u32>(&k).is_validating);
        drop(abandoned);
        assert!(!cache.snapshot::<u32>(&k).is_validating);

        let value = block_on(cache.load(&k, counted(&calls, 3))).unwrap();
        assert_eq!(calls.get(), 1);
        assert_eq!(*value, 3);
    }

    #[test]
    fn invalidate_path_only_touches_keys_below_it() {
        let cache = Cache::new();
        let worksheets = key("labmanagement/worksheet?limit=10");
        let worksheet = key("labmanagement/worksheet/abc");
        let imports = key("labmanagement/worksheetimport");
        for k in [&worksheets, &worksheet, &imports] {
            block_on(cache.load(k, || future::ready(Ok(0u32)))).unwrap();
        }

        assert_eq!(cache.invalidate_path("labmanagement/worksheet"), 2);
        assert!(cache.snapshot::<u32>(&worksheets).is_stale);
        assert!(cache.snapshot::<u32>(&worksheet).is_stale);
        assert!(!cache.snapshot::<u32>(&imports).is_stale);
    }

    #[test]
    fn subscribers_hear_about_changes_until_dropped() {
        let cache = Cache::new();
        let k = key("labmanagement/approvalconfig");
        let heard = Rc::new(Cell::new(0));

        let subscription = cache.subscribe(&k, {
            let heard = heard.clone();
            move || heard.set(heard.get() + 1)
        });
        // Start of the request and its settlement.
        block_on(cache.load(&k, || future::ready(Ok(1u32)))).unwrap();
        assert_eq!(heard.get(), 2);

        cache.invalidate(&k);
        assert_eq!(heard.get(), 3);

        drop(subscription);
        cache.invalidate(&k);
        assert_eq!(heard.get(), 3);
    }

    #[test]
    fn unwatched_stale_entries_are_evicted() {
        let cache = Cache::new();
        let stale = key("labmanagement/request?q=jane");
        let fresh = key("labmanagement/request?q=john");
        for k in [&stale, &fresh] {
            block_on(cache.load(k, || future::ready(Ok(1u32)))).unwrap();
        }
        let watching_stale = cache.subscribe(&stale, || {});
        let watching_stale_too = cache.subscribe(&stale, || {});
        let watching_fresh = cache.subscribe(&fresh, || {});
        cache.invalidate(&stale);

        drop(watching_stale);
        assert!(cache.contains(&stale));
        drop(watching_stale_too);
        assert!(!cache.contains(&stale));

        // Fresh data outlives its watchers.
        drop(watching_fresh);
        assert!(cache.contains(&fresh));
    }

    #[test]
    fn unknown_keys_have_empty_snapshots() {
        let cache = Cache::new();
        let snapshot = cache.snapshot::<u32>(&key("nothing"));
        assert!(snapshot.data.is_none());
        assert!(!snapshot.is_validating);
        assert!(!cache.invalidate(&key("nothing")));
    }
}
