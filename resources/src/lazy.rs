//! Lazy resources: nothing is fetched until [`LazyResource::trigger`].
//!
//! Every trigger takes the next sequence number. When responses arrive out
//! of order, only the one for the latest trigger is kept.

use crate::{
    cache::{FetchResult, SharedError},
    resource::{Fetcher, api_fetcher},
};
use futures::future::{FutureExt, LocalBoxFuture};
use payloads::{APIClient, CacheKey, query::ToQueryParams};
use serde::de::DeserializeOwned;
use std::{cell::RefCell, rc::Rc};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyPhase {
    NotTriggered,
    Fetching,
    Settled,
}

#[derive(Debug)]
pub struct LazyState<T> {
    pub phase: LazyPhase,
    pub data: Option<Rc<T>>,
    pub error: Option<SharedError>,
}

impl<T> Clone for LazyState<T> {
    fn clone(&self) -> Self {
        Self {
            phase: self.phase,
            data: self.data.clone(),
            error: self.error.clone(),
        }
    }
}

impl<T> Default for LazyState<T> {
    fn default() -> Self {
        Self {
            phase: LazyPhase::NotTriggered,
            data: None,
            error: None,
        }
    }
}

impl<T> LazyState<T> {
    /// Always false: a lazy source never blocks rendering on its first load.
    pub fn is_loading(&self) -> bool {
        false
    }

    pub fn is_validating(&self) -> bool {
        self.phase == LazyPhase::Fetching
    }
}

struct Inner<T> {
    sequence: u64,
    state: LazyState<T>,
}

pub struct LazyResource<T> {
    path: &'static str,
    fetcher: Fetcher<T>,
    inner: Rc<RefCell<Inner<T>>>,
}

impl<T> Clone for LazyResource<T> {
    fn clone(&self) -> Self {
        Self {
            path: self.path,
            fetcher: self.fetcher.clone(),
            inner: self.inner.clone(),
        }
    }
}

impl<T: 'static> LazyResource<T> {
    pub fn new(path: &'static str, fetcher: Fetcher<T>) -> Self {
        Self {
            path,
            fetcher,
            inner: Rc::new(RefCell::new(Inner {
                sequence: 0,
                state: LazyState::default(),
            })),
        }
    }

    pub fn state(&self) -> LazyState<T> {
        self.inner.borrow().state.clone()
    }

    /// Start a request for `filter`.
    ///
    /// The trigger takes its sequence number now, but the request only runs
    /// once the returned future is polled. The future resolves to `None` if a
    /// later trigger superseded this one by the time it settled.
    pub fn trigger(
        &self,
        filter: &impl ToQueryParams,
    ) -> LocalBoxFuture<'static, Option<FetchResult<T>>> {
        let key = CacheKey::new(self.path, filter);
        let sequence = {
            let mut inner = self.inner.borrow_mut();
            inner.sequence += 1;
            inner.state.phase = LazyPhase::Fetching;
            inner.sequence
        };
        tracing::debug!(%key, sequence, "lazy trigger");

        let request = (self.fetcher)(&key);
        let inner = self.inner.clone();
        async move {
            let result: FetchResult<T> =
                request.await.map(Rc::new).map_err(Rc::new);
            let mut inner = inner.borrow_mut();
            if inner.sequence != sequence {
                tracing::debug!(%key, sequence, "discarding superseded response");
                return None;
            }
            inner.state.phase = LazyPhase::Settled;
            match &result {
                Ok(data) => {
                    inner.state.data = Some(data.clone());
                    inner.state.error = None;
                }
                Err(error) => inner.state.error = Some(error.clone()),
            }
            Some(result)
        }
        .boxed_local()
    }
}

impl<T: DeserializeOwned + 'static> LazyResource<T> {
    pub fn with_client(client: APIClient, path: &'static str) -> Self {
        Self::new(path, api_fetcher(client))
    }
}
