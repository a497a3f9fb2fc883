use futures::future::{AbortHandle, Abortable, LocalBoxFuture};
use payloads::{PageResult, query::Filter};
use resources::{FetchResult, RefreshPolicy, Resource, SharedError};
use serde::de::DeserializeOwned;
use std::{cell::RefCell, rc::Rc};
use yew::{platform::spawn_local, prelude::*};

use crate::{cache, get_api_client, hooks::use_refresh};

/// What an eager resource hook hands to a screen.
pub struct ResourceHandle<T> {
    pub data: Option<Rc<T>>,
    pub error: Option<SharedError>,
    /// No data and no error yet.
    pub is_loading: bool,
    /// A request is in flight. Previous data, if any, is still in `data`.
    pub is_validating: bool,
    /// Refetch now, keeping the current data visible meanwhile.
    pub revalidate: Callback<()>,
}

impl<T> ResourceHandle<T> {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

impl<T> ResourceHandle<PageResult<T>> {
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

/// Eager resource hook.
///
/// Loads `path` with `filter` through the shared cache on mount and whenever
/// the filter changes the cache key, and again whenever a mutation
/// invalidates the key. Components showing the same key share one request.
/// The request is aborted if the component unmounts or the key changes
/// before it settles.
///
/// # Example
///
/// ```rust
/// # use payloads::{PageResult, filters::StorageUnitFilter, paths, responses};
/// # use resources::RefreshPolicy;
/// # use ui::hooks::{ResourceHandle, use_resource};
/// # use yew::prelude::*;
/// #[hook]
/// pub fn use_storage_units(
///     filter: StorageUnitFilter,
/// ) -> ResourceHandle<PageResult<responses::StorageUnit>> {
///     use_resource(paths::STORAGE_UNIT, filter, RefreshPolicy::default())
/// }
/// ```
#[hook]
pub fn use_resource<T, F>(
    path: &'static str,
    filter: F,
    policy: RefreshPolicy,
) -> ResourceHandle<T>
where
    T: DeserializeOwned + 'static,
    F: Filter,
{
    let resource = Resource::<T, F>::with_client(
        cache(),
        get_api_client(),
        path,
        filter,
    )
    .with_policy(policy);
    let key = resource.key();
    let trigger = use_force_update();

    // Watch the key and load it; both are undone on key change.
    {
        let resource = resource.clone();
        use_effect_with(key.clone(), move |_| {
            let in_flight = Rc::new(RefCell::new(None::<AbortHandle>));
            let spawn = {
                let in_flight = in_flight.clone();
                move |request: LocalBoxFuture<'static, FetchResult<T>>| {
                    let (abort, registration) = AbortHandle::new_pair();
                    in_flight.borrow_mut().replace(abort);
                    let request = Abortable::new(request, registration);
                    spawn_local(async move {
                        let _ = request.await;
                    });
                }
            };
            let watch =
                resource.watch(move || trigger.force_update(), spawn.clone());
            spawn(resource.load());

            move || {
                if let Some(abort) = in_flight.borrow_mut().take() {
                    abort.abort();
                }
                drop(watch);
            }
        });
    }

    let revalidate = {
        let resource = resource.clone();
        use_callback(key, move |_, _| {
            let revalidate = resource.revalidate();
            spawn_local(async move {
                let _ = revalidate.await;
            });
        })
    };
    use_refresh(policy, revalidate.clone());

    let state = resource.state();
    ResourceHandle {
        data: state.data,
        error: state.error,
        is_loading: state.is_loading,
        is_validating: state.is_validating,
        revalidate,
    }
}
