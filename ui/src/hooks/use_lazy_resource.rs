use futures::future::{AbortHandle, Abortable};
use payloads::{PageResult, query::ToQueryParams};
use resources::{LazyResource, SharedError};
use serde::de::DeserializeOwned;
use std::rc::Rc;
use yew::prelude::*;

use crate::get_api_client;

/// What a lazy resource hook hands to a screen.
pub struct LazyHandle<T, F> {
    /// Fetch with this filter. Only the latest trigger's response is kept.
    pub trigger: Callback<F>,
    pub data: Option<Rc<T>>,
    pub error: Option<SharedError>,
    /// Always false: a lazy source never blocks rendering.
    pub is_loading: bool,
    pub is_validating: bool,
}

impl<T, F> LazyHandle<PageResult<T>, F> {
    pub fn items(&self) -> &[T] {
        self.data
            .as_deref()
            .map(|page| page.results.as_slice())
            .unwrap_or_default()
    }
}

/// Lazy resource hook: nothing is fetched until `trigger` is called, for
/// example by a search-as-you-type selector.
///
/// Lazy results don't go through the shared cache. A new trigger aborts the
/// request it supersedes, and unmounting aborts the last one.
#[hook]
pub fn use_lazy_resource<T, F>(path: &'static str) -> LazyHandle<T, F>
where
    T: DeserializeOwned + 'static,
    F: ToQueryParams + 'static,
{
    let lazy = use_memo(path, |path| {
        LazyResource::<T>::with_client(get_api_client(), *path)
    });
    let in_flight = use_mut_ref(|| None::<AbortHandle>);
    let rerender = use_force_update();

    {
        let in_flight = in_flight.clone();
        use_effect_with((), move |_| {
            move || {
                if let Some(handle) = in_flight.borrow_mut().take() {
                    handle.abort();
                }
            }
        });
    }

    let trigger = {
        let lazy = lazy.clone();
        Callback::from(move |filter: F| {
            let request = lazy.trigger(&filter);
            let (abort, registration) = AbortHandle::new_pair();
            // An older request would be discarded anyway.
            if let Some(previous) = in_flight.borrow_mut().replace(abort) {
                previous.abort();
            }
            rerender.force_update();

            let rerender = rerender.clone();
            yew::platform::spawn_local(async move {
                // Superseded responses leave the state alone.
                if let Ok(Some(_)) = Abortable::new(request, registration).await {
                    rerender.force_update();
                }
            });
        })
    };

    let state = lazy.state();
    LazyHandle {
        trigger,
        is_loading: state.is_loading(),
        is_validating: state.is_validating(),
        data: state.data,
        error: state.error,
    }
}
