use payloads::{PageResult, query::Filter};
use resources::{Pagination, PaginationMode, RefreshPolicy};
use serde::de::DeserializeOwned;
use yew::prelude::*;

use crate::hooks::{ResourceHandle, use_resource};

/// Page state plus callbacks for the page controls.
#[derive(Clone, PartialEq)]
pub struct PaginationHandle {
    pub state: Pagination,
    pub go_to: Callback<usize>,
    pub next: Callback<()>,
    pub previous: Callback<()>,
    /// Also returns to the first page.
    pub set_page_size: Callback<usize>,
    pub set_total: Callback<usize>,
}

impl PaginationHandle {
    /// The current page of an in-memory list.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        self.state.clone().slice(items)
    }
}

fn updater<IN: 'static>(
    state: &UseStateHandle<Pagination>,
    update: impl Fn(&mut Pagination, IN) + 'static,
) -> Callback<IN> {
    let state = state.clone();
    Callback::from(move |input| {
        let mut next = (*state).clone();
        update(&mut next, input);
        state.set(next);
    })
}

#[hook]
pub fn use_pagination(mode: PaginationMode, page_size: usize) -> PaginationHandle {
    let state = use_state_eq(|| match mode {
        PaginationMode::Client => Pagination::client(page_size),
        PaginationMode::Server => Pagination::server(page_size),
    });

    PaginationHandle {
        state: (*state).clone(),
        go_to: updater(&state, |p, page| {
            p.go_to(page);
        }),
        next: updater(&state, |p, ()| {
            p.next();
        }),
        previous: updater(&state, |p, ()| {
            p.previous();
        }),
        set_page_size: updater(&state, Pagination::set_page_size),
        set_total: updater(&state, Pagination::set_total),
    }
}

/// Client-side pagination over a list of `total` rows already in memory.
/// Use [`PaginationHandle::slice`] to cut out the current page.
#[hook]
pub fn use_client_pagination(total: usize, page_size: usize) -> PaginationHandle {
    let pagination = use_pagination(PaginationMode::Client, page_size);
    {
        let set_total = pagination.set_total.clone();
        use_effect_with(total, move |total| set_total.emit(*total));
    }
    pagination
}

pub struct PagedResource<T> {
    pub resource: ResourceHandle<PageResult<T>>,
    pub pagination: PaginationHandle,
}

/// Server-side pagination: each page is its own request and cache key.
///
/// A filter change returns to the first page. The page count follows the
/// `totalCount` of the latest page.
#[hook]
pub fn use_paged_resource<T, F>(
    path: &'static str,
    filter: F,
    page_size: usize,
    policy: RefreshPolicy,
) -> PagedResource<T>
where
    T: DeserializeOwned + 'static,
    F: Filter,
{
    let pagination = use_pagination(PaginationMode::Server, page_size);
    let last_filter = use_mut_ref(|| filter.clone());

    // Request page 1 right away rather than the old page of the new filter;
    // the page state catches up in the effect.
    let mut page = pagination.state.clone();
    if *last_filter.borrow() != filter {
        *last_filter.borrow_mut() = filter.clone();
        page.go_to(1);
    }
    {
        let go_to = pagination.go_to.clone();
        use_effect_with(filter.clone(), move |_| go_to.emit(1));
    }

    let paged = page.paged_filter(&filter);
    let resource = use_resource::<PageResult<T>, F>(path, paged, policy);
    {
        let set_total = pagination.set_total.clone();
        use_effect_with(resource.total_count(), move |total| {
            if let Some(total) = total {
                set_total.emit(usize::try_from(*total).unwrap_or(usize::MAX));
            }
        });
    }

    PagedResource {
        resource,
        pagination,
    }
}
