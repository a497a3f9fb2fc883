//! Resource layer over the laboratory REST API.
//!
//! [`cache::Cache`] is a keyed stale-while-revalidate cache with request
//! deduplication. [`resource::Resource`] and [`lazy::LazyResource`] build the
//! eager and lazy data sources on top of it, [`pagination::Pagination`] maps
//! page state onto filter criteria, and [`mutation::mutate`] runs writes and
//! invalidates the collections they touch.
//!
//! Nothing here knows about a UI framework; the `ui` crate binds these types
//! to Yew hooks.

pub mod cache;
pub mod config;
pub mod debounce;
pub mod lazy;
pub mod mutation;
pub mod pagination;
pub mod resource;
pub mod transfer;

pub use cache::{Cache, FetchResult, SharedError, Snapshot, Subscription};
pub use config::{ConfigStore, LaboratoryConfig};
pub use debounce::{DEFAULT_DEBOUNCE_MS, Debouncer};
pub use lazy::{LazyPhase, LazyResource, LazyState};
pub use mutation::mutate;
pub use pagination::{Pagination, PaginationMode};
pub use resource::{RefreshPolicy, Resource, ResourceState};
pub use transfer::TransferList;
