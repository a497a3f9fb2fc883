pub mod use_debounce;
pub mod use_laboratory;
pub mod use_laboratory_config;
pub mod use_lazy_resource;
pub mod use_pagination;
pub mod use_refresh;
pub mod use_resource;
pub mod use_transfer_list;

pub use use_debounce::{use_debounced, use_debounced_search};
pub use use_laboratory::{
    use_approval_configs, use_approval_flows, use_batch_jobs,
    use_referrer_locations, use_storage_units, use_test_configs,
    use_test_requests, use_worksheets,
};
pub use use_laboratory_config::use_laboratory_config;
pub use use_lazy_resource::{LazyHandle, use_lazy_resource};
pub use use_pagination::{
    PagedResource, PaginationHandle, use_client_pagination, use_paged_resource,
    use_pagination,
};
pub use use_refresh::use_refresh;
pub use use_resource::{ResourceHandle, use_resource};
pub use use_transfer_list::{TransferHandle, use_transfer_list};
