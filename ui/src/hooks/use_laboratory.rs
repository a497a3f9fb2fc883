//! Resource hooks for the laboratory collections.

use payloads::{PageResult, filters, paths, responses};
use resources::RefreshPolicy;
use yew::prelude::*;

use crate::hooks::{ResourceHandle, use_laboratory_config, use_resource};

#[hook]
pub fn use_approval_configs(
    filter: filters::ApprovalConfigFilter,
) -> ResourceHandle<PageResult<responses::ApprovalConfig>> {
    use_resource(paths::APPROVAL_CONFIG, filter, RefreshPolicy::default())
}

#[hook]
pub fn use_approval_flows(
    filter: filters::ApprovalFlowFilter,
) -> ResourceHandle<PageResult<responses::ApprovalFlow>> {
    use_resource(paths::APPROVAL_FLOW, filter, RefreshPolicy::default())
}

#[hook]
pub fn use_test_configs(
    filter: filters::TestConfigFilter,
) -> ResourceHandle<PageResult<responses::TestConfig>> {
    use_resource(paths::TEST_CONFIG, filter, RefreshPolicy::default())
}

#[hook]
pub fn use_referrer_locations(
    filter: filters::ReferrerLocationFilter,
) -> ResourceHandle<PageResult<responses::ReferrerLocation>> {
    use_resource(paths::REFERRER_LOCATION, filter, RefreshPolicy::default())
}

#[hook]
pub fn use_storage_units(
    filter: filters::StorageUnitFilter,
) -> ResourceHandle<PageResult<responses::StorageUnit>> {
    use_resource(paths::STORAGE_UNIT, filter, RefreshPolicy::default())
}

#[hook]
pub fn use_test_requests(
    filter: filters::TestRequestFilter,
) -> ResourceHandle<PageResult<responses::TestRequest>> {
    use_resource(paths::TEST_REQUEST, filter, RefreshPolicy::default())
}

#[hook]
pub fn use_worksheets(
    filter: filters::WorksheetFilter,
) -> ResourceHandle<PageResult<responses::Worksheet>> {
    use_resource(paths::WORKSHEET, filter, RefreshPolicy::default())
}

/// Batch jobs and reports.
///
/// While any listed job is pending or running, the list polls at the
/// configured interval so progress shows without a manual refresh.
#[hook]
pub fn use_batch_jobs(
    filter: filters::BatchJobFilter,
) -> ResourceHandle<PageResult<responses::BatchJob>> {
    let config = use_laboratory_config();
    let any_active = use_state_eq(|| false);
    let policy = if *any_active {
        RefreshPolicy::polling(config.batch_job_poll_ms)
    } else {
        RefreshPolicy::default()
    };

    let jobs: ResourceHandle<PageResult<responses::BatchJob>> =
        use_resource(paths::BATCH_JOB, filter, policy);
    let active_now = jobs.items().iter().any(|job| job.status.is_active());
    use_effect_with(active_now, move |active| any_active.set(*active));
    jobs
}
