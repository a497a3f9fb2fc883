pub mod api_client;
pub mod filters;
pub mod forms;
pub mod query;
pub mod requests;
pub mod responses;

pub use api_client::{APIClient, ClientError};
pub use query::{CacheKey, FilterCriteria, PageResult, Representation, Sort};
pub use reqwest::StatusCode;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Resource paths under the REST root, one per laboratory collection.
///
/// These double as the invalidation prefixes for the revalidation cache: every
/// cache key for a collection starts with its path.
pub mod paths {
    pub const APPROVAL_CONFIG: &str = "labmanagement/approvalconfig";
    pub const APPROVAL_FLOW: &str = "labmanagement/approvalflow";
    pub const TEST_CONFIG: &str = "labmanagement/testconfig";
    pub const TEST_CONFIG_IMPORT: &str = "labmanagement/testconfigimport";
    pub const REFERRER_LOCATION: &str = "labmanagement/referrerlocation";
    pub const STORAGE_UNIT: &str = "labmanagement/storageunit";
    pub const TEST_REQUEST: &str = "labmanagement/request";
    pub const WORKSHEET: &str = "labmanagement/worksheet";
    pub const WORKSHEET_IMPORT: &str = "labmanagement/worksheetimport";
    pub const BATCH_JOB: &str = "labmanagement/batchjob";
    pub const SYSTEM_SETTING: &str = "systemsetting";
}

/// Id type wrapper helps ensure we don't mix up ids for different resources.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct ApprovalConfigId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct ApprovalFlowId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct TestConfigId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct ReferrerLocationId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct StorageUnitId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct TestRequestId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct TestRequestItemId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct WorksheetId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct WorksheetItemId(pub Uuid);

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
#[serde(transparent)]
pub struct BatchJobId(pub Uuid);

/// Reference to an entity owned by the wider hospital system (concepts,
/// locations, patients, providers). Those uuids are not guaranteed to be
/// RFC 4122 shaped, so they stay strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

impl EntityRef {
    pub fn new(uuid: impl Into<String>, display: impl Into<String>) -> Self {
        Self {
            uuid: uuid.into(),
            display: Some(display.into()),
        }
    }

    /// The display label, falling back to the uuid.
    pub fn label(&self) -> &str {
        self.display.as_deref().unwrap_or(&self.uuid)
    }
}
