use crate::{
    ApprovalConfigId, ApprovalFlowId, BatchJobId, EntityRef, ReferrerLocationId,
    StorageUnitId, TestConfigId, TestRequestId, TestRequestItemId, WorksheetId,
    WorksheetItemId, query::QueryValue,
};
use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

/// Implements `as_str` and query serialization for a status enum whose serde
/// form is its `SCREAMING_SNAKE_CASE` name.
macro_rules! wire_enum {
    ($name:ident { $($variant:ident => $wire:literal),+ $(,)? }) => {
        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $wire,)+
                }
            }
        }

        impl QueryValue for $name {
            fn to_query_value(&self) -> String {
                self.as_str().to_string()
            }
        }
    };
}

/// A named approval step that approval flows are built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalConfig {
    pub uuid: ApprovalConfigId,
    pub approval_title: String,
    /// Label shown to the approver, e.g. "Supervisor approval required".
    pub approval_required: String,
    pub description: Option<String>,
    #[serde(default)]
    pub voided: bool,
    pub date_created: Timestamp,
}

/// A multi-level approval flow. Levels are filled from one downwards; a flow
/// never has a gap (level three set while level two is empty).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApprovalFlow {
    pub uuid: ApprovalFlowId,
    pub name: String,
    pub system_name: String,
    pub description: Option<String>,
    pub level_one: Option<EntityRef>,
    pub level_two: Option<EntityRef>,
    pub level_three: Option<EntityRef>,
    pub level_four: Option<EntityRef>,
    #[serde(default)]
    pub level_one_allow_owner: bool,
    #[serde(default)]
    pub level_two_allow_owner: bool,
    #[serde(default)]
    pub level_three_allow_owner: bool,
    #[serde(default)]
    pub level_four_allow_owner: bool,
    #[serde(default)]
    pub voided: bool,
    pub date_created: Timestamp,
}

/// One configured step of an [`ApprovalFlow`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalLevel<'a> {
    pub level: u8,
    pub config: &'a EntityRef,
    pub allow_owner: bool,
}

impl ApprovalFlow {
    /// The configured levels in order, stopping at the first empty one.
    pub fn levels(&self) -> Vec<ApprovalLevel<'_>> {
        [
            (&self.level_one, self.level_one_allow_owner),
            (&self.level_two, self.level_two_allow_owner),
            (&self.level_three, self.level_three_allow_owner),
            (&self.level_four, self.level_four_allow_owner),
        ]
        .into_iter()
        .zip(1u8..)
        .map_while(|((config, allow_owner), level)| {
            config.as_ref().map(|config| ApprovalLevel {
                level,
                config,
                allow_owner,
            })
        })
        .collect()
    }
}

/// Laboratory configuration for a single orderable test.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestConfig {
    pub uuid: TestConfigId,
    /// The test concept.
    pub test: EntityRef,
    pub test_short_name: Option<String>,
    pub approval_flow: Option<EntityRef>,
    pub require_approval: bool,
    pub enabled: bool,
    pub date_created: Timestamp,
}

/// A facility samples can be referred from or to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferrerLocation {
    pub uuid: ReferrerLocationId,
    pub name: String,
    pub acronym: Option<String>,
    /// System-defined locations cannot be edited.
    #[serde(default)]
    pub system: bool,
    pub referrer_in: bool,
    pub referrer_out: bool,
    pub enabled: bool,
    pub date_created: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageUnit {
    pub uuid: StorageUnitId,
    pub unit_name: String,
    pub description: Option<String>,
    pub location: Option<EntityRef>,
    pub active: bool,
    pub date_created: Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UrgencyType {
    Routine,
    Stat,
    OnScheduledDate,
}

wire_enum!(UrgencyType {
    Routine => "ROUTINE",
    Stat => "STAT",
    OnScheduledDate => "ON_SCHEDULED_DATE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TestRequestStatus {
    Pending,
    InProgress,
    Completed,
    Cancelled,
}

wire_enum!(TestRequestStatus {
    Pending => "PENDING",
    InProgress => "IN_PROGRESS",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub uuid: TestRequestId,
    pub request_no: String,
    pub patient: EntityRef,
    pub at_location: EntityRef,
    pub urgency: UrgencyType,
    pub status: TestRequestStatus,
    pub request_date: Date,
    pub clinical_note: Option<String>,
    #[serde(default)]
    pub tests: Vec<TestRequestItem>,
    pub date_created: Timestamp,
}

/// A single ordered test within a request; worksheets are built from these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequestItem {
    pub uuid: TestRequestItemId,
    pub order_number: String,
    pub test: EntityRef,
    pub status: TestRequestStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorksheetStatus {
    Pending,
    Completed,
    Cancelled,
}

wire_enum!(WorksheetStatus {
    Pending => "PENDING",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WorksheetItemStatus {
    Pending,
    ResultEntered,
    Cancelled,
}

wire_enum!(WorksheetItemStatus {
    Pending => "PENDING",
    ResultEntered => "RESULT_ENTERED",
    Cancelled => "CANCELLED",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Worksheet {
    pub uuid: WorksheetId,
    pub worksheet_no: String,
    pub worksheet_date: Date,
    pub status: WorksheetStatus,
    /// The test concept every item on this worksheet runs.
    pub test: Option<EntityRef>,
    pub responsible_person: Option<EntityRef>,
    pub remarks: Option<String>,
    #[serde(default)]
    pub worksheet_items: Vec<WorksheetItem>,
    pub date_created: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorksheetItem {
    pub uuid: WorksheetItemId,
    pub test_request_item: TestRequestItemId,
    pub order_number: String,
    pub status: WorksheetItemStatus,
    pub result: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchJobType {
    Report,
    Export,
    Migrate,
}

wire_enum!(BatchJobType {
    Report => "REPORT",
    Export => "EXPORT",
    Migrate => "MIGRATE",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BatchJobStatus {
    Pending,
    Running,
    Completed,
    Cancelled,
    Failed,
    Expired,
}

wire_enum!(BatchJobStatus {
    Pending => "PENDING",
    Running => "RUNNING",
    Completed => "COMPLETED",
    Cancelled => "CANCELLED",
    Failed => "FAILED",
    Expired => "EXPIRED",
});

impl BatchJobStatus {
    /// Jobs in these states can still change without user action, so lists
    /// containing them are worth polling.
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Pending | Self::Running)
    }

    pub fn is_cancellable(&self) -> bool {
        self.is_active()
    }
}

/// A background job; generated reports are batch jobs of type `Report`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchJob {
    pub uuid: BatchJobId,
    pub batch_job_type: BatchJobType,
    pub status: BatchJobStatus,
    pub description: String,
    pub parameters: Option<String>,
    pub records_processed: Option<u64>,
    pub exit_message: Option<String>,
    pub cancel_reason: Option<String>,
    pub date_created: Timestamp,
    pub started_date: Option<Timestamp>,
    pub completed_date: Option<Timestamp>,
    pub expiration: Option<Timestamp>,
}

/// Result of a bulk import. The HTTP status is 200 even when rows failed;
/// `success` is the authoritative flag.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportResult {
    pub success: bool,
    #[serde(default)]
    pub created_count: u64,
    #[serde(default)]
    pub updated_count: u64,
    #[serde(default)]
    pub errors: Vec<String>,
    /// Reference to a downloadable file listing the rejected rows.
    pub error_file_uuid: Option<String>,
}

/// Caller-facing view of an [`ImportResult`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportOutcome {
    Imported {
        created: u64,
        updated: u64,
    },
    /// Rows may still have been written; counts are reported alongside the
    /// errors.
    Failed {
        created: u64,
        updated: u64,
        errors: Vec<String>,
        error_file_uuid: Option<String>,
    },
}

impl ImportResult {
    pub fn into_outcome(self) -> ImportOutcome {
        if self.success && self.errors.is_empty() {
            ImportOutcome::Imported {
                created: self.created_count,
                updated: self.updated_count,
            }
        } else {
            ImportOutcome::Failed {
                created: self.created_count,
                updated: self.updated_count,
                errors: self.errors,
                error_file_uuid: self.error_file_uuid,
            }
        }
    }
}

/// A server-side system setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlobalProperty {
    pub property: String,
    pub value: Option<String>,
}
