//! Request bodies. Each struct carries exactly the fields the backend accepts
//! for that write; anything else a screen tracks stays in its form model.

use crate::{
    ApprovalConfigId, ApprovalFlowId, TestRequestItemId, WorksheetId,
    responses::{BatchJobType, UrgencyType, WorksheetStatus},
};
use jiff::{Timestamp, civil::Date};
use serde::{Deserialize, Serialize};

pub const NAME_MAX_LEN: usize = 255;
pub const SYSTEM_NAME_MAX_LEN: usize = 50;
pub const APPROVAL_LEVELS_MAX: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertApprovalConfig {
    pub approval_title: String,
    pub approval_required: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertApprovalFlow {
    pub name: String,
    pub system_name: String,
    pub description: Option<String>,
    pub level_one: Option<ApprovalConfigId>,
    pub level_two: Option<ApprovalConfigId>,
    pub level_three: Option<ApprovalConfigId>,
    pub level_four: Option<ApprovalConfigId>,
    pub level_one_allow_owner: bool,
    pub level_two_allow_owner: bool,
    pub level_three_allow_owner: bool,
    pub level_four_allow_owner: bool,
}

/// Validation result for approval flows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalFlowValidation {
    Valid,
    NameRequired,
    NameTooLong,
    SystemNameRequired,
    SystemNameTooLong,
    NoLevels,
    TooManyLevels,
    /// A level is empty while a later one is set.
    LevelGap(u8),
    /// The same approval config appears on more than one level.
    DuplicateLevel(u8),
}

impl ApprovalFlowValidation {
    pub fn is_valid(&self) -> bool {
        matches!(self, Self::Valid)
    }

    pub fn error_message(&self) -> Option<String> {
        match self {
            Self::Valid => None,
            Self::NameRequired => Some("Name is required".into()),
            Self::NameTooLong => {
                Some(format!("Name must be at most {NAME_MAX_LEN} characters"))
            }
            Self::SystemNameRequired => Some("System name is required".into()),
            Self::SystemNameTooLong => Some(format!(
                "System name must be at most {SYSTEM_NAME_MAX_LEN} characters"
            )),
            Self::NoLevels => Some("At least one approval level is required".into()),
            Self::TooManyLevels => Some(format!(
                "An approval flow has at most {APPROVAL_LEVELS_MAX} levels"
            )),
            Self::LevelGap(level) => {
                Some(format!("Level {level} must be set before later levels"))
            }
            Self::DuplicateLevel(level) => Some(format!(
                "Level {level} repeats an approval used on an earlier level"
            )),
        }
    }
}

impl UpsertApprovalFlow {
    pub fn levels(&self) -> [Option<ApprovalConfigId>; APPROVAL_LEVELS_MAX] {
        [
            self.level_one,
            self.level_two,
            self.level_three,
            self.level_four,
        ]
    }

    /// Validate an approval flow.
    ///
    /// Rules:
    /// - name and system name are required and bounded
    /// - at least one level, filled from level one without gaps
    /// - no approval config on more than one level
    pub fn validate(&self) -> ApprovalFlowValidation {
        let name = self.name.trim();
        if name.is_empty() {
            return ApprovalFlowValidation::NameRequired;
        }
        if name.len() > NAME_MAX_LEN {
            return ApprovalFlowValidation::NameTooLong;
        }
        let system_name = self.system_name.trim();
        if system_name.is_empty() {
            return ApprovalFlowValidation::SystemNameRequired;
        }
        if system_name.len() > SYSTEM_NAME_MAX_LEN {
            return ApprovalFlowValidation::SystemNameTooLong;
        }

        let levels = self.levels();
        if levels.iter().all(Option::is_none) {
            return ApprovalFlowValidation::NoLevels;
        }

        let mut seen = Vec::with_capacity(APPROVAL_LEVELS_MAX);
        let mut gap_at = None;
        for (level, config) in (1u8..).zip(levels.iter()) {
            match (config, gap_at) {
                (None, None) => gap_at = Some(level),
                (None, Some(_)) => {}
                (Some(_), Some(gap)) => {
                    return ApprovalFlowValidation::LevelGap(gap);
                }
                (Some(config), None) => {
                    if seen.contains(config) {
                        return ApprovalFlowValidation::DuplicateLevel(level);
                    }
                    seen.push(*config);
                }
            }
        }

        ApprovalFlowValidation::Valid
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertTestConfig {
    /// Test concept uuid.
    pub test: String,
    pub test_short_name: Option<String>,
    pub approval_flow: Option<ApprovalFlowId>,
    pub require_approval: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertReferrerLocation {
    pub name: String,
    pub acronym: Option<String>,
    pub referrer_in: bool,
    pub referrer_out: bool,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertStorageUnit {
    pub unit_name: String,
    pub description: Option<String>,
    /// Location uuid.
    pub location: Option<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTestRequest {
    /// Patient uuid.
    pub patient: String,
    /// Location uuid.
    pub at_location: String,
    pub urgency: UrgencyType,
    pub request_date: Date,
    pub clinical_note: Option<String>,
    /// Test concept uuids.
    pub tests: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsertWorksheet {
    pub worksheet_date: Date,
    /// Test concept uuid.
    pub test: Option<String>,
    /// Provider uuid.
    pub responsible_person: Option<String>,
    pub remarks: Option<String>,
    pub status: WorksheetStatus,
    /// Request items placed on the worksheet, in worksheet order.
    pub test_request_items: Vec<TestRequestItemId>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBatchJob {
    pub batch_job_type: BatchJobType,
    pub description: String,
    pub parameters: Option<String>,
    pub expiration: Option<Timestamp>,
}

/// Body of a batch job cancellation. The reason also travels as a query
/// parameter; see `APIClient::cancel_batch_jobs`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelBatchJobs {
    pub reason: String,
}

/// A file upload for the bulk import endpoints, sent as multipart form data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileImport {
    pub file_name: String,
    pub mime_type: String,
    pub content: Vec<u8>,
    pub has_header: bool,
    /// Only for worksheet result imports.
    pub worksheet: Option<WorksheetId>,
}

impl FileImport {
    pub fn csv(
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
        has_header: bool,
    ) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: "text/csv".into(),
            content: content.into(),
            has_header,
            worksheet: None,
        }
    }

    pub fn for_worksheet(mut self, worksheet: WorksheetId) -> Self {
        self.worksheet = Some(worksheet);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn config() -> ApprovalConfigId {
        ApprovalConfigId(Uuid::new_v4())
    }

    fn flow() -> UpsertApprovalFlow {
        UpsertApprovalFlow {
            name: "Two step".into(),
            system_name: "TWO_STEP".into(),
            description: None,
            level_one: Some(config()),
            level_two: Some(config()),
            level_three: None,
            level_four: None,
            level_one_allow_owner: false,
            level_two_allow_owner: false,
            level_three_allow_owner: false,
            level_four_allow_owner: false,
        }
    }

    #[test]
    fn contiguous_levels_are_valid() {
        assert!(flow().validate().is_valid());
    }

    #[test]
    fn gap_between_levels_is_rejected() {
        let flow = UpsertApprovalFlow {
            level_two: None,
            level_three: Some(config()),
            ..flow()
        };
        assert_eq!(flow.validate(), ApprovalFlowValidation::LevelGap(2));
    }

    #[test]
    fn repeated_config_is_rejected() {
        let repeated = config();
        let flow = UpsertApprovalFlow {
            level_one: Some(repeated),
            level_two: Some(repeated),
            ..flow()
        };
        assert_eq!(flow.validate(), ApprovalFlowValidation::DuplicateLevel(2));
    }

    #[test]
    fn flow_without_levels_is_rejected() {
        let flow = UpsertApprovalFlow {
            level_one: None,
            level_two: None,
            ..flow()
        };
        assert_eq!(flow.validate(), ApprovalFlowValidation::NoLevels);
        assert!(flow.validate().error_message().is_some());
    }

    #[test]
    fn blank_names_are_rejected() {
        let flow = UpsertApprovalFlow {
            name: "   ".into(),
            ..flow()
        };
        assert_eq!(flow.validate(), ApprovalFlowValidation::NameRequired);
    }
}
