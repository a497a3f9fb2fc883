//! Form models for the configuration screens.
//!
//! A form holds everything a screen tracks while editing, including state the
//! backend must never see (`is_saving`, touched flags). Request bodies are
//! only ever produced through `to_request`, which copies the writable fields.

use crate::{
    ApprovalConfigId,
    requests::{
        APPROVAL_LEVELS_MAX, ApprovalFlowValidation, UpsertApprovalFlow,
        UpsertReferrerLocation,
    },
    responses::{ApprovalFlow, ReferrerLocation},
};
use uuid::Uuid;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalLevelForm {
    pub config: Option<ApprovalConfigId>,
    pub allow_owner: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalFlowForm {
    pub name: String,
    pub system_name: String,
    pub description: String,
    pub levels: Vec<ApprovalLevelForm>,
    pub is_saving: bool,
    pub touched: bool,
}

impl ApprovalFlowForm {
    /// Prefill from an existing flow for editing.
    pub fn from_flow(flow: &ApprovalFlow) -> Self {
        let levels = flow
            .levels()
            .into_iter()
            .map(|level| ApprovalLevelForm {
                config: Uuid::parse_str(&level.config.uuid)
                    .ok()
                    .map(ApprovalConfigId),
                allow_owner: level.allow_owner,
            })
            .collect();
        Self {
            name: flow.name.clone(),
            system_name: flow.system_name.clone(),
            description: flow.description.clone().unwrap_or_default(),
            levels,
            ..Default::default()
        }
    }

    pub fn add_level(&mut self) -> bool {
        if self.levels.len() >= APPROVAL_LEVELS_MAX {
            return false;
        }
        self.levels.push(ApprovalLevelForm::default());
        self.touched = true;
        true
    }

    /// Remove a level, shifting the later ones up so no gap remains.
    pub fn remove_level(&mut self, index: usize) {
        if index < self.levels.len() {
            self.levels.remove(index);
            self.touched = true;
        }
    }

    /// Build the request body, validating it first.
    pub fn to_request(&self) -> Result<UpsertApprovalFlow, ApprovalFlowValidation> {
        if self.levels.len() > APPROVAL_LEVELS_MAX {
            return Err(ApprovalFlowValidation::TooManyLevels);
        }
        let level = |i: usize| self.levels.get(i).cloned().unwrap_or_default();
        let (one, two, three, four) = (level(0), level(1), level(2), level(3));
        let description = self.description.trim();

        let request = UpsertApprovalFlow {
            name: self.name.trim().to_string(),
            system_name: self.system_name.trim().to_string(),
            description: (!description.is_empty())
                .then(|| description.to_string()),
            level_one: one.config,
            level_two: two.config,
            level_three: three.config,
            level_four: four.config,
            level_one_allow_owner: one.allow_owner,
            level_two_allow_owner: two.allow_owner,
            level_three_allow_owner: three.allow_owner,
            level_four_allow_owner: four.allow_owner,
        };

        match request.validate() {
            ApprovalFlowValidation::Valid => Ok(request),
            invalid => Err(invalid),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferrerLocationForm {
    pub name: String,
    pub acronym: String,
    pub referrer_in: bool,
    pub referrer_out: bool,
    pub enabled: bool,
    pub is_saving: bool,
    pub name_error: Option<String>,
}

impl ReferrerLocationForm {
    pub fn from_location(location: &ReferrerLocation) -> Self {
        Self {
            name: location.name.clone(),
            acronym: location.acronym.clone().unwrap_or_default(),
            referrer_in: location.referrer_in,
            referrer_out: location.referrer_out,
            enabled: location.enabled,
            ..Default::default()
        }
    }

    pub fn to_request(&self) -> Option<UpsertReferrerLocation> {
        let name = self.name.trim();
        if name.is_empty() {
            return None;
        }
        let acronym = self.acronym.trim();
        Some(UpsertReferrerLocation {
            name: name.to_string(),
            acronym: (!acronym.is_empty()).then(|| acronym.to_string()),
            referrer_in: self.referrer_in,
            referrer_out: self.referrer_out,
            enabled: self.enabled,
        })
    }
}
