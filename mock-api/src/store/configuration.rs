//! Approval configs and flows, test configurations, referrer locations,
//! storage units and system settings.

use jiff::Timestamp;
use payloads::{
    ApprovalConfigId, ApprovalFlowId, EntityRef, ReferrerLocationId,
    StorageUnitId, TestConfigId,
    requests::{
        UpsertApprovalConfig, UpsertApprovalFlow, UpsertReferrerLocation,
        UpsertStorageUnit, UpsertTestConfig,
    },
    responses::{
        ApprovalConfig, ApprovalFlow, GlobalProperty, ImportResult,
        ReferrerLocation, StorageUnit, TestConfig,
    },
};
use uuid::Uuid;

use super::{ExternalKind, State, StoreError, csv_rows, parse_flag};

fn required(value: &str, field: &str) -> Result<String, StoreError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(StoreError::Invalid(format!("{field} is required")));
    }
    Ok(value.to_string())
}

impl State {
    pub fn get_approval_config(
        &self,
        id: &ApprovalConfigId,
    ) -> Result<ApprovalConfig, StoreError> {
        self.approval_configs
            .iter()
            .find(|c| &c.uuid == id)
            .cloned()
            .ok_or(StoreError::NotFound("Approval config"))
    }

    pub fn upsert_approval_config(
        &mut self,
        id: Option<ApprovalConfigId>,
        details: UpsertApprovalConfig,
        now: Timestamp,
    ) -> Result<ApprovalConfig, StoreError> {
        let approval_title = required(&details.approval_title, "Approval title")?;
        let approval_required =
            required(&details.approval_required, "Approval required")?;
        if self.approval_configs.iter().any(|c| {
            !c.voided
                && Some(c.uuid) != id
                && c.approval_title.eq_ignore_ascii_case(&approval_title)
        }) {
            return Err(StoreError::Conflict(format!(
                "An approval config titled '{approval_title}' already exists"
            )));
        }

        match id {
            Some(id) => {
                let config = self
                    .approval_configs
                    .iter_mut()
                    .find(|c| c.uuid == id)
                    .ok_or(StoreError::NotFound("Approval config"))?;
                config.approval_title = approval_title;
                config.approval_required = approval_required;
                config.description = details.description;
                Ok(config.clone())
            }
            None => {
                let config = ApprovalConfig {
                    uuid: ApprovalConfigId(Uuid::new_v4()),
                    approval_title,
                    approval_required,
                    description: details.description,
                    voided: false,
                    date_created: now,
                };
                self.approval_configs.push(config.clone());
                Ok(config)
            }
        }
    }

    pub fn void_approval_config(
        &mut self,
        id: &ApprovalConfigId,
    ) -> Result<(), StoreError> {
        let in_use = self.approval_flows.iter().any(|flow| {
            !flow.voided
                && flow
                    .levels()
                    .iter()
                    .any(|level| level.config.uuid == id.to_string())
        });
        if in_use {
            return Err(StoreError::Conflict(
                "Approval config is used by an approval flow".into(),
            ));
        }
        let config = self
            .approval_configs
            .iter_mut()
            .find(|c| &c.uuid == id)
            .ok_or(StoreError::NotFound("Approval config"))?;
        config.voided = true;
        Ok(())
    }

    pub fn get_approval_flow(
        &self,
        id: &ApprovalFlowId,
    ) -> Result<ApprovalFlow, StoreError> {
        self.approval_flows
            .iter()
            .find(|f| &f.uuid == id)
            .cloned()
            .ok_or(StoreError::NotFound("Approval flow"))
    }

    fn approval_level(
        &self,
        id: Option<ApprovalConfigId>,
    ) -> Result<Option<EntityRef>, StoreError> {
        let Some(id) = id else {
            return Ok(None);
        };
        let config = self.get_approval_config(&id).map_err(|_| {
            StoreError::UnknownReference {
                kind: "approval config",
                uuid: id.to_string(),
            }
        })?;
        Ok(Some(EntityRef::new(id.to_string(), config.approval_title)))
    }

    pub fn upsert_approval_flow(
        &mut self,
        id: Option<ApprovalFlowId>,
        details: UpsertApprovalFlow,
        now: Timestamp,
    ) -> Result<ApprovalFlow, StoreError> {
        if let Some(message) = details.validate().error_message() {
            return Err(StoreError::Invalid(message));
        }
        let system_name = details.system_name.trim().to_string();
        if self.approval_flows.iter().any(|f| {
            !f.voided && Some(f.uuid) != id && f.system_name == system_name
        }) {
            return Err(StoreError::Conflict(format!(
                "System name '{system_name}' is already in use"
            )));
        }

        let flow = ApprovalFlow {
            uuid: id.unwrap_or_else(|| ApprovalFlowId(Uuid::new_v4())),
            name: details.name.trim().to_string(),
            system_name,
            description: details.description,
            level_one: self.approval_level(details.level_one)?,
            level_two: self.approval_level(details.level_two)?,
            level_three: self.approval_level(details.level_three)?,
            level_four: self.approval_level(details.level_four)?,
            level_one_allow_owner: details.level_one_allow_owner,
            level_two_allow_owner: details.level_two_allow_owner,
            level_three_allow_owner: details.level_three_allow_owner,
            level_four_allow_owner: details.level_four_allow_owner,
            voided: false,
            date_created: now,
        };

        match id {
            Some(id) => {
                let existing = self
                    .approval_flows
                    .iter_mut()
                    .find(|f| f.uuid == id)
                    .ok_or(StoreError::NotFound("Approval flow"))?;
                *existing = ApprovalFlow {
                    date_created: existing.date_created,
                    ..flow
                };
                Ok(existing.clone())
            }
            None => {
                self.approval_flows.push(flow.clone());
                Ok(flow)
            }
        }
    }

    pub fn void_approval_flow(
        &mut self,
        id: &ApprovalFlowId,
    ) -> Result<(), StoreError> {
        let flow = self
            .approval_flows
            .iter_mut()
            .find(|f| &f.uuid == id)
            .ok_or(StoreError::NotFound("Approval flow"))?;
        flow.voided = true;
        Ok(())
    }

    pub fn get_test_config(
        &self,
        id: &TestConfigId,
    ) -> Result<TestConfig, StoreError> {
        self.test_configs
            .iter()
            .find(|c| &c.uuid == id)
            .cloned()
            .ok_or(StoreError::NotFound("Test configuration"))
    }

    pub fn upsert_test_config(
        &mut self,
        id: Option<TestConfigId>,
        details: UpsertTestConfig,
        now: Timestamp,
    ) -> Result<TestConfig, StoreError> {
        let test = self.resolve(ExternalKind::Concept, &details.test)?;
        if self
            .test_configs
            .iter()
            .any(|c| Some(c.uuid) != id && c.test.uuid == test.uuid)
        {
            return Err(StoreError::Conflict(format!(
                "{} is already configured",
                test.label()
            )));
        }
        let approval_flow = match details.approval_flow {
            Some(flow_id) => {
                let flow = self.get_approval_flow(&flow_id)?;
                Some(EntityRef::new(flow_id.to_string(), flow.name))
            }
            None => None,
        };
        if details.require_approval && approval_flow.is_none() {
            return Err(StoreError::Invalid(
                "An approval flow is required when approval is required".into(),
            ));
        }

        match id {
            Some(id) => {
                let config = self
                    .test_configs
                    .iter_mut()
                    .find(|c| c.uuid == id)
                    .ok_or(StoreError::NotFound("Test configuration"))?;
                config.test = test;
                config.test_short_name = details.test_short_name;
                config.approval_flow = approval_flow;
                config.require_approval = details.require_approval;
                config.enabled = details.enabled;
                Ok(config.clone())
            }
            None => {
                let config = TestConfig {
                    uuid: TestConfigId(Uuid::new_v4()),
                    test,
                    test_short_name: details.test_short_name,
                    approval_flow,
                    require_approval: details.require_approval,
                    enabled: details.enabled,
                    date_created: now,
                };
                self.test_configs.push(config.clone());
                Ok(config)
            }
        }
    }

    /// Import rows of `test uuid, short name, require approval, enabled`.
    ///
    /// Valid rows are written even when others fail; the result lists one
    /// error per rejected row.
    pub fn import_test_configs(
        &mut self,
        content: &str,
        has_header: bool,
        now: Timestamp,
    ) -> ImportResult {
        let mut result = ImportResult::default();
        for (line, cells) in csv_rows(content, has_header) {
            let cell = |i: usize| cells.get(i).map(String::as_str).unwrap_or("");
            let (Some(require_approval), Some(enabled)) =
                (parse_flag(cell(2)), parse_flag(cell(3)))
            else {
                result.errors.push(format!("row {line}: invalid flag value"));
                continue;
            };
            let short_name = cell(1);
            let existing = self
                .test_configs
                .iter()
                .find(|c| c.test.uuid == cell(0))
                .map(|c| (c.uuid, c.approval_flow.clone()));
            let approval_flow = existing
                .as_ref()
                .and_then(|(_, flow)| flow.as_ref())
                .and_then(|flow| Uuid::parse_str(&flow.uuid).ok())
                .map(ApprovalFlowId);
            let existing_id = existing.map(|(id, _)| id);
            let details = UpsertTestConfig {
                test: cell(0).to_string(),
                test_short_name: (!short_name.is_empty())
                    .then(|| short_name.to_string()),
                approval_flow,
                require_approval: require_approval && approval_flow.is_some(),
                enabled,
            };
            match self.upsert_test_config(existing_id, details, now) {
                Ok(_) if existing_id.is_some() => result.updated_count += 1,
                Ok(_) => result.created_count += 1,
                Err(e) => result.errors.push(format!("row {line}: {e}")),
            }
        }
        result.success = result.errors.is_empty();
        if !result.success {
            result.error_file_uuid = Some(Uuid::new_v4().to_string());
        }
        result
    }

    pub fn get_referrer_location(
        &self,
        id: &ReferrerLocationId,
    ) -> Result<ReferrerLocation, StoreError> {
        self.referrer_locations
            .iter()
            .find(|l| &l.uuid == id)
            .cloned()
            .ok_or(StoreError::NotFound("Referrer location"))
    }

    pub fn upsert_referrer_location(
        &mut self,
        id: Option<ReferrerLocationId>,
        details: UpsertReferrerLocation,
        now: Timestamp,
    ) -> Result<ReferrerLocation, StoreError> {
        let name = required(&details.name, "Name")?;
        match id {
            Some(id) => {
                let location = self
                    .referrer_locations
                    .iter_mut()
                    .find(|l| l.uuid == id)
                    .ok_or(StoreError::NotFound("Referrer location"))?;
                if location.system {
                    return Err(StoreError::Invalid(
                        "System referrer locations cannot be edited".into(),
                    ));
                }
                location.name = name;
                location.acronym = details.acronym;
                location.referrer_in = details.referrer_in;
                location.referrer_out = details.referrer_out;
                location.enabled = details.enabled;
                Ok(location.clone())
            }
            None => {
                let location = ReferrerLocation {
                    uuid: ReferrerLocationId(Uuid::new_v4()),
                    name,
                    acronym: details.acronym,
                    system: false,
                    referrer_in: details.referrer_in,
                    referrer_out: details.referrer_out,
                    enabled: details.enabled,
                    date_created: now,
                };
                self.referrer_locations.push(location.clone());
                Ok(location)
            }
        }
    }

    pub fn get_storage_unit(
        &self,
        id: &StorageUnitId,
    ) -> Result<StorageUnit, StoreError> {
        self.storage_units
            .iter()
            .find(|u| &u.uuid == id)
            .cloned()
            .ok_or(StoreError::NotFound("Storage unit"))
    }

    pub fn upsert_storage_unit(
        &mut self,
        id: Option<StorageUnitId>,
        details: UpsertStorageUnit,
        now: Timestamp,
    ) -> Result<StorageUnit, StoreError> {
        let unit_name = required(&details.unit_name, "Unit name")?;
        let location = details
            .location
            .as_deref()
            .map(|uuid| self.resolve(ExternalKind::Location, uuid))
            .transpose()?;
        match id {
            Some(id) => {
                let unit = self
                    .storage_units
                    .iter_mut()
                    .find(|u| u.uuid == id)
                    .ok_or(StoreError::NotFound("Storage unit"))?;
                unit.unit_name = unit_name;
                unit.description = details.description;
                unit.location = location;
                unit.active = details.active;
                Ok(unit.clone())
            }
            None => {
                let unit = StorageUnit {
                    uuid: StorageUnitId(Uuid::new_v4()),
                    unit_name,
                    description: details.description,
                    location,
                    active: details.active,
                    date_created: now,
                };
                self.storage_units.push(unit.clone());
                Ok(unit)
            }
        }
    }

    pub fn delete_storage_unit(
        &mut self,
        id: &StorageUnitId,
    ) -> Result<(), StoreError> {
        let before = self.storage_units.len();
        self.storage_units.retain(|u| &u.uuid != id);
        if self.storage_units.len() == before {
            return Err(StoreError::NotFound("Storage unit"));
        }
        Ok(())
    }

    pub fn set_global_property(&mut self, property: &str, value: &str) {
        match self
            .global_properties
            .iter_mut()
            .find(|p| p.property == property)
        {
            Some(existing) => existing.value = Some(value.to_string()),
            None => self.global_properties.push(GlobalProperty {
                property: property.to_string(),
                value: Some(value.to_string()),
            }),
        }
    }
}
