//! Per-resource list filters. Each one composes the base [`FilterCriteria`]
//! with the fields its endpoint understands, written in declaration order.

use crate::query::{Filter, FilterCriteria, QueryParams, ToQueryParams};
use crate::responses::{
    BatchJobStatus, BatchJobType, TestRequestStatus, UrgencyType,
    WorksheetStatus,
};
use jiff::{Timestamp, civil::Date};

macro_rules! impl_filter {
    ($($name:ident),+ $(,)?) => {
        $(
            impl Filter for $name {
                fn criteria(&self) -> &FilterCriteria {
                    &self.criteria
                }

                fn criteria_mut(&mut self) -> &mut FilterCriteria {
                    &mut self.criteria
                }
            }

            impl From<FilterCriteria> for $name {
                fn from(criteria: FilterCriteria) -> Self {
                    Self {
                        criteria,
                        ..Default::default()
                    }
                }
            }
        )+
    };
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalConfigFilter {
    pub criteria: FilterCriteria,
    pub include_voided: Option<bool>,
}

impl ToQueryParams for ApprovalConfigFilter {
    fn write_query_params(&self, params: &mut QueryParams) {
        self.criteria.write_query_params(params);
        params.push("includeVoided", self.include_voided.as_ref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApprovalFlowFilter {
    pub criteria: FilterCriteria,
    pub include_voided: Option<bool>,
}

impl ToQueryParams for ApprovalFlowFilter {
    fn write_query_params(&self, params: &mut QueryParams) {
        self.criteria.write_query_params(params);
        params.push("includeVoided", self.include_voided.as_ref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestConfigFilter {
    pub criteria: FilterCriteria,
    pub active: Option<bool>,
    /// Restrict to these test concept uuids.
    pub tests: Vec<String>,
}

impl ToQueryParams for TestConfigFilter {
    fn write_query_params(&self, params: &mut QueryParams) {
        self.criteria.write_query_params(params);
        params
            .push("active", self.active.as_ref())
            .push_list("tests", &self.tests);
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferrerLocationFilter {
    pub criteria: FilterCriteria,
    pub active: Option<bool>,
    pub referrer_in: Option<bool>,
    pub referrer_out: Option<bool>,
}

impl ToQueryParams for ReferrerLocationFilter {
    fn write_query_params(&self, params: &mut QueryParams) {
        self.criteria.write_query_params(params);
        params
            .push("active", self.active.as_ref())
            .push("referrerIn", self.referrer_in.as_ref())
            .push("referrerOut", self.referrer_out.as_ref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StorageUnitFilter {
    pub criteria: FilterCriteria,
    /// Location uuid.
    pub location: Option<String>,
    pub active: Option<bool>,
}

impl ToQueryParams for StorageUnitFilter {
    fn write_query_params(&self, params: &mut QueryParams) {
        self.criteria.write_query_params(params);
        params
            .push("location", self.location.as_deref())
            .push("active", self.active.as_ref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestRequestFilter {
    pub criteria: FilterCriteria,
    pub status: Vec<TestRequestStatus>,
    pub urgency: Option<UrgencyType>,
    /// Patient uuid.
    pub patient: Option<String>,
    /// Location uuid.
    pub location: Option<String>,
    pub min_request_date: Option<Date>,
    pub max_request_date: Option<Date>,
    pub include_items: Option<bool>,
}

impl ToQueryParams for TestRequestFilter {
    fn write_query_params(&self, params: &mut QueryParams) {
        self.criteria.write_query_params(params);
        params
            .push_list("status", &self.status)
            .push("urgency", self.urgency.as_ref())
            .push("patient", self.patient.as_deref())
            .push("location", self.location.as_deref())
            .push("minRequestDate", self.min_request_date.as_ref())
            .push("maxRequestDate", self.max_request_date.as_ref())
            .push("includeItems", self.include_items.as_ref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorksheetFilter {
    pub criteria: FilterCriteria,
    pub status: Vec<WorksheetStatus>,
    /// Provider uuid.
    pub responsible_person: Option<String>,
    pub min_worksheet_date: Option<Date>,
    pub max_worksheet_date: Option<Date>,
    pub include_items: Option<bool>,
}

impl ToQueryParams for WorksheetFilter {
    fn write_query_params(&self, params: &mut QueryParams) {
        self.criteria.write_query_params(params);
        params
            .push_list("status", &self.status)
            .push("responsiblePerson", self.responsible_person.as_deref())
            .push("minWorksheetDate", self.min_worksheet_date.as_ref())
            .push("maxWorksheetDate", self.max_worksheet_date.as_ref())
            .push("includeItems", self.include_items.as_ref());
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchJobFilter {
    pub criteria: FilterCriteria,
    pub batch_job_type: Option<BatchJobType>,
    pub status: Vec<BatchJobStatus>,
    pub date_created_min: Option<Timestamp>,
    pub date_created_max: Option<Timestamp>,
}

impl ToQueryParams for BatchJobFilter {
    fn write_query_params(&self, params: &mut QueryParams) {
        self.criteria.write_query_params(params);
        params
            .push("batchJobType", self.batch_job_type.as_ref())
            .push_list("status", &self.status)
            .push("dateCreatedMin", self.date_created_min.as_ref())
            .push("dateCreatedMax", self.date_created_max.as_ref());
    }
}

impl_filter!(
    ApprovalConfigFilter,
    ApprovalFlowFilter,
    TestConfigFilter,
    ReferrerLocationFilter,
    StorageUnitFilter,
    TestRequestFilter,
    WorksheetFilter,
    BatchJobFilter,
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::CacheKey;

    #[test]
    fn base_criteria_precede_feature_fields() {
        let filter = TestRequestFilter {
            criteria: FilterCriteria::page(0, 20).with_total_count(),
            status: vec![TestRequestStatus::Pending, TestRequestStatus::InProgress],
            min_request_date: Some("2025-01-01".parse().unwrap()),
            ..Default::default()
        };
        assert_eq!(
            filter.to_query_string(),
            "?startIndex=0&limit=20&totalCount=true\
             &status=PENDING%2CIN_PROGRESS&minRequestDate=2025-01-01"
        );
    }

    #[test]
    fn unset_feature_fields_are_omitted() {
        let filter = ReferrerLocationFilter {
            active: Some(true),
            referrer_out: None,
            ..Default::default()
        };
        assert_eq!(filter.to_query_string(), "?active=true");
        assert_eq!(BatchJobFilter::default().to_query_string(), "");
    }

    #[test]
    fn booleans_serialize_as_words() {
        let filter = StorageUnitFilter {
            active: Some(false),
            ..Default::default()
        };
        assert_eq!(filter.query_params().get("active"), Some("false"));
    }

    #[test]
    fn filters_built_differently_share_a_key() {
        let mut incremental = WorksheetFilter::default();
        incremental.include_items = Some(true);
        incremental.criteria.limit = Some(10);
        incremental.status.push(WorksheetStatus::Pending);

        let literal = WorksheetFilter {
            criteria: FilterCriteria {
                limit: Some(10),
                ..Default::default()
            },
            status: vec![WorksheetStatus::Pending],
            include_items: Some(true),
            ..Default::default()
        };

        let path = crate::paths::WORKSHEET;
        assert_eq!(
            CacheKey::new(path, &incremental).as_str(),
            CacheKey::new(path, &literal).as_str()
        );
    }

    #[test]
    fn criteria_are_reachable_through_filter_trait() {
        let mut filter = BatchJobFilter::from(FilterCriteria::page(10, 10));
        filter.criteria_mut().start_index = Some(20);
        assert_eq!(filter.criteria().start_index, Some(20));
    }
}
