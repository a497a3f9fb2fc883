pub mod approval;
pub mod batch_job;
pub mod import;
pub mod location;
pub mod order;
pub mod system_setting;
pub mod test_config;

use actix_web::{
    HttpResponse, Responder, ResponseError, body::BoxBody,
    dev::HttpServiceFactory, get, web,
};
use jiff::{Timestamp, civil::Date};
use payloads::PageResult;
use serde::de::DeserializeOwned;
use std::{collections::HashMap, str::FromStr};
use uuid::Uuid;

use crate::store::{MockStore, StoreError};

/// Default page size when a list request carries no `limit`.
pub const DEFAULT_LIMIT: usize = 50;

pub fn api_services() -> impl HttpServiceFactory {
    web::scope("/ws/rest/v1")
        .service(health_check)
        .service(approval::list_approval_configs)
        .service(approval::get_approval_config)
        .service(approval::create_approval_config)
        .service(approval::update_approval_config)
        .service(approval::delete_approval_config)
        .service(approval::list_approval_flows)
        .service(approval::get_approval_flow)
        .service(approval::create_approval_flow)
        .service(approval::update_approval_flow)
        .service(approval::delete_approval_flow)
        .service(test_config::list_test_configs)
        .service(test_config::get_test_config)
        .service(test_config::create_test_config)
        .service(test_config::update_test_config)
        .service(location::list_referrer_locations)
        .service(location::get_referrer_location)
        .service(location::create_referrer_location)
        .service(location::update_referrer_location)
        .service(location::list_storage_units)
        .service(location::get_storage_unit)
        .service(location::create_storage_unit)
        .service(location::update_storage_unit)
        .service(location::delete_storage_unit)
        .service(order::list_test_requests)
        .service(order::get_test_request)
        .service(order::create_test_request)
        .service(order::list_worksheets)
        .service(order::get_worksheet)
        .service(order::create_worksheet)
        .service(order::update_worksheet)
        .service(import::import_test_configs)
        .service(import::import_worksheet_results)
        .service(batch_job::list_batch_jobs)
        .service(batch_job::get_batch_job)
        .service(batch_job::create_batch_job)
        .service(batch_job::cancel_batch_jobs)
        .service(system_setting::list_system_settings)
}

#[get("/health_check")]
pub async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("healthy")
}

#[derive(Debug, thiserror::Error)]
pub enum APIError {
    #[error("Bad request")]
    BadRequest(#[source] anyhow::Error),
    #[error("Not found")]
    NotFound(#[source] anyhow::Error),
    #[error("Conflict")]
    Conflict(#[source] anyhow::Error),
    #[error("Something went wrong")]
    UnexpectedError(#[from] anyhow::Error),
}

impl ResponseError for APIError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        match self {
            Self::BadRequest(e) => {
                HttpResponse::BadRequest().body(format!("{self}: {e}"))
            }
            Self::NotFound(e) => {
                HttpResponse::NotFound().body(format!("{self}: {e}"))
            }
            Self::Conflict(e) => {
                HttpResponse::Conflict().body(format!("{self}: {e}"))
            }
            Self::UnexpectedError(_) => {
                HttpResponse::InternalServerError().body(self.to_string())
            }
        }
    }
}

impl From<StoreError> for APIError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound(_) => APIError::NotFound(e.into()),
            StoreError::Conflict(_) => APIError::Conflict(e.into()),
            StoreError::UnknownReference { .. } | StoreError::Invalid(_) => {
                APIError::BadRequest(e.into())
            }
        }
    }
}

/// Parse a uuid path segment.
fn parse_id(raw: &str) -> Result<Uuid, APIError> {
    Uuid::parse_str(raw).map_err(|e| {
        APIError::NotFound(anyhow::Error::from(e).context("Invalid uuid"))
    })
}

/// Record a write body exactly as received, then decode it.
fn parse_body<T: DeserializeOwned>(
    store: &MockStore,
    path: &str,
    body: serde_json::Value,
) -> Result<T, APIError> {
    store.record_body(path, &body);
    serde_json::from_value(body).map_err(|e| {
        APIError::BadRequest(anyhow::Error::from(e).context("Invalid body"))
    })
}

/// Decode a status-style enum from its wire name.
fn parse_enum<T: DeserializeOwned>(value: &str) -> Result<T, APIError> {
    serde_json::from_value(serde_json::Value::String(value.to_string()))
        .map_err(|e| {
            APIError::BadRequest(
                anyhow::Error::from(e)
                    .context(format!("Invalid value '{value}'")),
            )
        })
}

/// Query parameters of a list request.
#[derive(Debug, Default)]
pub struct ListParams(HashMap<String, String>);

impl ListParams {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self(params)
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn flag(&self, key: &str) -> Result<Option<bool>, APIError> {
        self.parsed(key)
    }

    pub fn parsed<T>(&self, key: &str) -> Result<Option<T>, APIError>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        self.get(key)
            .map(|value| {
                value.parse().map_err(|e: T::Err| {
                    APIError::BadRequest(
                        anyhow::Error::from(e)
                            .context(format!("Invalid {key} '{value}'")),
                    )
                })
            })
            .transpose()
    }

    pub fn date(&self, key: &str) -> Result<Option<Date>, APIError> {
        self.parsed(key)
    }

    pub fn timestamp(&self, key: &str) -> Result<Option<Timestamp>, APIError> {
        self.parsed(key)
    }

    /// A comma-joined multi-value parameter.
    pub fn list(&self, key: &str) -> Vec<&str> {
        self.get(key)
            .map(|value| {
                value
                    .split(',')
                    .map(str::trim)
                    .filter(|v| !v.is_empty())
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn enums<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>, APIError> {
        self.list(key).into_iter().map(parse_enum).collect()
    }

    /// Whether the free-text `q` matches any of `fields`, ignoring case.
    pub fn search(&self, fields: &[&str]) -> bool {
        match self.get("q") {
            None => true,
            Some(q) => {
                let q = q.to_lowercase();
                fields.iter().any(|field| field.to_lowercase().contains(&q))
            }
        }
    }

    /// Whether nested items were asked for, explicitly or through `v=full`.
    pub fn include_items(&self) -> Result<bool, APIError> {
        Ok(self.flag("includeItems")?.unwrap_or(false)
            || self.get("v") == Some("full"))
    }

    /// Cut one page out of the matching rows.
    pub fn page<T>(&self, rows: Vec<T>) -> Result<PageResult<T>, APIError> {
        let start = self.parsed::<usize>("startIndex")?.unwrap_or(0);
        let limit = self.parsed::<usize>("limit")?.unwrap_or(DEFAULT_LIMIT);
        let total = rows.len() as u64;
        let results = rows.into_iter().skip(start).take(limit).collect();
        let total_count = self
            .flag("totalCount")?
            .unwrap_or(false)
            .then_some(total);
        Ok(PageResult::new(results, total_count))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use payloads::responses::BatchJobStatus;

    fn params(pairs: &[(&str, &str)]) -> ListParams {
        ListParams::new(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn pages_default_to_the_first_fifty_rows() {
        let page = params(&[]).page((0..60).collect()).unwrap();
        assert_eq!(page.results.len(), DEFAULT_LIMIT);
        assert_eq!(page.total_count, None);
    }

    #[test]
    fn pages_honour_offset_and_report_totals() {
        let page = params(&[("startIndex", "5"), ("limit", "3"), ("totalCount", "true")])
            .page((0..7).collect::<Vec<u32>>())
            .unwrap();
        assert_eq!(page.results, vec![5, 6]);
        assert_eq!(page.total_count, Some(7));
    }

    #[test]
    fn multi_value_enums_are_comma_joined() {
        let statuses: Vec<BatchJobStatus> =
            params(&[("status", "PENDING,RUNNING")]).enums("status").unwrap();
        assert_eq!(statuses, vec![BatchJobStatus::Pending, BatchJobStatus::Running]);
        assert!(params(&[("status", "ASLEEP")])
            .enums::<BatchJobStatus>("status")
            .is_err());
    }

    #[test]
    fn search_ignores_case_and_blank_queries() {
        assert!(params(&[("q", "blood")]).search(&["Full Blood Count"]));
        assert!(!params(&[("q", "liver")]).search(&["Full Blood Count"]));
        assert!(params(&[("q", "  ")]).search(&["anything"]));
    }
}
