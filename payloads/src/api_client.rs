use crate::{
    ApprovalConfigId, ApprovalFlowId, BatchJobId, ReferrerLocationId,
    StorageUnitId, TestConfigId, TestRequestId, WorksheetId, filters, paths,
    query::{
        CacheKey, FilterCriteria, PageResult, QueryParams, Representation,
        ToQueryParams,
    },
    requests, responses,
};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, CACHE_CONTROL, PRAGMA};
use serde::{Serialize, de::DeserializeOwned};
use std::fmt::Display;

type ReqwestResult = Result<reqwest::Response, reqwest::Error>;

/// Path of the REST API below the server address.
pub const REST_ROOT: &str = "ws/rest/v1";

/// An API client for interfacing with the laboratory backend.
#[derive(Clone)]
pub struct APIClient {
    pub address: String,
    pub inner_client: reqwest::Client,
}

/// Helper methods for http actions
impl APIClient {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            inner_client: reqwest::Client::new(),
        }
    }

    /// Full URL for a path (optionally with query) below the REST root.
    pub fn format_url(&self, path: &str) -> String {
        format!(
            "{}/{REST_ROOT}/{}",
            self.address.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Every request leaves through here: local HTTP caches are bypassed and
    /// a JSON accept header is always present. Errors are returned as-is.
    async fn send(&self, request: reqwest::RequestBuilder) -> ReqwestResult {
        let request = request
            .header(CACHE_CONTROL, "no-cache")
            .header(PRAGMA, "no-cache")
            .header(ACCEPT, "application/json");

        #[cfg(target_arch = "wasm32")]
        let request = request.fetch_credentials_include();

        request.send().await
    }

    async fn get(&self, path: &str) -> ReqwestResult {
        self.send(self.inner_client.get(self.format_url(path))).await
    }

    async fn post(&self, path: &str, body: &impl Serialize) -> ReqwestResult {
        self.send(self.inner_client.post(self.format_url(path)).json(body))
            .await
    }

    async fn delete(&self, path: &str) -> ReqwestResult {
        self.send(self.inner_client.delete(self.format_url(path)))
            .await
    }

    async fn delete_with_body(
        &self,
        path: &str,
        body: &impl Serialize,
    ) -> ReqwestResult {
        self.send(self.inner_client.delete(self.format_url(path)).json(body))
            .await
    }

    async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ReqwestResult {
        self.send(self.inner_client.post(self.format_url(path)).multipart(form))
            .await
    }
}

/// Generic resource operations, shared by every laboratory collection.
impl APIClient {
    /// GET a cache key (path plus query) and decode the body.
    pub async fn fetch_key<T: DeserializeOwned>(
        &self,
        key: &CacheKey,
    ) -> Result<T, ClientError> {
        let response = self.get(key.as_str()).await?;
        ok_body(response).await
    }

    /// GET one page of a collection.
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        filter: &impl ToQueryParams,
    ) -> Result<PageResult<T>, ClientError> {
        self.fetch_key(&CacheKey::new(path, filter)).await
    }

    /// GET a single entity.
    pub async fn get_entity<T: DeserializeOwned>(
        &self,
        path: &str,
        uuid: &impl Display,
        v: Option<Representation>,
    ) -> Result<T, ClientError> {
        let criteria = FilterCriteria {
            v,
            ..Default::default()
        };
        self.fetch_key(&entity_key(path, uuid, &criteria)).await
    }

    /// POST a new entity.
    pub async fn create<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.post(path, body).await?;
        ok_body(response).await
    }

    /// POST to an existing entity; the backend treats this as an upsert.
    pub async fn update<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        uuid: &impl Display,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.post(&format!("{path}/{uuid}"), body).await?;
        ok_body(response).await
    }

    /// DELETE (void) an entity.
    pub async fn delete_entity(
        &self,
        path: &str,
        uuid: &impl Display,
    ) -> Result<(), ClientError> {
        let response = self.delete(&format!("{path}/{uuid}")).await?;
        ok_empty(response).await
    }

    /// Upload a file to a bulk import endpoint.
    pub async fn import(
        &self,
        path: &str,
        upload: &requests::FileImport,
    ) -> Result<responses::ImportResult, ClientError> {
        let file = reqwest::multipart::Part::bytes(upload.content.clone())
            .file_name(upload.file_name.clone())
            .mime_str(&upload.mime_type)?;
        let mut form = reqwest::multipart::Form::new()
            .part("file", file)
            .text("hasHeader", upload.has_header.to_string());
        if let Some(worksheet) = upload.worksheet {
            form = form.text("worksheetUuid", worksheet.to_string());
        }
        let response = self.post_multipart(path, form).await?;
        ok_body(response).await
    }
}

/// Key for a single entity below a collection path.
pub fn entity_key(
    path: &str,
    uuid: &impl Display,
    criteria: &impl ToQueryParams,
) -> CacheKey {
    CacheKey::new(&format!("{path}/{uuid}"), criteria)
}

/// Methods on the laboratory API
impl APIClient {
    // Approval configs

    pub async fn list_approval_configs(
        &self,
        filter: &filters::ApprovalConfigFilter,
    ) -> Result<PageResult<responses::ApprovalConfig>, ClientError> {
        self.list(paths::APPROVAL_CONFIG, filter).await
    }

    pub async fn get_approval_config(
        &self,
        id: &ApprovalConfigId,
    ) -> Result<responses::ApprovalConfig, ClientError> {
        self.get_entity(paths::APPROVAL_CONFIG, id, None).await
    }

    pub async fn create_approval_config(
        &self,
        details: &requests::UpsertApprovalConfig,
    ) -> Result<responses::ApprovalConfig, ClientError> {
        self.create(paths::APPROVAL_CONFIG, details).await
    }

    pub async fn update_approval_config(
        &self,
        id: &ApprovalConfigId,
        details: &requests::UpsertApprovalConfig,
    ) -> Result<responses::ApprovalConfig, ClientError> {
        self.update(paths::APPROVAL_CONFIG, id, details).await
    }

    pub async fn delete_approval_config(
        &self,
        id: &ApprovalConfigId,
    ) -> Result<(), ClientError> {
        self.delete_entity(paths::APPROVAL_CONFIG, id).await
    }

    // Approval flows

    pub async fn list_approval_flows(
        &self,
        filter: &filters::ApprovalFlowFilter,
    ) -> Result<PageResult<responses::ApprovalFlow>, ClientError> {
        self.list(paths::APPROVAL_FLOW, filter).await
    }

    pub async fn get_approval_flow(
        &self,
        id: &ApprovalFlowId,
    ) -> Result<responses::ApprovalFlow, ClientError> {
        self.get_entity(paths::APPROVAL_FLOW, id, None).await
    }

    pub async fn create_approval_flow(
        &self,
        details: &requests::UpsertApprovalFlow,
    ) -> Result<responses::ApprovalFlow, ClientError> {
        self.create(paths::APPROVAL_FLOW, details).await
    }

    pub async fn update_approval_flow(
        &self,
        id: &ApprovalFlowId,
        details: &requests::UpsertApprovalFlow,
    ) -> Result<responses::ApprovalFlow, ClientError> {
        self.update(paths::APPROVAL_FLOW, id, details).await
    }

    pub async fn delete_approval_flow(
        &self,
        id: &ApprovalFlowId,
    ) -> Result<(), ClientError> {
        self.delete_entity(paths::APPROVAL_FLOW, id).await
    }

    // Test configurations

    pub async fn list_test_configs(
        &self,
        filter: &filters::TestConfigFilter,
    ) -> Result<PageResult<responses::TestConfig>, ClientError> {
        self.list(paths::TEST_CONFIG, filter).await
    }

    pub async fn get_test_config(
        &self,
        id: &TestConfigId,
    ) -> Result<responses::TestConfig, ClientError> {
        self.get_entity(paths::TEST_CONFIG, id, None).await
    }

    pub async fn create_test_config(
        &self,
        details: &requests::UpsertTestConfig,
    ) -> Result<responses::TestConfig, ClientError> {
        self.create(paths::TEST_CONFIG, details).await
    }

    pub async fn update_test_config(
        &self,
        id: &TestConfigId,
        details: &requests::UpsertTestConfig,
    ) -> Result<responses::TestConfig, ClientError> {
        self.update(paths::TEST_CONFIG, id, details).await
    }

    /// Bulk import test configurations from a CSV file.
    pub async fn import_test_configs(
        &self,
        upload: &requests::FileImport,
    ) -> Result<responses::ImportResult, ClientError> {
        self.import(paths::TEST_CONFIG_IMPORT, upload).await
    }

    // Referrer locations

    pub async fn list_referrer_locations(
        &self,
        filter: &filters::ReferrerLocationFilter,
    ) -> Result<PageResult<responses::ReferrerLocation>, ClientError> {
        self.list(paths::REFERRER_LOCATION, filter).await
    }

    pub async fn get_referrer_location(
        &self,
        id: &ReferrerLocationId,
    ) -> Result<responses::ReferrerLocation, ClientError> {
        self.get_entity(paths::REFERRER_LOCATION, id, None).await
    }

    pub async fn create_referrer_location(
        &self,
        details: &requests::UpsertReferrerLocation,
    ) -> Result<responses::ReferrerLocation, ClientError> {
        self.create(paths::REFERRER_LOCATION, details).await
    }

    pub async fn update_referrer_location(
        &self,
        id: &ReferrerLocationId,
        details: &requests::UpsertReferrerLocation,
    ) -> Result<responses::ReferrerLocation, ClientError> {
        self.update(paths::REFERRER_LOCATION, id, details).await
    }

    // Storage

    pub async fn list_storage_units(
        &self,
        filter: &filters::StorageUnitFilter,
    ) -> Result<PageResult<responses::StorageUnit>, ClientError> {
        self.list(paths::STORAGE_UNIT, filter).await
    }

    pub async fn get_storage_unit(
        &self,
        id: &StorageUnitId,
    ) -> Result<responses::StorageUnit, ClientError> {
        self.get_entity(paths::STORAGE_UNIT, id, None).await
    }

    pub async fn create_storage_unit(
        &self,
        details: &requests::UpsertStorageUnit,
    ) -> Result<responses::StorageUnit, ClientError> {
        self.create(paths::STORAGE_UNIT, details).await
    }

    pub async fn update_storage_unit(
        &self,
        id: &StorageUnitId,
        details: &requests::UpsertStorageUnit,
    ) -> Result<responses::StorageUnit, ClientError> {
        self.update(paths::STORAGE_UNIT, id, details).await
    }

    pub async fn delete_storage_unit(
        &self,
        id: &StorageUnitId,
    ) -> Result<(), ClientError> {
        self.delete_entity(paths::STORAGE_UNIT, id).await
    }

    // Test requests

    pub async fn list_test_requests(
        &self,
        filter: &filters::TestRequestFilter,
    ) -> Result<PageResult<responses::TestRequest>, ClientError> {
        self.list(paths::TEST_REQUEST, filter).await
    }

    pub async fn get_test_request(
        &self,
        id: &TestRequestId,
    ) -> Result<responses::TestRequest, ClientError> {
        self.get_entity(paths::TEST_REQUEST, id, Some(Representation::Full))
            .await
    }

    pub async fn create_test_request(
        &self,
        details: &requests::CreateTestRequest,
    ) -> Result<responses::TestRequest, ClientError> {
        self.create(paths::TEST_REQUEST, details).await
    }

    // Worksheets

    pub async fn list_worksheets(
        &self,
        filter: &filters::WorksheetFilter,
    ) -> Result<PageResult<responses::Worksheet>, ClientError> {
        self.list(paths::WORKSHEET, filter).await
    }

    pub async fn get_worksheet(
        &self,
        id: &WorksheetId,
    ) -> Result<responses::Worksheet, ClientError> {
        self.get_entity(paths::WORKSHEET, id, Some(Representation::Full))
            .await
    }

    pub async fn create_worksheet(
        &self,
        details: &requests::UpsertWorksheet,
    ) -> Result<responses::Worksheet, ClientError> {
        self.create(paths::WORKSHEET, details).await
    }

    pub async fn update_worksheet(
        &self,
        id: &WorksheetId,
        details: &requests::UpsertWorksheet,
    ) -> Result<responses::Worksheet, ClientError> {
        self.update(paths::WORKSHEET, id, details).await
    }

    /// Import instrument results for the items of one worksheet.
    pub async fn import_worksheet_results(
        &self,
        upload: &requests::FileImport,
    ) -> Result<responses::ImportResult, ClientError> {
        self.import(paths::WORKSHEET_IMPORT, upload).await
    }

    // Batch jobs and reports

    pub async fn list_batch_jobs(
        &self,
        filter: &filters::BatchJobFilter,
    ) -> Result<PageResult<responses::BatchJob>, ClientError> {
        self.list(paths::BATCH_JOB, filter).await
    }

    pub async fn get_batch_job(
        &self,
        id: &BatchJobId,
    ) -> Result<responses::BatchJob, ClientError> {
        self.get_entity(paths::BATCH_JOB, id, None).await
    }

    pub async fn create_batch_job(
        &self,
        details: &requests::CreateBatchJob,
    ) -> Result<responses::BatchJob, ClientError> {
        self.create(paths::BATCH_JOB, details).await
    }

    /// Cancel one or more batch jobs.
    ///
    /// The reason is sent both as a query parameter and in the JSON body;
    /// the backend contract has not confirmed which of the two it reads.
    /// Does nothing when `ids` is empty.
    pub async fn cancel_batch_jobs(
        &self,
        ids: &[BatchJobId],
        reason: &str,
    ) -> Result<(), ClientError> {
        let Some(first) = ids.first() else {
            return Ok(());
        };
        let mut params = QueryParams::new();
        params
            .push_list(
                "ids",
                &ids.iter().map(|id| id.0).collect::<Vec<_>>(),
            )
            .push("reason", Some(reason));
        let path = format!(
            "{}/{first}{}",
            paths::BATCH_JOB,
            params.to_query_string()
        );
        let body = requests::CancelBatchJobs {
            reason: reason.to_string(),
        };
        let response = self.delete_with_body(&path, &body).await?;
        ok_empty(response).await
    }

    // System settings

    /// Global properties whose names start with `prefix`.
    pub async fn list_global_properties(
        &self,
        prefix: &str,
    ) -> Result<PageResult<responses::GlobalProperty>, ClientError> {
        let criteria = FilterCriteria::default()
            .with_q(prefix)
            .with_v(Representation::Custom("property,value".into()));
        self.list(paths::SYSTEM_SETTING, &criteria).await
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// An unhandled API error to display, containing response text.
    #[error("{1}")]
    APIError(StatusCode, String),
    #[error("Network error. Please check your connection.")]
    Network(#[from] reqwest::Error),
}

impl ClientError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::APIError(status, _) => Some(*status),
            Self::Network(e) => e.status(),
        }
    }
}

/// Deserialize a successful request into the desired type, or return an
/// appropriate error.
pub async fn ok_body<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(response.json::<T>().await?)
}

/// Check that an empty response is OK, returning a ClientError if not.
pub async fn ok_empty(response: reqwest::Response) -> Result<(), ClientError> {
    if !response.status().is_success() {
        return Err(ClientError::APIError(
            response.status(),
            response.text().await?,
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn urls_resolve_below_rest_root() {
        let client = APIClient::new("http://localhost:8080/openmrs/");
        assert_eq!(
            client.format_url("labmanagement/worksheet?limit=5"),
            "http://localhost:8080/openmrs/ws/rest/v1/labmanagement/worksheet?limit=5"
        );
    }

    #[test]
    fn entity_keys_nest_under_collection() {
        let id = WorksheetId(uuid::Uuid::nil());
        let key = entity_key(
            paths::WORKSHEET,
            &id,
            &FilterCriteria::default().with_v(Representation::Full),
        );
        assert_eq!(
            key.as_str(),
            "labmanagement/worksheet/00000000-0000-0000-0000-000000000000?v=full"
        );
        assert!(key.is_under(paths::WORKSHEET));
    }
}
