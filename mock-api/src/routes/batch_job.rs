use actix_web::{HttpResponse, delete, get, post, web};
use payloads::{
    BatchJobId, paths,
    requests::CancelBatchJobs,
    responses::{BatchJobStatus, BatchJobType},
};
use std::collections::HashMap;

use crate::store::{Cancellation, MockStore};

use super::{APIError, ListParams, parse_body, parse_enum, parse_id};

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/batchjob")]
pub async fn list_batch_jobs(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let statuses: Vec<BatchJobStatus> = params.enums("status")?;
    let job_type: Option<BatchJobType> =
        params.get("batchJobType").map(parse_enum).transpose()?;
    let created_min = params.timestamp("dateCreatedMin")?;
    let created_max = params.timestamp("dateCreatedMax")?;

    // Newest first.
    let mut rows: Vec<_> = store
        .lock()
        .batch_jobs
        .iter()
        .filter(|j| statuses.is_empty() || statuses.contains(&j.status))
        .filter(|j| job_type.is_none_or(|t| j.batch_job_type == t))
        .filter(|j| created_min.is_none_or(|t| j.date_created >= t))
        .filter(|j| created_max.is_none_or(|t| j.date_created <= t))
        .filter(|j| params.search(&[j.description.as_str()]))
        .cloned()
        .collect();
    rows.reverse();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/batchjob/{uuid}")]
pub async fn get_batch_job(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = BatchJobId(parse_id(&uuid)?);
    let job = store.lock().get_batch_job(&id)?;
    Ok(HttpResponse::Ok().json(job))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/batchjob")]
pub async fn create_batch_job(
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let details = parse_body(&store, paths::BATCH_JOB, body.into_inner())?;
    let now = store.time.now();
    let job = store.lock().create_batch_job(details, now)?;
    Ok(HttpResponse::Created().json(job))
}

/// Cancel the jobs listed in `ids` (or just the one in the path). The reason
/// is read from the query string, falling back to the JSON body.
#[tracing::instrument(skip(body, store), ret)]
#[delete("/labmanagement/batchjob/{uuid}")]
pub async fn cancel_batch_jobs(
    uuid: web::Path<String>,
    params: web::Query<HashMap<String, String>>,
    body: web::Bytes,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let ids = match params.list("ids").as_slice() {
        [] => vec![BatchJobId(parse_id(&uuid)?)],
        ids => ids
            .iter()
            .map(|id| parse_id(id).map(BatchJobId))
            .collect::<Result<Vec<_>, _>>()?,
    };
    let body_reason = if body.is_empty() {
        None
    } else {
        let value: serde_json::Value = serde_json::from_slice(&body)
            .map_err(|e| APIError::BadRequest(e.into()))?;
        let cancel: CancelBatchJobs = parse_body(&store, paths::BATCH_JOB, value)?;
        Some(cancel.reason)
    };
    let query_reason = params.get("reason").map(str::to_string);
    store.record_cancellation(Cancellation {
        ids: ids.clone(),
        query_reason: query_reason.clone(),
        body_reason: body_reason.clone(),
    });

    let reason = query_reason.or(body_reason).unwrap_or_default();
    let now = store.time.now();
    store.lock().cancel_batch_jobs(&ids, &reason, now)?;
    Ok(HttpResponse::NoContent().finish())
}
