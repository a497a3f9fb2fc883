use actix_web::{HttpResponse, delete, get, post, web};
use payloads::{ApprovalConfigId, ApprovalFlowId, paths};
use std::collections::HashMap;

use crate::store::MockStore;

use super::{APIError, ListParams, parse_body, parse_id};

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/approvalconfig")]
pub async fn list_approval_configs(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let include_voided = params.flag("includeVoided")?.unwrap_or(false);
    let rows: Vec<_> = store
        .lock()
        .approval_configs
        .iter()
        .filter(|c| include_voided || !c.voided)
        .filter(|c| {
            params.search(&[
                c.approval_title.as_str(),
                c.approval_required.as_str(),
            ])
        })
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/approvalconfig/{uuid}")]
pub async fn get_approval_config(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = ApprovalConfigId(parse_id(&uuid)?);
    let config = store.lock().get_approval_config(&id)?;
    Ok(HttpResponse::Ok().json(config))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/approvalconfig")]
pub async fn create_approval_config(
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let details = parse_body(&store, paths::APPROVAL_CONFIG, body.into_inner())?;
    let now = store.time.now();
    let config = store.lock().upsert_approval_config(None, details, now)?;
    Ok(HttpResponse::Created().json(config))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/approvalconfig/{uuid}")]
pub async fn update_approval_config(
    uuid: web::Path<String>,
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = ApprovalConfigId(parse_id(&uuid)?);
    let details = parse_body(&store, paths::APPROVAL_CONFIG, body.into_inner())?;
    let now = store.time.now();
    let config = store.lock().upsert_approval_config(Some(id), details, now)?;
    Ok(HttpResponse::Ok().json(config))
}

#[tracing::instrument(skip(store), ret)]
#[delete("/labmanagement/approvalconfig/{uuid}")]
pub async fn delete_approval_config(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = ApprovalConfigId(parse_id(&uuid)?);
    store.lock().void_approval_config(&id)?;
    Ok(HttpResponse::NoContent().finish())
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/approvalflow")]
pub async fn list_approval_flows(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let include_voided = params.flag("includeVoided")?.unwrap_or(false);
    let rows: Vec<_> = store
        .lock()
        .approval_flows
        .iter()
        .filter(|f| include_voided || !f.voided)
        .filter(|f| params.search(&[f.name.as_str(), f.system_name.as_str()]))
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/approvalflow/{uuid}")]
pub async fn get_approval_flow(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = ApprovalFlowId(parse_id(&uuid)?);
    let flow = store.lock().get_approval_flow(&id)?;
    Ok(HttpResponse::Ok().json(flow))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/approvalflow")]
pub async fn create_approval_flow(
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let details = parse_body(&store, paths::APPROVAL_FLOW, body.into_inner())?;
    let now = store.time.now();
    let flow = store.lock().upsert_approval_flow(None, details, now)?;
    Ok(HttpResponse::Created().json(flow))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/approvalflow/{uuid}")]
pub async fn update_approval_flow(
    uuid: web::Path<String>,
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = ApprovalFlowId(parse_id(&uuid)?);
    let details = parse_body(&store, paths::APPROVAL_FLOW, body.into_inner())?;
    let now = store.time.now();
    let flow = store.lock().upsert_approval_flow(Some(id), details, now)?;
    Ok(HttpResponse::Ok().json(flow))
}

#[tracing::instrument(skip(store), ret)]
#[delete("/labmanagement/approvalflow/{uuid}")]
pub async fn delete_approval_flow(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = ApprovalFlowId(parse_id(&uuid)?);
    store.lock().void_approval_flow(&id)?;
    Ok(HttpResponse::NoContent().finish())
}
