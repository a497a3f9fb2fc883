//! Test requests and worksheets.

use actix_web::{HttpResponse, get, post, web};
use payloads::{
    TestRequestId, WorksheetId, paths,
    responses::{TestRequestStatus, UrgencyType, WorksheetStatus},
};
use std::collections::HashMap;

use crate::store::MockStore;

use super::{APIError, ListParams, parse_body, parse_enum, parse_id};

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/request")]
pub async fn list_test_requests(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let statuses: Vec<TestRequestStatus> = params.enums("status")?;
    let urgency: Option<UrgencyType> =
        params.get("urgency").map(parse_enum).transpose()?;
    let patient = params.get("patient");
    let location = params.get("location");
    let min_date = params.date("minRequestDate")?;
    let max_date = params.date("maxRequestDate")?;
    let include_items = params.include_items()?;

    let rows: Vec<_> = store
        .lock()
        .test_requests
        .iter()
        .filter(|r| statuses.is_empty() || statuses.contains(&r.status))
        .filter(|r| urgency.is_none_or(|u| r.urgency == u))
        .filter(|r| patient.is_none_or(|p| r.patient.uuid == p))
        .filter(|r| location.is_none_or(|l| r.at_location.uuid == l))
        .filter(|r| min_date.is_none_or(|d| r.request_date >= d))
        .filter(|r| max_date.is_none_or(|d| r.request_date <= d))
        .filter(|r| params.search(&[r.request_no.as_str(), r.patient.label()]))
        .map(|r| {
            let mut r = r.clone();
            if !include_items {
                r.tests.clear();
            }
            r
        })
        .collect();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/request/{uuid}")]
pub async fn get_test_request(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = TestRequestId(parse_id(&uuid)?);
    let request = store.lock().get_test_request(&id)?;
    Ok(HttpResponse::Ok().json(request))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/request")]
pub async fn create_test_request(
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let details = parse_body(&store, paths::TEST_REQUEST, body.into_inner())?;
    let now = store.time.now();
    let request = store.lock().create_test_request(details, now)?;
    Ok(HttpResponse::Created().json(request))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/worksheet")]
pub async fn list_worksheets(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let statuses: Vec<WorksheetStatus> = params.enums("status")?;
    let responsible = params.get("responsiblePerson");
    let min_date = params.date("minWorksheetDate")?;
    let max_date = params.date("maxWorksheetDate")?;
    let include_items = params.include_items()?;

    let rows: Vec<_> = store
        .lock()
        .worksheets
        .iter()
        .filter(|w| statuses.is_empty() || statuses.contains(&w.status))
        .filter(|w| {
            responsible.is_none_or(|p| {
                w.responsible_person.as_ref().is_some_and(|r| r.uuid == p)
            })
        })
        .filter(|w| min_date.is_none_or(|d| w.worksheet_date >= d))
        .filter(|w| max_date.is_none_or(|d| w.worksheet_date <= d))
        .filter(|w| params.search(&[w.worksheet_no.as_str()]))
        .map(|w| {
            let mut w = w.clone();
            if !include_items {
                w.worksheet_items.clear();
            }
            w
        })
        .collect();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/worksheet/{uuid}")]
pub async fn get_worksheet(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = WorksheetId(parse_id(&uuid)?);
    let worksheet = store.lock().get_worksheet(&id)?;
    Ok(HttpResponse::Ok().json(worksheet))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/worksheet")]
pub async fn create_worksheet(
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let details = parse_body(&store, paths::WORKSHEET, body.into_inner())?;
    let now = store.time.now();
    let worksheet = store.lock().create_worksheet(details, now)?;
    Ok(HttpResponse::Created().json(worksheet))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/worksheet/{uuid}")]
pub async fn update_worksheet(
    uuid: web::Path<String>,
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = WorksheetId(parse_id(&uuid)?);
    let details = parse_body(&store, paths::WORKSHEET, body.into_inner())?;
    let now = store.time.now();
    let worksheet = store.lock().update_worksheet(&id, details, now)?;
    Ok(HttpResponse::Ok().json(worksheet))
}
