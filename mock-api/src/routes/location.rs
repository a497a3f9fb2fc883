//! Referrer locations and storage units.

use actix_web::{HttpResponse, delete, get, post, web};
use payloads::{ReferrerLocationId, StorageUnitId, paths};
use std::collections::HashMap;

use crate::store::MockStore;

use super::{APIError, ListParams, parse_body, parse_id};

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/referrerlocation")]
pub async fn list_referrer_locations(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let active = params.flag("active")?;
    let referrer_in = params.flag("referrerIn")?;
    let referrer_out = params.flag("referrerOut")?;
    let rows: Vec<_> = store
        .lock()
        .referrer_locations
        .iter()
        .filter(|l| active.is_none_or(|active| l.enabled == active))
        .filter(|l| referrer_in.is_none_or(|v| l.referrer_in == v))
        .filter(|l| referrer_out.is_none_or(|v| l.referrer_out == v))
        .filter(|l| {
            params.search(&[
                l.name.as_str(),
                l.acronym.as_deref().unwrap_or_default(),
            ])
        })
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/referrerlocation/{uuid}")]
pub async fn get_referrer_location(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = ReferrerLocationId(parse_id(&uuid)?);
    let location = store.lock().get_referrer_location(&id)?;
    Ok(HttpResponse::Ok().json(location))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/referrerlocation")]
pub async fn create_referrer_location(
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let details =
        parse_body(&store, paths::REFERRER_LOCATION, body.into_inner())?;
    let now = store.time.now();
    let location = store.lock().upsert_referrer_location(None, details, now)?;
    Ok(HttpResponse::Created().json(location))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/referrerlocation/{uuid}")]
pub async fn update_referrer_location(
    uuid: web::Path<String>,
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = ReferrerLocationId(parse_id(&uuid)?);
    let details =
        parse_body(&store, paths::REFERRER_LOCATION, body.into_inner())?;
    let now = store.time.now();
    let location =
        store.lock().upsert_referrer_location(Some(id), details, now)?;
    Ok(HttpResponse::Ok().json(location))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/storageunit")]
pub async fn list_storage_units(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let active = params.flag("active")?;
    let location = params.get("location");
    let rows: Vec<_> = store
        .lock()
        .storage_units
        .iter()
        .filter(|u| active.is_none_or(|active| u.active == active))
        .filter(|u| {
            location.is_none_or(|location| {
                u.location.as_ref().is_some_and(|l| l.uuid == location)
            })
        })
        .filter(|u| params.search(&[u.unit_name.as_str()]))
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/storageunit/{uuid}")]
pub async fn get_storage_unit(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = StorageUnitId(parse_id(&uuid)?);
    let unit = store.lock().get_storage_unit(&id)?;
    Ok(HttpResponse::Ok().json(unit))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/storageunit")]
pub async fn create_storage_unit(
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let details = parse_body(&store, paths::STORAGE_UNIT, body.into_inner())?;
    let now = store.time.now();
    let unit = store.lock().upsert_storage_unit(None, details, now)?;
    Ok(HttpResponse::Created().json(unit))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/storageunit/{uuid}")]
pub async fn update_storage_unit(
    uuid: web::Path<String>,
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = StorageUnitId(parse_id(&uuid)?);
    let details = parse_body(&store, paths::STORAGE_UNIT, body.into_inner())?;
    let now = store.time.now();
    let unit = store.lock().upsert_storage_unit(Some(id), details, now)?;
    Ok(HttpResponse::Ok().json(unit))
}

#[tracing::instrument(skip(store), ret)]
#[delete("/labmanagement/storageunit/{uuid}")]
pub async fn delete_storage_unit(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = StorageUnitId(parse_id(&uuid)?);
    store.lock().delete_storage_unit(&id)?;
    Ok(HttpResponse::NoContent().finish())
}
