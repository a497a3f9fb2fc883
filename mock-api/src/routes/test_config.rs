use actix_web::{HttpResponse, get, post, web};
use payloads::{TestConfigId, paths};
use std::collections::HashMap;

use crate::store::MockStore;

use super::{APIError, ListParams, parse_body, parse_id};

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/testconfig")]
pub async fn list_test_configs(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let active = params.flag("active")?;
    let tests = params.list("tests");
    let rows: Vec<_> = store
        .lock()
        .test_configs
        .iter()
        .filter(|c| active.is_none_or(|active| c.enabled == active))
        .filter(|c| tests.is_empty() || tests.contains(&c.test.uuid.as_str()))
        .filter(|c| {
            params.search(&[
                c.test.label(),
                c.test_short_name.as_deref().unwrap_or_default(),
            ])
        })
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}

#[tracing::instrument(skip(store), ret)]
#[get("/labmanagement/testconfig/{uuid}")]
pub async fn get_test_config(
    uuid: web::Path<String>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = TestConfigId(parse_id(&uuid)?);
    let config = store.lock().get_test_config(&id)?;
    Ok(HttpResponse::Ok().json(config))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/testconfig")]
pub async fn create_test_config(
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let details = parse_body(&store, paths::TEST_CONFIG, body.into_inner())?;
    let now = store.time.now();
    let config = store.lock().upsert_test_config(None, details, now)?;
    Ok(HttpResponse::Created().json(config))
}

#[tracing::instrument(skip(store), ret)]
#[post("/labmanagement/testconfig/{uuid}")]
pub async fn update_test_config(
    uuid: web::Path<String>,
    body: web::Json<serde_json::Value>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let id = TestConfigId(parse_id(&uuid)?);
    let details = parse_body(&store, paths::TEST_CONFIG, body.into_inner())?;
    let now = store.time.now();
    let config = store.lock().upsert_test_config(Some(id), details, now)?;
    Ok(HttpResponse::Ok().json(config))
}
