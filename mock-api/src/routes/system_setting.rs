use actix_web::{HttpResponse, get, web};
use std::collections::HashMap;

use crate::store::MockStore;

use super::{APIError, ListParams};

/// Global properties; `q` is a name prefix.
#[tracing::instrument(skip(store), ret)]
#[get("/systemsetting")]
pub async fn list_system_settings(
    params: web::Query<HashMap<String, String>>,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let params = ListParams::new(params.into_inner());
    let prefix = params.get("q").unwrap_or_default();
    let rows: Vec<_> = store
        .lock()
        .global_properties
        .iter()
        .filter(|p| p.property.starts_with(prefix))
        .cloned()
        .collect();
    Ok(HttpResponse::Ok().json(params.page(rows)?))
}
