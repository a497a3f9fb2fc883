//! Bulk imports: multipart uploads with a `file` part plus text options.

use actix_multipart::Multipart;
use actix_web::{HttpResponse, post, web};
use futures::TryStreamExt;
use payloads::WorksheetId;

use crate::store::MockStore;

use super::{APIError, parse_id};

#[derive(Debug, Default)]
struct ImportUpload {
    content: Option<String>,
    has_header: bool,
    worksheet: Option<String>,
}

fn bad_upload(e: impl std::fmt::Display) -> APIError {
    APIError::BadRequest(anyhow::anyhow!("Invalid upload: {e}"))
}

/// Collect the parts of an import upload. Unknown parts are ignored.
async fn read_upload(mut payload: Multipart) -> Result<ImportUpload, APIError> {
    let mut upload = ImportUpload::default();
    while let Some(mut field) = payload.try_next().await.map_err(bad_upload)? {
        let name = field.name().unwrap_or_default().to_string();
        let mut data = Vec::new();
        while let Some(chunk) = field.try_next().await.map_err(bad_upload)? {
            data.extend_from_slice(&chunk);
        }
        let text = String::from_utf8(data).map_err(bad_upload)?;
        match name.as_str() {
            "file" => upload.content = Some(text),
            "hasHeader" => upload.has_header = text.trim() == "true",
            "worksheetUuid" => upload.worksheet = Some(text.trim().to_string()),
            _ => tracing::debug!(name, "ignoring upload part"),
        }
    }
    Ok(upload)
}

#[tracing::instrument(skip(payload, store), ret)]
#[post("/labmanagement/testconfigimport")]
pub async fn import_test_configs(
    payload: Multipart,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let upload = read_upload(payload).await?;
    let content = upload.content.ok_or_else(|| bad_upload("missing file"))?;
    let now = store.time.now();
    let result = store
        .lock()
        .import_test_configs(&content, upload.has_header, now);
    Ok(HttpResponse::Ok().json(result))
}

#[tracing::instrument(skip(payload, store), ret)]
#[post("/labmanagement/worksheetimport")]
pub async fn import_worksheet_results(
    payload: Multipart,
    store: web::Data<MockStore>,
) -> Result<HttpResponse, APIError> {
    let upload = read_upload(payload).await?;
    let content = upload.content.ok_or_else(|| bad_upload("missing file"))?;
    let worksheet = upload
        .worksheet
        .ok_or_else(|| bad_upload("missing worksheetUuid"))?;
    let id = WorksheetId(parse_id(&worksheet)?);
    let result = store.lock().import_worksheet_results(
        &id,
        &content,
        upload.has_header,
    )?;
    Ok(HttpResponse::Ok().json(result))
}
