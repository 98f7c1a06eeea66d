//! HTTP handlers for object listing, search, and transfer operations.
//!
//! Each handler resolves the session, runs exactly one service operation,
//! and maps the result onto the JSON/byte-stream response contract.

use axum::extract::{Multipart, Query, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Redirect, Response};
use axum::{Form, Json};
use serde::Deserialize;
use serde_json::json;
use tracing::{error, info};

use crate::errors::AppError;
use crate::handlers::session::{MaybeAuth, SessionAuth};
use crate::models::object::{ObjectDescriptor, ObjectPage};
use crate::services::storage_service::StorageService;

#[derive(Debug, Deserialize)]
pub struct ObjectsQuery {
    pub bucket: String,
    #[serde(default)]
    pub prefix: String,
    pub cursor: Option<String>,
}

/// GET /objects — one listing page plus the cursor for the next.
pub async fn list_objects(
    State(service): State<StorageService>,
    auth: SessionAuth,
    Query(query): Query<ObjectsQuery>,
) -> Result<Json<ObjectPage>, AppError> {
    let page = service
        .list_objects(
            &auth.credential,
            &query.bucket,
            &query.prefix,
            query.cursor.as_deref(),
        )
        .await?;
    Ok(Json(page))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    pub bucket: String,
    #[serde(default)]
    pub q: String,
}

/// GET /search — prefix match against object keys. This is *prefix*
/// search, not substring or full-text; an empty query yields an empty
/// array.
pub async fn search_objects(
    State(service): State<StorageService>,
    auth: SessionAuth,
    Query(query): Query<SearchQuery>,
) -> Result<Json<Vec<ObjectDescriptor>>, AppError> {
    let objects = service
        .search_objects(&auth.credential, &query.bucket, &query.q)
        .await?;
    Ok(Json(objects))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub bucket: String,
    pub key: String,
}

/// GET /download — whole object as an attachment. Browser-facing, so an
/// unauthenticated request redirects to the login page instead of a 401.
pub async fn download_object(
    State(service): State<StorageService>,
    MaybeAuth(auth): MaybeAuth,
    Query(query): Query<DownloadQuery>,
) -> Response {
    let Some(auth) = auth else {
        return Redirect::to("/login").into_response();
    };
    match service
        .download_object(&auth.credential, &query.bucket, &query.key)
        .await
    {
        Ok((data, file_name)) => {
            let mut response = (StatusCode::OK, data).into_response();
            let headers = response.headers_mut();
            headers.insert(
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            let disposition = format!("attachment; filename=\"{}\"", header_safe(&file_name));
            if let Ok(value) = HeaderValue::from_str(&disposition) {
                headers.insert(header::CONTENT_DISPOSITION, value);
            }
            response
        }
        Err(err) => err.into_response(),
    }
}

/// POST /upload — multipart form carrying the file plus its destination.
pub async fn upload_object(
    State(service): State<StorageService>,
    auth: SessionAuth,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, AppError> {
    let mut file: Option<(String, bytes::Bytes)> = None;
    let mut bucket: Option<String> = None;
    let mut prefix = String::new();

    while let Some(field) = multipart.next_field().await.map_err(|err| {
        AppError::InvalidRequest(format!("malformed multipart body: {}", err))
    })? {
        // Reading a field consumes it, so take the name first.
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "file" => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let data = field.bytes().await.map_err(|err| {
                    AppError::InvalidRequest(format!("could not read file field: {}", err))
                })?;
                file = Some((file_name, data));
            }
            "bucket" => {
                bucket = Some(field.text().await.map_err(|err| {
                    AppError::InvalidRequest(format!("could not read bucket field: {}", err))
                })?);
            }
            "prefix" => {
                prefix = field.text().await.map_err(|err| {
                    AppError::InvalidRequest(format!("could not read prefix field: {}", err))
                })?;
            }
            _ => {}
        }
    }

    let (file_name, data) =
        file.ok_or_else(|| AppError::InvalidRequest("file is required".into()))?;
    let bucket = bucket
        .filter(|b| !b.is_empty())
        .ok_or_else(|| AppError::InvalidRequest("bucket is required".into()))?;

    info!(
        "upload start: bucket={} prefix={} file={} bytes={}",
        bucket,
        prefix,
        file_name,
        data.len()
    );
    match service
        .upload_object(&auth.credential, &bucket, &prefix, &file_name, data)
        .await
    {
        Ok(key) => {
            info!("upload complete: bucket={} key={}", bucket, key);
            Ok(Json(json!({ "success": true, "key": key })))
        }
        Err(err) => {
            error!("upload failed: bucket={} file={}: {}", bucket, file_name, err);
            Err(err)
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteForm {
    pub bucket: Option<String>,
    pub key: Option<String>,
}

/// POST /delete — parameter presence is checked before any backend call;
/// deleting an absent key still succeeds.
pub async fn delete_object(
    State(service): State<StorageService>,
    auth: SessionAuth,
    Form(form): Form<DeleteForm>,
) -> Result<Json<serde_json::Value>, AppError> {
    let bucket = form.bucket.unwrap_or_default();
    let key = form.key.unwrap_or_default();
    service
        .delete_object(&auth.credential, &bucket, &key)
        .await?;
    Ok(Json(json!({ "success": true })))
}

/// Strip characters that would break the Content-Disposition header.
fn header_safe(file_name: &str) -> String {
    file_name
        .chars()
        .filter(|c| !c.is_control() && *c != '"' && *c != '\\')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disposition_names_drop_quotes_and_controls() {
        assert_eq!(header_safe("report.pdf"), "report.pdf");
        assert_eq!(header_safe("we\"ird\\name\n.txt"), "weirdname.txt");
    }
}
