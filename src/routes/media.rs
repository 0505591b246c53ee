//! Media procedures: metadata list/insert/delete plus the disk upload
//! collaborator.
//!
//! Upload and persistence are two separate calls: `POST /api/upload` writes
//! the bytes and answers with the metadata record, which the panel then
//! stores through `POST /api/media`. Deletion mirrors that split - the row
//! is removed first and the backing file second, so a failure in between
//! leaves an orphan file, never a dangling row.

use axum::{
    extract::{Multipart, Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use std::path::PathBuf;
use uuid::Uuid;

use crate::db::models::NewMediaFile;
use crate::db::queries;
use crate::routes::auth::require_admin;
use crate::routes::{bad_request, internal_error, SuccessResponse};
use crate::AppState;

pub const UPLOAD_DIR: &str = "uploads";
const MAX_FILE_SIZE: usize = 10 * 1024 * 1024; // 10 MiB
const ALLOWED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp", "gif", "svg"];

/// Result of a disk upload, fed back to the panel for persistence
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    pub filename: String,
    pub original_name: String,
    pub mime_type: String,
    pub size: usize,
    pub url: String,
    pub file_key: String,
}

fn sniff_image_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.len() < 4 {
        return None;
    }
    match bytes {
        // JPEG: FF D8 FF
        [0xFF, 0xD8, 0xFF, ..] => Some("image/jpeg"),
        // PNG: 89 50 4E 47
        [0x89, 0x50, 0x4E, 0x47, ..] => Some("image/png"),
        // GIF: 47 49 46 38
        [0x47, 0x49, 0x46, 0x38, ..] => Some("image/gif"),
        // WebP: 52 49 46 46 .. 57 45 42 50
        [0x52, 0x49, 0x46, 0x46, _, _, _, _, 0x57, 0x45, 0x42, 0x50, ..] => Some("image/webp"),
        // SVG has no magic number; accept the two textual openings
        _ => {
            let head = String::from_utf8_lossy(&bytes[..bytes.len().min(256)]);
            let head = head.trim_start();
            if head.starts_with("<?xml") || head.starts_with("<svg") {
                Some("image/svg+xml")
            } else {
                None
            }
        }
    }
}

fn extension_for_mime(mime: &str) -> &'static str {
    match mime {
        "image/jpeg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        "image/svg+xml" => "svg",
        _ => "bin",
    }
}

fn is_safe_file_key(file_key: &str) -> bool {
    !file_key.is_empty()
        && !file_key.contains("..")
        && !file_key.contains('/')
        && !file_key.contains('\\')
        && !file_key.contains('\0')
}

/// GET /api/media - newest first
pub async fn list_media(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::list_media(&state.pool).await {
        Ok(files) => Json(files).into_response(),
        Err(e) => {
            tracing::error!("Database error listing media: {}", e);
            internal_error()
        }
    }
}

/// POST /api/media - persist the metadata record produced by the upload
/// handler. The upload collaborator already filtered type and size; only
/// structural emptiness is rechecked here.
pub async fn create_media(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<NewMediaFile>,
) -> Response {
    if payload.filename.trim().is_empty() {
        return bad_request("Filename is required");
    }
    if payload.file_key.trim().is_empty() {
        return bad_request("File key is required");
    }
    if payload.url.trim().is_empty() {
        return bad_request("Url is required");
    }

    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::insert_media(&state.pool, &payload).await {
        Ok(file) => (StatusCode::CREATED, Json(file)).into_response(),
        Err(e) => {
            tracing::error!("Database error inserting media metadata: {}", e);
            internal_error()
        }
    }
}

/// DELETE /api/media/{id} - removes the row, then best-effort removes the
/// backing file. Already-absent rows are a successful no-op.
pub async fn delete_media(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    let deleted = match queries::delete_media(&state.pool, id).await {
        Ok(deleted) => deleted,
        Err(e) => {
            tracing::error!("Database error deleting media {}: {}", id, e);
            return internal_error();
        }
    };

    if let Some(file) = deleted {
        if is_safe_file_key(&file.file_key) {
            let path = PathBuf::from(UPLOAD_DIR).join(&file.file_key);
            if let Err(e) = tokio::fs::remove_file(&path).await {
                // Orphaned file; the record is already gone.
                tracing::warn!("Failed to remove backing file {}: {}", file.file_key, e);
            }
        } else {
            tracing::warn!("Refusing to remove suspicious file key: {}", file.file_key);
        }
    }

    Json(SuccessResponse { success: true }).into_response()
}

/// POST /api/upload - multipart image upload. Accepts the common raster
/// formats plus SVG, caps size at 10 MiB, verifies content against the
/// declared extension, and stores under a generated name.
pub async fn upload_file(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    mut multipart: Multipart,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    let upload_path = PathBuf::from(UPLOAD_DIR);
    if let Err(e) = tokio::fs::create_dir_all(&upload_path).await {
        tracing::error!("Failed to create upload directory: {}", e);
        return internal_error();
    }

    let field = match multipart.next_field().await {
        Ok(Some(field)) => field,
        Ok(None) => return bad_request("No file provided"),
        Err(e) => {
            tracing::error!("Multipart error: {}", e);
            return bad_request("Invalid multipart data");
        }
    };

    let original_name = field.file_name().unwrap_or("unknown").to_string();
    let original_ext = original_name
        .rsplit('.')
        .next()
        .unwrap_or("")
        .to_lowercase();

    if !ALLOWED_EXTENSIONS.contains(&original_ext.as_str()) {
        return bad_request("Unsupported file type. Allowed: JPEG, PNG, WebP, GIF, SVG.");
    }

    let bytes = match field.bytes().await {
        Ok(b) => b,
        Err(e) => {
            tracing::error!("Failed to read upload bytes: {}", e);
            return bad_request("Failed to read file data");
        }
    };

    if bytes.is_empty() {
        return bad_request("Empty file");
    }
    if bytes.len() > MAX_FILE_SIZE {
        return bad_request("File too large. Maximum size is 10 MiB.");
    }

    let mime_type = match sniff_image_mime(&bytes) {
        Some(mime) => mime,
        None => return bad_request("File content does not match an allowed image type."),
    };

    let filename = format!("{}.{}", Uuid::new_v4(), extension_for_mime(mime_type));
    let file_path = upload_path.join(&filename);

    if let Err(e) = tokio::fs::write(&file_path, &bytes).await {
        tracing::error!("Failed to write upload file: {}", e);
        return internal_error();
    }

    tracing::info!("Image uploaded: {} ({} bytes)", filename, bytes.len());

    (
        StatusCode::CREATED,
        Json(UploadResponse {
            url: format!("/uploads/{}", filename),
            file_key: filename.clone(),
            filename,
            original_name,
            mime_type: mime_type.to_string(),
            size: bytes.len(),
        }),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    #[test]
    fn sniffs_raster_formats() {
        assert_eq!(sniff_image_mime(&[0xFF, 0xD8, 0xFF, 0xE0]), Some("image/jpeg"));
        assert_eq!(
            sniff_image_mime(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A]),
            Some("image/png")
        );
        assert_eq!(sniff_image_mime(&[0x47, 0x49, 0x46, 0x38, 0x39]), Some("image/gif"));
        assert_eq!(
            sniff_image_mime(b"RIFF\x00\x00\x00\x00WEBPVP8 "),
            Some("image/webp")
        );
    }

    #[test]
    fn sniffs_svg_by_prefix() {
        assert_eq!(
            sniff_image_mime(b"<?xml version=\"1.0\"?><svg/>"),
            Some("image/svg+xml")
        );
        assert_eq!(sniff_image_mime(b"  <svg xmlns=\"x\"/>"), Some("image/svg+xml"));
        assert_eq!(sniff_image_mime(b"#!/bin/sh\nrm -rf /"), None);
    }

    #[test]
    fn file_key_traversal_is_rejected() {
        assert!(is_safe_file_key("abc123.png"));
        assert!(!is_safe_file_key("../etc/passwd"));
        assert!(!is_safe_file_key("a/b.png"));
        assert!(!is_safe_file_key(""));
    }

    #[tokio::test]
    async fn upload_without_session_is_unauthorized() {
        let req = Request::post("/api/upload")
            .header("content-type", "multipart/form-data; boundary=x")
            .body(Body::empty())
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn metadata_insert_requires_filename() {
        let body = r#"{"filename":"","originalName":"a.png","mimeType":"image/png","size":10,"url":"/uploads/a.png","fileKey":"a.png"}"#;
        let req = Request::post("/api/media")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
