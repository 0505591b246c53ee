//! Site settings procedures: list, upsert, batch upsert.
//!
//! The upsert is an atomic insert-or-update on `setting_key`. The batch
//! variant applies entries one at a time with no surrounding transaction: a
//! failure at entry k leaves entries 1..k-1 committed and the rest untouched.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::db::queries;
use crate::routes::auth::require_admin;
use crate::routes::{bad_request, internal_error, SuccessResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct SettingUpsert {
    pub key: String,
    pub value: String,
}

/// GET /api/settings - unordered key/value listing
pub async fn list_settings(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::list_settings(&state.pool).await {
        Ok(settings) => Json(settings).into_response(),
        Err(e) => {
            tracing::error!("Database error listing settings: {}", e);
            internal_error()
        }
    }
}

/// PUT /api/settings - single key upsert
pub async fn upsert_setting(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<SettingUpsert>,
) -> Response {
    if payload.key.trim().is_empty() {
        return bad_request("Key is required");
    }

    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::upsert_setting(&state.pool, &payload.key, &payload.value).await {
        Ok(setting) => Json(setting).into_response(),
        Err(e) => {
            tracing::error!("Database error upserting setting: {}", e);
            internal_error()
        }
    }
}

/// PUT /api/settings/batch - sequential, non-transactional batch upsert
pub async fn upsert_settings_batch(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<Vec<SettingUpsert>>,
) -> Response {
    if payload.iter().any(|entry| entry.key.trim().is_empty()) {
        return bad_request("Key is required");
    }

    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    for entry in &payload {
        if let Err(e) = queries::upsert_setting(&state.pool, &entry.key, &entry.value).await {
            tracing::error!("Database error in settings batch at '{}': {}", entry.key, e);
            return internal_error();
        }
    }

    Json(SuccessResponse { success: true }).into_response()
}

#[cfg(test)]
mod tests {
    use crate::test_app;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn list_without_session_is_unauthorized() {
        let req = Request::get("/api/settings").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upsert_empty_key_is_bad_request() {
        let body = r#"{"key":"  ","value":"anything"}"#;
        let req = Request::put("/api/settings")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn batch_with_empty_key_is_bad_request() {
        let body = r#"[{"key":"site_title","value":"Firm"},{"key":"","value":"x"}]"#;
        let req = Request::put("/api/settings/batch")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
