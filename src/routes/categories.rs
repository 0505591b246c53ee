//! Blog category procedures: list, upsert, delete. Categories order by
//! `sort_order` with name as the tiebreaker so admin listings are stable.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::db::models::CategoryUpsert;
use crate::db::queries;
use crate::routes::auth::require_admin;
use crate::routes::blog::is_valid_slug;
use crate::routes::{
    bad_request, bad_request_detail, conflict, internal_error, is_unique_violation, SuccessResponse,
};
use crate::AppState;

/// GET /api/categories
pub async fn list_categories(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::list_categories(&state.pool).await {
        Ok(categories) => Json(categories).into_response(),
        Err(e) => {
            tracing::error!("Database error listing categories: {}", e);
            internal_error()
        }
    }
}

/// POST /api/categories - insert without id, update with id. A duplicate
/// slug on insert surfaces the store's unique violation as a conflict.
pub async fn upsert_category(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<CategoryUpsert>,
) -> Response {
    if payload.name.trim().is_empty() {
        return bad_request("Name is required");
    }
    if payload.slug.trim().is_empty() {
        return bad_request("Slug is required");
    }
    if !is_valid_slug(&payload.slug) {
        return bad_request_detail(
            "Invalid slug",
            "Slug must contain only lowercase letters, numbers, and hyphens",
        );
    }

    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::upsert_category(&state.pool, &payload).await {
        Ok(category) => Json(category).into_response(),
        Err(e) if is_unique_violation(&e) => conflict("Slug already in use"),
        Err(e) => {
            tracing::error!("Database error upserting category: {}", e);
            internal_error()
        }
    }
}

/// DELETE /api/categories/{id} - posts keep their category slug string;
/// nothing cascades.
pub async fn delete_category(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::delete_category(&state.pool, id).await {
        Ok(_) => Json(SuccessResponse { success: true }).into_response(),
        Err(e) => {
            tracing::error!("Database error deleting category {}: {}", id, e);
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::test_app;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn list_without_session_is_unauthorized() {
        let req = Request::get("/api/categories").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upsert_empty_name_is_bad_request() {
        let body = r#"{"slug":"tributario","name":""}"#;
        let req = Request::post("/api/categories")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upsert_invalid_slug_is_bad_request() {
        let body = r#"{"slug":"Direito Tributário","name":"Direito Tributário"}"#;
        let req = Request::post("/api/categories")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
