//! FAQ procedures: list, upsert, delete. Items order by `sort_order` with id
//! as the tiebreaker.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;

use crate::db::models::FaqUpsert;
use crate::db::queries;
use crate::routes::auth::require_admin;
use crate::routes::{bad_request, internal_error, SuccessResponse};
use crate::AppState;

/// GET /api/faq
pub async fn list_faq(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::list_faq(&state.pool).await {
        Ok(items) => Json(items).into_response(),
        Err(e) => {
            tracing::error!("Database error listing FAQ items: {}", e);
            internal_error()
        }
    }
}

/// POST /api/faq - insert without id, update with id
pub async fn upsert_faq(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<FaqUpsert>,
) -> Response {
    if payload.question.trim().is_empty() {
        return bad_request("Question is required");
    }
    if payload.answer.trim().is_empty() {
        return bad_request("Answer is required");
    }

    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::upsert_faq(&state.pool, &payload).await {
        Ok(item) => Json(item).into_response(),
        Err(e) => {
            tracing::error!("Database error upserting FAQ item: {}", e);
            internal_error()
        }
    }
}

/// DELETE /api/faq/{id}
pub async fn delete_faq(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::delete_faq(&state.pool, id).await {
        Ok(_) => Json(SuccessResponse { success: true }).into_response(),
        Err(e) => {
            tracing::error!("Database error deleting FAQ item {}: {}", id, e);
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
        let req = Request::get("/api/faq").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upsert_empty_answer_is_bad_request() {
        let body = r#"{"question":"Quanto custa uma consulta?","answer":"  "}"#;
        let req = Request::post("/api/faq")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
