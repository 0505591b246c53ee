//! Lead procedures. The admin panel lists, transitions, and deletes leads;
//! the one write that does not come from the panel is the public contact
//! form intake, which always starts a lead at status `new`.

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;

use crate::db::models::{LeadStatus, NewLead};
use crate::db::queries;
use crate::routes::auth::require_admin;
use crate::routes::{bad_request, error_response, internal_error, SuccessResponse};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct UpdateLeadStatusRequest {
    pub status: LeadStatus,
}

/// GET /api/leads - newest first
pub async fn list_leads(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::list_leads(&state.pool).await {
        Ok(leads) => Json(leads).into_response(),
        Err(e) => {
            tracing::error!("Database error listing leads: {}", e);
            internal_error()
        }
    }
}

/// POST /api/leads - public contact-form intake, no session required
pub async fn create_lead(State(state): State<AppState>, Json(payload): Json<NewLead>) -> Response {
    if payload.name.trim().is_empty() {
        return bad_request("Name is required");
    }
    if let Some(email) = &payload.email {
        if !email.contains('@') {
            return bad_request("Invalid email format");
        }
    }

    match queries::insert_lead(&state.pool, &payload).await {
        Ok(lead) => {
            tracing::info!("New lead received: {}", lead.id);
            (StatusCode::CREATED, Json(lead)).into_response()
        }
        Err(e) => {
            tracing::error!("Database error creating lead: {}", e);
            internal_error()
        }
    }
}

/// PATCH /api/leads/{id}/status - 404 when the lead does not exist
pub async fn update_lead_status(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateLeadStatusRequest>,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::update_lead_status(&state.pool, id, payload.status).await {
        Ok(Some(lead)) => Json(lead).into_response(),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Lead not found"),
        Err(e) => {
            tracing::error!("Database error updating lead {} status: {}", id, e);
            internal_error()
        }
    }
}

/// DELETE /api/leads/{id}
pub async fn delete_lead(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::delete_lead(&state.pool, id).await {
        Ok(_) => Json(SuccessResponse { success: true }).into_response(),
        Err(e) => {
            tracing::error!("Database error deleting lead {}: {}", id, e);
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
        let req = Request::get("/api/leads").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn intake_requires_a_name() {
        let body = r#"{"name":"","email":"joao@example.com"}"#;
        let req = Request::post("/api/leads")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn intake_rejects_malformed_email() {
        let body = r#"{"name":"João","email":"not-an-email"}"#;
        let req = Request::post("/api/leads")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn update_status_rejects_unknown_variant() {
        let body = r#"{"status":"won"}"#;
        let req = Request::patch("/api/leads/1/status")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
