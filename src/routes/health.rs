//! Health endpoints: a liveness ping and a database round-trip check.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::AppState;

#[derive(Debug, Serialize)]
pub struct SimpleHealthResponse {
    pub status: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseHealthResponse {
    pub status: String,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response_time_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// GET /health
pub async fn health_ping() -> Response {
    Json(SimpleHealthResponse {
        status: "ok".to_string(),
    })
    .into_response()
}

/// GET /health/database
pub async fn health_database(State(state): State<AppState>) -> Response {
    match crate::db::health_check(&state.pool).await {
        Ok(duration) => Json(DatabaseHealthResponse {
            status: "healthy".to_string(),
            timestamp: Utc::now(),
            response_time_ms: Some(duration.as_millis() as u64),
            error: None,
        })
        .into_response(),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(DatabaseHealthResponse {
                status: "unhealthy".to_string(),
                timestamp: Utc::now(),
                response_time_ms: None,
                error: Some(e.to_string()),
            }),
        )
            .into_response(),
    }
}

#[cfg(test)]
mod tests {
    use crate::test_app;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[tokio::test]
    async fn ping_returns_ok() {
        let req = Request::get("/health").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], br#"{"status":"ok"}"#);
    }
}
