//! Blog post procedures: list, getById, upsert, delete for the admin panel,
//! plus the public by-slug read used by the marketing site.

use axum::{
    extract::{Path, State},
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use regex::Regex;

use crate::db::models::{BlogPost, BlogPostUpsert};
use crate::db::queries;
use crate::routes::auth::require_admin;
use crate::routes::{
    bad_request, bad_request_detail, conflict, internal_error, is_unique_violation, SuccessResponse,
};
use crate::AppState;

lazy_static::lazy_static! {
    /// Valid slug: lowercase letters, numbers, and hyphens
    static ref SLUG_REGEX: Regex = Regex::new(r"^[a-z0-9]+(?:-[a-z0-9]+)*$").unwrap();
}

pub(crate) fn is_valid_slug(slug: &str) -> bool {
    SLUG_REGEX.is_match(slug)
}

/// GET /api/blog - all posts, newest created first
pub async fn list_posts(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::list_blog_posts(&state.pool).await {
        Ok(posts) => Json(posts).into_response(),
        Err(e) => {
            tracing::error!("Database error listing blog posts: {}", e);
            internal_error()
        }
    }
}

/// GET /api/blog/{id} - single post or JSON `null`
pub async fn get_post_by_id(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::get_blog_post_by_id(&state.pool, id).await {
        Ok(post) => Json(post).into_response(),
        Err(e) => {
            tracing::error!("Database error fetching blog post {}: {}", id, e);
            internal_error()
        }
    }
}

/// GET /api/posts/{slug} - public read; drafts and archived posts read as
/// absent.
pub async fn get_published_post(State(state): State<AppState>, Path(slug): Path<String>) -> Response {
    if !is_valid_slug(&slug) {
        return bad_request("Invalid slug");
    }

    match queries::get_blog_post_by_slug(&state.pool, &slug).await {
        Ok(post) => Json(post.filter(|p| p.is_published)).into_response(),
        Err(e) => {
            tracing::error!("Database error fetching post by slug: {}", e);
            internal_error()
        }
    }
}

/// POST /api/blog - insert when the payload has no id, update otherwise.
/// Publish-state consistency is handled by the data access layer.
pub async fn upsert_post(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Json(payload): Json<BlogPostUpsert>,
) -> Response {
    if payload.title.trim().is_empty() {
        return bad_request("Title is required");
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

    match queries::upsert_blog_post(&state.pool, &payload).await {
        Ok(post) => Json(post).into_response(),
        Err(e) if is_unique_violation(&e) => conflict("Slug already in use"),
        Err(e) => {
            tracing::error!("Database error upserting blog post: {}", e);
            internal_error()
        }
    }
}

/// DELETE /api/blog/{id} - hard delete; deleting an absent id is a no-op.
pub async fn delete_post(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
    Path(id): Path<i32>,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::delete_blog_post(&state.pool, id).await {
        Ok(_) => Json(SuccessResponse { success: true }).into_response(),
        Err(e) => {
            tracing::error!("Database error deleting blog post {}: {}", id, e);
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    #[test]
    fn slug_validation() {
        assert!(is_valid_slug("direito-tributario"));
        assert!(is_valid_slug("a1-b2-c3"));
        assert!(!is_valid_slug(""));
        assert!(!is_valid_slug("Uppercase"));
        assert!(!is_valid_slug("trailing-"));
        assert!(!is_valid_slug("espaço aqui"));
    }

    #[tokio::test]
    async fn list_without_session_is_unauthorized() {
        let req = Request::get("/api/blog").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn upsert_empty_title_is_bad_request() {
        let body = r#"{"slug":"valid-slug","title":"  "}"#;
        let req = Request::post("/api/blog")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upsert_invalid_slug_is_bad_request() {
        let body = r#"{"slug":"Not A Slug","title":"Tax Law"}"#;
        let req = Request::post("/api/blog")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn upsert_unknown_status_is_rejected_before_auth() {
        let body = r#"{"slug":"ok-slug","title":"Tax Law","status":"live"}"#;
        let req = Request::post("/api/blog")
            .header("content-type", "application/json")
            .body(Body::from(body))
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn public_post_route_rejects_invalid_slug() {
        let req = Request::get("/api/posts/Not%20A%20Slug")
            .body(Body::empty())
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::BAD_REQUEST);
    }
}
