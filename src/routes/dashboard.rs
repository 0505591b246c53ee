//! Dashboard aggregator: a read-side rollup over the data access layer.
//! Every call re-reads the store; nothing is cached.

use axum::{
    extract::State,
    http::HeaderMap,
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::CookieJar;
use serde::Serialize;
use sqlx::PgPool;

use crate::db::models::{LeadStatus, PostStatus};
use crate::db::queries;
use crate::routes::auth::require_admin;
use crate::routes::internal_error;
use crate::AppState;

/// Number of entries returned by the recent-posts/recent-leads procedures
const RECENT_LIMIT: usize = 5;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardStats {
    pub total_posts: i64,
    pub published: i64,
    pub drafts: i64,
    pub scheduled: i64,
    pub archived: i64,
    pub total_categories: i64,
    pub total_media: i64,
    pub total_leads: i64,
    pub new_leads: i64,
    pub total_faq: i64,
}

async fn collect_stats(pool: &PgPool) -> Result<DashboardStats, sqlx::Error> {
    Ok(DashboardStats {
        total_posts: queries::count_posts(pool).await?,
        published: queries::count_posts_by_status(pool, PostStatus::Published).await?,
        drafts: queries::count_posts_by_status(pool, PostStatus::Draft).await?,
        scheduled: queries::count_posts_by_status(pool, PostStatus::Scheduled).await?,
        archived: queries::count_posts_by_status(pool, PostStatus::Archived).await?,
        total_categories: queries::count_categories(pool).await?,
        total_media: queries::count_media(pool).await?,
        total_leads: queries::count_leads(pool).await?,
        new_leads: queries::count_leads_by_status(pool, LeadStatus::New).await?,
        total_faq: queries::count_faq(pool).await?,
    })
}

/// GET /api/dashboard/stats
pub async fn stats(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match collect_stats(&state.pool).await {
        Ok(stats) => Json(stats).into_response(),
        Err(e) => {
            tracing::error!("Database error collecting dashboard stats: {}", e);
            internal_error()
        }
    }
}

/// GET /api/dashboard/recent-leads - prefix of the already-sorted listing
pub async fn recent_leads(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::list_leads(&state.pool).await {
        Ok(mut leads) => {
            leads.truncate(RECENT_LIMIT);
            Json(leads).into_response()
        }
        Err(e) => {
            tracing::error!("Database error listing recent leads: {}", e);
            internal_error()
        }
    }
}

/// GET /api/dashboard/recent-posts - prefix of the already-sorted listing
pub async fn recent_posts(
    State(state): State<AppState>,
    jar: CookieJar,
    headers: HeaderMap,
) -> Response {
    if let Err(rejection) = require_admin(&jar, &headers, &state.pool).await {
        return rejection;
    }

    match queries::list_blog_posts(&state.pool).await {
        Ok(mut posts) => {
            posts.truncate(RECENT_LIMIT);
            Json(posts).into_response()
        }
        Err(e) => {
            tracing::error!("Database error listing recent posts: {}", e);
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
    async fn stats_without_session_is_unauthorized() {
        let req = Request::get("/api/dashboard/stats")
            .body(Body::empty())
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn recent_posts_without_session_is_unauthorized() {
        let req = Request::get("/api/dashboard/recent-posts")
            .body(Body::empty())
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }
}
