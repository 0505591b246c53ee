//! Session and authorization gate.
//!
//! The session is a signed, 7-day JWT carrying the admin's id, stored in an
//! HTTP-only `admin_token` cookie (bearer header accepted as a fallback).
//! Every protected handler calls [`require_admin`] before doing anything
//! else; login failures never reveal whether the email or the password was
//! wrong.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::db::models::{AdminProfile, AdminUser};
use crate::db::queries;
use crate::routes::{bad_request, forbidden, internal_error, unauthorized, SuccessResponse};
use crate::AppState;

// ============================================================================
// Configuration
// ============================================================================

lazy_static::lazy_static! {
    /// JWT signing secret from environment
    pub static ref JWT_SECRET: String = std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "default-jwt-secret-change-in-production".to_string());
}

/// Session cookie name
pub const SESSION_COOKIE: &str = "admin_token";

/// Session lifetime in days (token expiry and cookie max-age)
const SESSION_TTL_DAYS: i64 = 7;

/// Minimum password length accepted by setup
const MIN_PASSWORD_LEN: usize = 8;

fn is_production() -> bool {
    std::env::var("ENVIRONMENT").unwrap_or_default() == "production"
}

// ============================================================================
// Types
// ============================================================================

/// JWT claims: the admin's id plus standard expiry bookkeeping
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i32,
    pub exp: i64,
    pub iat: i64,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct SetupRequest {
    pub email: String,
    pub password: String,
    pub name: String,
}

// ============================================================================
// Tokens and cookies
// ============================================================================

fn create_session_token(admin_id: i32) -> Result<String, jsonwebtoken::errors::Error> {
    let now = Utc::now();
    let claims = Claims {
        sub: admin_id,
        exp: (now + Duration::days(SESSION_TTL_DAYS)).timestamp(),
        iat: now.timestamp(),
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(JWT_SECRET.as_bytes()),
    )
}

pub fn verify_session_token(token: &str) -> Result<Claims, jsonwebtoken::errors::Error> {
    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(JWT_SECRET.as_bytes()),
        &Validation::default(),
    )?;
    Ok(token_data.claims)
}

fn session_cookie(token: String) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(is_production())
        .max_age(time::Duration::days(SESSION_TTL_DAYS))
        .build()
}

/// Session token from the cookie, falling back to an Authorization bearer
/// header.
fn extract_session_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|s| s.to_string())
}

/// Gate applied by every protected handler: verifies the token, loads the
/// admin it names, and rejects when the token is missing/invalid/expired or
/// the account no longer exists or is inactive.
pub async fn require_admin(
    jar: &CookieJar,
    headers: &HeaderMap,
    pool: &PgPool,
) -> Result<AdminUser, Response> {
    let token = match extract_session_token(jar, headers) {
        Some(t) => t,
        None => return Err(unauthorized("Authentication required")),
    };

    let claims = match verify_session_token(&token) {
        Ok(c) => c,
        Err(_) => return Err(unauthorized("Invalid or expired session")),
    };

    match queries::get_admin_by_id(pool, claims.sub).await {
        Ok(Some(user)) if user.is_active => Ok(user),
        Ok(_) => Err(unauthorized("Invalid or expired session")),
        Err(e) => {
            tracing::error!("Database error loading session admin: {}", e);
            Err(internal_error())
        }
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Response {
    if payload.email.is_empty() || payload.password.is_empty() {
        return bad_request("Email and password are required");
    }
    if !payload.email.contains('@') {
        return bad_request("Invalid email format");
    }

    let user = match queries::get_admin_by_email(&state.pool, &payload.email).await {
        Ok(Some(user)) => user,
        Ok(None) => {
            tracing::warn!("Login attempt for unknown email");
            return unauthorized("Invalid credentials");
        }
        Err(e) => {
            tracing::error!("Database error during login: {}", e);
            return internal_error();
        }
    };

    // An admin created before setup finished has no hash and cannot log in.
    let password_hash = match user.password_hash.clone() {
        Some(h) => h,
        None => return unauthorized("Invalid credentials"),
    };

    // bcrypt is CPU-bound; keep the async executor free.
    let password = payload.password.clone();
    let password_ok =
        tokio::task::spawn_blocking(move || verify(&password, &password_hash).unwrap_or(false))
            .await
            .unwrap_or(false);
    if !password_ok {
        tracing::warn!("Failed login attempt for admin {}", user.id);
        return unauthorized("Invalid credentials");
    }

    if !user.is_active {
        return forbidden("Account is inactive");
    }

    if let Err(e) = queries::update_last_signed_in(&state.pool, user.id).await {
        tracing::warn!("Failed to stamp last_signed_in for admin {}: {}", user.id, e);
    }

    let token = match create_session_token(user.id) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Failed to create session token: {}", e);
            return internal_error();
        }
    };

    tracing::info!("Successful login for admin {}", user.id);

    let jar = jar.add(session_cookie(token));
    (jar, Json(AdminProfile::from(user))).into_response()
}

/// POST /api/auth/logout - clears the session cookie; always succeeds.
pub async fn logout(jar: CookieJar) -> Response {
    let jar = jar.remove(Cookie::build(SESSION_COOKIE).path("/"));
    (jar, Json(SuccessResponse { success: true })).into_response()
}

/// GET /api/auth/me - profile of the authenticated admin, or JSON `null`.
/// Never an error status: an absent, invalid or expired session and a
/// deactivated account all read as "not signed in".
pub async fn me(State(state): State<AppState>, jar: CookieJar, headers: HeaderMap) -> Response {
    let token = match extract_session_token(&jar, &headers) {
        Some(t) => t,
        None => return Json(None::<AdminProfile>).into_response(),
    };
    let claims = match verify_session_token(&token) {
        Ok(c) => c,
        Err(_) => return Json(None::<AdminProfile>).into_response(),
    };
    match queries::get_admin_by_id(&state.pool, claims.sub).await {
        Ok(Some(user)) if user.is_active => Json(Some(AdminProfile::from(user))).into_response(),
        Ok(_) => Json(None::<AdminProfile>).into_response(),
        Err(e) => {
            tracing::error!("Database error resolving session: {}", e);
            Json(None::<AdminProfile>).into_response()
        }
    }
}

/// POST /api/auth/setup - one-time bootstrap of the first admin account.
/// Refused the moment any admin row exists; this is the only unauthenticated
/// account-creation path and must never be reachable twice.
pub async fn setup(State(state): State<AppState>, Json(payload): Json<SetupRequest>) -> Response {
    if payload.email.is_empty() || !payload.email.contains('@') {
        return bad_request("Invalid email format");
    }
    if payload.name.trim().is_empty() {
        return bad_request("Name is required");
    }
    if payload.password.len() < MIN_PASSWORD_LEN {
        return bad_request("Password must be at least 8 characters long");
    }

    match queries::count_admins(&state.pool).await {
        Ok(0) => {}
        Ok(_) => return forbidden("Setup already completed. An admin account exists."),
        Err(e) => {
            tracing::error!("Database error during setup: {}", e);
            return internal_error();
        }
    }

    let password = payload.password.clone();
    let password_hash = match tokio::task::spawn_blocking(move || hash(&password, DEFAULT_COST))
        .await
    {
        Ok(Ok(h)) => h,
        Ok(Err(e)) => {
            tracing::error!("Failed to hash password: {}", e);
            return internal_error();
        }
        Err(e) => {
            tracing::error!("spawn_blocking panic during hash: {}", e);
            return internal_error();
        }
    };

    match queries::create_admin(&state.pool, &payload.email, &password_hash, &payload.name).await {
        Ok(user) => {
            tracing::info!("Bootstrap admin created: {}", user.id);
            (StatusCode::CREATED, Json(AdminProfile::from(user))).into_response()
        }
        Err(e) => {
            // Two concurrent setups: the loser hits the unique email index.
            if crate::routes::is_unique_violation(&e) {
                return forbidden("Setup already completed. An admin account exists.");
            }
            tracing::error!("Failed to create bootstrap admin: {}", e);
            internal_error()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_app;
    use axum::body::Body;
    use axum::http::Request;
    use tower::ServiceExt;

    async fn post_json(
        uri: &str,
        json: &impl serde::Serialize,
    ) -> (StatusCode, axum::body::Bytes) {
        let body = Body::from(serde_json::to_vec(json).unwrap());
        let req = Request::post(uri)
            .header("content-type", "application/json")
            .body(body)
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        let status = res.status();
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, bytes)
    }

    #[test]
    fn session_token_round_trip() {
        let token = create_session_token(7).unwrap();
        let claims = verify_session_token(&token).unwrap();
        assert_eq!(claims.sub, 7);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn verify_session_token_rejects_garbage() {
        assert!(verify_session_token("invalid.jwt.token").is_err());
    }

    #[test]
    fn session_cookie_is_http_only_and_lax() {
        let cookie = session_cookie("tok".to_string());
        assert_eq!(cookie.name(), SESSION_COOKIE);
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.path(), Some("/"));
    }

    #[tokio::test]
    async fn login_empty_email_is_bad_request() {
        let (status, _) = post_json(
            "/api/auth/login",
            &LoginRequest {
                email: "".to_string(),
                password: "pw123456".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn login_malformed_email_is_bad_request() {
        let (status, _) = post_json(
            "/api/auth/login",
            &LoginRequest {
                email: "no-at-sign".to_string(),
                password: "pw123456".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn setup_short_password_is_bad_request() {
        let (status, bytes) = post_json(
            "/api/auth/setup",
            &SetupRequest {
                email: "a@x.com".to_string(),
                password: "short".to_string(),
                name: "Ana".to_string(),
            },
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("Password"));
    }

    #[tokio::test]
    async fn me_without_session_returns_null() {
        let req = Request::get("/api/auth/me").body(Body::empty()).unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"null");
    }

    #[tokio::test]
    async fn me_with_garbage_token_returns_null() {
        let req = Request::get("/api/auth/me")
            .header("authorization", "Bearer not.a.token")
            .body(Body::empty())
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let bytes = axum::body::to_bytes(res.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(&bytes[..], b"null");
    }

    #[tokio::test]
    async fn logout_always_succeeds_and_clears_cookie() {
        let req = Request::post("/api/auth/logout")
            .body(Body::empty())
            .unwrap();
        let res = test_app().oneshot(req).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let set_cookie = res
            .headers()
            .get("set-cookie")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(set_cookie.starts_with("admin_token="));
    }
}
