// Authentication middleware for protected routes
// Validates session tokens and injects AuthenticatedUser into request extensions

use axum::{
    body::Body,
    extract::{FromRequestParts, State},
    http::{header, request::Parts, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Json, Response},
};
use axum_extra::extract::cookie::CookieJar;
use serde_json::json;

use crate::{app::AppState, middleware::auth::AuthenticatedUser};

pub const SESSION_COOKIE: &str = "encore_session";

/// Pull the session token from the Authorization header (API clients) or the
/// session cookie (browser clients)
fn extract_token(request: &Request<Body>) -> Option<String> {
    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    if let Some(header) = auth_header {
        if let Some(token) = header.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let jar = CookieJar::from_headers(request.headers());
    jar.get(SESSION_COOKIE).map(|c| c.value().to_string())
}

/// Middleware that validates session tokens and adds AuthenticatedUser to extensions
pub async fn auth_middleware(
    State(app_state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let token = match extract_token(&request) {
        Some(token) => token,
        None => {
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Please log in.",
                    "code": "UNAUTHORIZED",
                    "status": 401
                })),
            )
                .into_response();
        },
    };

    match app_state.jwt_service.validate_token(&token) {
        Ok(auth_user) => {
            request.extensions_mut().insert(auth_user);
            next.run(request).await
        },
        Err(e) => {
            tracing::warn!("Session token validation failed: {}", e);
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "Invalid or expired session",
                    "code": "UNAUTHORIZED",
                    "status": 401
                })),
            )
                .into_response()
        },
    }
}

/// Extractor for AuthenticatedUser from request extensions
/// Allows handlers to take Extension<AuthenticatedUser> in their parameters
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({
                        "error": "Authentication required",
                        "code": "UNAUTHORIZED",
                        "status": 401
                    })),
                )
            })
    }
}
