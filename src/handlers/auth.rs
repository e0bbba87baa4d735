// Authentication handlers: register, login, logout, current user

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Json},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    middleware::auth_middleware::SESSION_COOKIE,
    models::user::{NewUser, User, UserError},
    utils::{hash_password, verify_password, ServiceError},
};

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 1, max = 100, message = "Username must be 1-100 characters"))]
    pub username: String,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct SessionResponse {
    pub token: String,
    pub expires_in: u64,
    pub user: UserInfo,
}

#[derive(Debug, Serialize)]
pub struct UserInfo {
    pub id: String,
    pub username: String,
    pub email: String,
    pub role: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        UserInfo {
            id: user.id.to_string(),
            username: user.username.clone(),
            email: user.email.clone(),
            role: user.role.clone(),
        }
    }
}

fn session_cookie(token: String, expiry_secs: u64) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .secure(crate::app_config::config().is_production())
        .same_site(SameSite::Lax)
        .max_age(time::Duration::seconds(expiry_secs as i64))
        .build()
}

fn delete_session_cookie() -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(time::Duration::seconds(-1))
        .build()
}

/// POST /auth/register
///
/// Self-registration always produces the regular user role; admin accounts
/// are provisioned out of band.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<RegisterRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let email = req.email.trim().to_lowercase();
    let username = req.username.trim().to_string();
    let password_hash = hash_password(&req.password)?;

    let mut conn = state.diesel_pool.get().await?;
    let user = User::create(
        &mut conn,
        NewUser {
            username,
            email,
            password_hash,
            role: "user".to_string(),
        },
    )
    .await
    .map_err(|e| match e {
        UserError::DuplicateEmail => {
            ServiceError::ValidationError("Email already registered".to_string())
        },
        e => ServiceError::DatabaseError(e.to_string()),
    })?;

    tracing::info!(user_id = %user.id, "Registered new user");

    let token = state
        .jwt_service
        .issue_token(&user)
        .map_err(|e| ServiceError::UpstreamFailure(e.to_string()))?;
    let expires_in = state.jwt_service.expiry_secs();

    let jar = jar.add(session_cookie(token.clone(), expires_in));
    let body = Json(SessionResponse {
        token,
        expires_in,
        user: UserInfo::from(&user),
    });

    Ok((StatusCode::CREATED, jar, body))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return Err(ServiceError::Unauthorized);
    }

    let mut conn = state.diesel_pool.get().await?;
    let user = match User::find_by_email(&mut conn, &email).await {
        Ok(user) => user,
        // Same refusal for unknown email and bad password
        Err(UserError::NotFound) => return Err(ServiceError::Unauthorized),
        Err(e) => return Err(ServiceError::DatabaseError(e.to_string())),
    };

    let valid = verify_password(&req.password, &user.password_hash)?;
    if !valid {
        tracing::warn!(user_id = %user.id, "Failed login attempt");
        return Err(ServiceError::Unauthorized);
    }

    let token = state
        .jwt_service
        .issue_token(&user)
        .map_err(|e| ServiceError::UpstreamFailure(e.to_string()))?;
    let expires_in = state.jwt_service.expiry_secs();

    tracing::info!(user_id = %user.id, "User logged in");

    let jar = jar.add(session_cookie(token.clone(), expires_in));
    let body = Json(SessionResponse {
        token,
        expires_in,
        user: UserInfo::from(&user),
    });

    Ok((StatusCode::OK, jar, body))
}

/// POST /auth/logout
pub async fn logout(jar: CookieJar) -> impl IntoResponse {
    let jar = jar.add(delete_session_cookie());
    (
        StatusCode::OK,
        jar,
        Json(serde_json::json!({"message": "Logged out"})),
    )
}

/// GET /auth/me
pub async fn current_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let user = User::find_by_id(&mut conn, auth_user.user_id)
        .await
        .map_err(|e| match e {
            UserError::NotFound => ServiceError::NotFound,
            e => ServiceError::DatabaseError(e.to_string()),
        })?;

    Ok(Json(UserInfo::from(&user)))
}
