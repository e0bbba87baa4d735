// User management: self-service profile edits and admin user administration

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::user::{User, UserError, UserUpdate},
    utils::{hash_password, verify_password, ServiceError},
};

use super::auth::UserInfo;

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(min = 1, max = 100, message = "Username must be 1-100 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: Option<String>,

    pub avatar: Option<String>,

    /// Changing the password requires proving the current one
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: Option<String>,
    pub current_password: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct AdminUpdateUserRequest {
    #[validate(length(min = 1, max = 100, message = "Username must be 1-100 characters"))]
    pub username: Option<String>,

    #[validate(email(message = "Invalid email format"))]
    #[validate(length(max = 320, message = "Email must be less than 320 characters"))]
    pub email: Option<String>,

    pub role: Option<String>,
    pub avatar: Option<String>,

    /// Admin password reset, no current-password proof needed
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: Option<String>,
}

fn valid_role(role: &str) -> bool {
    matches!(role, "user" | "admin")
}

fn require_admin(auth_user: &AuthenticatedUser) -> Result<(), ServiceError> {
    if auth_user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

fn map_user_err(e: UserError) -> ServiceError {
    match e {
        UserError::NotFound => ServiceError::NotFound,
        UserError::DuplicateEmail => {
            ServiceError::ValidationError("email already registered".to_string())
        },
        UserError::Database(e) => e.into(),
    }
}

/// PUT /me
///
/// Edits the caller's own profile. A password change must carry the
/// current password; the stored hash gates it, not the session token.
pub async fn update_profile(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    if req.username.is_none()
        && req.email.is_none()
        && req.avatar.is_none()
        && req.new_password.is_none()
    {
        return Err(ServiceError::ValidationError(
            "no fields to update".to_string(),
        ));
    }

    let mut conn = state.diesel_pool.get().await?;

    let password_hash = match &req.new_password {
        Some(new_password) => {
            let current = req.current_password.as_deref().ok_or_else(|| {
                ServiceError::ValidationError("current_password is required".to_string())
            })?;
            let user = User::find_by_id(&mut conn, auth_user.user_id)
                .await
                .map_err(map_user_err)?;
            if !verify_password(current, &user.password_hash)? {
                return Err(ServiceError::Unauthorized);
            }
            Some(hash_password(new_password)?)
        },
        None => None,
    };

    let updated = User::update(
        &mut conn,
        auth_user.user_id,
        UserUpdate {
            username: req.username.map(|u| u.trim().to_string()),
            email: req.email.map(|e| e.trim().to_lowercase()),
            password_hash,
            role: None,
            avatar: req.avatar.map(Some),
        },
    )
    .await
    .map_err(map_user_err)?;

    Ok(Json(UserInfo::from(&updated)))
}

/// DELETE /me
///
/// Removes the account and everything hanging off it (cascading FKs).
pub async fn delete_account(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let deleted = User::delete(&mut conn, auth_user.user_id)
        .await
        .map_err(map_user_err)?;
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }

    tracing::info!(user_id = %auth_user.user_id, "Account deleted by owner");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /admin/users
pub async fn list_users(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let mut conn = state.diesel_pool.get().await?;
    let users = User::list_all(&mut conn, 200).await.map_err(map_user_err)?;
    Ok(Json(users))
}

/// GET /admin/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let mut conn = state.diesel_pool.get().await?;
    let user = User::find_by_id(&mut conn, user_id)
        .await
        .map_err(map_user_err)?;
    Ok(Json(user))
}

/// PUT /admin/users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
    Json(req): Json<AdminUpdateUserRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;
    req.validate()?;

    if let Some(role) = &req.role {
        if !valid_role(role) {
            return Err(ServiceError::ValidationError(
                "role must be user or admin".to_string(),
            ));
        }
    }
    if req.username.is_none()
        && req.email.is_none()
        && req.role.is_none()
        && req.avatar.is_none()
        && req.password.is_none()
    {
        return Err(ServiceError::ValidationError(
            "no fields to update".to_string(),
        ));
    }

    let password_hash = match &req.password {
        Some(password) => Some(hash_password(password)?),
        None => None,
    };

    let mut conn = state.diesel_pool.get().await?;
    let updated = User::update(
        &mut conn,
        user_id,
        UserUpdate {
            username: req.username.map(|u| u.trim().to_string()),
            email: req.email.map(|e| e.trim().to_lowercase()),
            password_hash,
            role: req.role,
            avatar: req.avatar.map(Some),
        },
    )
    .await
    .map_err(map_user_err)?;

    tracing::info!(user_id = %updated.id, admin = %auth_user.user_id, "Admin updated user");
    Ok(Json(updated))
}

/// DELETE /admin/users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(user_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    // Admins remove their own account through /me like everyone else
    if user_id == auth_user.user_id {
        return Err(ServiceError::ValidationError(
            "cannot delete your own account here".to_string(),
        ));
    }

    let mut conn = state.diesel_pool.get().await?;
    let deleted = User::delete(&mut conn, user_id).await.map_err(map_user_err)?;
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }

    tracing::info!(user_id = %user_id, admin = %auth_user.user_id, "Admin deleted user");
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::Role;

    fn profile_req() -> UpdateProfileRequest {
        UpdateProfileRequest {
            username: None,
            email: None,
            avatar: None,
            new_password: None,
            current_password: None,
        }
    }

    #[test]
    fn test_profile_password_length_enforced() {
        let mut req = profile_req();
        req.new_password = Some("short".to_string());
        assert!(req.validate().is_err());

        req.new_password = Some("long enough".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_profile_email_format_enforced() {
        let mut req = profile_req();
        req.email = Some("not-an-email".to_string());
        assert!(req.validate().is_err());

        req.email = Some("user@example.com".to_string());
        assert!(req.validate().is_ok());
    }

    #[test]
    fn test_role_names() {
        assert!(valid_role("user"));
        assert!(valid_role("admin"));
        assert!(!valid_role("root"));
        assert!(!valid_role("Admin"));
    }

    #[test]
    fn test_admin_routes_reject_plain_users() {
        let user = AuthenticatedUser {
            user_id: Uuid::new_v4(),
            email: "u@example.com".into(),
            role: Role::User,
            exp: 0,
        };
        assert!(matches!(
            require_admin(&user),
            Err(ServiceError::Forbidden)
        ));
    }
}
