// Review handlers: public reads, authenticated writes on own reviews

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
    models::review::{NewReview, Review},
    utils::ServiceError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreateReviewRequest {
    pub content_id: i32,
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "Comment must be less than 2000 characters"))]
    pub comment: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateReviewRequest {
    #[validate(range(min = 1, max = 5, message = "Rating must be between 1 and 5"))]
    pub rating: i32,
    #[validate(length(max = 2000, message = "Comment must be less than 2000 characters"))]
    pub comment: String,
}

/// Owner-or-admin gate for mutating an existing review
fn require_review_access(
    auth_user: &AuthenticatedUser,
    owner_id: Uuid,
) -> Result<(), ServiceError> {
    if auth_user.can_access(owner_id) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// GET /reviews/latest
///
/// Landing page feed, capped at the 20 most recent reviews.
pub async fn latest_reviews(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let reviews = Review::list_latest(&mut conn, 20).await?;
    Ok(Json(reviews))
}

/// GET /content/{content_id}/reviews
pub async fn list_reviews(
    State(state): State<AppState>,
    Path(content_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let reviews = Review::list_for_content(&mut conn, content_id).await?;
    Ok(Json(reviews))
}

/// GET /content/{content_id}/reviews/stats
pub async fn review_stats(
    State(state): State<AppState>,
    Path(content_id): Path<i32>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let stats = Review::stats_for_content(&mut conn, content_id).await?;
    Ok(Json(stats))
}

/// POST /reviews
pub async fn create_review(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CreateReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let review = Review::create(
        &mut conn,
        NewReview {
            user_id: auth_user.user_id,
            content_id: req.content_id,
            rating: req.rating,
            comment: req.comment.trim().to_string(),
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(review)))
}

/// PUT /reviews/{id}
///
/// 404 when the review does not exist, 403 when it belongs to someone else.
pub async fn update_review(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(review_id): Path<Uuid>,
    Json(req): Json<UpdateReviewRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let existing = Review::find_by_id(&mut conn, review_id)
        .await?
        .ok_or(ServiceError::NotFound)?;
    if existing.user_id != auth_user.user_id {
        // Edits are owner-only even for admins
        return Err(ServiceError::Forbidden);
    }

    let review = Review::update_own(
        &mut conn,
        review_id,
        auth_user.user_id,
        req.rating,
        req.comment.trim(),
    )
    .await?
    .ok_or(ServiceError::NotFound)?;

    Ok(Json(review))
}

/// DELETE /reviews/{id}
///
/// Owners delete their own reviews; admins can delete any review. A review
/// that exists but is not the caller's yields 403, not 404.
pub async fn delete_review(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(review_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let existing = Review::find_by_id(&mut conn, review_id)
        .await?
        .ok_or(ServiceError::NotFound)?;
    require_review_access(&auth_user, existing.user_id)?;

    let deleted = if auth_user.is_admin() {
        Review::delete_any(&mut conn, review_id).await?
    } else {
        Review::delete_own(&mut conn, review_id, auth_user.user_id).await?
    };
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::auth::Role;

    fn caller(user_id: Uuid, role: Role) -> AuthenticatedUser {
        AuthenticatedUser {
            user_id,
            email: "caller@example.com".into(),
            role,
            exp: 0,
        }
    }

    #[test]
    fn test_non_owner_delete_is_forbidden_not_missing() {
        let owner = Uuid::new_v4();
        let stranger = caller(Uuid::new_v4(), Role::User);
        assert!(matches!(
            require_review_access(&stranger, owner),
            Err(ServiceError::Forbidden)
        ));
    }

    #[test]
    fn test_owner_and_admin_pass_access_gate() {
        let owner = Uuid::new_v4();
        assert!(require_review_access(&caller(owner, Role::User), owner).is_ok());
        assert!(require_review_access(&caller(Uuid::new_v4(), Role::Admin), owner).is_ok());
    }
}
