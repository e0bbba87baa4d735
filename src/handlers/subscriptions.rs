// Subscription handlers: plan listing, current state, purchase

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::subscription::{Subscription, SubscriptionUpdate},
    utils::ServiceError,
};

#[derive(Debug, Deserialize)]
pub struct PurchaseRequest {
    pub plan: String,
    /// Captured payment reference from the payment flow
    pub transaction_ref: String,
}

#[derive(Debug, Serialize)]
pub struct SubscriptionResponse {
    pub subscription: Option<Subscription>,
}

/// GET /plans
pub async fn list_plans(State(state): State<AppState>) -> impl IntoResponse {
    Json(state.subscription_service.catalog().all().to_vec())
}

/// GET /subscription
pub async fn current_subscription(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let subscription = state
        .subscription_service
        .current_for_user(&mut conn, auth_user.user_id)
        .await?;

    Ok(Json(SubscriptionResponse { subscription }))
}

/// POST /subscription/purchase
///
/// Assumes payment already settled through the payment endpoints; the
/// transaction reference is recorded in the log trail only.
pub async fn purchase(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<PurchaseRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    if req.transaction_ref.trim().is_empty() {
        return Err(ServiceError::ValidationError(
            "transaction_ref is required".to_string(),
        ));
    }

    let mut conn = state.diesel_pool.get().await?;
    let subscription = state
        .subscription_service
        .purchase(&mut conn, auth_user.user_id, &req.plan)
        .await?;

    tracing::info!(
        user_id = %auth_user.user_id,
        plan = %subscription.plan_name,
        transaction_ref = %req.transaction_ref,
        "Subscription purchase settled"
    );

    Ok((
        StatusCode::CREATED,
        Json(SubscriptionResponse {
            subscription: Some(subscription),
        }),
    ))
}

fn require_admin(auth_user: &AuthenticatedUser) -> Result<(), ServiceError> {
    if auth_user.is_admin() {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

/// GET /admin/subscriptions
pub async fn admin_list_subscriptions(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let mut conn = state.diesel_pool.get().await?;
    let subscriptions = Subscription::list_recent(&mut conn, 100)
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;

    Ok(Json(subscriptions))
}

/// PUT /admin/subscriptions/{id}
pub async fn admin_update_subscription(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(sub_id): Path<Uuid>,
    Json(changes): Json<SubscriptionUpdate>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    if let Some(credit) = changes.credit_cents {
        if credit < 0 {
            return Err(ServiceError::ValidationError(
                "credit_cents must not be negative".to_string(),
            ));
        }
    }

    let mut conn = state.diesel_pool.get().await?;
    let subscription = Subscription::admin_update(&mut conn, sub_id, changes)
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?
        .ok_or(ServiceError::NotFound)?;

    tracing::info!(
        subscription_id = %subscription.id,
        admin = %auth_user.user_id,
        "Admin updated subscription"
    );
    Ok(Json(subscription))
}

/// DELETE /admin/subscriptions/{id}
pub async fn admin_delete_subscription(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(sub_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    require_admin(&auth_user)?;

    let mut conn = state.diesel_pool.get().await?;
    let deleted = Subscription::admin_delete(&mut conn, sub_id)
        .await
        .map_err(|e| ServiceError::DatabaseError(e.to_string()))?;
    if deleted == 0 {
        return Err(ServiceError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}
