// Payment handlers: PayPal order create/capture and NETS QR issuance

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use serde::Deserialize;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::cart::CartItem,
    services::drive::mime_from_name,
    services::paypal::{order_total_cents, OrderLine},
    utils::ServiceError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, max = 40, message = "Reference must be 1-40 characters"))]
    pub reference: String,
}

/// The caller's cart as priced order lines. Amounts come from the store,
/// never from the request body.
async fn cart_order_lines(
    state: &AppState,
    user_id: uuid::Uuid,
) -> Result<Vec<OrderLine>, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let lines = CartItem::lines_for_user(&mut conn, user_id).await?;
    if lines.is_empty() {
        return Err(ServiceError::ValidationError("cart is empty".to_string()));
    }

    Ok(lines
        .into_iter()
        .map(|line| OrderLine {
            name: line.event_name,
            quantity: line.item.quantity,
            unit_price_cents: line.unit_price_cents,
        })
        .collect())
}

/// POST /payments/paypal/orders
pub async fn create_paypal_order(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let lines = cart_order_lines(&state, auth_user.user_id).await?;
    let order = state
        .paypal
        .create_order(req.reference.trim(), &lines)
        .await?;

    tracing::info!(
        user_id = %auth_user.user_id,
        order_id = %order.id,
        amount_cents = order_total_cents(&lines),
        "PayPal order created"
    );

    Ok((StatusCode::CREATED, Json(order)))
}

/// POST /payments/paypal/orders/{id}/capture
pub async fn capture_paypal_order(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(order_id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let order = state.paypal.capture_order(&order_id).await?;

    tracing::info!(
        user_id = %auth_user.user_id,
        order_id = %order.id,
        "PayPal order captured"
    );

    Ok(Json(order))
}

/// POST /payments/nets/qr
pub async fn request_nets_qr(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CreatePaymentRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let lines = cart_order_lines(&state, auth_user.user_id).await?;
    let amount_cents = order_total_cents(&lines);
    let qr = state
        .nets
        .request_qr(amount_cents, req.reference.trim())
        .await?;

    tracing::info!(
        user_id = %auth_user.user_id,
        txn_id = %qr.txn_id,
        amount_cents,
        "NETS QR issued"
    );

    Ok((StatusCode::CREATED, Json(qr)))
}

#[derive(Debug, Deserialize, Validate)]
pub struct DriveUploadRequest {
    /// An http(s) URL, or the bare name of a file in the media directory
    #[validate(length(min = 1, max = 2000))]
    pub source: String,
    pub name: Option<String>,
}

/// POST /drive/upload
///
/// Re-uploads an already stored media file, or a remote URL, to the shared
/// Drive folder. Local sources are restricted to bare file names inside the
/// media directory.
pub async fn upload_to_drive(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<DriveUploadRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;
    let source = req.source.trim();

    let (bytes, default_name) = if source.starts_with("http://") || source.starts_with("https://") {
        let bytes = state.drive.fetch_url(source).await?;
        let name = source
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("download")
            .to_string();
        (bytes, name)
    } else {
        if source.contains('/') || source.contains('\\') || source.contains("..") {
            return Err(ServiceError::ValidationError(
                "source must be a bare file name or an http(s) URL".to_string(),
            ));
        }
        let media_dir = &crate::app_config::config().media_dir;
        let path = std::path::Path::new(media_dir).join(source);
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|_| ServiceError::NotFound)?;
        (bytes, source.to_string())
    };

    let file_name = req.name.as_deref().unwrap_or(&default_name);
    let mime_type = mime_from_name(file_name);
    let file = state.drive.upload(file_name, mime_type, bytes).await?;

    tracing::info!(
        user_id = %auth_user.user_id,
        file_id = %file.id,
        "Media uploaded to Drive"
    );

    Ok((StatusCode::CREATED, Json(file)))
}
