// Cart and checkout handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncConnection;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::{
    app::AppState,
    middleware::auth::AuthenticatedUser,
    models::cart::{cart_total_cents, CartItem, CartLine, NewCartItem},
    models::order::{NewOrderItem, OrderItem},
    models::ticket::Ticket,
    utils::ServiceError,
};

#[derive(Debug, Deserialize, Validate)]
pub struct AddToCartRequest {
    pub ticket_id: Uuid,
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCartItemRequest {
    #[validate(range(min = 1, max = 100, message = "Quantity must be between 1 and 100"))]
    pub quantity: i32,
}

#[derive(Debug, Deserialize)]
pub struct CheckoutRequest {
    /// "paypal" or "nets", recorded on the order
    pub payment_method: String,
}

#[derive(Debug, Serialize)]
pub struct CartResponse {
    pub lines: Vec<CartLine>,
    pub total_cents: i64,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order_ref: String,
    pub transaction_ref: String,
    pub items: Vec<OrderItem>,
    pub total_cents: i64,
}

/// Order/transaction reference: prefix, epoch seconds, random suffix
fn payment_reference(prefix: &str) -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(6)
        .map(char::from)
        .collect();
    format!(
        "{}-{}-{}",
        prefix,
        chrono::Utc::now().timestamp(),
        suffix.to_uppercase()
    )
}

/// GET /cart
pub async fn list_cart(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let lines = CartItem::lines_for_user(&mut conn, auth_user.user_id).await?;
    let total_cents = cart_total_cents(&lines);

    Ok(Json(CartResponse { lines, total_cents }))
}

/// POST /cart
pub async fn add_to_cart(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<AddToCartRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let mut conn = state.diesel_pool.get().await?;

    // The ticket must exist, but stock is only committed at checkout
    Ticket::find_by_id(&mut conn, req.ticket_id)
        .await?
        .ok_or(ServiceError::NotFound)?;

    let item = CartItem::add(
        &mut conn,
        NewCartItem {
            user_id: auth_user.user_id,
            ticket_id: req.ticket_id,
            quantity: req.quantity,
        },
    )
    .await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /cart/{id}
pub async fn update_cart_item(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
    Json(req): Json<UpdateCartItemRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    req.validate()?;

    let mut conn = state.diesel_pool.get().await?;
    let item = CartItem::set_quantity(&mut conn, item_id, auth_user.user_id, req.quantity)
        .await?
        .ok_or(ServiceError::NotFound)?;

    Ok(Json(item))
}

/// DELETE /cart/{id}
pub async fn remove_cart_item(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Path(item_id): Path<Uuid>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let removed = CartItem::remove(&mut conn, item_id, auth_user.user_id).await?;
    if removed == 0 {
        return Err(ServiceError::NotFound);
    }

    Ok(StatusCode::NO_CONTENT)
}

/// POST /cart/checkout
///
/// Stock reservation, order rows and cart clearing happen in one
/// transaction: an oversubscribed line rolls everything back.
pub async fn checkout(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
    Json(req): Json<CheckoutRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let payment_method = req.payment_method.trim().to_lowercase();
    if payment_method != "paypal" && payment_method != "nets" {
        return Err(ServiceError::ValidationError(
            "payment_method must be paypal or nets".to_string(),
        ));
    }

    let user_id = auth_user.user_id;
    let order_ref = payment_reference("ORD");
    let transaction_ref = payment_reference("TXN");

    let mut conn = state.diesel_pool.get().await?;

    let (items, total_cents) = conn
        .transaction::<_, ServiceError, _>(|conn| {
            let order_ref = order_ref.clone();
            let transaction_ref = transaction_ref.clone();
            let payment_method = payment_method.clone();
            async move {
                let lines = CartItem::lines_for_user(conn, user_id).await?;
                if lines.is_empty() {
                    return Err(ServiceError::ValidationError("Cart is empty".to_string()));
                }

                let mut new_items = Vec::with_capacity(lines.len());
                for line in &lines {
                    let reserved =
                        Ticket::reserve_stock(conn, line.item.ticket_id, line.item.quantity)
                            .await?;
                    if !reserved {
                        return Err(ServiceError::ValidationError(format!(
                            "Not enough stock for {}",
                            line.event_name
                        )));
                    }

                    new_items.push(NewOrderItem {
                        order_ref: order_ref.clone(),
                        transaction_ref: transaction_ref.clone(),
                        user_id,
                        ticket_id: line.item.ticket_id,
                        quantity: line.item.quantity,
                        unit_price_cents: line.unit_price_cents,
                        payment_method: payment_method.clone(),
                    });
                }

                let total = cart_total_cents(&lines);
                let items = OrderItem::create_batch(conn, &new_items).await?;
                CartItem::clear_for_user(conn, user_id).await?;

                Ok((items, total))
            }
            .scope_boxed()
        })
        .await?;

    tracing::info!(
        user_id = %user_id,
        order_ref = %order_ref,
        total_cents,
        "Checkout completed"
    );

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            order_ref,
            transaction_ref,
            items,
            total_cents,
        }),
    ))
}

/// GET /orders
pub async fn order_history(
    State(state): State<AppState>,
    auth_user: AuthenticatedUser,
) -> Result<impl IntoResponse, ServiceError> {
    let mut conn = state.diesel_pool.get().await?;
    let orders = OrderItem::list_for_user(&mut conn, auth_user.user_id).await?;
    Ok(Json(orders))
}
