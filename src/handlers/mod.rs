// HTTP handlers and route builders

pub mod auth;
pub mod cart;
pub mod dashboard;
pub mod generation;
pub mod payments;
pub mod reviews;
pub mod subscriptions;
pub mod tickets;
pub mod users;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post, put},
    Router,
};

use crate::{app::AppState, middleware::auth_middleware};

/// Authentication routes, no session required
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
}

/// Public catalog and review reads
pub fn public_routes() -> Router<AppState> {
    Router::new()
        .route("/tickets", get(tickets::list_tickets))
        .route("/tickets/{id}", get(tickets::get_ticket))
        .route("/categories", get(tickets::list_categories))
        .route("/content/{content_id}/reviews", get(reviews::list_reviews))
        .route(
            "/content/{content_id}/reviews/stats",
            get(reviews::review_stats),
        )
        .route("/reviews/latest", get(reviews::latest_reviews))
        .route("/plans", get(subscriptions::list_plans))
}

/// Session-protected routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/me",
            get(auth::current_user)
                .put(users::update_profile)
                .delete(users::delete_account),
        )
        .route("/cart", get(cart::list_cart).post(cart::add_to_cart))
        .route(
            "/cart/{id}",
            put(cart::update_cart_item).delete(cart::remove_cart_item),
        )
        .route("/cart/checkout", post(cart::checkout))
        .route("/orders", get(cart::order_history))
        .route("/reviews", post(reviews::create_review))
        .route(
            "/reviews/{id}",
            put(reviews::update_review).delete(reviews::delete_review),
        )
        .route("/subscription", get(subscriptions::current_subscription))
        .route("/subscription/purchase", post(subscriptions::purchase))
        .route("/generate/image", post(generation::generate_image))
        .route("/generate/video", post(generation::generate_video))
        .route("/generate/history", get(generation::generation_history))
        .route("/generate/quota", get(generation::generation_quota))
        .route("/media/{file_name}", get(generation::serve_media))
        .route("/payments/paypal/orders", post(payments::create_paypal_order))
        .route(
            "/payments/paypal/orders/{id}/capture",
            post(payments::capture_paypal_order),
        )
        .route("/payments/nets/qr", post(payments::request_nets_qr))
        .route("/drive/upload", post(payments::upload_to_drive))
        .layer(from_fn_with_state(state, auth_middleware))
}

/// Admin-only routes. The session middleware authenticates; each handler
/// still enforces the admin role.
pub fn admin_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(dashboard::overview))
        .route("/dashboard/orders", get(dashboard::order_stats))
        .route("/dashboard/reviews", get(dashboard::review_buckets))
        .route(
            "/subscriptions",
            get(subscriptions::admin_list_subscriptions),
        )
        .route(
            "/subscriptions/{id}",
            put(subscriptions::admin_update_subscription)
                .delete(subscriptions::admin_delete_subscription),
        )
        .route("/tickets", post(tickets::create_ticket))
        .route(
            "/tickets/{id}",
            put(tickets::update_ticket).delete(tickets::delete_ticket),
        )
        .route("/categories", post(tickets::create_category))
        .route(
            "/categories/{id}",
            put(tickets::update_category).delete(tickets::delete_category),
        )
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .layer(from_fn_with_state(state, auth_middleware))
}
