// Library exports for the Encore backend

pub mod app;
pub mod app_config;
pub mod db;
pub mod handlers;
pub mod middleware;
pub mod migrations;
pub mod models;
pub mod schema;
pub mod services;
pub mod utils;

// Re-export commonly used types
pub use app::AppState;
pub use app_config::{AppConfig, CONFIG};
pub use db::DieselPool;
pub use middleware::auth_middleware;
pub use middleware::AuthenticatedUser;
pub use services::{JwtError, JwtService, LedgerService, PlanCatalog, SubscriptionService};
pub use utils::ServiceError;

// Re-export handler route builders
pub use handlers::{admin_routes, api_routes, auth_routes, public_routes};

/// Initialize pools, services and shared state from the environment
pub async fn initialize_app_state() -> anyhow::Result<AppState> {
    use std::sync::Arc;
    use tracing::info;

    // Load environment
    dotenv::dotenv().ok();

    let config = app_config::config();

    info!("Initializing database pool...");
    let db_config = db::DieselDatabaseConfig::default();
    let max_connections = db_config.max_connections;
    let diesel_pool = db::create_diesel_pool(db_config)
        .await
        .map_err(|e| anyhow::anyhow!("Pool initialization failed: {}", e))?;

    if migrations::should_run_migrations() {
        info!("Running embedded migrations...");
        let migration_config = migrations::MigrationConfig::default();
        migrations::run_all_migrations(&diesel_pool, migration_config)
            .await
            .map_err(|e| anyhow::anyhow!("Migration failed: {}", e))?;
    }

    let jwt_service = Arc::new(services::JwtService::from_config());
    let subscription_service = Arc::new(services::SubscriptionService::new(
        services::PlanCatalog::default(),
    ));
    let media_gen = Arc::new(services::MediaGenClient::new(config.media_gen.clone())?);
    let paypal = Arc::new(services::PayPalClient::new(config.paypal.clone()));
    let nets = Arc::new(services::NetsClient::new(config.nets.clone()));
    let drive = Arc::new(services::DriveClient::new(config.drive.clone()));

    Ok(AppState {
        diesel_pool,
        jwt_service,
        ledger: services::LedgerService::new(),
        subscription_service,
        media_gen,
        paypal,
        nets,
        drive,
        max_connections,
    })
}

/// The full application router
pub fn build_router(state: AppState) -> axum::Router {
    use axum::middleware::from_fn;
    use axum::routing::get;

    axum::Router::new()
        .route("/health", get(health_check))
        .nest("/auth", handlers::auth_routes())
        .merge(handlers::public_routes())
        .merge(handlers::api_routes(state.clone()))
        .nest("/admin", handlers::admin_routes(state.clone()))
        .layer(from_fn(middleware::dynamic_cors_middleware))
        .layer(tower_http::trace::TraceLayer::new_for_http())
        .with_state(state)
}

// Health check handler
pub async fn health_check(
    axum::extract::State(state): axum::extract::State<AppState>,
) -> impl axum::response::IntoResponse {
    use axum::http::StatusCode;
    use axum::Json;

    let timestamp = chrono::Utc::now().to_rfc3339();

    let (healthy, postgres_health) = match db::check_diesel_health(&state.diesel_pool).await {
        Ok(_) => (
            true,
            serde_json::json!({
                "status": "healthy",
                "max_connections": state.max_connections,
                "error": null
            }),
        ),
        Err(e) => (
            false,
            serde_json::json!({
                "status": "unhealthy",
                "error": format!("Database connection failed: {}", e)
            }),
        ),
    };

    let response = serde_json::json!({
        "status": if healthy { "healthy" } else { "degraded" },
        "service": "encore-backend",
        "timestamp": timestamp,
        "components": {
            "postgresql": postgres_health
        }
    });

    if healthy {
        (StatusCode::OK, Json(response))
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, Json(response))
    }
}
