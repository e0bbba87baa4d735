// Encore backend entrypoint

use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use encore_backend::{app_config, build_router, initialize_app_state};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();

    let config = app_config::config();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.rust_log.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        environment = %config.environment,
        "Starting encore-backend"
    );

    let state = initialize_app_state().await?;
    let router = build_router(state);

    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    info!("Listening on {}", config.bind_address);

    axum::serve(listener, router).await?;
    Ok(())
}
