// Migration runner for the Encore backend
// Embedded in the application binary so deployments need no external diesel CLI

pub mod diesel;

use crate::db::DieselPool;
use std::error::Error;
use tracing::{error, info};

/// Configuration for migration execution
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    pub skip_diesel: bool,
    pub environment: String,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        let config = crate::app_config::config();

        Self {
            skip_diesel: false,
            environment: config.environment.to_string(),
        }
    }
}

/// Run all pending migrations in order
pub async fn run_all_migrations(
    diesel_pool: &DieselPool,
    config: MigrationConfig,
) -> Result<(), Box<dyn Error + Send + Sync>> {
    info!(
        "[MIGRATIONS] Starting migration process for environment: {}",
        config.environment
    );

    if config.skip_diesel {
        info!("[MIGRATIONS] Skipping migrations (disabled in config)");
        return Ok(());
    }

    match diesel::run_migrations(diesel_pool).await {
        Ok(0) => info!("[MIGRATIONS] Migrations up to date"),
        Ok(applied) => info!("[MIGRATIONS] Applied {} migrations", applied),
        Err(e) => {
            error!("[MIGRATIONS] Migration failed: {}", e);
            return Err(format!("Migration failed: {}", e).into());
        },
    }

    Ok(())
}

/// Check if migrations should run based on environment variables
pub fn should_run_migrations() -> bool {
    !crate::app_config::config().disable_embedded_migrations
}
