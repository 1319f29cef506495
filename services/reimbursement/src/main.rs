use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

use common::database::{DatabaseConfig, health_check, init_pool, run_migrations};
use reimbursement::{
    jwt::JwtService,
    notification::Notifications,
    repositories::{RequestRepository, UserRepository},
    routes,
    settings::Settings,
    state::AppState,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting reimbursement service");

    let settings = Settings::load()?;

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&pool).await?;

    let app_state = AppState::new(
        Arc::new(UserRepository::new(pool.clone())),
        Arc::new(RequestRepository::new(pool)),
        Notifications::from_settings(&settings.notification),
        JwtService::from_settings(&settings.auth),
        settings.policy.min_password_length,
    );

    // Start the web server
    let app = routes::create_router(app_state);

    let listener = tokio::net::TcpListener::bind(&settings.server.bind_address).await?;
    info!(
        "Reimbursement service listening on {}",
        settings.server.bind_address
    );

    axum::serve(listener, app).await?;

    Ok(())
}
