use std::sync::Arc;

use medadmin::app::{AppServices, build_router};
use medadmin::core::config::Config;
use medadmin::core::db::{
    CredentialStore, DbConfig, MemoryUserRepository, UserRepository, create_pool_with_migrations,
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file (if exists)
    let _ = dotenvy::dotenv();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load application config from environment variables
    let config = Config::from_env()?;

    // Log config status (without revealing secrets)
    tracing::info!(
        "Config loaded: database={}, environment={:?}, token_ttl={}m, bcrypt_cost={}",
        config.has_database(),
        config.environment,
        config.jwt.expiration_minutes,
        config.bcrypt_cost
    );

    let store: Arc<dyn CredentialStore> = match &config.database_url {
        Some(url) => {
            let pool = create_pool_with_migrations(&DbConfig::new(url.clone())).await?;
            tracing::info!("Connected to PostgreSQL, migrations applied");
            Arc::new(UserRepository::new(pool))
        }
        None if config.is_development() => {
            tracing::warn!("DATABASE_URL not set, using in-memory store");
            Arc::new(MemoryUserRepository::new())
        }
        None => return Err("DATABASE_URL must be set outside development".into()),
    };

    let app = build_router(AppServices::from_config(store, &config), &config.frontend_url)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    tracing::info!("listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
