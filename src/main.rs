use account_engine::api::{create_router, AppState};
use account_engine::config::Settings;
use account_engine::lock::{LockCoordinator, RedisLockBackend};
use account_engine::observability::{init_logging, init_metrics, LogConfig};
use account_engine::repositories::{AccountRepository, TransactionRepository};
use account_engine::services::{
    AccountService, FailureRecorder, TransactionHandler, TransactionService,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    // Load configuration
    let settings = Settings::new()?;
    init_logging(&LogConfig::from_settings(&settings.application));
    info!("Configuration loaded");

    let metrics_handle = init_metrics()?;

    // Connect to PostgreSQL
    info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(settings.database.pool_size)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&settings.database.url)
        .await?;
    info!("Database connection established");

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    info!("Migrations applied successfully");

    // Connect to Redis
    info!("Connecting to Redis...");
    let client = redis::Client::open(settings.redis.url.as_str())?;
    let lock_backend = RedisLockBackend::connect(&client).await?;
    info!("Redis connection established");

    let accounts = Arc::new(AccountRepository::new(pool.clone()));
    let transactions = Arc::new(TransactionRepository::new(pool));

    let locks = LockCoordinator::new(Arc::new(lock_backend), settings.lock.clone());
    let engine = Arc::new(TransactionService::with_settings(
        accounts.clone(),
        transactions.clone(),
        settings.transaction.clone(),
    ));
    let recorder = FailureRecorder::new(accounts.clone(), transactions);
    let transaction_handler = Arc::new(TransactionHandler::new(locks, engine, recorder));
    let account_service = Arc::new(AccountService::new(accounts));

    let state = AppState::new(account_service, transaction_handler).with_metrics(metrics_handle);
    let app = create_router(state);

    let addr = format!("{}:{}", settings.application.host, settings.application.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutdown signal received");
}
