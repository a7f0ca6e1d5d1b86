//! Worker binary: runs the daily subscription expiry scan and the mail
//! queue drain as background loops over one shared pool.

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod mail_job;
mod scan_job;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "opsdesk_worker=debug,opsdesk_engine=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = opsdesk_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    opsdesk_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    opsdesk_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let cancel = CancellationToken::new();

    let scan_handle = tokio::spawn(scan_job::run(pool.clone(), cancel.clone()));
    let mail_handle = tokio::spawn(mail_job::run(pool.clone(), cancel.clone()));

    tokio::signal::ctrl_c()
        .await
        .expect("Failed to listen for ctrl-c");
    tracing::info!("Shutdown signal received");
    cancel.cancel();

    let _ = scan_handle.await;
    let _ = mail_handle.await;
    tracing::info!("Worker stopped");
}
