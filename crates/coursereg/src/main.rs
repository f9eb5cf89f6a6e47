use std::sync::Arc;

use anyhow::Context;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use coursereg::catalog::{NewUser, UserType};
use coursereg::config::ServerConfig;
use coursereg::db::ScheduleDbManager;
use coursereg::server::create_router;
use coursereg::types::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config_path = std::env::args().nth(1);
    let config = ServerConfig::resolve(config_path.as_deref())?;
    info!(
        "Starting with database {} (max class length {} minutes, report mode {:?})",
        config.database_path, config.validation.max_duration_minutes, config.validation.report
    );

    let schedule_db = ScheduleDbManager::open(&config.database_path)
        .with_context(|| format!("Failed to open database {}", config.database_path))?;

    if let Some(username) = &config.bootstrap_staff {
        let user_id = schedule_db
            .ensure_user(&NewUser::new(username.clone(), UserType::Staff))
            .with_context(|| format!("Failed to create staff user {username}"))?;
        info!("Staff user '{}' has id {}", username, user_id);
    }

    let app_state = Arc::new(AppState::new(schedule_db, config.validation.clone()));
    let app = create_router(app_state);

    let address = config.bind_address();
    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {address}"))?;
    info!("Listening on {}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_err() {
        // Without a signal handler there is nothing to wait on; keep serving
        std::future::pending::<()>().await;
    }
    info!("Shutting down");
}
