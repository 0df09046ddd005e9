mod api;
mod autostart;
mod middleware;
mod scheduler;
mod services;

use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use crate::{
    api::{build_app, default_rate_limit_state, AppState},
    middleware::AuthState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Arc::new(replyguard_core::load_app_config()?);
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let pool_config = replyguard_db::PoolConfig::from_app_config(&config);
    let pool = replyguard_db::connect_pool(&config.database_url, pool_config).await?;
    let applied = replyguard_db::run_migrations(&pool).await?;
    tracing::info!(applied, "migrations up to date");

    let registry = services::build_registry(&config, pool.clone())?;
    let pending = registry.workflow().pending().await?.len();
    if pending > 0 {
        tracing::info!(pending, "approvals waiting from a previous run");
    }

    let _scheduler = scheduler::build_scheduler(Arc::clone(registry.workflow())).await?;
    autostart::start_configured_monitors(&registry, &config.monitors_path).await?;

    let auth = AuthState::new(&config.api_keys, config.is_development())?;
    let state = AppState {
        registry: Arc::clone(&registry),
        pool: Some(pool),
        default_interval_secs: config.default_interval_secs,
    };
    let app = build_app(state, auth, default_rate_limit_state());

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    tracing::info!(addr = %config.bind_addr, env = %config.env, "replyguard server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    registry.stop_all().await;
    tracing::info!("all monitors stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to listen for ctrl-c");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("received shutdown signal, starting graceful shutdown");
}
