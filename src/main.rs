use mimalloc::MiMalloc;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use warden::db::{DataSource, JdbcUserDetailsService};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let properties = warden::config::properties_path();
    let cfg = warden::config::load(&properties)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.server.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        properties = %properties.display(),
        listen = %cfg.server.listen,
        loglevel = %cfg.server.loglevel,
        view_prefix = %cfg.view.prefix,
        view_suffix = %cfg.view.suffix
    );

    let source = DataSource::provision(&cfg.jdbc, &cfg.pool).await?;
    if cfg.jdbc.init_schema {
        source.init_schema().await?;
        info!("security schema initialized");
    }

    let users = Arc::new(JdbcUserDetailsService::new(source.clone()));
    let state = warden::WardenState::new(&cfg, users);
    let app = warden::warden_router(state);

    let listener = TcpListener::bind(cfg.server.listen).await?;
    info!("HTTP server listening on {}", cfg.server.listen);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    source.close().await;
    info!("security data source closed");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
