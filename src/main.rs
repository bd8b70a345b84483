use ddd_calculator::bootstrap;
use ddd_calculator::config::Config;
use ddd_calculator::infrastructure::http::router::build_router;
use ddd_calculator::infrastructure::observability;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::from_env()?;

    let _observability = observability::init(&config)?;
    tracing::info!("Configuration loaded for {}", config.app_name);

    // Build application state (holiday provider and calculation service)
    let state = bootstrap::build_app_state(&config)?;
    let provider = state.calculation_service.provider().clone();

    let app = build_router(state, &config.api_prefix);

    let addr = config.server_address();
    tracing::info!("listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    provider.clear().await;
    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
}
