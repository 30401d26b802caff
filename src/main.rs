//! PDF Gate Server
//!
//! A PDF manipulation service that admits processing work through a
//! bounded-concurrency gate, stages large uploads on disk with a
//! process-scoped lifecycle, and streams results back to the client.

use axum::extract::DefaultBodyLimit;
use tokio::signal;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use pdf_gate_server::config::Config;
use pdf_gate_server::routes;
use pdf_gate_server::state::AppState;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "pdf_gate_server=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::from_env();

    tracing::info!("Starting PDF Gate Server v{}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        max_concurrent = config.gate.max_concurrent,
        max_queue_size = config.gate.max_queue_size,
        "Gate limits"
    );
    tracing::info!(dir = %config.temp_files.dir.display(), "Staging directory");

    // The whole multipart body may carry up to max_files files at the
    // per-file limit; per-file enforcement happens in the streaming boundary.
    let body_limit = (config.upload.max_file_size as usize)
        .saturating_mul(config.upload.max_files.max(1))
        .saturating_add(1024 * 1024);

    let addr = format!("{}:{}", config.server.host, config.server.port);

    // Create application state
    let app_state = AppState::new(config);

    // Build CORS layer
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Build router
    let app = routes::router(app_state.clone())
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server with graceful shutdown
    tracing::info!("PDF Gate Server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("failed to bind listen address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("server error");

    // Drain in-flight work and clear this process's staged files
    app_state.shutdown().await;

    tracing::info!("Server shutdown complete");
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, starting graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown...");
        },
    }
}
