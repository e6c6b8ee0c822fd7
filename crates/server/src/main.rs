use std::process;

use clap::Parser;

use emotion_core::pipeline::model_context::ModelContext;
use emotion_server::{create_router, AppState, ServerConfig};

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        eprintln!("Error: {e}");
        process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServerConfig::parse();

    let paths = config.model_paths();
    let models = tokio::task::spawn_blocking(move || ModelContext::load(&paths)).await?;
    log::info!(
        "Model status: classifier {}, cascade {}",
        if models.classifier_loaded() { "loaded" } else { "not loaded" },
        if models.detector_loaded() { "loaded" } else { "not loaded" },
    );

    let app = create_router(AppState::new(models, &config));

    let listener = tokio::net::TcpListener::bind(config.bind_address()).await?;
    log::info!("Listening on http://{}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    log::info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            log::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                log::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    log::info!("Received shutdown signal");
}
