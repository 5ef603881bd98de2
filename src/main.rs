use std::sync::Arc;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use wiki_quiz::{
    config::Config,
    api::routes::create_router,
    llm::GeminiClient,
    quiz::QuizSynthesizer,
    scraper::{HttpFetcher, WikipediaScraper},
    store::QuizStore,
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "wiki_quiz=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let store = QuizStore::connect(&config.database_url).await?;
    store.migrate().await?;
    tracing::info!(database_url = %config.database_url, "Database ready");

    // Create application state
    let app_state = AppState {
        scraper: Arc::new(WikipediaScraper::new(Arc::new(HttpFetcher::new()?))),
        synthesizer: Arc::new(QuizSynthesizer::new(Arc::new(GeminiClient::from_config(&config)?))),
        store,
    };

    let app = create_router(app_state);

    let listener = TcpListener::bind(config.server_addr).await?;
    tracing::info!(addr = %config.server_addr, model = %config.gemini_model, "Listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on SIGINT, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
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
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT, shutting down"),
        () = terminate => tracing::info!("Received SIGTERM, shutting down"),
    }
}
