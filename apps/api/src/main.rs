mod config;
mod errors;
mod feedback;
mod llm_client;
mod routes;
mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{Config, LlmMode};
use crate::feedback::orchestrator::RewriteOrchestrator;
use crate::feedback::prompts::RubricPromptBuilder;
use crate::llm_client::{FakeLlmClient, LlmClient, LlmGateway};
use crate::routes::build_router;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Feedback API v{}", env!("CARGO_PKG_VERSION"));

    // Initialize LLM gateway
    let llm: Arc<dyn LlmGateway> = match config.llm_mode {
        LlmMode::OpenAi => {
            let client = LlmClient::new(config.llm.clone())?;
            info!("LLM client initialized (model: {})", client.model());
            Arc::new(client)
        }
        LlmMode::Fake => {
            info!("LLM_MODE=fake: rewrites are stubbed");
            Arc::new(FakeLlmClient)
        }
    };

    // One worker pool for the whole process
    let orchestrator = RewriteOrchestrator::new(
        llm,
        Arc::new(RubricPromptBuilder),
        config.rewrite_max_parallel,
        config.rewrite_call_timeout,
    );
    info!(
        "Rewrite pool: {} workers, {:?} per call",
        config.rewrite_max_parallel, config.rewrite_call_timeout
    );

    let state = AppState {
        orchestrator,
        config: config.clone(),
    };

    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
