use crate::config::Config;
use crate::feedback::orchestrator::RewriteOrchestrator;

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    /// Holds the process-wide rewrite worker pool; every clone shares it.
    pub orchestrator: RewriteOrchestrator,
    pub config: Config,
}
