use crate::config::Config;
use crate::vertex::{TextGenerator, VertexClient};
use std::sync::Arc;
use tracing::{error, info};

/// Whether the translation backend came up at startup
#[derive(Clone)]
pub enum ModelState {
    Ready(Arc<dyn TextGenerator>),
    Unavailable { reason: String },
}

impl ModelState {
    /// Load configuration and build the Vertex AI client.
    ///
    /// Runs once at startup. Failures are logged and turned into
    /// `Unavailable`; they never stop the process.
    pub fn initialize() -> Self {
        let config = match Config::from_env() {
            Ok(config) => config,
            Err(e) => {
                error!("Error initializing Vertex AI: {}", e);
                error!("Please ensure your GOOGLE_APPLICATION_CREDENTIALS variable is set correctly.");
                return Self::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        match VertexClient::init(&config) {
            Ok(client) => {
                info!(
                    "✓ Initialized Vertex AI for project: {} in region: {} (model: {})",
                    client.project_id(),
                    client.region(),
                    client.model()
                );
                Self::Ready(Arc::new(client))
            }
            Err(e) => {
                error!("Error initializing Vertex AI: {}", e);
                Self::Unavailable {
                    reason: e.to_string(),
                }
            }
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Shared state handed to every request handler
#[derive(Clone)]
pub struct AppState {
    pub model: ModelState,
}

impl AppState {
    pub fn new(model: ModelState) -> Self {
        Self { model }
    }
}
