use crate::error::GenerationError;
use crate::prompt::build_prompt;
use crate::state::{AppState, ModelState};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tower_http::{services::ServeDir, trace::TraceLayer};
use tracing::{debug, error, warn};

const INDEX_PAGE: &str = include_str!("../templates/index.html");
const TRANSLATE_PAGE: &str = include_str!("../templates/translate.html");

pub const INVALID_REQUEST_MESSAGE: &str = "Invalid request. \"text\" is required.";
pub const TRANSLATION_FAILED_MESSAGE: &str = "Failed to translate text.";
pub const NOT_CONFIGURED_MESSAGE: &str = "Translation service is not configured.";

#[derive(Debug, Deserialize)]
pub struct TranslateRequest {
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct TranslateResponse {
    pub translated_text: String,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Every way a translation request can fail, as seen by the caller
#[derive(Debug)]
pub enum TranslateError {
    InvalidRequest,
    NotConfigured,
    Generation(GenerationError),
}

impl From<GenerationError> for TranslateError {
    fn from(err: GenerationError) -> Self {
        TranslateError::Generation(err)
    }
}

impl IntoResponse for TranslateError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            TranslateError::InvalidRequest => (StatusCode::BAD_REQUEST, INVALID_REQUEST_MESSAGE),
            TranslateError::NotConfigured => {
                (StatusCode::SERVICE_UNAVAILABLE, NOT_CONFIGURED_MESSAGE)
            }
            TranslateError::Generation(e) => {
                error!("An error occurred during translation: {}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, TRANSLATION_FAILED_MESSAGE)
            }
        };

        let body = ErrorResponse {
            error: message.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Build the application router
pub fn create_router(state: AppState, static_dir: impl AsRef<Path>) -> Router {
    Router::new()
        .route("/", get(index_page))
        .route("/translate.html", get(translate_page))
        // No cap on the text a caller may submit
        .route(
            "/translate",
            post(translate).layer(DefaultBodyLimit::disable()),
        )
        .nest_service("/static", ServeDir::new(static_dir.as_ref()))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_page() -> Html<&'static str> {
    Html(INDEX_PAGE)
}

async fn translate_page() -> Html<&'static str> {
    Html(TRANSLATE_PAGE)
}

/// Parse the body leniently: any JSON object with a string `text` is accepted
fn parse_request(body: &[u8]) -> Option<TranslateRequest> {
    serde_json::from_slice(body).ok()
}

async fn translate(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<Json<TranslateResponse>, TranslateError> {
    let Some(request) = parse_request(&body) else {
        debug!("Rejected translation request with invalid body");
        return Err(TranslateError::InvalidRequest);
    };

    let generator = match &state.model {
        ModelState::Ready(generator) => Arc::clone(generator),
        ModelState::Unavailable { reason } => {
            warn!("Translation requested but Vertex AI is unavailable: {}", reason);
            return Err(TranslateError::NotConfigured);
        }
    };

    let prompt = build_prompt(&request.text);

    // Spawned so a dropped client connection does not cancel the remote call
    let generated = tokio::spawn(async move { generator.generate(&prompt).await })
        .await
        .map_err(|e| GenerationError::Aborted(e.to_string()))??;

    Ok(Json(TranslateResponse {
        translated_text: generated.trim().to_string(),
    }))
}
