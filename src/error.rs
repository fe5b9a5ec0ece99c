use std::path::PathBuf;
use thiserror::Error;

/// Failures while loading configuration from the environment and credentials file
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("GOOGLE_APPLICATION_CREDENTIALS environment variable not set")]
    MissingCredentialsPath,

    #[error("Failed to read credentials file {path}: {source}")]
    ReadCredentials {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse credentials file {path}: {source}")]
    ParseCredentials {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Credentials file {path} has no project_id")]
    MissingProjectId { path: PathBuf },
}

/// Failures while building the Vertex AI client
#[derive(Error, Debug)]
pub enum InitError {
    #[error("Failed to read service account key {path}: {message}")]
    ServiceAccount { path: PathBuf, message: String },

    #[error("Invalid service account private key: {0}")]
    PrivateKey(#[from] jsonwebtoken::errors::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(#[from] reqwest::Error),
}

/// Failures during a single generation call
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Failed to sign token assertion: {0}")]
    Assertion(#[from] jsonwebtoken::errors::Error),

    #[error("Request to {endpoint} failed: {source}")]
    Transport {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} returned {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Malformed response from {endpoint}: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Model returned no text (finish reason: {finish_reason})")]
    EmptyResponse { finish_reason: String },

    #[error("Generation task aborted: {0}")]
    Aborted(String),
}
