use crate::error::ConfigError;
use std::path::{Path, PathBuf};

/// Vertex AI region the client is bound to
pub const REGION: &str = "asia-northeast1";

pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";

#[derive(Debug, Clone)]
pub struct Config {
    // Credentials
    pub credentials_path: PathBuf,
    pub project_id: String,

    // Vertex AI
    pub region: String,
    pub api_endpoint: String,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let credentials_path = std::env::var(CREDENTIALS_ENV)
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from)
            .ok_or(ConfigError::MissingCredentialsPath)?;

        let project_id = read_project_id(&credentials_path)?;

        Ok(Self {
            credentials_path,
            project_id,
            region: REGION.to_string(),
            api_endpoint: std::env::var("VERTEX_API_ENDPOINT")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .unwrap_or_else(|| default_endpoint(REGION)),
        })
    }
}

/// Regional Vertex AI base URL
pub fn default_endpoint(region: &str) -> String {
    format!("https://{}-aiplatform.googleapis.com", region)
}

/// Read the credentials document and pull out its `project_id`
fn read_project_id(path: &Path) -> Result<String, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::ReadCredentials {
        path: path.to_path_buf(),
        source,
    })?;

    let document: serde_json::Value =
        serde_json::from_str(&content).map_err(|source| ConfigError::ParseCredentials {
            path: path.to_path_buf(),
            source,
        })?;

    document
        .get("project_id")
        .and_then(|v| v.as_str())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingProjectId { path: path.to_path_buf() })
}

/// Listen address and asset location. Never fails; every field has a default.
#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub static_dir: PathBuf,
}

impl ServerSettings {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port: std::env::var("PORT")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5000),
            static_dir: std::env::var("STATIC_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("static")),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
