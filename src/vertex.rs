use crate::config::Config;
use crate::error::{GenerationError, InitError};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::sync::Mutex;
use tracing::debug;

/// Gemini model every request is sent to
pub const MODEL_NAME: &str = "gemini-2.5-flash";

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";
const CLOUD_PLATFORM_SCOPE: &str = "https://www.googleapis.com/auth/cloud-platform";
const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";

/// Lifetime requested for the signed assertion
const ASSERTION_LIFETIME_SECS: i64 = 3600;

/// Refresh the access token this long before it actually expires
const TOKEN_EXPIRY_MARGIN_SECS: i64 = 60;

const TOKEN_ENDPOINT: &str = "OAuth token endpoint";
const VERTEX_ENDPOINT: &str = "Vertex AI";

/// Anything that turns a prompt into model text
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Fields of a service account key file needed to mint access tokens
#[derive(Debug, Deserialize)]
struct ServiceAccountKey {
    client_email: String,
    private_key: String,
    #[serde(default)]
    private_key_id: Option<String>,
    #[serde(default)]
    token_uri: Option<String>,
}

impl ServiceAccountKey {
    fn from_file(path: &Path) -> Result<Self, InitError> {
        let content = std::fs::read_to_string(path).map_err(|e| InitError::ServiceAccount {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| InitError::ServiceAccount {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }
}

#[derive(Debug, Serialize)]
struct AssertionClaims<'a> {
    iss: &'a str,
    scope: &'a str,
    aud: &'a str,
    iat: i64,
    exp: i64,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
}

fn default_expires_in() -> i64 {
    ASSERTION_LIFETIME_SECS
}

impl TokenResponse {
    /// Lifetime reported by the token endpoint, bounded by the assertion lifetime
    fn lifetime(&self) -> Duration {
        Duration::seconds(self.expires_in.clamp(0, ASSERTION_LIFETIME_SECS))
    }
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl CachedToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at - Duration::seconds(TOKEN_EXPIRY_MARGIN_SECS) > now
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
struct GenerateContentRequest {
    contents: Vec<Content>,
}

impl GenerateContentRequest {
    fn user_prompt(prompt: &str) -> Self {
        Self {
            contents: vec![Content {
                role: "user".to_string(),
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        }
    }
}

#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
    #[serde(default)]
    finish_reason: Option<String>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn into_text(self) -> Result<String, GenerationError> {
        let Some(candidate) = self.candidates.into_iter().next() else {
            return Err(GenerationError::EmptyResponse {
                finish_reason: "no candidates".to_string(),
            });
        };

        let texts: Vec<String> = candidate
            .content
            .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
            .unwrap_or_default();

        if texts.is_empty() {
            return Err(GenerationError::EmptyResponse {
                finish_reason: candidate
                    .finish_reason
                    .unwrap_or_else(|| "unspecified".to_string()),
            });
        }

        Ok(texts.concat())
    }
}

/// Handle to one Gemini model in one Vertex AI project and region
pub struct VertexClient {
    http: reqwest::Client,
    project_id: String,
    region: String,
    generate_url: String,
    client_email: String,
    key_id: Option<String>,
    token_uri: String,
    signing_key: EncodingKey,
    token: Mutex<Option<CachedToken>>,
}

impl VertexClient {
    /// Build the client from loaded configuration.
    ///
    /// Reads the service account key from the credentials file and parses the
    /// private key. No network call is made until the first `generate`.
    pub fn init(config: &Config) -> Result<Self, InitError> {
        let key = ServiceAccountKey::from_file(&config.credentials_path)?;
        let signing_key = EncodingKey::from_rsa_pem(key.private_key.as_bytes())?;
        let http = reqwest::Client::builder().build()?;

        Ok(Self {
            http,
            project_id: config.project_id.clone(),
            region: config.region.clone(),
            generate_url: generate_content_url(config),
            client_email: key.client_email,
            key_id: key.private_key_id,
            token_uri: key
                .token_uri
                .unwrap_or_else(|| DEFAULT_TOKEN_URI.to_string()),
            signing_key,
            token: Mutex::new(None),
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    pub fn model(&self) -> &str {
        MODEL_NAME
    }

    /// Return a cached access token, minting a new one when close to expiry
    async fn access_token(&self) -> Result<String, GenerationError> {
        let mut cached = self.token.lock().await;

        if let Some(token) = cached.as_ref().filter(|t| t.is_fresh(Utc::now())) {
            return Ok(token.value.clone());
        }

        let fresh = self.fetch_token().await?;
        let value = fresh.value.clone();
        *cached = Some(fresh);
        Ok(value)
    }

    /// Exchange a signed assertion for an OAuth access token
    async fn fetch_token(&self) -> Result<CachedToken, GenerationError> {
        let now = Utc::now();
        let claims = AssertionClaims {
            iss: &self.client_email,
            scope: CLOUD_PLATFORM_SCOPE,
            aud: &self.token_uri,
            iat: now.timestamp(),
            exp: now.timestamp() + ASSERTION_LIFETIME_SECS,
        };

        let mut header = Header::new(Algorithm::RS256);
        header.kid = self.key_id.clone();
        let assertion = jsonwebtoken::encode(&header, &claims, &self.signing_key)?;

        let response = self
            .http
            .post(&self.token_uri)
            .form(&[("grant_type", JWT_BEARER_GRANT), ("assertion", assertion.as_str())])
            .send()
            .await
            .map_err(|source| GenerationError::Transport {
                endpoint: TOKEN_ENDPOINT,
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(GenerationError::Status {
                endpoint: TOKEN_ENDPOINT,
                status,
                body,
            });
        }

        let token: TokenResponse =
            response
                .json()
                .await
                .map_err(|source| GenerationError::Decode {
                    endpoint: TOKEN_ENDPOINT,
                    source,
                })?;

        let lifetime = token.lifetime();
        debug!("Obtained access token valid for {}s", lifetime.num_seconds());

        Ok(CachedToken {
            value: token.access_token,
            expires_at: now + lifetime,
        })
    }
}

#[async_trait]
impl TextGenerator for VertexClient {
    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let token = self.access_token().await?;

        let response = self
            .http
            .post(&self.generate_url)
            .bearer_auth(&token)
            .json(&GenerateContentRequest::user_prompt(prompt))
            .send()
            .await
            .map_err(|source| GenerationError::Transport {
                endpoint: VERTEX_ENDPOINT,
                source,
            })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response
                .text()
                .await
                .unwrap_or_else(|e| format!("<failed to read body: {}>", e));
            return Err(GenerationError::Status {
                endpoint: VERTEX_ENDPOINT,
                status,
                body,
            });
        }

        let parsed: GenerateContentResponse =
            response
                .json()
                .await
                .map_err(|source| GenerationError::Decode {
                    endpoint: VERTEX_ENDPOINT,
                    source,
                })?;

        let text = parsed.into_text()?;
        debug!("{} returned {} bytes", MODEL_NAME, text.len());
        Ok(text)
    }
}

fn generate_content_url(config: &Config) -> String {
    format!(
        "{}/v1/projects/{}/locations/{}/publishers/google/models/{}:generateContent",
        config.api_endpoint.trim_end_matches('/'),
        config.project_id,
        config.region,
        MODEL_NAME
    )
}
