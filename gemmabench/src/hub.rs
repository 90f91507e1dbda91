use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info, instrument, warn};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
const ERROR_CODE_HEADER: &str = "x-error-code";
const MAX_MODEL_ID_LEN: usize = 96;

#[derive(Debug, Clone, PartialEq)]
pub enum ModelLookup {
    Found,
    NotFound,
    /// Network, auth or server trouble; the model may or may not exist.
    Unavailable(String),
}

impl ModelLookup {
    /// Only a confirmed model lets the session continue.
    pub fn exists(&self) -> bool {
        matches!(self, ModelLookup::Found)
    }
}

pub trait ModelRegistry {
    fn lookup(&self, model_id: &str) -> ModelLookup;
}

/// Accepts `name` or `namespace/name`, each segment made of ASCII
/// alphanumerics and `-`, `_`, `.`. Segments may not start or end with `-` or
/// `.`, and `--` or `..` may not appear anywhere.
pub fn is_valid_model_id(model_id: &str) -> bool {
    if model_id.is_empty() || model_id.len() > MAX_MODEL_ID_LEN {
        return false;
    }
    if model_id.contains("--") || model_id.contains("..") {
        return false;
    }

    let segments: Vec<&str> = model_id.split('/').collect();
    if segments.len() > 2 {
        return false;
    }
    segments.iter().all(|segment| {
        !segment.is_empty()
            && !segment.starts_with(['-', '.'])
            && !segment.ends_with(['-', '.'])
            && segment
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
    })
}

/// Read-only client for the Hugging Face Hub model API.
pub struct HubRegistry {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HubRegistry {
    pub fn new(endpoint: impl Into<String>, token: Option<String>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("gemmabench/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            token,
        })
    }

    pub fn model_url(&self, model_id: &str) -> String {
        format!("{}/api/models/{}", self.endpoint.trim_end_matches('/'), model_id)
    }
}

impl ModelRegistry for HubRegistry {
    #[instrument(skip(self))]
    fn lookup(&self, model_id: &str) -> ModelLookup {
        if !is_valid_model_id(model_id) {
            warn!("'{}' is not a valid Hugging Face model id", model_id);
            return ModelLookup::NotFound;
        }
        info!("Verifying model '{}' on Hugging Face Hub", model_id);

        let mut request = self.client.get(self.model_url(model_id));
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let lookup = match request.send() {
            Ok(response) => {
                let error_code = response
                    .headers()
                    .get(ERROR_CODE_HEADER)
                    .and_then(|v| v.to_str().ok())
                    .map(str::to_string);
                classify(response.status(), error_code.as_deref())
            }
            Err(e) => ModelLookup::Unavailable(format!("request failed: {}", e)),
        };

        match &lookup {
            ModelLookup::Found => info!("Model '{}' found", model_id),
            ModelLookup::NotFound => warn!("Model '{}' not found on Hugging Face Hub", model_id),
            ModelLookup::Unavailable(reason) => error!("Could not check model '{}': {}", model_id, reason),
        }
        lookup
    }
}

/// The hub answers 401 for repositories the caller cannot see, so a 401 counts
/// as not found unless the repo is gated.
pub fn classify(status: StatusCode, error_code: Option<&str>) -> ModelLookup {
    if status.is_success() {
        return ModelLookup::Found;
    }
    match (status, error_code) {
        (_, Some("GatedRepo")) => {
            ModelLookup::Unavailable("model is gated; accept its license on the hub first".to_string())
        }
        (_, Some("RepoNotFound")) | (StatusCode::NOT_FOUND, _) | (StatusCode::UNAUTHORIZED, _) => {
            ModelLookup::NotFound
        }
        (status, _) => ModelLookup::Unavailable(format!("hub returned {}", status)),
    }
}

/// `$HF_HOME/token`, falling back to `~/.cache/huggingface/token`.
pub fn token_path() -> Option<PathBuf> {
    if let Some(home) = std::env::var_os("HF_HOME") {
        return Some(PathBuf::from(home).join("token"));
    }
    std::env::var_os("HOME")
        .or_else(|| std::env::var_os("USERPROFILE"))
        .map(|home| PathBuf::from(home).join(".cache").join("huggingface").join("token"))
}

/// Persist the access token where Hugging Face CLI tools look for it.
pub fn save_token(token: &str, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).with_context(|| format!("Failed to create {:?}", parent))?;
    }
    std::fs::write(path, token).with_context(|| format!("Failed to write token to {:?}", path))?;
    info!("HF token saved to {:?}", path);
    Ok(())
}
