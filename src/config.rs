use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Default base URL of the hosted retrieval service.
pub const DEFAULT_RAGIE_API_BASE: &str = "https://api.ragie.ai";
/// Default base URL of the hosted generation service.
pub const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
/// Port used when neither the CLI nor `PORT` picks one.
pub const DEFAULT_SERVER_PORT: u16 = 3001;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the gateway.
///
/// Built once at process start and handed to the components that need it. Credentials are
/// optional here: a missing key only fails the requests that need it.
#[derive(Debug, Clone)]
pub struct Config {
    /// Bearer token for the retrieval service.
    pub ragie_api_key: Option<String>,
    /// Bearer token for the generation service.
    pub openai_api_key: Option<String>,
    /// Base URL of the retrieval service.
    pub ragie_api_base: String,
    /// Base URL of the generation service (including the API version segment).
    pub openai_api_base: String,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Optional per-request timeout applied to both upstream clients.
    pub upstream_timeout_secs: Option<u64>,
    /// Optional directory holding the built browser UI.
    pub frontend_dir: Option<PathBuf>,
    /// Optional log file path; `None` logs to `logs/ragbridge.log`.
    pub log_file: Option<PathBuf>,
}

impl Config {
    /// Load configuration from environment variables, performing validation along the way.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            ragie_api_key: load_env_optional("RAGIE_API_KEY"),
            openai_api_key: load_env_optional("OPENAI_API_KEY"),
            ragie_api_base: load_base_url("RAGIE_API_BASE", DEFAULT_RAGIE_API_BASE)?,
            openai_api_base: load_base_url("OPENAI_API_BASE", DEFAULT_OPENAI_API_BASE)?,
            server_port: load_env_optional("PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("PORT".into()))
                })
                .transpose()?,
            upstream_timeout_secs: load_env_optional("UPSTREAM_TIMEOUT_SECS")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("UPSTREAM_TIMEOUT_SECS".into()))
                })
                .transpose()?,
            frontend_dir: load_env_optional("RAGBRIDGE_FRONTEND_DIR").map(PathBuf::from),
            log_file: load_env_optional("RAGBRIDGE_LOG_FILE").map(PathBuf::from),
        })
    }

    /// Configuration with no credentials and default upstream endpoints.
    pub fn unconfigured() -> Self {
        Self {
            ragie_api_key: None,
            openai_api_key: None,
            ragie_api_base: DEFAULT_RAGIE_API_BASE.to_string(),
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            server_port: None,
            upstream_timeout_secs: None,
            frontend_dir: None,
            log_file: None,
        }
    }

    /// Whether a retrieval credential is present.
    pub fn ragie_configured(&self) -> bool {
        self.ragie_api_key.is_some()
    }

    /// Whether a generation credential is present.
    pub fn openai_configured(&self) -> bool {
        self.openai_api_key.is_some()
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn load_base_url(key: &str, default: &str) -> Result<String, ConfigError> {
    let value = load_env_optional(key).unwrap_or_else(|| default.to_string());
    normalize_base_url(&value).map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

/// Parse a base URL and strip any trailing slash from its path.
pub fn normalize_base_url(url: &str) -> Result<String, String> {
    let mut parsed = reqwest::Url::parse(url).map_err(|err| err.to_string())?;
    if parsed.cannot_be_a_base() {
        return Err(format!("{url} cannot be used as a base URL"));
    }
    let path = parsed.path().trim_end_matches('/').to_string();
    parsed.set_path(&path);
    Ok(parsed.as_str().trim_end_matches('/').to_string())
}

/// Load the `.env` file (if any) and read configuration from the environment.
pub fn load_config() -> Result<Config, ConfigError> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;
    tracing::debug!(
        ragie_api_base = %config.ragie_api_base,
        openai_api_base = %config.openai_api_base,
        ragie_configured = config.ragie_configured(),
        openai_configured = config.openai_configured(),
        server_port = ?config.server_port,
        upstream_timeout_secs = ?config.upstream_timeout_secs,
        "Loaded configuration"
    );
    Ok(config)
}
