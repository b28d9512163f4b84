use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_MODEL: &str = "models/gemini-2.5-flash";
pub const DEFAULT_GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_CONFIG_PATH: &str = "bettrbot.toml";
pub const DEFAULT_STATIC_DIR: &str = "static";

/// Turns kept per user after every update.
pub const HISTORY_LIMIT: usize = 10;
/// Turns prepared as provider context (last 2 exchanges).
pub const CONTEXT_TURNS: usize = 4;

/// Environment variable holding the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Top-level config (bettrbot.toml + BETTRBOT_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BettrConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub providers: ProvidersConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Directory served under `/static`.
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            static_dir: DEFAULT_STATIC_DIR.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_context_turns")]
    pub context_turns: usize,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            history_limit: HISTORY_LIMIT,
            context_turns: CONTEXT_TURNS,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub gemini: GeminiConfig,
}

/// Google Gemini provider, authenticated with a plain API key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeminiConfig {
    /// Falls back to the `GEMINI_API_KEY` env var when not set.
    pub api_key: Option<String>,
    #[serde(default = "default_gemini_base_url")]
    pub base_url: String,
    /// Whole-request timeout. `None` leaves timing to the provider.
    pub timeout_secs: Option<u64>,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_gemini_base_url(),
            timeout_secs: None,
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_static_dir() -> String {
    DEFAULT_STATIC_DIR.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_history_limit() -> usize {
    HISTORY_LIMIT
}
fn default_context_turns() -> usize {
    CONTEXT_TURNS
}
fn default_gemini_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

impl BettrConfig {
    /// Load config from a TOML file with BETTRBOT_* env var overrides.
    ///
    /// A missing file is not an error: every section has defaults.
    /// Nested keys use a double underscore, e.g. `BETTRBOT_AGENT__MODEL`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_PATH);
        tracing::debug!(path, "loading config");

        let config: BettrConfig = Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("BETTRBOT_").split("__"))
            .extract()
            .map_err(|e| crate::error::BettrError::Config(e.to_string()))?;

        Ok(config)
    }

    /// Resolve the Gemini API key: config value first, then `GEMINI_API_KEY`.
    ///
    /// Blank values count as absent.
    pub fn gemini_api_key(&self) -> crate::error::Result<String> {
        self.providers
            .gemini
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var(API_KEY_ENV).ok().filter(|k| !k.trim().is_empty()))
            .ok_or_else(|| {
                crate::error::BettrError::MissingCredential(format!(
                    "{API_KEY_ENV} not found in environment variables"
                ))
            })
    }
}
