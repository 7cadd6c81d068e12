use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

// Protocol constants — must match what the web and mobile clients expect
pub const PROTOCOL_VERSION: u32 = 2;
pub const DEFAULT_PORT: u16 = 18420;
pub const DEFAULT_BIND: &str = "127.0.0.1";
pub const MAX_PAYLOAD_BYTES: usize = 64 * 1024; // 64 KB hard cap per frame
pub const HANDSHAKE_TIMEOUT_MS: u64 = 10_000; // close if client doesn't auth in 10s
pub const HEARTBEAT_INTERVAL_SECS: u64 = 25; // tick event cadence
pub const REPLAY_BUFFER_LEN: usize = 256; // buffered events kept per room for resume
pub const OUT_QUEUE_CAPACITY: usize = 64; // per-connection outbound queue

/// Top-level config (lilove.toml + LILOVE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiloveConfig {
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub coach: CoachConfig,
    #[serde(default)]
    pub limits: LimitsConfig,
}

impl Default for LiloveConfig {
    fn default() -> Self {
        Self {
            gateway: GatewayConfig::default(),
            database: DatabaseConfig::default(),
            coach: CoachConfig::default(),
            limits: LimitsConfig::default(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Secret used to sign stateless resume tokens. Connections cannot resume
    /// across a secret rotation — they fall back to a fresh handshake.
    pub resume_secret: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            resume_secret: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

/// AI coach subsystem configuration.
///
/// With no `api_key` the gateway falls back to the canned offline provider so
/// `coach.ask` keeps working in development setups.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CoachConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    #[serde(default = "default_coach_model")]
    pub model: String,
}

/// Per-view and per-request caps enforced by the gateway handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Max items returned by feed.list / leaderboard.get / notifications.list.
    #[serde(default = "default_view_limit")]
    pub view_limit: usize,
    /// Max chat message length in characters.
    #[serde(default = "default_chat_len")]
    pub max_chat_len: usize,
    /// Max coach prompt length in characters.
    #[serde(default = "default_prompt_len")]
    pub max_prompt_len: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            view_limit: default_view_limit(),
            max_chat_len: default_chat_len(),
            max_prompt_len: default_prompt_len(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_coach_model() -> String {
    "claude-haiku-4-5".to_string()
}
fn default_view_limit() -> usize {
    50
}
fn default_chat_len() -> usize {
    2_000
}
fn default_prompt_len() -> usize {
    4_000
}
fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.lilove/lilove.db", home)
}

impl LiloveConfig {
    /// Load config from a TOML file with LILOVE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.lilove/lilove.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: LiloveConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("LILOVE_").split("_"))
            .extract()
            .map_err(|e| crate::error::LiloveError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.lilove/lilove.toml", home)
}
