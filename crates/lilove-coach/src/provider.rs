use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Personalisation context the gateway assembles before calling the coach.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoachContext {
    pub display_name: String,
    pub streak_days: u32,
    /// Names of the user's active challenges.
    pub challenges: Vec<String>,
}

/// A single coach question.
#[derive(Debug, Clone)]
pub struct CoachRequest {
    pub prompt: String,
    pub context: CoachContext,
    pub model: String,
    pub max_tokens: u32,
}

/// The coach's answer.
#[derive(Debug, Clone, Serialize)]
pub struct CoachReply {
    pub text: String,
    pub model: String,
}

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Response parse error: {0}")]
    Parse(String),

    #[error("Rate limited, retry after {retry_after_ms}ms")]
    RateLimited { retry_after_ms: u64 },
}

/// A coach backend. One HTTP provider in production, the canned provider in
/// development and tests.
#[async_trait]
pub trait CoachProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn ask(&self, req: &CoachRequest) -> Result<CoachReply, ProviderError>;
}
