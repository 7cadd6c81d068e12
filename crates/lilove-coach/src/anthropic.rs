use async_trait::async_trait;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::provider::{CoachProvider, CoachReply, CoachRequest, ProviderError};

const API_VERSION: &str = "2023-06-01";
const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

pub struct AnthropicCoach {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl AnthropicCoach {
    pub fn new(api_key: String, base_url: Option<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
        }
    }

    fn build_body(req: &CoachRequest) -> serde_json::Value {
        serde_json::json!({
            "model": req.model,
            "max_tokens": req.max_tokens,
            "system": system_preamble(req),
            "messages": [{ "role": "user", "content": req.prompt }],
        })
    }
}

/// A short system preamble carrying the personalisation context, so the
/// model answers as the user's coach rather than a generic assistant.
fn system_preamble(req: &CoachRequest) -> String {
    let mut parts = vec![format!(
        "You are the LiLove coach for {}. Encourage, stay concrete, keep answers under 120 words.",
        req.context.display_name
    )];
    if req.context.streak_days > 0 {
        parts.push(format!(
            "Current streak: {} consecutive days.",
            req.context.streak_days
        ));
    }
    if !req.context.challenges.is_empty() {
        parts.push(format!(
            "Active challenges: {}.",
            req.context.challenges.join(", ")
        ));
    }
    parts.join(" ")
}

#[async_trait]
impl CoachProvider for AnthropicCoach {
    fn name(&self) -> &str {
        "anthropic"
    }

    async fn ask(&self, req: &CoachRequest) -> Result<CoachReply, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(model = %req.model, "coach request");

        let resp = self
            .client
            .post(&url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .header("content-type", "application/json")
            .json(&Self::build_body(req))
            .send()
            .await?;

        let status = resp.status().as_u16();
        if status == 429 {
            let retry = resp
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5000);
            return Err(ProviderError::RateLimited {
                retry_after_ms: retry,
            });
        }

        if !resp.status().is_success() {
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "coach API error");
            return Err(ProviderError::Api {
                status,
                message: text,
            });
        }

        let api_resp: ApiResponse = resp
            .json()
            .await
            .map_err(|e| ProviderError::Parse(e.to_string()))?;

        let text = api_resp
            .content
            .into_iter()
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("");

        Ok(CoachReply {
            text,
            model: api_resp.model,
        })
    }
}

#[derive(Deserialize)]
struct ApiResponse {
    model: String,
    content: Vec<ContentBlock>,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CoachContext;

    #[test]
    fn preamble_includes_context() {
        let req = CoachRequest {
            prompt: "how do I keep going?".into(),
            context: CoachContext {
                display_name: "ada".into(),
                streak_days: 4,
                challenges: vec!["10k steps".into()],
            },
            model: "m".into(),
            max_tokens: 256,
        };
        let preamble = system_preamble(&req);
        assert!(preamble.contains("ada"));
        assert!(preamble.contains("4 consecutive days"));
        assert!(preamble.contains("10k steps"));
    }

    #[test]
    fn preamble_omits_empty_context() {
        let req = CoachRequest {
            prompt: "hi".into(),
            context: CoachContext {
                display_name: "bo".into(),
                streak_days: 0,
                challenges: vec![],
            },
            model: "m".into(),
            max_tokens: 256,
        };
        let preamble = system_preamble(&req);
        assert!(!preamble.contains("streak"));
        assert!(!preamble.contains("challenges"));
    }
}
