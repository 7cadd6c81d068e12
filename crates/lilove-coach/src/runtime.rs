use lilove_core::config::CoachConfig;
use tracing::info;

use crate::anthropic::AnthropicCoach;
use crate::canned::CannedCoach;
use crate::provider::{CoachContext, CoachProvider, CoachReply, CoachRequest, ProviderError};

const MAX_REPLY_TOKENS: u32 = 512;

/// Owns the configured provider and the request shaping around it.
pub struct CoachRuntime {
    provider: Box<dyn CoachProvider>,
    model: String,
    max_prompt_len: usize,
}

impl CoachRuntime {
    /// Build from config: HTTP provider when an API key is present, canned
    /// fallback otherwise.
    pub fn from_config(config: &CoachConfig, max_prompt_len: usize) -> Self {
        let provider: Box<dyn CoachProvider> = match &config.api_key {
            Some(key) => Box::new(AnthropicCoach::new(key.clone(), config.base_url.clone())),
            None => Box::new(CannedCoach::new()),
        };
        info!(provider = provider.name(), model = %config.model, "coach runtime ready");
        Self {
            provider,
            model: config.model.clone(),
            max_prompt_len,
        }
    }

    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Ask the coach, clamping oversized prompts instead of rejecting them.
    pub async fn ask(
        &self,
        prompt: &str,
        context: CoachContext,
    ) -> Result<CoachReply, ProviderError> {
        let mut prompt = prompt.to_string();
        if prompt.len() > self.max_prompt_len {
            prompt.truncate(floor_char_boundary(&prompt, self.max_prompt_len));
        }
        let req = CoachRequest {
            prompt,
            context,
            model: self.model.clone(),
            max_tokens: MAX_REPLY_TOKENS,
        };
        self.provider.ask(&req).await
    }
}

/// Largest index <= `at` that falls on a char boundary.
fn floor_char_boundary(s: &str, at: usize) -> usize {
    let mut i = at.min(s.len());
    while i > 0 && !s.is_char_boundary(i) {
        i -= 1;
    }
    i
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn falls_back_to_canned_without_api_key() {
        let runtime = CoachRuntime::from_config(&CoachConfig::default(), 100);
        assert_eq!(runtime.provider_name(), "canned");

        let reply = runtime.ask("keep me honest", CoachContext::default()).await.unwrap();
        assert!(!reply.text.is_empty());
    }

    #[tokio::test]
    async fn clamps_oversized_prompts_on_char_boundary() {
        let runtime = CoachRuntime::from_config(&CoachConfig::default(), 5);
        // 4-byte char straddling the cut must not split
        let reply = runtime.ask("ab🦀cdef", CoachContext::default()).await;
        assert!(reply.is_ok());
    }
}
