use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;

use crate::provider::{CoachProvider, CoachReply, CoachRequest, ProviderError};

/// Deterministic offline fallback used when no API key is configured.
///
/// Cycles through a fixed tip list so development setups and tests get
/// stable, non-empty answers without network access.
pub struct CannedCoach {
    cursor: AtomicUsize,
}

const TIPS: &[&str] = &[
    "Pick the smallest next step and do it before anything else today.",
    "A missed day is a data point, not a verdict. Restart the streak now.",
    "Tell one teammate what you will finish today — visibility builds follow-through.",
    "Attach the new habit to one you already have; stack, don't schedule.",
    "Review your week: keep what worked, cut one thing that didn't.",
];

impl CannedCoach {
    pub fn new() -> Self {
        Self {
            cursor: AtomicUsize::new(0),
        }
    }
}

impl Default for CannedCoach {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoachProvider for CannedCoach {
    fn name(&self) -> &str {
        "canned"
    }

    async fn ask(&self, req: &CoachRequest) -> Result<CoachReply, ProviderError> {
        let i = self.cursor.fetch_add(1, Ordering::Relaxed) % TIPS.len();
        let text = if req.context.streak_days > 1 {
            format!(
                "{} (You're on a {}-day streak — keep it alive.)",
                TIPS[i], req.context.streak_days
            )
        } else {
            TIPS[i].to_string()
        };
        Ok(CoachReply {
            text,
            model: "canned".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::CoachContext;

    fn req(streak: u32) -> CoachRequest {
        CoachRequest {
            prompt: "help".into(),
            context: CoachContext {
                display_name: "t".into(),
                streak_days: streak,
                challenges: vec![],
            },
            model: "ignored".into(),
            max_tokens: 64,
        }
    }

    #[tokio::test]
    async fn cycles_through_tips() {
        let coach = CannedCoach::new();
        let first = coach.ask(&req(0)).await.unwrap();
        let second = coach.ask(&req(0)).await.unwrap();
        assert_ne!(first.text, second.text);
        assert_eq!(first.model, "canned");
    }

    #[tokio::test]
    async fn mentions_streak_when_present() {
        let coach = CannedCoach::new();
        let reply = coach.ask(&req(6)).await.unwrap();
        assert!(reply.text.contains("6-day streak"));
    }
}
