use lilove_core::types::{Entitlements, Tier};
use serde::{Deserialize, Serialize};

/// Full user record. Stored in SQLite; loaded only on handshake and when a
/// handler needs the display name or tier.
///
/// The subscription tier is written by the payment collaborator's webhook
/// endpoint (out of scope here) — the gateway only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// UUIDv7 — time-sortable, useful for log correlation.
    pub id: String,
    pub display_name: String,
    pub tier: Tier,

    /// Consecutive days with at least one completed goal. Fed into the coach
    /// preamble; maintained by the goals handler.
    pub streak_days: u32,
    /// ISO-8601 date (YYYY-MM-DD) of the last day that counted toward the
    /// streak. A gap of more than one day resets the streak.
    pub last_active_date: Option<String>,

    pub created_at: String,
    pub updated_at: String,
}

impl User {
    pub fn entitlements(&self) -> Entitlements {
        Entitlements::from(self.tier)
    }
}
