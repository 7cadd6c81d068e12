use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Identifies one client-side cached query (a "view") that an event splices
/// into, e.g. `feed:team:t1`, `leaderboard:challenge:c9`, `notifications:u2`.
///
/// Opaque to the server beyond construction — the client uses it as the cache
/// key it already queries by.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueryKey(pub String);

impl QueryKey {
    pub fn feed_team(team_id: &str) -> Self {
        Self(format!("feed:team:{team_id}"))
    }

    pub fn chat_room(room: &str) -> Self {
        Self(format!("chat:{room}"))
    }

    pub fn leaderboard(challenge_id: &str) -> Self {
        Self(format!("leaderboard:challenge:{challenge_id}"))
    }

    pub fn notifications(user_id: &str) -> Self {
        Self(format!("notifications:{user_id}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for QueryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How to splice an event into a cached view without a refetch.
///
/// `Upsert` and `Remove` are idempotent: redelivering the same patch leaves
/// the view unchanged. `Invalidate` is the always-safe fallback — it forces a
/// refetch instead of describing a splice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PatchOp {
    /// Insert `item` at the head of the list (newest-first views).
    Prepend { item: Value },
    /// Merge `item` into the entry whose `id` field equals `key`, inserting
    /// if absent.
    Upsert { key: String, item: Value },
    /// Delete the entry whose `id` field equals `key`.
    Remove { key: String },
    /// Replace the whole view with `items` (snapshot after a refetch/replay).
    Replace { items: Vec<Value> },
    /// The view can no longer be patched incrementally — refetch it.
    Invalidate,
}

/// A cache-update instruction attached to an [`EventFrame`](crate::EventFrame).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachePatch {
    pub query: QueryKey,
    #[serde(flatten)]
    pub op: PatchOp,
}

impl CachePatch {
    pub fn prepend(query: QueryKey, item: impl Serialize) -> Self {
        Self {
            query,
            op: PatchOp::Prepend {
                item: serde_json::to_value(item).unwrap_or(Value::Null),
            },
        }
    }

    pub fn upsert(query: QueryKey, key: impl Into<String>, item: impl Serialize) -> Self {
        Self {
            query,
            op: PatchOp::Upsert {
                key: key.into(),
                item: serde_json::to_value(item).unwrap_or(Value::Null),
            },
        }
    }

    pub fn remove(query: QueryKey, key: impl Into<String>) -> Self {
        Self {
            query,
            op: PatchOp::Remove { key: key.into() },
        }
    }

    pub fn invalidate(query: QueryKey) -> Self {
        Self {
            query,
            op: PatchOp::Invalidate,
        }
    }
}
