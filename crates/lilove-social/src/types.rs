use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub owner_id: String,
    pub created_at: String,
}

/// Lifecycle phase of a challenge, derived from its start/end timestamps.
///
/// The phase is also *stored* so the engine can flip it exactly once per
/// edge — restarts do not re-fire `challenge.started` for an already-active
/// challenge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengePhase {
    Upcoming,
    Active,
    Ended,
}

impl std::fmt::Display for ChallengePhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ChallengePhase::Upcoming => "upcoming",
            ChallengePhase::Active => "active",
            ChallengePhase::Ended => "ended",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for ChallengePhase {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "upcoming" => Ok(ChallengePhase::Upcoming),
            "active" => Ok(ChallengePhase::Active),
            "ended" => Ok(ChallengePhase::Ended),
            other => Err(format!("unknown challenge phase: {other}")),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Challenge {
    pub id: String,
    /// Team-scoped challenges broadcast into the team room as well; open
    /// challenges have no team.
    pub team_id: Option<String>,
    pub name: String,
    /// Free-text description of what counts as progress.
    pub goal: String,
    pub starts_at: String,
    pub ends_at: String,
    pub phase: ChallengePhase,
    pub created_by: String,
    pub created_at: String,
}

/// One row of a challenge leaderboard. `id` is the user id so the client's
/// upsert-by-id cache splice applies directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub id: String,
    pub points: i64,
    pub rank: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedItem {
    pub id: String,
    pub team_id: String,
    /// e.g. "goal_completed", "member_joined", "challenge_ended".
    pub kind: String,
    pub actor_id: String,
    pub body: Value,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    /// e.g. "streak", "challenge_started", "team_invite".
    pub kind: String,
    pub body: Value,
    pub created_at: String,
}
