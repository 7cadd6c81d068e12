use lilove_core::types::{ChallengeId, TeamId, UserId};
use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use thiserror::Error;

/// A named broadcast scope. Events published to a room reach exactly the
/// connections that have joined it.
///
/// Wire form is the canonical string: `user:{id}`, `team:{id}`,
/// `challenge:{id}`. The user room carries personal notifications; team and
/// challenge rooms carry chat, feed and leaderboard traffic.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RoomId {
    User(UserId),
    Team(TeamId),
    Challenge(ChallengeId),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RoomIdError {
    #[error("invalid room id: {0}")]
    Invalid(String),
}

impl RoomId {
    /// Return the canonical wire-format string.
    pub fn format(&self) -> String {
        match self {
            RoomId::User(id) => format!("user:{}", id),
            RoomId::Team(id) => format!("team:{}", id),
            RoomId::Challenge(id) => format!("challenge:{}", id),
        }
    }

    /// Parse a wire-format room string back into a `RoomId`.
    ///
    /// Expects exactly `<kind>:<id>` with a non-empty id; ids may themselves
    /// contain colons (only the first one is a separator).
    pub fn parse(s: &str) -> Result<Self, RoomIdError> {
        let (kind, id) = s
            .split_once(':')
            .ok_or_else(|| RoomIdError::Invalid(format!("missing ':' separator: {s}")))?;
        if id.is_empty() {
            return Err(RoomIdError::Invalid(format!("empty id: {s}")));
        }
        match kind {
            "user" => Ok(RoomId::User(UserId::from(id))),
            "team" => Ok(RoomId::Team(TeamId::from(id))),
            "challenge" => Ok(RoomId::Challenge(ChallengeId::from(id))),
            other => Err(RoomIdError::Invalid(format!("unknown room kind: {other}"))),
        }
    }
}

// Display/serde both defer to the canonical wire string so logs, frames and
// map keys never disagree.
impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format())
    }
}

impl Serialize for RoomId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.format())
    }
}

impl<'de> Deserialize<'de> for RoomId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        RoomId::parse(&s).map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_all_kinds() {
        for s in ["user:u-1", "team:t-9", "challenge:c-42"] {
            let room = RoomId::parse(s).unwrap();
            assert_eq!(room.format(), s);
        }
    }

    #[test]
    fn rejects_malformed_strings() {
        assert!(RoomId::parse("user").is_err());
        assert!(RoomId::parse("user:").is_err());
        assert!(RoomId::parse("guild:abc").is_err());
    }

    #[test]
    fn id_may_contain_colons() {
        let room = RoomId::parse("team:org:42").unwrap();
        assert_eq!(room, RoomId::Team("org:42".into()));
    }
}
