//! Event names and frame builders for room fan-out.
//!
//! Every builder returns an un-stamped `EventFrame` — `RoomRegistry::publish`
//! fills in `room` and `seq`. The attached cache patch is what lets the
//! client splice the payload into its local query cache without refetching
//! the whole view.

use lilove_protocol::frames::EventFrame;
use lilove_protocol::patch::{CachePatch, QueryKey};
use lilove_social::{Challenge, ChallengePhase, FeedItem, LeaderboardEntry, Notification};
use serde_json::json;

pub const CHAT_MESSAGE: &str = "chat.message";
pub const FEED_ITEM: &str = "feed.item";
pub const LEADERBOARD_UPDATED: &str = "leaderboard.updated";
pub const NOTIFICATION_CREATED: &str = "notification.created";
pub const TEAM_MEMBER_JOINED: &str = "team.member_joined";
pub const TEAM_MEMBER_LEFT: &str = "team.member_left";
pub const CHALLENGE_MEMBER_JOINED: &str = "challenge.member_joined";
pub const CHALLENGE_STARTED: &str = "challenge.started";
pub const CHALLENGE_ENDED: &str = "challenge.ended";

/// Chat message for a room. Prepends into the room's chat view.
pub fn chat_message(room: &str, message: serde_json::Value) -> EventFrame {
    EventFrame::new(CHAT_MESSAGE, message.clone())
        .with_patch(CachePatch::prepend(QueryKey::chat_room(room), message))
}

/// New feed item in a team's activity feed.
pub fn feed_item(item: &FeedItem) -> EventFrame {
    EventFrame::new(FEED_ITEM, item)
        .with_patch(CachePatch::prepend(QueryKey::feed_team(&item.team_id), item))
}

/// A single leaderboard row changed. The entry's `id` is the user id, so the
/// client upserts it in place; `rank` values of other rows may be stale until
/// the next refetch, which is acceptable for a live view.
pub fn leaderboard_updated(challenge_id: &str, entry: &LeaderboardEntry) -> EventFrame {
    EventFrame::new(LEADERBOARD_UPDATED, entry).with_patch(CachePatch::upsert(
        QueryKey::leaderboard(challenge_id),
        entry.id.clone(),
        entry,
    ))
}

/// Personal notification, published to the user's own room.
pub fn notification_created(n: &Notification) -> EventFrame {
    EventFrame::new(NOTIFICATION_CREATED, n)
        .with_patch(CachePatch::prepend(QueryKey::notifications(&n.user_id), n))
}

pub fn team_member_joined(team_id: &str, user_id: &str, display_name: &str) -> EventFrame {
    EventFrame::new(
        TEAM_MEMBER_JOINED,
        json!({ "team_id": team_id, "user_id": user_id, "display_name": display_name }),
    )
}

pub fn team_member_left(team_id: &str, user_id: &str) -> EventFrame {
    EventFrame::new(
        TEAM_MEMBER_LEFT,
        json!({ "team_id": team_id, "user_id": user_id }),
    )
}

pub fn challenge_member_joined(challenge_id: &str, user_id: &str) -> EventFrame {
    EventFrame::new(
        CHALLENGE_MEMBER_JOINED,
        json!({ "challenge_id": challenge_id, "user_id": user_id }),
    )
}

/// Phase-edge event from the challenge engine. An ended challenge invalidates
/// its leaderboard view so clients refetch the final, fully-ranked standings.
pub fn challenge_transition(challenge: &Challenge, to: ChallengePhase) -> EventFrame {
    let name = match to {
        ChallengePhase::Active => CHALLENGE_STARTED,
        ChallengePhase::Ended => CHALLENGE_ENDED,
        ChallengePhase::Upcoming => CHALLENGE_STARTED,
    };
    let frame = EventFrame::new(name, challenge);
    if to == ChallengePhase::Ended {
        frame.with_patch(CachePatch::invalidate(QueryKey::leaderboard(&challenge.id)))
    } else {
        frame
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lilove_protocol::patch::PatchOp;

    fn sample_challenge() -> Challenge {
        Challenge {
            id: "c1".to_string(),
            team_id: Some("t1".to_string()),
            name: "10k steps".to_string(),
            goal: "walk 10k steps daily".to_string(),
            starts_at: "2026-09-01T00:00:00Z".to_string(),
            ends_at: "2026-09-08T00:00:00Z".to_string(),
            phase: ChallengePhase::Active,
            created_by: "u1".to_string(),
            created_at: "2026-08-30T00:00:00Z".to_string(),
        }
    }

    #[test]
    fn chat_message_patch_targets_room_chat_view() {
        let frame = chat_message("team:t1", json!({ "id": "m1", "text": "hi" }));
        let patch = frame.patch.expect("chat events carry a patch");
        assert_eq!(patch.query.as_str(), "chat:team:t1");
        assert!(matches!(patch.op, PatchOp::Prepend { .. }));
    }

    #[test]
    fn leaderboard_update_upserts_by_user_id() {
        let entry = LeaderboardEntry {
            id: "u1".to_string(),
            points: 42,
            rank: 3,
        };
        let frame = leaderboard_updated("c1", &entry);
        let patch = frame.patch.expect("leaderboard events carry a patch");
        assert_eq!(patch.query.as_str(), "leaderboard:challenge:c1");
        assert!(matches!(patch.op, PatchOp::Upsert { ref key, .. } if key == "u1"));
    }

    #[test]
    fn ended_transition_invalidates_leaderboard() {
        let frame = challenge_transition(&sample_challenge(), ChallengePhase::Ended);
        assert_eq!(frame.event, CHALLENGE_ENDED);
        let patch = frame.patch.expect("ended transitions carry a patch");
        assert_eq!(patch.op, PatchOp::Invalidate);
    }

    #[test]
    fn started_transition_carries_no_patch() {
        let frame = challenge_transition(&sample_challenge(), ChallengePhase::Active);
        assert_eq!(frame.event, CHALLENGE_STARTED);
        assert!(frame.patch.is_none());
    }
}

