//! Concrete WS method handler functions.
//!
//! Each function extracts its parameters, calls the appropriate `AppState`
//! subsystem, and returns a `ResFrame`. `dispatch::route` is the only
//! caller — keep this module free of I/O side-effects beyond the subsystem
//! calls and room publishes (no direct DB access, no raw sockets).

use chrono::{DateTime, Utc};
use lilove_coach::{CoachContext, ProviderError};
use lilove_core::LiloveError;
use lilove_protocol::frames::ResFrame;
use lilove_protocol::rooms::RoomId;
use lilove_social::{ChallengePhase, LeaderboardEntry, SocialError};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;
use crate::events;
use crate::ws::connection::Session;

fn param_str<'a>(params: Option<&'a serde_json::Value>, field: &str) -> Option<&'a str> {
    params.and_then(|p| p.get(field)).and_then(|v| v.as_str())
}

fn param_u64(params: Option<&serde_json::Value>, field: &str) -> Option<u64> {
    params.and_then(|p| p.get(field)).and_then(|v| v.as_u64())
}

/// Wire codes come from [`LiloveError::code`], the single mapping — handlers
/// never spell code strings out by hand.
fn fail(req_id: &str, e: LiloveError) -> ResFrame {
    ResFrame::err(req_id, e.code(), &e.to_string())
}

fn missing(req_id: &str, field: &str) -> ResFrame {
    fail(
        req_id,
        LiloveError::InvalidParams(format!("missing '{field}' field")),
    )
}

fn social_err(req_id: &str, method: &str, e: SocialError) -> ResFrame {
    let mapped = match e {
        SocialError::NotFound { what } => LiloveError::NotFound { what },
        SocialError::NotActive { .. } => LiloveError::InvalidParams(e.to_string()),
        SocialError::Database(_) => {
            warn!(method, error = %e, "store call failed");
            LiloveError::Database(e.to_string())
        }
    };
    fail(req_id, mapped)
}

/// Clamp a client-supplied limit to the configured view cap.
fn view_limit(params: Option<&serde_json::Value>, app: &AppState) -> usize {
    param_u64(params, "limit")
        .map(|n| (n as usize).min(app.config.limits.view_limit))
        .unwrap_or(app.config.limits.view_limit)
}

// ---------------------------------------------------------------------------
// rooms.join / rooms.leave / rooms.list
// ---------------------------------------------------------------------------

/// Handler for `rooms.join`.
///
/// Params: `{ "room": "team:abc" }`
///
/// Membership is checked against storage, not against who asks: a user room
/// must be the caller's own, team and challenge rooms require a stored
/// membership row. Joining an already-joined room is a no-op.
pub async fn handle_rooms_join(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(room_str) = param_str(params, "room") else {
        return missing(req_id, "room");
    };
    let room = match RoomId::parse(room_str) {
        Ok(r) => r,
        Err(e) => return fail(req_id, LiloveError::InvalidParams(e.to_string())),
    };

    let allowed = match &room {
        RoomId::User(id) => id.as_str() == session.user_id,
        RoomId::Team(id) => match app.social.is_team_member(id.as_str(), &session.user_id) {
            Ok(member) => member,
            Err(e) => return social_err(req_id, "rooms.join", e),
        },
        RoomId::Challenge(id) => match app.social.challenge_ids_of(&session.user_id) {
            Ok(ids) => ids.iter().any(|c| c == id.as_str()),
            Err(e) => return social_err(req_id, "rooms.join", e),
        },
    };
    if !allowed {
        return fail(req_id, LiloveError::NotAMember { room: room_str.to_string() });
    }

    app.rooms.join(room, &session.conn_id);
    ResFrame::ok(req_id, json!({ "room": room_str, "joined": true }))
}

/// Handler for `rooms.leave`.
///
/// Params: `{ "room": "team:abc" }`
///
/// Leaves the broadcast scope only — stored team/challenge membership is
/// untouched. Leaving a room the connection is not in is a no-op.
pub async fn handle_rooms_leave(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(room_str) = param_str(params, "room") else {
        return missing(req_id, "room");
    };
    let room = match RoomId::parse(room_str) {
        Ok(r) => r,
        Err(e) => return fail(req_id, LiloveError::InvalidParams(e.to_string())),
    };
    app.rooms.leave(&room, &session.conn_id);
    ResFrame::ok(req_id, json!({ "room": room_str, "joined": false }))
}

/// Handler for `rooms.list` — rooms this connection currently receives.
pub async fn handle_rooms_list(req_id: &str, session: &Session, app: &AppState) -> ResFrame {
    let rooms = app.rooms.rooms_of(&session.conn_id);
    ResFrame::ok(req_id, json!({ "rooms": rooms }))
}

// ---------------------------------------------------------------------------
// chat.send
// ---------------------------------------------------------------------------

/// Handler for `chat.send`.
///
/// Params: `{ "room": "team:abc", "text": "gg everyone" }`
///
/// The connection must have joined the room. The message fans out as a
/// `chat.message` event with a prepend patch for the room's chat view; the
/// response carries the stamped seq so the sender can reconcile its
/// optimistic insert.
pub async fn handle_chat_send(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(room_str) = param_str(params, "room") else {
        return missing(req_id, "room");
    };
    let Some(text) = param_str(params, "text") else {
        return missing(req_id, "text");
    };
    if text.is_empty() {
        return fail(req_id, LiloveError::InvalidParams("empty message".into()));
    }
    if text.chars().count() > app.config.limits.max_chat_len {
        return fail(
            req_id,
            LiloveError::InvalidParams(format!(
                "message exceeds {} characters",
                app.config.limits.max_chat_len
            )),
        );
    }

    let room = match RoomId::parse(room_str) {
        Ok(r @ (RoomId::Team(_) | RoomId::Challenge(_))) => r,
        Ok(RoomId::User(_)) => {
            return fail(req_id, LiloveError::InvalidParams("user rooms carry no chat".into()))
        }
        Err(e) => return fail(req_id, LiloveError::InvalidParams(e.to_string())),
    };
    if !app.rooms.is_member(&room, &session.conn_id) {
        return fail(req_id, LiloveError::NotAMember { room: room_str.to_string() });
    }

    let message = json!({
        "id": Uuid::now_v7().to_string(),
        "room": room_str,
        "user_id": session.user_id,
        "text": text,
        "sent_at": Utc::now().to_rfc3339(),
    });
    match app.rooms.publish(&room, events::chat_message(room_str, message.clone())) {
        Ok(seq) => ResFrame::ok(req_id, json!({ "id": message["id"], "seq": seq })),
        Err(e) => {
            warn!(error = %e, "chat.send publish failed");
            fail(req_id, e)
        }
    }
}

// ---------------------------------------------------------------------------
// teams.*
// ---------------------------------------------------------------------------

/// Handler for `teams.create`.
///
/// Params: `{ "name": "Morning Crew" }`
///
/// Requires the `create_teams` entitlement. The creator becomes the first
/// member and this connection joins the new team room immediately.
pub async fn handle_teams_create(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    if !session.entitlements.create_teams {
        return fail(req_id, LiloveError::EntitlementRequired { entitlement: "create_teams".into() });
    }
    let Some(name) = param_str(params, "name") else {
        return missing(req_id, "name");
    };

    match app.social.create_team(name, &session.user_id) {
        Ok(team) => {
            app.rooms
                .join(RoomId::Team(team.id.clone().into()), &session.conn_id);
            ResFrame::ok(req_id, json!({ "team": team }))
        }
        Err(e) => social_err(req_id, "teams.create", e),
    }
}

/// Handler for `teams.join`.
///
/// Params: `{ "team_id": "..." }`
///
/// Adds a stored membership row, joins this connection to the team room, and
/// announces the new member to the room plus the team feed.
pub async fn handle_teams_join(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(team_id) = param_str(params, "team_id") else {
        return missing(req_id, "team_id");
    };

    let team = match app.social.join_team(team_id, &session.user_id) {
        Ok(t) => t,
        Err(e) => return social_err(req_id, "teams.join", e),
    };
    let room = RoomId::Team(team.id.clone().into());
    app.rooms.join(room.clone(), &session.conn_id);

    let display_name = app
        .users
        .get_user(&session.user_id)
        .ok()
        .flatten()
        .map(|u| u.display_name)
        .unwrap_or_default();
    let _ = app.rooms.publish(
        &room,
        events::team_member_joined(team_id, &session.user_id, &display_name),
    );
    match app.social.add_feed_item(
        team_id,
        "member_joined",
        &session.user_id,
        json!({ "display_name": display_name }),
    ) {
        Ok(item) => {
            let _ = app.rooms.publish(&room, events::feed_item(&item));
        }
        Err(e) => warn!(team_id, error = %e, "feed write failed"),
    }

    ResFrame::ok(req_id, json!({ "team": team }))
}

/// Handler for `teams.leave`.
///
/// Params: `{ "team_id": "..." }`
pub async fn handle_teams_leave(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(team_id) = param_str(params, "team_id") else {
        return missing(req_id, "team_id");
    };

    if let Err(e) = app.social.leave_team(team_id, &session.user_id) {
        return social_err(req_id, "teams.leave", e);
    }
    let room = RoomId::Team(team_id.into());
    // Announce before dropping out of the broadcast scope.
    let _ = app
        .rooms
        .publish(&room, events::team_member_left(team_id, &session.user_id));
    app.rooms.leave(&room, &session.conn_id);
    ResFrame::ok(req_id, json!({ "team_id": team_id, "left": true }))
}

/// Handler for `teams.list` — teams the caller belongs to.
pub async fn handle_teams_list(req_id: &str, session: &Session, app: &AppState) -> ResFrame {
    match app.social.teams_of(&session.user_id) {
        Ok(teams) => ResFrame::ok(req_id, json!({ "teams": teams })),
        Err(e) => social_err(req_id, "teams.list", e),
    }
}

// ---------------------------------------------------------------------------
// challenges.*
// ---------------------------------------------------------------------------

/// Handler for `challenges.create`.
///
/// Params: `{ "name": "10k steps", "goal": "...", "team_id"?: "...",
///            "starts_at": "2026-09-01T00:00:00Z", "ends_at": "..." }`
///
/// Requires the `create_challenges` entitlement. A team-scoped challenge
/// requires team membership. The creator joins the challenge room.
pub async fn handle_challenges_create(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    if !session.entitlements.create_challenges {
        return fail(
            req_id,
            LiloveError::EntitlementRequired { entitlement: "create_challenges".into() },
        );
    }
    let Some(name) = param_str(params, "name") else {
        return missing(req_id, "name");
    };
    let Some(goal) = param_str(params, "goal") else {
        return missing(req_id, "goal");
    };
    let starts_at = match parse_ts(params, "starts_at", req_id) {
        Ok(ts) => ts,
        Err(res) => return res,
    };
    let ends_at = match parse_ts(params, "ends_at", req_id) {
        Ok(ts) => ts,
        Err(res) => return res,
    };
    if ends_at <= starts_at {
        return fail(
            req_id,
            LiloveError::InvalidParams("ends_at must be after starts_at".into()),
        );
    }

    let team_id = param_str(params, "team_id");
    if let Some(tid) = team_id {
        match app.social.is_team_member(tid, &session.user_id) {
            Ok(true) => {}
            Ok(false) => {
                return fail(req_id, LiloveError::NotAMember { room: format!("team:{tid}") })
            }
            Err(e) => return social_err(req_id, "challenges.create", e),
        }
    }

    match app
        .social
        .create_challenge(name, goal, team_id, starts_at, ends_at, &session.user_id)
    {
        Ok(challenge) => {
            app.rooms.join(
                RoomId::Challenge(challenge.id.clone().into()),
                &session.conn_id,
            );
            ResFrame::ok(req_id, json!({ "challenge": challenge }))
        }
        Err(e) => social_err(req_id, "challenges.create", e),
    }
}

/// Handler for `challenges.join`.
///
/// Params: `{ "challenge_id": "..." }`
pub async fn handle_challenges_join(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(challenge_id) = param_str(params, "challenge_id") else {
        return missing(req_id, "challenge_id");
    };

    let challenge = match app.social.join_challenge(challenge_id, &session.user_id) {
        Ok(c) => c,
        Err(e) => return social_err(req_id, "challenges.join", e),
    };
    let room = RoomId::Challenge(challenge.id.clone().into());
    app.rooms.join(room.clone(), &session.conn_id);
    let _ = app.rooms.publish(
        &room,
        events::challenge_member_joined(challenge_id, &session.user_id),
    );
    ResFrame::ok(req_id, json!({ "challenge": challenge }))
}

/// Handler for `challenges.list`.
///
/// Params: `{ "limit"?: number }`
///
/// Returns open challenges plus those scoped to the caller's teams.
pub async fn handle_challenges_list(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let limit = view_limit(params, app);
    match app.social.challenges_for(&session.user_id, limit) {
        Ok(challenges) => ResFrame::ok(req_id, json!({ "challenges": challenges })),
        Err(e) => social_err(req_id, "challenges.list", e),
    }
}

// ---------------------------------------------------------------------------
// goals.complete
// ---------------------------------------------------------------------------

/// Handler for `goals.complete`.
///
/// Params: `{ "challenge_id": "...", "points"?: number }`
///
/// The write path behind most of the fan-out: bumps the caller's streak,
/// adds points to the challenge score, then publishes a leaderboard upsert
/// to the challenge room, a feed item to the team room (team-scoped
/// challenges only), and a streak-milestone notification to the caller's
/// own room.
pub async fn handle_goals_complete(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(challenge_id) = param_str(params, "challenge_id") else {
        return missing(req_id, "challenge_id");
    };
    let points = param_u64(params, "points").unwrap_or(1) as i64;
    if points <= 0 {
        return fail(req_id, LiloveError::InvalidParams("points must be positive".into()));
    }

    match app.social.challenge_ids_of(&session.user_id) {
        Ok(ids) if ids.iter().any(|c| c == challenge_id) => {}
        Ok(_) => {
            return fail(
                req_id,
                LiloveError::NotAMember { room: format!("challenge:{challenge_id}") },
            )
        }
        Err(e) => return social_err(req_id, "goals.complete", e),
    }

    let total = match app
        .social
        .record_progress(challenge_id, &session.user_id, points)
    {
        Ok(t) => t,
        Err(e) => return social_err(req_id, "goals.complete", e),
    };

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let streak = match app.users.record_activity(&session.user_id, &today) {
        Ok(s) => s,
        Err(e) => {
            warn!(user_id = %session.user_id, error = %e, "streak update failed");
            0
        }
    };

    // Leaderboard upsert: rank comes from the current standings; a caller
    // below the view cutoff gets the next rank past the visible page.
    let challenge_room = RoomId::Challenge(challenge_id.into());
    match app
        .social
        .leaderboard(challenge_id, app.config.limits.view_limit)
    {
        Ok(entries) => {
            let rank = entries
                .iter()
                .position(|e| e.id == session.user_id)
                .map(|i| i as u32 + 1)
                .unwrap_or(entries.len() as u32 + 1);
            let entry = LeaderboardEntry {
                id: session.user_id.clone(),
                points: total,
                rank,
            };
            let _ = app.rooms.publish(
                &challenge_room,
                events::leaderboard_updated(challenge_id, &entry),
            );
        }
        Err(e) => warn!(challenge_id, error = %e, "leaderboard read failed"),
    }

    // Team feed, when the challenge is team-scoped.
    if let Ok(Some(challenge)) = app.social.get_challenge(challenge_id) {
        if let Some(team_id) = &challenge.team_id {
            match app.social.add_feed_item(
                team_id,
                "goal_completed",
                &session.user_id,
                json!({ "challenge_id": challenge_id, "challenge_name": challenge.name, "points": points }),
            ) {
                Ok(item) => {
                    let _ = app
                        .rooms
                        .publish(&RoomId::Team(team_id.clone().into()), events::feed_item(&item));
                }
                Err(e) => warn!(team_id, error = %e, "feed write failed"),
            }
        }
    }

    // Weekly streak milestones land in the personal notification view.
    if streak > 0 && streak % 7 == 0 {
        match app.social.add_notification(
            &session.user_id,
            "streak_milestone",
            json!({ "streak_days": streak }),
        ) {
            Ok(n) => {
                let _ = app.rooms.publish(
                    &RoomId::User(session.user_id.as_str().into()),
                    events::notification_created(&n),
                );
            }
            Err(e) => warn!(user_id = %session.user_id, error = %e, "notification write failed"),
        }
    }

    ResFrame::ok(
        req_id,
        json!({ "points": total, "streak_days": streak }),
    )
}

// ---------------------------------------------------------------------------
// feed.list / leaderboard.get / notifications.list
// ---------------------------------------------------------------------------

/// Handler for `feed.list`.
///
/// Params: `{ "team_id": "...", "limit"?: number }`
///
/// Newest first. This is the refetch path for the feed view — the page it
/// returns is the new cache baseline.
pub async fn handle_feed_list(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(team_id) = param_str(params, "team_id") else {
        return missing(req_id, "team_id");
    };
    match app.social.is_team_member(team_id, &session.user_id) {
        Ok(true) => {}
        Ok(false) => {
            return fail(req_id, LiloveError::NotAMember { room: format!("team:{team_id}") })
        }
        Err(e) => return social_err(req_id, "feed.list", e),
    }
    let limit = view_limit(params, app);
    match app.social.list_feed(team_id, limit) {
        Ok(items) => ResFrame::ok(req_id, json!({ "items": items })),
        Err(e) => social_err(req_id, "feed.list", e),
    }
}

/// Handler for `leaderboard.get`.
///
/// Params: `{ "challenge_id": "...", "limit"?: number }`
///
/// Open challenges are readable by anyone authenticated; team-scoped
/// leaderboards require team membership.
pub async fn handle_leaderboard_get(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let Some(challenge_id) = param_str(params, "challenge_id") else {
        return missing(req_id, "challenge_id");
    };
    let challenge = match app.social.get_challenge(challenge_id) {
        Ok(Some(c)) => c,
        Ok(None) => {
            return fail(
                req_id,
                LiloveError::NotFound { what: format!("challenge {challenge_id}") },
            )
        }
        Err(e) => return social_err(req_id, "leaderboard.get", e),
    };
    if let Some(team_id) = &challenge.team_id {
        match app.social.is_team_member(team_id, &session.user_id) {
            Ok(true) => {}
            Ok(false) => {
                return fail(req_id, LiloveError::NotAMember { room: format!("team:{team_id}") })
            }
            Err(e) => return social_err(req_id, "leaderboard.get", e),
        }
    }
    let limit = view_limit(params, app);
    match app.social.leaderboard(challenge_id, limit) {
        Ok(entries) => ResFrame::ok(
            req_id,
            json!({ "entries": entries, "phase": challenge.phase }),
        ),
        Err(e) => social_err(req_id, "leaderboard.get", e),
    }
}

/// Handler for `notifications.list` — the caller's own notifications,
/// newest first.
pub async fn handle_notifications_list(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    let limit = view_limit(params, app);
    match app.social.list_notifications(&session.user_id, limit) {
        Ok(items) => ResFrame::ok(req_id, json!({ "items": items })),
        Err(e) => social_err(req_id, "notifications.list", e),
    }
}

// ---------------------------------------------------------------------------
// coach.ask
// ---------------------------------------------------------------------------

/// Handler for `coach.ask`.
///
/// Params: `{ "prompt": "how do I keep my streak through a rest day?" }`
///
/// Requires the `coach` entitlement. The user's streak and active challenge
/// names are folded into the provider preamble.
pub async fn handle_coach_ask(
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &AppState,
) -> ResFrame {
    if !session.entitlements.coach {
        return fail(req_id, LiloveError::EntitlementRequired { entitlement: "coach".into() });
    }
    let Some(prompt) = param_str(params, "prompt") else {
        return missing(req_id, "prompt");
    };

    let user = match app.users.get_user(&session.user_id) {
        Ok(Some(u)) => u,
        Ok(None) => {
            return fail(
                req_id,
                LiloveError::NotFound { what: format!("user {}", session.user_id) },
            )
        }
        Err(e) => {
            warn!(error = %e, "user lookup failed");
            return fail(req_id, LiloveError::Database(e.to_string()));
        }
    };
    let challenges = app
        .social
        .challenges_for(&session.user_id, app.config.limits.view_limit)
        .map(|cs| {
            cs.into_iter()
                .filter(|c| c.phase == ChallengePhase::Active)
                .map(|c| c.name)
                .collect()
        })
        .unwrap_or_default();

    let context = CoachContext {
        display_name: user.display_name,
        streak_days: user.streak_days,
        challenges,
    };
    match app.coach.ask(prompt, context).await {
        Ok(reply) => ResFrame::ok(req_id, json!({ "text": reply.text, "model": reply.model })),
        Err(ProviderError::RateLimited { retry_after_ms }) => fail(
            req_id,
            LiloveError::Coach(format!("rate limited, retry in {retry_after_ms}ms")),
        ),
        Err(e) => {
            warn!(error = %e, "coach.ask failed");
            fail(req_id, LiloveError::Coach(e.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// helpers
// ---------------------------------------------------------------------------

/// RFC 3339 timestamp param, or the error response to send back as-is.
fn parse_ts(
    params: Option<&serde_json::Value>,
    field: &str,
    req_id: &str,
) -> Result<DateTime<Utc>, ResFrame> {
    let Some(raw) = param_str(params, field) else {
        return Err(missing(req_id, field));
    };
    DateTime::parse_from_rfc3339(raw)
        .map(|ts| ts.with_timezone(&Utc))
        .map_err(|_| {
            fail(
                req_id,
                LiloveError::InvalidParams(format!("'{field}' must be RFC 3339")),
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn code_of(res: &ResFrame) -> &str {
        assert!(!res.ok);
        &res.error.as_ref().unwrap().code
    }

    #[test]
    fn fail_uses_the_variant_wire_code() {
        let res = fail("r1", LiloveError::NotAMember { room: "team:t1".into() });
        assert_eq!(code_of(&res), "NOT_A_MEMBER");
        assert!(res.error.as_ref().unwrap().message.contains("team:t1"));

        let res = fail("r2", LiloveError::EntitlementRequired { entitlement: "coach".into() });
        assert_eq!(code_of(&res), "ENTITLEMENT_REQUIRED");

        let res = fail("r3", LiloveError::Coach("rate limited".into()));
        assert_eq!(code_of(&res), "COACH_ERROR");
    }

    #[test]
    fn missing_field_is_invalid_params() {
        let res = missing("r1", "room");
        assert_eq!(code_of(&res), "INVALID_PARAMS");
        assert!(res.error.as_ref().unwrap().message.contains("'room'"));
    }

    #[test]
    fn store_errors_map_to_wire_codes() {
        let res = social_err("r1", "rooms.join", SocialError::NotFound { what: "team t9".into() });
        assert_eq!(code_of(&res), "NOT_FOUND");
        assert!(res.error.as_ref().unwrap().message.contains("team t9"));

        let res = social_err("r2", "goals.complete", SocialError::NotActive { id: "c1".into() });
        assert_eq!(code_of(&res), "INVALID_PARAMS");
    }
}
