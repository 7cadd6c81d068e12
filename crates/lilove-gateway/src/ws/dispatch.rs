use std::sync::Arc;

use lilove_core::LiloveError;
use lilove_protocol::{frames::ResFrame, methods};

use crate::app::AppState;
use crate::ws::connection::Session;
use crate::ws::handlers;

/// Route a WS method call to the correct handler.
///
/// `connect` never reaches this function — `message.rs` consumes it during
/// the handshake. Everything here runs with an authenticated session.
pub async fn route(
    method: &str,
    params: Option<&serde_json::Value>,
    req_id: &str,
    session: &Session,
    app: &Arc<AppState>,
) -> ResFrame {
    match method {
        // ------------------------------------------------------------------
        // Utility
        // ------------------------------------------------------------------
        methods::PING => ResFrame::ok(req_id, serde_json::json!({ "pong": true })),

        // ------------------------------------------------------------------
        // Rooms
        // ------------------------------------------------------------------
        methods::ROOMS_JOIN => handlers::handle_rooms_join(params, req_id, session, app).await,
        methods::ROOMS_LEAVE => handlers::handle_rooms_leave(params, req_id, session, app).await,
        methods::ROOMS_LIST => handlers::handle_rooms_list(req_id, session, app).await,

        // ------------------------------------------------------------------
        // Chat
        // ------------------------------------------------------------------
        methods::CHAT_SEND => handlers::handle_chat_send(params, req_id, session, app).await,

        // ------------------------------------------------------------------
        // Teams
        // ------------------------------------------------------------------
        methods::TEAMS_CREATE => handlers::handle_teams_create(params, req_id, session, app).await,
        methods::TEAMS_JOIN => handlers::handle_teams_join(params, req_id, session, app).await,
        methods::TEAMS_LEAVE => handlers::handle_teams_leave(params, req_id, session, app).await,
        methods::TEAMS_LIST => handlers::handle_teams_list(req_id, session, app).await,

        // ------------------------------------------------------------------
        // Challenges
        // ------------------------------------------------------------------
        methods::CHALLENGES_CREATE => {
            handlers::handle_challenges_create(params, req_id, session, app).await
        }
        methods::CHALLENGES_JOIN => {
            handlers::handle_challenges_join(params, req_id, session, app).await
        }
        methods::CHALLENGES_LIST => {
            handlers::handle_challenges_list(params, req_id, session, app).await
        }

        // ------------------------------------------------------------------
        // Goals / progress
        // ------------------------------------------------------------------
        methods::GOALS_COMPLETE => {
            handlers::handle_goals_complete(params, req_id, session, app).await
        }

        // ------------------------------------------------------------------
        // Views
        // ------------------------------------------------------------------
        methods::FEED_LIST => handlers::handle_feed_list(params, req_id, session, app).await,
        methods::LEADERBOARD_GET => {
            handlers::handle_leaderboard_get(params, req_id, session, app).await
        }
        methods::NOTIFICATIONS_LIST => {
            handlers::handle_notifications_list(params, req_id, session, app).await
        }

        // ------------------------------------------------------------------
        // Coach
        // ------------------------------------------------------------------
        methods::COACH_ASK => handlers::handle_coach_ask(params, req_id, session, app).await,

        other => {
            let e = LiloveError::MethodNotFound { method: other.to_string() };
            ResFrame::err(req_id, e.code(), &e.to_string())
        }
    }
}
