use lilove_core::config::{HEARTBEAT_INTERVAL_SECS, MAX_PAYLOAD_BYTES, PROTOCOL_VERSION};
use lilove_core::types::ConnId;
use lilove_core::LiloveError;
use lilove_protocol::frames::EventFrame;
use lilove_protocol::handshake::{
    AuthPayload, ClientPolicy, ConnectChallenge, ConnectParams, HelloOk, ReplayOutcome, ServerInfo,
};
use lilove_protocol::rooms::RoomId;
use lilove_rooms::Replay;
use lilove_users::User;
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

use crate::app::AppState;

/// Random nonce for the connect challenge.
pub fn make_nonce() -> String {
    Uuid::new_v4().to_string().replace('-', "")
}

/// Serialize the `connect.challenge` event that opens every WS session.
pub fn challenge_event(nonce: &str) -> String {
    let frame = EventFrame::new(
        "connect.challenge",
        ConnectChallenge {
            nonce: nonce.to_string(),
        },
    );
    serde_json::to_string(&frame).expect("challenge serialization is infallible")
}

/// Resolve the connect auth payload to a stored user.
pub fn authenticate(params: &ConnectParams, app: &AppState) -> Result<User, LiloveError> {
    match &params.auth {
        AuthPayload::Token { token } => app
            .users
            .resolve_token(token)
            .map_err(|e| LiloveError::AuthFailed(e.to_string())),

        AuthPayload::ResumeToken { resume_token } => {
            let user_id = app
                .keyring
                .verify(resume_token)
                .map_err(|e| LiloveError::AuthFailed(e.to_string()))?;
            app.users
                .get_user(&user_id)
                .map_err(|e| LiloveError::AuthFailed(e.to_string()))?
                .ok_or_else(|| LiloveError::AuthFailed(format!("unknown user {user_id}")))
        }

        AuthPayload::None => Err(LiloveError::AuthFailed("credentials required".to_string())),
    }
}

/// Everything `connect` produces beyond the state change: the hello-ok
/// payload, plus buffered frames to push right after it (original seqs
/// intact) for rooms the resume request could be replayed for.
pub struct HandshakeOutcome {
    pub hello: HelloOk,
    pub replays: Vec<String>,
}

/// Join the connection to every room the user belongs to and work out the
/// replay outcome for each room the client resumed.
///
/// Membership comes from storage, not from the resume request — a client can
/// never resume its way into a room it was removed from.
pub fn establish(
    conn_id: &ConnId,
    user: &User,
    params: &ConnectParams,
    app: &AppState,
) -> Result<HandshakeOutcome, LiloveError> {
    let mut joined: Vec<RoomId> = vec![RoomId::User(user.id.clone().into())];
    let teams = app
        .social
        .teams_of(&user.id)
        .map_err(|e| LiloveError::Database(e.to_string()))?;
    for team in &teams {
        joined.push(RoomId::Team(team.id.clone().into()));
    }
    let challenge_ids = app
        .social
        .challenge_ids_of(&user.id)
        .map_err(|e| LiloveError::Database(e.to_string()))?;
    for id in &challenge_ids {
        joined.push(RoomId::Challenge(id.clone().into()));
    }

    for room in &joined {
        app.rooms.join(room.clone(), conn_id);
    }

    let mut rooms: Vec<String> = joined.iter().map(|r| r.format()).collect();
    rooms.sort();

    // Replay per resumed room. Rooms the user no longer belongs to get
    // Refetch: the client must drop those views entirely.
    let mut replay_outcomes: HashMap<String, ReplayOutcome> = HashMap::new();
    let mut replays: Vec<String> = Vec::new();
    if let Some(resume) = &params.resume {
        for (room_str, last_seq) in &resume.rooms {
            let Ok(room) = RoomId::parse(room_str) else {
                warn!(room = %room_str, "resume request names unparseable room");
                replay_outcomes.insert(room_str.clone(), ReplayOutcome::Refetch);
                continue;
            };
            if !joined.contains(&room) {
                replay_outcomes.insert(room_str.clone(), ReplayOutcome::Refetch);
                continue;
            }
            match app.rooms.replay_since(&room, *last_seq) {
                Replay::Events(events) => {
                    replay_outcomes.insert(
                        room_str.clone(),
                        ReplayOutcome::Replayed {
                            count: events.len(),
                        },
                    );
                    replays.extend(events);
                }
                Replay::Refetch => {
                    replay_outcomes.insert(room_str.clone(), ReplayOutcome::Refetch);
                }
            }
        }
    }

    let hello = HelloOk {
        protocol: PROTOCOL_VERSION,
        server: ServerInfo {
            name: "lilove".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
        user_id: user.id.clone(),
        entitlements: user.entitlements(),
        rooms,
        replay: replay_outcomes,
        resume_token: app.keyring.issue(&user.id),
        policy: ClientPolicy {
            max_message_size: MAX_PAYLOAD_BYTES,
            heartbeat_interval_secs: HEARTBEAT_INTERVAL_SECS,
        },
    };

    Ok(HandshakeOutcome { hello, replays })
}
