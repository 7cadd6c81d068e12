use lilove_core::{types::ConnId, LiloveError};
use lilove_protocol::{
    frames::{InboundFrame, ResFrame},
    handshake::ConnectParams,
    methods::CONNECT,
};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::AppState;
use crate::ws::connection::{ConnState, Session};
use crate::ws::{dispatch, handshake, send};

/// Process one inbound WS text frame. Returns the new connection state.
pub async fn handle(
    conn_id: &ConnId,
    text: &str,
    state: ConnState,
    tx: &mpsc::Sender<String>,
    app: &Arc<AppState>,
) -> ConnState {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(f) => f,
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "malformed frame");
            return state;
        }
    };

    match state {
        ConnState::AwaitingConnect { nonce: _ } => handle_auth(conn_id, frame, tx, app).await,
        ConnState::Authenticated(session) => handle_method(frame, session, tx, app).await,
        ConnState::Closing => ConnState::Closing,
    }
}

/// Pre-auth: only the `connect` method is accepted.
async fn handle_auth(
    conn_id: &ConnId,
    frame: InboundFrame,
    tx: &mpsc::Sender<String>,
    app: &Arc<AppState>,
) -> ConnState {
    let Some(req) = frame.as_req() else {
        return ConnState::AwaitingConnect {
            nonce: String::new(),
        };
    };

    if req.method != CONNECT {
        let e = LiloveError::Protocol("must authenticate first".into());
        let res = ResFrame::err(&req.id, e.code(), &e.to_string());
        let _ = send::json(tx, &res).await;
        return ConnState::AwaitingConnect {
            nonce: String::new(),
        };
    }

    let params: ConnectParams = match req.params.and_then(|p| serde_json::from_value(p).ok()) {
        Some(p) => p,
        None => {
            let e = LiloveError::Protocol("invalid connect params".into());
            let res = ResFrame::err(&req.id, e.code(), &e.to_string());
            let _ = send::json(tx, &res).await;
            return ConnState::Closing;
        }
    };

    let user = match handshake::authenticate(&params, app) {
        Ok(user) => user,
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "auth failed");
            let res = ResFrame::err(&req.id, e.code(), &e.to_string());
            let _ = send::json(tx, &res).await;
            return ConnState::Closing;
        }
    };

    match handshake::establish(conn_id, &user, &params, app) {
        Ok(outcome) => {
            let res = ResFrame::ok(&req.id, &outcome.hello);
            if send::json(tx, &res).await.is_err() {
                return ConnState::Closing;
            }
            // Buffered events follow hello-ok in publish order, original
            // seqs intact, so the client closes its gaps before any live
            // traffic arrives.
            for event_json in outcome.replays {
                if tx.send(event_json).await.is_err() {
                    return ConnState::Closing;
                }
            }
            info!(conn_id = %conn_id, user_id = %user.id, "client authenticated");
            let entitlements = user.entitlements();
            ConnState::Authenticated(Session {
                conn_id: conn_id.clone(),
                user_id: user.id,
                entitlements,
            })
        }
        Err(e) => {
            warn!(conn_id = %conn_id, error = %e, "handshake failed");
            let res = ResFrame::err(&req.id, e.code(), &e.to_string());
            let _ = send::json(tx, &res).await;
            ConnState::Closing
        }
    }
}

/// Post-auth: dispatch method calls to handlers.
async fn handle_method(
    frame: InboundFrame,
    session: Session,
    tx: &mpsc::Sender<String>,
    app: &Arc<AppState>,
) -> ConnState {
    if let Some(req) = frame.as_req() {
        let res = dispatch::route(&req.method, req.params.as_ref(), &req.id, &session, app).await;
        let _ = send::json(tx, &res).await;
    }
    ConnState::Authenticated(session)
}
