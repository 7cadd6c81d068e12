use axum::{
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use lilove_core::config::{
    HANDSHAKE_TIMEOUT_MS, HEARTBEAT_INTERVAL_SECS, MAX_PAYLOAD_BYTES, OUT_QUEUE_CAPACITY,
};
use lilove_core::types::{ConnId, Entitlements};
use lilove_core::LiloveError;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::app::AppState;
use crate::ws::{handshake, message};

/// Authenticated connection identity — everything a handler needs to gate a
/// method call without touching the users table.
#[derive(Debug, Clone)]
pub struct Session {
    pub conn_id: ConnId,
    pub user_id: String,
    pub entitlements: Entitlements,
}

/// WS connection states — linear progression, no backwards transitions.
pub enum ConnState {
    AwaitingConnect { nonce: String },
    Authenticated(Session),
    Closing,
}

impl ConnState {
    /// The handshake deadline only applies in this state; the select loop
    /// must stop polling the timer once it leaves.
    fn awaiting_connect(&self) -> bool {
        matches!(self, ConnState::AwaitingConnect { .. })
    }
}

/// Axum handler — upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Per-connection event loop — lives for the entire WS session.
///
/// The socket sink is owned by a spawned writer task; everything that wants
/// to reach this client (room fan-out included) goes through one bounded
/// mpsc queue. A queue that fills up drops events for this connection only —
/// the client detects the seq gap and refetches.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = ConnId::new();
    info!(conn_id = %conn_id, "new WS connection");

    let (mut sink, mut rx) = socket.split();
    let (out_tx, mut out_rx) = mpsc::channel::<String>(OUT_QUEUE_CAPACITY);

    let writer = tokio::spawn(async move {
        while let Some(text) = out_rx.recv().await {
            if sink.send(Message::Text(text.into())).await.is_err() {
                break;
            }
        }
        let _ = sink.close().await;
    });

    state.rooms.register_conn(conn_id.clone(), out_tx.clone());

    // send challenge and enter AwaitingConnect state
    let nonce = handshake::make_nonce();
    if out_tx.send(handshake::challenge_event(&nonce)).await.is_err() {
        state.rooms.unregister_conn(&conn_id);
        return;
    }
    let mut conn_state = ConnState::AwaitingConnect { nonce };

    // handshake must complete within 10s
    let deadline =
        tokio::time::Instant::now() + std::time::Duration::from_millis(HANDSHAKE_TIMEOUT_MS);
    let mut handshake_timer = Box::pin(tokio::time::sleep_until(deadline));

    // heartbeat tick after auth
    let mut tick = tokio::time::interval(std::time::Duration::from_secs(HEARTBEAT_INTERVAL_SECS));
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        if text.len() > MAX_PAYLOAD_BYTES {
                            let e = LiloveError::PayloadTooLarge {
                                size: text.len(),
                                max: MAX_PAYLOAD_BYTES,
                            };
                            warn!(conn_id = %conn_id, code = e.code(), error = %e, "closing connection");
                            break;
                        }
                        conn_state = message::handle(
                            &conn_id, &text, conn_state, &out_tx, &state,
                        ).await;
                        if matches!(conn_state, ConnState::Closing) { break; }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }

            _ = tick.tick() => {
                if matches!(conn_state, ConnState::Authenticated(_)) {
                    // The per-room seq snapshot lets the client spot a
                    // dropped event between publishes and refetch early.
                    let ev = lilove_protocol::frames::EventFrame::new(
                        "heartbeat",
                        serde_json::json!({
                            "ts": chrono::Utc::now().timestamp_millis(),
                            "rooms": state.rooms.seq_snapshot(&conn_id),
                        }),
                    );
                    if crate::ws::send::json(&out_tx, &ev).await.is_err() {
                        break;
                    }
                }
            }

            // The guard keeps the elapsed timer out of the poll set once the
            // handshake is done — an unguarded completed Sleep is ready on
            // every poll and turns this loop into a busy-spin.
            _ = &mut handshake_timer, if conn_state.awaiting_connect() => {
                warn!(conn_id = %conn_id, "handshake timeout");
                break;
            }
        }
    }

    state.rooms.unregister_conn(&conn_id);
    drop(out_tx);
    writer.abort();
    info!(conn_id = %conn_id, "WS connection closed");
}

#[cfg(test)]
mod tests {
    use super::*;

    // An elapsed handshake deadline must drop out of the select poll set
    // once the connection is authenticated — a completed Sleep left in the
    // set is ready on every poll and the loop never parks.
    #[tokio::test(start_paused = true)]
    async fn elapsed_deadline_is_not_polled_after_auth() {
        let conn_state = ConnState::Authenticated(Session {
            conn_id: ConnId::new(),
            user_id: "u1".to_string(),
            entitlements: Entitlements::default(),
        });
        let deadline = tokio::time::Instant::now();
        let mut handshake_timer = Box::pin(tokio::time::sleep_until(deadline));
        tokio::time::advance(std::time::Duration::from_millis(1)).await;

        let mut timer_fired = 0u32;
        for _ in 0..50 {
            tokio::select! {
                biased;
                _ = &mut handshake_timer, if conn_state.awaiting_connect() => {
                    timer_fired += 1;
                }
                _ = tokio::task::yield_now() => {}
            }
        }
        assert_eq!(timer_fired, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_fires_while_awaiting_connect() {
        let conn_state = ConnState::AwaitingConnect {
            nonce: "n".to_string(),
        };
        let deadline = tokio::time::Instant::now() + std::time::Duration::from_secs(10);
        let mut handshake_timer = Box::pin(tokio::time::sleep_until(deadline));
        tokio::time::advance(std::time::Duration::from_secs(11)).await;

        tokio::select! {
            biased;
            _ = &mut handshake_timer, if conn_state.awaiting_connect() => {}
            _ = tokio::task::yield_now() => {
                panic!("deadline must win pre-auth once elapsed");
            }
        }
    }
}
