use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Server → Client: initial challenge on WS connect.
/// Sent as: `EVENT connect.challenge { nonce: "..." }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectChallenge {
    pub nonce: String,
}

/// Client → Server: authentication request.
/// Sent as: `REQ connect { auth: { mode: "token", token: "..." }, resume: {...} }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectParams {
    pub auth: AuthPayload,
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
    /// Present when the client is reconnecting and wants buffered events
    /// replayed instead of refetching every view.
    #[serde(default)]
    pub resume: Option<ResumeState>,
}

/// Discriminated auth payload — mode determines which fields are present.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "kebab-case")]
pub enum AuthPayload {
    /// Bearer token minted by the session collaborator.
    Token { token: String },
    /// HMAC-signed resume token issued by this gateway in an earlier hello-ok.
    ResumeToken { resume_token: String },
    None,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientInfo {
    pub name: Option<String>,
    pub version: Option<String>,
    pub platform: Option<String>,
}

/// Per-room high-water marks from the client's cache: the last seq it applied
/// before the connection dropped.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ResumeState {
    /// room wire string → last applied seq.
    #[serde(default)]
    pub rooms: HashMap<String, u64>,
}

/// Server → Client: successful auth response payload.
/// Sent as: `RES { protocol: 2, server: {...}, entitlements: {...}, ... }`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloOk {
    pub protocol: u32,
    pub server: ServerInfo,
    pub user_id: String,
    pub entitlements: lilove_core::types::Entitlements,
    /// Rooms this connection was auto-joined to (own user room plus every
    /// team/challenge room from stored membership).
    pub rooms: Vec<String>,
    /// Outcome of the resume request, one entry per room the client asked for.
    #[serde(default)]
    pub replay: HashMap<String, ReplayOutcome>,
    /// Token to present on the next reconnect.
    pub resume_token: String,
    pub policy: ClientPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// What the server could do for one resumed room.
///
/// `Replayed` means the buffered events (delivered right after hello-ok,
/// in order, with their original seqs) close the gap. `Refetch` means the
/// buffer no longer covers the client's last seq — every view scoped to the
/// room must be refetched.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReplayOutcome {
    Replayed { count: usize },
    Refetch,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ClientPolicy {
    pub max_message_size: usize,
    pub heartbeat_interval_secs: u64,
}
