// Verify wire format matches what the web and mobile clients expect.
// These tests ensure protocol compatibility is never broken.

use lilove_protocol::frames::{EventFrame, InboundFrame, ResFrame};
use lilove_protocol::handshake::{AuthPayload, ConnectParams, ReplayOutcome};
use lilove_protocol::patch::{CachePatch, PatchOp, QueryKey};
use lilove_protocol::rooms::RoomId;

#[test]
fn req_frame_round_trip() {
    let json = r#"{"type":"req","id":"abc-123","method":"chat.send","params":{"text":"hello"}}"#;
    let frame: InboundFrame = serde_json::from_str(json).unwrap();
    assert_eq!(frame.frame_type, "req");

    let req = frame.as_req().unwrap();
    assert_eq!(req.method, "chat.send");
    assert_eq!(req.id, "abc-123");
}

#[test]
fn non_req_frame_is_not_a_req() {
    let json = r#"{"type":"event","event":"chat.message"}"#;
    let frame: InboundFrame = serde_json::from_str(json).unwrap();
    assert!(frame.as_req().is_none());
}

#[test]
fn res_ok_serialization() {
    let res = ResFrame::ok("req-1", serde_json::json!({"pong": true}));
    let json = serde_json::to_string(&res).unwrap();

    assert!(json.contains(r#""type":"res""#));
    assert!(json.contains(r#""ok":true"#));
    assert!(json.contains(r#""pong":true"#));
    // error field must be absent on success
    assert!(!json.contains(r#""error""#));
}

#[test]
fn res_err_serialization() {
    let res = ResFrame::err("req-2", "AUTH_FAILED", "bad token");
    let json = serde_json::to_string(&res).unwrap();

    assert!(json.contains(r#""ok":false"#));
    assert!(json.contains(r#""AUTH_FAILED""#));
    // payload must be absent on error
    assert!(!json.contains(r#""payload""#));
}

#[test]
fn event_frame_with_room_and_seq() {
    let ev = EventFrame::new("chat.message", serde_json::json!({"text": "hi"}))
        .with_room("team:t1")
        .with_seq(42);
    let json = serde_json::to_string(&ev).unwrap();

    assert!(json.contains(r#""type":"event""#));
    assert!(json.contains(r#""event":"chat.message""#));
    assert!(json.contains(r#""room":"team:t1""#));
    assert!(json.contains(r#""seq":42"#));
}

#[test]
fn event_frame_patch_is_flattened() {
    let patch = CachePatch::prepend(
        QueryKey::feed_team("t1"),
        serde_json::json!({"id": "f1", "kind": "goal_completed"}),
    );
    let ev = EventFrame::new("feed.item", serde_json::json!({})).with_patch(patch);
    let json = serde_json::to_string(&ev).unwrap();

    // op is flattened into the patch object, not nested under "op": {...}
    assert!(json.contains(r#""patch":{"query":"feed:team:t1","op":"prepend"#));
}

#[test]
fn patch_upsert_round_trip() {
    let json = r#"{"query":"leaderboard:challenge:c9","op":"upsert","key":"u2","item":{"id":"u2","points":30}}"#;
    let patch: CachePatch = serde_json::from_str(json).unwrap();

    assert_eq!(patch.query, QueryKey::leaderboard("c9"));
    match patch.op {
        PatchOp::Upsert { ref key, ref item } => {
            assert_eq!(key, "u2");
            assert_eq!(item["points"], 30);
        }
        ref other => panic!("expected upsert, got {other:?}"),
    }
}

#[test]
fn patch_invalidate_has_no_extra_fields() {
    let patch = CachePatch::invalidate(QueryKey::notifications("u1"));
    let json = serde_json::to_string(&patch).unwrap();
    assert_eq!(json, r#"{"query":"notifications:u1","op":"invalidate"}"#);
}

#[test]
fn connect_params_token_auth() {
    let json = r#"{"auth":{"mode":"token","token":"secret-123"}}"#;
    let params: ConnectParams = serde_json::from_str(json).unwrap();

    match params.auth {
        AuthPayload::Token { ref token } => assert_eq!(token, "secret-123"),
        _ => panic!("expected token auth"),
    }
    assert!(params.resume.is_none());
}

#[test]
fn connect_params_resume() {
    let json = r#"{
        "auth": {"mode": "resume-token", "resume_token": "rt.abc"},
        "resume": {"rooms": {"team:t1": 17, "user:u1": 4}}
    }"#;
    let params: ConnectParams = serde_json::from_str(json).unwrap();

    assert!(matches!(params.auth, AuthPayload::ResumeToken { .. }));
    let resume = params.resume.unwrap();
    assert_eq!(resume.rooms["team:t1"], 17);
    assert_eq!(resume.rooms["user:u1"], 4);
}

#[test]
fn replay_outcome_shapes() {
    let replayed = serde_json::to_string(&ReplayOutcome::Replayed { count: 3 }).unwrap();
    assert_eq!(replayed, r#"{"outcome":"replayed","count":3}"#);

    let refetch = serde_json::to_string(&ReplayOutcome::Refetch).unwrap();
    assert_eq!(refetch, r#"{"outcome":"refetch"}"#);
}

#[test]
fn room_id_serde_as_wire_string() {
    let room: RoomId = serde_json::from_str(r#""challenge:c-7""#).unwrap();
    assert_eq!(room.format(), "challenge:c-7");
    assert_eq!(serde_json::to_string(&room).unwrap(), r#""challenge:c-7""#);
}
