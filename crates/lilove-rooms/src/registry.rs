//! Room membership and targeted event fan-out.
//!
//! One registry per gateway process. Events are stamped with a per-room
//! monotonic seq, kept in a bounded replay buffer for reconnect catch-up,
//! and pushed to every member connection's outbound queue. Delivery is
//! at-most-once: a full queue drops the event for that connection and the
//! client's seq-gap detection turns the loss into a refetch.

use std::collections::{HashSet, VecDeque};

use dashmap::DashMap;
use lilove_core::config::REPLAY_BUFFER_LEN;
use lilove_core::types::ConnId;
use lilove_core::Result;
use lilove_protocol::frames::EventFrame;
use lilove_protocol::rooms::RoomId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// One buffered event: the seq it was stamped with plus the serialized frame.
struct BufferedEvent {
    seq: u64,
    json: String,
}

/// Per-room state: members, seq counter, replay buffer.
///
/// Lives behind a DashMap entry lock — publish holds it only long enough to
/// stamp, buffer, and snapshot the member list. Sends happen after release.
struct RoomState {
    members: HashSet<ConnId>,
    next_seq: u64,
    buffer: VecDeque<BufferedEvent>,
}

impl RoomState {
    fn new() -> Self {
        Self {
            members: HashSet::new(),
            next_seq: 1,
            buffer: VecDeque::with_capacity(REPLAY_BUFFER_LEN),
        }
    }
}

/// Outcome of a resume request for one room.
#[derive(Debug)]
pub enum Replay {
    /// Serialized event frames (original seqs intact) that close the gap.
    Events(Vec<String>),
    /// The buffer no longer covers the client's last seq — views scoped to
    /// this room must be refetched.
    Refetch,
}

/// Registry of live rooms and connections.
///
/// Connections register an outbound `mpsc::Sender<String>`; the writer task on
/// the other end owns the actual socket sink. Rooms are created lazily on
/// first join or publish and never removed — an empty room still advances its
/// seq so late joiners can replay.
pub struct RoomRegistry {
    rooms: DashMap<RoomId, RoomState>,
    conns: DashMap<ConnId, mpsc::Sender<String>>,
    /// Reverse index for O(1) disconnect cleanup.
    conn_rooms: DashMap<ConnId, HashSet<RoomId>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self {
            rooms: DashMap::new(),
            conns: DashMap::new(),
            conn_rooms: DashMap::new(),
        }
    }

    /// Register a connection's outbound queue. Called once per WS connection
    /// after the socket is split.
    pub fn register_conn(&self, conn: ConnId, tx: mpsc::Sender<String>) {
        self.conns.insert(conn, tx);
    }

    /// Drop a connection: leaves every room and removes the sender.
    pub fn unregister_conn(&self, conn: &ConnId) {
        self.leave_all(conn);
        self.conns.remove(conn);
    }

    /// Join a room. Idempotent — joining twice is a no-op.
    pub fn join(&self, room: RoomId, conn: &ConnId) {
        let mut state = self.rooms.entry(room.clone()).or_insert_with(RoomState::new);
        if state.members.insert(conn.clone()) {
            debug!(room = %room, conn = %conn, "joined room");
        }
        drop(state);
        self.conn_rooms
            .entry(conn.clone())
            .or_default()
            .insert(room);
    }

    /// Leave a room. Leaving a room the connection is not in is a no-op.
    pub fn leave(&self, room: &RoomId, conn: &ConnId) {
        if let Some(mut state) = self.rooms.get_mut(room) {
            if state.members.remove(conn) {
                debug!(room = %room, conn = %conn, "left room");
            }
        }
        if let Some(mut set) = self.conn_rooms.get_mut(conn) {
            set.remove(room);
        }
    }

    /// Leave every room — called on disconnect.
    pub fn leave_all(&self, conn: &ConnId) {
        let rooms = self
            .conn_rooms
            .remove(conn)
            .map(|(_, set)| set)
            .unwrap_or_default();
        for room in rooms {
            if let Some(mut state) = self.rooms.get_mut(&room) {
                state.members.remove(conn);
            }
        }
    }

    /// Rooms the connection currently belongs to, sorted for deterministic output.
    pub fn rooms_of(&self, conn: &ConnId) -> Vec<String> {
        let mut rooms: Vec<String> = self
            .conn_rooms
            .get(conn)
            .map(|set| set.iter().map(|r| r.format()).collect())
            .unwrap_or_default();
        rooms.sort();
        rooms
    }

    /// Latest stamped seq per room the connection is in. Sent with each
    /// heartbeat so a client can spot a silently dropped event between
    /// publishes and refetch early instead of on the next delivery.
    pub fn seq_snapshot(&self, conn: &ConnId) -> std::collections::HashMap<String, u64> {
        let rooms = self
            .conn_rooms
            .get(conn)
            .map(|set| set.iter().cloned().collect::<Vec<_>>())
            .unwrap_or_default();
        rooms
            .into_iter()
            .map(|room| {
                let latest = self
                    .rooms
                    .get(&room)
                    .map(|state| state.next_seq - 1)
                    .unwrap_or(0);
                (room.format(), latest)
            })
            .collect()
    }

    /// Whether the connection is currently a member of the room.
    pub fn is_member(&self, room: &RoomId, conn: &ConnId) -> bool {
        self.rooms
            .get(room)
            .map(|state| state.members.contains(conn))
            .unwrap_or(false)
    }

    /// Number of live registered connections.
    pub fn conn_count(&self) -> usize {
        self.conns.len()
    }

    /// Stamp, buffer, and fan out an event to every member of the room.
    ///
    /// Returns the seq the event was stamped with. Publishing to an empty
    /// room still advances the seq and fills the buffer. Sends never block:
    /// a full per-connection queue drops the event for that connection only.
    pub fn publish(&self, room: &RoomId, event: EventFrame) -> Result<u64> {
        let (seq, json, members) = {
            let mut state = self
                .rooms
                .entry(room.clone())
                .or_insert_with(RoomState::new);
            let seq = state.next_seq;
            state.next_seq += 1;

            let stamped = event.with_room(room.format()).with_seq(seq);
            let json = serde_json::to_string(&stamped)?;

            if state.buffer.len() == REPLAY_BUFFER_LEN {
                state.buffer.pop_front();
            }
            state.buffer.push_back(BufferedEvent {
                seq,
                json: json.clone(),
            });

            let members: Vec<ConnId> = state.members.iter().cloned().collect();
            (seq, json, members)
        };

        for conn in members {
            let Some(tx) = self.conns.get(&conn) else {
                continue;
            };
            if let Err(e) = tx.try_send(json.clone()) {
                // Slow or dead consumer — at-most-once, the client refetches.
                warn!(room = %room, conn = %conn, error = %e, "dropping event for connection");
            }
        }

        Ok(seq)
    }

    /// Buffered events newer than `last_seq`, or `Refetch` when the buffer
    /// has wrapped past the client's position.
    pub fn replay_since(&self, room: &RoomId, last_seq: u64) -> Replay {
        let Some(state) = self.rooms.get(room) else {
            // Unknown room: nothing was ever published here. A client that
            // claims progress is ahead of us (restart) — tell it to refetch.
            return if last_seq == 0 {
                Replay::Events(Vec::new())
            } else {
                Replay::Refetch
            };
        };

        let latest = state.next_seq - 1;
        if last_seq == latest {
            return Replay::Events(Vec::new());
        }
        if last_seq > latest {
            // Client claims more progress than this room has seen — a
            // restart reset the counter. Its cached baseline is unusable:
            // new events would be stamped at-or-below its high-water mark
            // and discarded as duplicates. Refetch, never an empty replay.
            warn!(room = %room, last_seq, latest, "resume ahead of room seq");
            return Replay::Refetch;
        }

        // Coverage check: the buffer must still hold seq last_seq + 1.
        match state.buffer.front() {
            Some(oldest) if oldest.seq <= last_seq + 1 => {
                let events = state
                    .buffer
                    .iter()
                    .filter(|e| e.seq > last_seq)
                    .map(|e| e.json.clone())
                    .collect();
                Replay::Events(events)
            }
            _ => Replay::Refetch,
        }
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lilove_core::config::OUT_QUEUE_CAPACITY;

    fn team_room(id: &str) -> RoomId {
        RoomId::Team(id.into())
    }

    fn chat_event(text: &str) -> EventFrame {
        EventFrame::new("chat.message", serde_json::json!({ "text": text }))
    }

    #[tokio::test]
    async fn publish_reaches_members_only() {
        let reg = RoomRegistry::new();
        let room = team_room("t1");

        let (tx_a, mut rx_a) = mpsc::channel(OUT_QUEUE_CAPACITY);
        let (tx_b, mut rx_b) = mpsc::channel(OUT_QUEUE_CAPACITY);
        let a = ConnId::from("conn-a");
        let b = ConnId::from("conn-b");
        reg.register_conn(a.clone(), tx_a);
        reg.register_conn(b.clone(), tx_b);
        reg.join(room.clone(), &a);

        reg.publish(&room, chat_event("hi")).unwrap();

        let got = rx_a.recv().await.unwrap();
        assert!(got.contains(r#""room":"team:t1""#));
        assert!(got.contains(r#""seq":1"#));
        assert!(rx_b.try_recv().is_err(), "non-member must not receive");
    }

    #[tokio::test]
    async fn seq_is_monotonic_per_room() {
        let reg = RoomRegistry::new();
        let room = team_room("t1");
        let other = team_room("t2");

        assert_eq!(reg.publish(&room, chat_event("1")).unwrap(), 1);
        assert_eq!(reg.publish(&room, chat_event("2")).unwrap(), 2);
        // independent counter per room
        assert_eq!(reg.publish(&other, chat_event("x")).unwrap(), 1);
        assert_eq!(reg.publish(&room, chat_event("3")).unwrap(), 3);
    }

    #[tokio::test]
    async fn join_is_idempotent() {
        let reg = RoomRegistry::new();
        let room = team_room("t1");
        let (tx, mut rx) = mpsc::channel(OUT_QUEUE_CAPACITY);
        let conn = ConnId::from("conn-a");
        reg.register_conn(conn.clone(), tx);
        reg.join(room.clone(), &conn);
        reg.join(room.clone(), &conn);

        reg.publish(&room, chat_event("once")).unwrap();
        rx.recv().await.unwrap();
        assert!(rx.try_recv().is_err(), "double join must not double-deliver");
    }

    #[tokio::test]
    async fn slow_consumer_is_dropped_not_blocked() {
        let reg = RoomRegistry::new();
        let room = team_room("t1");
        let (tx, mut rx) = mpsc::channel(1);
        let conn = ConnId::from("conn-a");
        reg.register_conn(conn.clone(), tx);
        reg.join(room.clone(), &conn);

        // queue capacity 1: second publish must drop, not block
        reg.publish(&room, chat_event("1")).unwrap();
        reg.publish(&room, chat_event("2")).unwrap();

        let first = rx.recv().await.unwrap();
        assert!(first.contains(r#""seq":1"#));
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn leave_all_removes_membership() {
        let reg = RoomRegistry::new();
        let (tx, mut rx) = mpsc::channel(OUT_QUEUE_CAPACITY);
        let conn = ConnId::from("conn-a");
        reg.register_conn(conn.clone(), tx);
        reg.join(team_room("t1"), &conn);
        reg.join(team_room("t2"), &conn);

        reg.unregister_conn(&conn);

        reg.publish(&team_room("t1"), chat_event("after")).unwrap();
        assert!(rx.try_recv().is_err());
        assert!(reg.rooms_of(&conn).is_empty());
    }

    #[tokio::test]
    async fn replay_covers_recent_gap() {
        let reg = RoomRegistry::new();
        let room = team_room("t1");
        for i in 0..5 {
            reg.publish(&room, chat_event(&format!("m{i}"))).unwrap();
        }

        match reg.replay_since(&room, 3) {
            Replay::Events(events) => {
                assert_eq!(events.len(), 2);
                assert!(events[0].contains(r#""seq":4"#));
                assert!(events[1].contains(r#""seq":5"#));
            }
            Replay::Refetch => panic!("buffer should cover seq 4..=5"),
        }
    }

    #[tokio::test]
    async fn replay_up_to_date_is_empty() {
        let reg = RoomRegistry::new();
        let room = team_room("t1");
        reg.publish(&room, chat_event("only")).unwrap();

        match reg.replay_since(&room, 1) {
            Replay::Events(events) => assert!(events.is_empty()),
            Replay::Refetch => panic!("client is current"),
        }
    }

    #[tokio::test]
    async fn replay_after_wrap_forces_refetch() {
        let reg = RoomRegistry::new();
        let room = team_room("t1");
        for i in 0..(REPLAY_BUFFER_LEN + 10) {
            reg.publish(&room, chat_event(&format!("m{i}"))).unwrap();
        }

        // seq 1 fell out of the buffer long ago
        assert!(matches!(reg.replay_since(&room, 1), Replay::Refetch));
    }

    #[tokio::test]
    async fn seq_snapshot_reports_latest_per_joined_room() {
        let reg = RoomRegistry::new();
        let (tx, _rx) = mpsc::channel(OUT_QUEUE_CAPACITY);
        let conn = ConnId::from("conn-a");
        reg.register_conn(conn.clone(), tx);
        reg.join(team_room("t1"), &conn);
        reg.join(team_room("t2"), &conn);

        reg.publish(&team_room("t1"), chat_event("1")).unwrap();
        reg.publish(&team_room("t1"), chat_event("2")).unwrap();

        let snapshot = reg.seq_snapshot(&conn);
        assert_eq!(snapshot.get("team:t1"), Some(&2));
        assert_eq!(snapshot.get("team:t2"), Some(&0));
        assert_eq!(snapshot.len(), 2);
    }

    #[tokio::test]
    async fn replay_ahead_of_joined_room_forces_refetch() {
        let reg = RoomRegistry::new();
        let room = team_room("t1");
        let (tx, _rx) = mpsc::channel(OUT_QUEUE_CAPACITY);
        let conn = ConnId::from("conn-a");
        reg.register_conn(conn.clone(), tx);
        // joining materializes the room with seq 0, as the handshake does
        // before asking for replay
        reg.join(room.clone(), &conn);

        // a client resuming from before a restart is ahead of the fresh
        // counter — an empty replay would make it discard all new events
        // as duplicates
        assert!(matches!(reg.replay_since(&room, 7), Replay::Refetch));

        reg.publish(&room, chat_event("1")).unwrap();
        reg.publish(&room, chat_event("2")).unwrap();
        assert!(matches!(reg.replay_since(&room, 3), Replay::Refetch));
        // exactly current stays a clean empty replay
        assert!(matches!(reg.replay_since(&room, 2), Replay::Events(e) if e.is_empty()));
    }

    #[tokio::test]
    async fn replay_unknown_room_with_progress_is_refetch() {
        let reg = RoomRegistry::new();
        let room = team_room("never-seen");
        assert!(matches!(reg.replay_since(&room, 0), Replay::Events(e) if e.is_empty()));
        assert!(matches!(reg.replay_since(&room, 7), Replay::Refetch));
    }
}
