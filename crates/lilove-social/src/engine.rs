use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use crate::db::{init_db, row_to_challenge, CHALLENGE_SELECT_SQL};
use crate::error::Result;
use crate::types::{Challenge, ChallengePhase};

/// A challenge phase edge the engine fired: upcoming→active or active→ended.
#[derive(Debug, Clone)]
pub struct Transition {
    pub challenge: Challenge,
    pub to: ChallengePhase,
}

/// Drives challenge phase flips at ±1 poll-interval precision.
///
/// The stored `phase` column is the exactly-once guard: a flip updates the
/// row and emits the transition in the same tick, so a restart never
/// re-fires `challenge.started` for an already-active challenge. Edges that
/// passed while the process was down fire once on the first tick.
pub struct ChallengeEngine {
    conn: Connection,
    /// Fired transitions are sent here for room fan-out.
    fired_tx: mpsc::Sender<Transition>,
}

impl ChallengeEngine {
    /// Create a new engine, initialising the DB schema if needed.
    ///
    /// The sender is serviced with `try_send` so the tick loop is never
    /// stalled by a slow consumer.
    pub fn new(conn: Connection, fired_tx: mpsc::Sender<Transition>) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn, fired_tx })
    }

    /// Main event loop. Polls every second until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("challenge engine started");

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        error!("challenge engine tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("challenge engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    /// Flip every challenge whose window edge has passed. Public so tests
    /// can drive the engine without the timer.
    pub fn tick(&mut self) -> Result<()> {
        let now = Utc::now();

        // Collect eagerly so `stmt` is dropped before the UPDATEs below.
        let candidates: Vec<Challenge> = {
            let sql = format!("{CHALLENGE_SELECT_SQL} WHERE phase IN ('upcoming', 'active')");
            let mut stmt = self.conn.prepare_cached(&sql)?;
            let rows: Vec<_> = stmt
                .query_map([], row_to_challenge)?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };

        for challenge in candidates {
            let due = crate::store::phase_for(
                parse_ts(&challenge.starts_at),
                parse_ts(&challenge.ends_at),
                now,
            );
            if due == challenge.phase {
                continue;
            }

            info!(
                challenge_id = %challenge.id,
                from = %challenge.phase,
                to = %due,
                "challenge phase transition"
            );

            self.conn.execute(
                "UPDATE challenges SET phase = ?1, updated_at = ?2 WHERE id = ?3",
                rusqlite::params![due.to_string(), now.to_rfc3339(), challenge.id],
            )?;

            let fired = Transition {
                challenge: Challenge {
                    phase: due,
                    ..challenge
                },
                to: due,
            };
            if self.fired_tx.try_send(fired).is_err() {
                warn!("transition channel full or closed — fan-out skipped");
            }
        }
        Ok(())
    }
}

fn parse_ts(s: &str) -> chrono::DateTime<Utc> {
    chrono::DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        // Unparseable timestamps count as "long past" so the row settles
        // into Ended instead of flapping.
        .unwrap_or_else(|_| chrono::DateTime::<Utc>::MIN_UTC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn engine_with_store() -> (ChallengeEngine, crate::store::SocialStore, mpsc::Receiver<Transition>) {
        // Shared in-memory DB: one connection for the store, one for the engine.
        let uri = format!(
            "file:engine-test-{}?mode=memory&cache=shared",
            uuid::Uuid::new_v4()
        );
        let store_conn = Connection::open(&uri).unwrap();
        let engine_conn = Connection::open(&uri).unwrap();
        crate::db::init_db(&store_conn).unwrap();

        let (tx, rx) = mpsc::channel(16);
        let engine = ChallengeEngine::new(engine_conn, tx).unwrap();
        (engine, crate::store::SocialStore::new(store_conn), rx)
    }

    #[tokio::test]
    async fn fires_start_edge_once() {
        let (mut engine, store, mut rx) = engine_with_store();
        let now = Utc::now();
        // Window already open but stored phase is upcoming (created in the past).
        let ch = store
            .create_challenge(
                "steps",
                "",
                None,
                now + Duration::milliseconds(1),
                now + Duration::days(1),
                "u1",
            )
            .unwrap();
        assert_eq!(ch.phase, ChallengePhase::Upcoming);
        std::thread::sleep(std::time::Duration::from_millis(5));

        engine.tick().unwrap();
        let t = rx.try_recv().unwrap();
        assert_eq!(t.to, ChallengePhase::Active);
        assert_eq!(t.challenge.id, ch.id);

        // second tick: edge already consumed
        engine.tick().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn skips_straight_to_ended_after_downtime() {
        let (mut engine, store, mut rx) = engine_with_store();
        let now = Utc::now();
        let ch = store
            .create_challenge(
                "short",
                "",
                None,
                now + Duration::milliseconds(1),
                now + Duration::milliseconds(2),
                "u1",
            )
            .unwrap();
        std::thread::sleep(std::time::Duration::from_millis(10));

        // Both edges passed while "down" — a single Ended transition fires.
        engine.tick().unwrap();
        let t = rx.try_recv().unwrap();
        assert_eq!(t.to, ChallengePhase::Ended);
        assert_eq!(t.challenge.id, ch.id);
        assert!(rx.try_recv().is_err());
    }
}
