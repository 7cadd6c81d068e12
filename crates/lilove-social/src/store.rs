use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde_json::Value;
use tracing::{info, instrument};
use uuid::Uuid;

use crate::db::{
    row_to_challenge, row_to_feed_item, row_to_notification, row_to_team, CHALLENGE_SELECT_SQL,
};
use crate::error::{Result, SocialError};
use crate::types::{Challenge, ChallengePhase, FeedItem, LeaderboardEntry, Notification, Team};

/// Thread-safe store for teams, challenges, scores, feed and notifications.
///
/// Wraps a single SQLite connection in a `Mutex` — sufficient for the
/// single-node target; a pool can replace it if profiling ever demands.
pub struct SocialStore {
    db: Mutex<Connection>,
}

impl SocialStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
        }
    }

    // ------------------------------------------------------------------
    // Teams
    // ------------------------------------------------------------------

    /// Create a team; the owner becomes its first member.
    #[instrument(skip(self))]
    pub fn create_team(&self, name: &str, owner_id: &str) -> Result<Team> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO teams (id, name, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            rusqlite::params![id, name, owner_id, now],
        )?;
        db.execute(
            "INSERT INTO team_members (team_id, user_id, joined_at) VALUES (?1, ?2, ?3)",
            rusqlite::params![id, owner_id, now],
        )?;
        info!(team_id = %id, %name, "team created");
        Ok(Team {
            id,
            name: name.to_string(),
            owner_id: owner_id.to_string(),
            created_at: now,
        })
    }

    pub fn get_team(&self, team_id: &str) -> Result<Option<Team>> {
        let db = self.db.lock().unwrap();
        match db.query_row(
            "SELECT id, name, owner_id, created_at FROM teams WHERE id = ?1",
            rusqlite::params![team_id],
            row_to_team,
        ) {
            Ok(t) => Ok(Some(t)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SocialError::Database(e)),
        }
    }

    /// Join a team. Idempotent — re-joining is a no-op.
    pub fn join_team(&self, team_id: &str, user_id: &str) -> Result<Team> {
        let team = self
            .get_team(team_id)?
            .ok_or_else(|| SocialError::NotFound {
                what: format!("team {team_id}"),
            })?;
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO team_members (team_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![team_id, user_id, now],
        )?;
        Ok(team)
    }

    /// Leave a team. Leaving a team you are not in is a no-op.
    pub fn leave_team(&self, team_id: &str, user_id: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        db.execute(
            "DELETE FROM team_members WHERE team_id = ?1 AND user_id = ?2",
            rusqlite::params![team_id, user_id],
        )?;
        Ok(())
    }

    pub fn is_team_member(&self, team_id: &str, user_id: &str) -> Result<bool> {
        let db = self.db.lock().unwrap();
        let count: i64 = db.query_row(
            "SELECT COUNT(*) FROM team_members WHERE team_id = ?1 AND user_id = ?2",
            rusqlite::params![team_id, user_id],
            |row| row.get(0),
        )?;
        Ok(count > 0)
    }

    /// Teams the user belongs to, oldest first.
    pub fn teams_of(&self, user_id: &str) -> Result<Vec<Team>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT t.id, t.name, t.owner_id, t.created_at
             FROM teams t JOIN team_members m ON m.team_id = t.id
             WHERE m.user_id = ?1
             ORDER BY t.created_at",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id], row_to_team)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ------------------------------------------------------------------
    // Challenges
    // ------------------------------------------------------------------

    /// Create a challenge; the creator becomes its first participant.
    /// The initial phase is derived from `starts_at`/`ends_at` against now.
    #[instrument(skip(self, goal))]
    pub fn create_challenge(
        &self,
        name: &str,
        goal: &str,
        team_id: Option<&str>,
        starts_at: DateTime<Utc>,
        ends_at: DateTime<Utc>,
        created_by: &str,
    ) -> Result<Challenge> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now();
        let phase = phase_for(starts_at, ends_at, now);
        let now_str = now.to_rfc3339();

        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO challenges
             (id, team_id, name, goal, starts_at, ends_at, phase, created_by, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)",
            rusqlite::params![
                id,
                team_id,
                name,
                goal,
                starts_at.to_rfc3339(),
                ends_at.to_rfc3339(),
                phase.to_string(),
                created_by,
                now_str
            ],
        )?;
        db.execute(
            "INSERT INTO challenge_members (challenge_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![id, created_by, now_str],
        )?;
        info!(challenge_id = %id, %name, %phase, "challenge created");
        Ok(Challenge {
            id,
            team_id: team_id.map(String::from),
            name: name.to_string(),
            goal: goal.to_string(),
            starts_at: starts_at.to_rfc3339(),
            ends_at: ends_at.to_rfc3339(),
            phase,
            created_by: created_by.to_string(),
            created_at: now_str,
        })
    }

    pub fn get_challenge(&self, challenge_id: &str) -> Result<Option<Challenge>> {
        let db = self.db.lock().unwrap();
        let sql = format!("{CHALLENGE_SELECT_SQL} WHERE id = ?1");
        match db.query_row(&sql, rusqlite::params![challenge_id], row_to_challenge) {
            Ok(c) => Ok(Some(c)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(SocialError::Database(e)),
        }
    }

    /// Join a challenge. Idempotent.
    pub fn join_challenge(&self, challenge_id: &str, user_id: &str) -> Result<Challenge> {
        let challenge = self
            .get_challenge(challenge_id)?
            .ok_or_else(|| SocialError::NotFound {
                what: format!("challenge {challenge_id}"),
            })?;
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR IGNORE INTO challenge_members (challenge_id, user_id, joined_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![challenge_id, user_id, now],
        )?;
        Ok(challenge)
    }

    /// Challenges visible to a user: every open challenge plus those of the
    /// user's teams, newest first.
    pub fn challenges_for(&self, user_id: &str, limit: usize) -> Result<Vec<Challenge>> {
        let db = self.db.lock().unwrap();
        let sql = format!(
            "{CHALLENGE_SELECT_SQL}
             WHERE team_id IS NULL
                OR team_id IN (SELECT team_id FROM team_members WHERE user_id = ?1)
             ORDER BY created_at DESC
             LIMIT ?2"
        );
        let mut stmt = db.prepare(&sql)?;
        let rows = stmt.query_map(rusqlite::params![user_id, limit as i64], row_to_challenge)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    /// Challenges the user participates in (for handshake room auto-join).
    pub fn challenge_ids_of(&self, user_id: &str) -> Result<Vec<String>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT challenge_id FROM challenge_members WHERE user_id = ?1 ORDER BY joined_at",
        )?;
        let rows = stmt.query_map(rusqlite::params![user_id], |row| row.get(0))?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ------------------------------------------------------------------
    // Scores / leaderboard
    // ------------------------------------------------------------------

    /// Accumulate progress points for a user in an active challenge and
    /// return their new total.
    #[instrument(skip(self))]
    pub fn record_progress(
        &self,
        challenge_id: &str,
        user_id: &str,
        points: i64,
    ) -> Result<i64> {
        let challenge = self
            .get_challenge(challenge_id)?
            .ok_or_else(|| SocialError::NotFound {
                what: format!("challenge {challenge_id}"),
            })?;
        if challenge.phase != ChallengePhase::Active {
            return Err(SocialError::NotActive {
                id: challenge_id.to_string(),
            });
        }

        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO scores (challenge_id, user_id, points, updated_at)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(challenge_id, user_id)
             DO UPDATE SET points = points + excluded.points, updated_at = excluded.updated_at",
            rusqlite::params![challenge_id, user_id, points, now],
        )?;
        let total: i64 = db.query_row(
            "SELECT points FROM scores WHERE challenge_id = ?1 AND user_id = ?2",
            rusqlite::params![challenge_id, user_id],
            |row| row.get(0),
        )?;
        Ok(total)
    }

    /// Top entries for a challenge, highest points first. Rank is dense
    /// by position (ties share nothing — stable id tiebreak keeps output
    /// deterministic).
    pub fn leaderboard(&self, challenge_id: &str, limit: usize) -> Result<Vec<LeaderboardEntry>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT user_id, points FROM scores
             WHERE challenge_id = ?1
             ORDER BY points DESC, user_id
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![challenge_id, limit as i64], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
        })?;
        Ok(rows
            .filter_map(|r| r.ok())
            .enumerate()
            .map(|(i, (id, points))| LeaderboardEntry {
                id,
                points,
                rank: i as u32 + 1,
            })
            .collect())
    }

    // ------------------------------------------------------------------
    // Feed
    // ------------------------------------------------------------------

    pub fn add_feed_item(
        &self,
        team_id: &str,
        kind: &str,
        actor_id: &str,
        body: Value,
    ) -> Result<FeedItem> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO feed_items (id, team_id, kind, actor_id, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rusqlite::params![id, team_id, kind, actor_id, body.to_string(), now],
        )?;
        Ok(FeedItem {
            id,
            team_id: team_id.to_string(),
            kind: kind.to_string(),
            actor_id: actor_id.to_string(),
            body,
            created_at: now,
        })
    }

    /// Newest-first feed page for a team.
    pub fn list_feed(&self, team_id: &str, limit: usize) -> Result<Vec<FeedItem>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, team_id, kind, actor_id, body, created_at
             FROM feed_items
             WHERE team_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows = stmt.query_map(rusqlite::params![team_id, limit as i64], row_to_feed_item)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }

    // ------------------------------------------------------------------
    // Notifications
    // ------------------------------------------------------------------

    pub fn add_notification(
        &self,
        user_id: &str,
        kind: &str,
        body: Value,
    ) -> Result<Notification> {
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO notifications (id, user_id, kind, body, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![id, user_id, kind, body.to_string(), now],
        )?;
        Ok(Notification {
            id,
            user_id: user_id.to_string(),
            kind: kind.to_string(),
            body,
            created_at: now,
        })
    }

    /// Newest-first notification page for a user.
    pub fn list_notifications(&self, user_id: &str, limit: usize) -> Result<Vec<Notification>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare(
            "SELECT id, user_id, kind, body, created_at
             FROM notifications
             WHERE user_id = ?1
             ORDER BY created_at DESC, id DESC
             LIMIT ?2",
        )?;
        let rows =
            stmt.query_map(rusqlite::params![user_id, limit as i64], row_to_notification)?;
        Ok(rows.filter_map(|r| r.ok()).collect())
    }
}

/// Phase a challenge should be in at `now` given its window.
pub(crate) fn phase_for(
    starts_at: DateTime<Utc>,
    ends_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> ChallengePhase {
    if now < starts_at {
        ChallengePhase::Upcoming
    } else if now < ends_at {
        ChallengePhase::Active
    } else {
        ChallengePhase::Ended
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn store() -> SocialStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        SocialStore::new(conn)
    }

    fn active_challenge(store: &SocialStore, team: Option<&str>) -> Challenge {
        let now = Utc::now();
        store
            .create_challenge(
                "10k steps",
                "walk 10k steps a day",
                team,
                now - Duration::hours(1),
                now + Duration::days(7),
                "u-owner",
            )
            .unwrap()
    }

    #[test]
    fn team_membership_lifecycle() {
        let store = store();
        let team = store.create_team("morning crew", "u1").unwrap();

        assert!(store.is_team_member(&team.id, "u1").unwrap());
        store.join_team(&team.id, "u2").unwrap();
        store.join_team(&team.id, "u2").unwrap(); // idempotent
        assert!(store.is_team_member(&team.id, "u2").unwrap());

        store.leave_team(&team.id, "u2").unwrap();
        assert!(!store.is_team_member(&team.id, "u2").unwrap());
        assert_eq!(store.teams_of("u1").unwrap().len(), 1);
    }

    #[test]
    fn joining_missing_team_fails() {
        let store = store();
        assert!(matches!(
            store.join_team("nope", "u1"),
            Err(SocialError::NotFound { .. })
        ));
    }

    #[test]
    fn progress_accumulates_and_ranks() {
        let store = store();
        let ch = active_challenge(&store, None);

        assert_eq!(store.record_progress(&ch.id, "u1", 10).unwrap(), 10);
        assert_eq!(store.record_progress(&ch.id, "u1", 5).unwrap(), 15);
        store.record_progress(&ch.id, "u2", 20).unwrap();

        let board = store.leaderboard(&ch.id, 10).unwrap();
        assert_eq!(board[0].id, "u2");
        assert_eq!(board[0].rank, 1);
        assert_eq!(board[1].id, "u1");
        assert_eq!(board[1].points, 15);
    }

    #[test]
    fn progress_rejected_outside_active_window() {
        let store = store();
        let now = Utc::now();
        let upcoming = store
            .create_challenge(
                "later",
                "",
                None,
                now + Duration::days(1),
                now + Duration::days(2),
                "u1",
            )
            .unwrap();
        assert_eq!(upcoming.phase, ChallengePhase::Upcoming);
        assert!(matches!(
            store.record_progress(&upcoming.id, "u1", 1),
            Err(SocialError::NotActive { .. })
        ));
    }

    #[test]
    fn feed_is_newest_first_and_limited() {
        let store = store();
        for i in 0..5 {
            store
                .add_feed_item("t1", "goal_completed", "u1", serde_json::json!({ "n": i }))
                .unwrap();
        }
        let feed = store.list_feed("t1", 3).unwrap();
        assert_eq!(feed.len(), 3);
        assert_eq!(feed[0].body["n"], 4);
        assert_eq!(feed[2].body["n"], 2);
    }

    #[test]
    fn team_scoped_challenges_hidden_from_outsiders() {
        let store = store();
        let team = store.create_team("crew", "u1").unwrap();
        active_challenge(&store, Some(&team.id));
        active_challenge(&store, None);

        let visible_member = store.challenges_for("u1", 10).unwrap();
        assert_eq!(visible_member.len(), 2);

        let visible_outsider = store.challenges_for("u9", 10).unwrap();
        assert_eq!(visible_outsider.len(), 1);
        assert!(visible_outsider[0].team_id.is_none());
    }

    #[test]
    fn notifications_page_per_user() {
        let store = store();
        store
            .add_notification("u1", "streak", serde_json::json!({ "days": 3 }))
            .unwrap();
        store
            .add_notification("u2", "streak", serde_json::json!({ "days": 9 }))
            .unwrap();

        let page = store.list_notifications("u1", 10).unwrap();
        assert_eq!(page.len(), 1);
        assert_eq!(page[0].body["days"], 3);
    }
}
