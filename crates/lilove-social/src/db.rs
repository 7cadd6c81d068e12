use rusqlite::Connection;

use crate::error::Result;
use crate::types::{Challenge, ChallengePhase, FeedItem, Notification, Team};

/// Initialise all tables for the social subsystem. Safe to call on every
/// startup — CREATE IF NOT EXISTS throughout.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS teams (
            id         TEXT PRIMARY KEY NOT NULL,
            name       TEXT NOT NULL,
            owner_id   TEXT NOT NULL,
            created_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS team_members (
            team_id   TEXT NOT NULL REFERENCES teams(id),
            user_id   TEXT NOT NULL,
            joined_at TEXT NOT NULL,
            PRIMARY KEY (team_id, user_id)
        );
        CREATE INDEX IF NOT EXISTS idx_team_members_user
            ON team_members(user_id);

        CREATE TABLE IF NOT EXISTS challenges (
            id         TEXT PRIMARY KEY NOT NULL,
            team_id    TEXT,
            name       TEXT NOT NULL,
            goal       TEXT NOT NULL DEFAULT '',
            starts_at  TEXT NOT NULL,
            ends_at    TEXT NOT NULL,
            phase      TEXT NOT NULL DEFAULT 'upcoming',
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS challenge_members (
            challenge_id TEXT NOT NULL REFERENCES challenges(id),
            user_id      TEXT NOT NULL,
            joined_at    TEXT NOT NULL,
            PRIMARY KEY (challenge_id, user_id)
        );
        CREATE INDEX IF NOT EXISTS idx_challenge_members_user
            ON challenge_members(user_id);

        CREATE TABLE IF NOT EXISTS scores (
            challenge_id TEXT NOT NULL,
            user_id      TEXT NOT NULL,
            points       INTEGER NOT NULL DEFAULT 0,
            updated_at   TEXT NOT NULL,
            PRIMARY KEY (challenge_id, user_id)
        );

        CREATE TABLE IF NOT EXISTS feed_items (
            id         TEXT PRIMARY KEY NOT NULL,
            team_id    TEXT NOT NULL,
            kind       TEXT NOT NULL,
            actor_id   TEXT NOT NULL,
            body       TEXT NOT NULL DEFAULT '{}',  -- JSON
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_feed_items_team
            ON feed_items(team_id, created_at DESC);

        CREATE TABLE IF NOT EXISTS notifications (
            id         TEXT PRIMARY KEY NOT NULL,
            user_id    TEXT NOT NULL,
            kind       TEXT NOT NULL,
            body       TEXT NOT NULL DEFAULT '{}',  -- JSON
            created_at TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_notifications_user
            ON notifications(user_id, created_at DESC);",
    )?;
    Ok(())
}

pub(crate) fn row_to_team(row: &rusqlite::Row<'_>) -> rusqlite::Result<Team> {
    Ok(Team {
        id: row.get(0)?,
        name: row.get(1)?,
        owner_id: row.get(2)?,
        created_at: row.get(3)?,
    })
}

pub(crate) const CHALLENGE_SELECT_SQL: &str =
    "SELECT id, team_id, name, goal, starts_at, ends_at, phase, created_by, created_at
     FROM challenges";

pub(crate) fn row_to_challenge(row: &rusqlite::Row<'_>) -> rusqlite::Result<Challenge> {
    use std::str::FromStr;
    let phase =
        ChallengePhase::from_str(&row.get::<_, String>(6)?).unwrap_or(ChallengePhase::Upcoming);
    Ok(Challenge {
        id: row.get(0)?,
        team_id: row.get(1)?,
        name: row.get(2)?,
        goal: row.get(3)?,
        starts_at: row.get(4)?,
        ends_at: row.get(5)?,
        phase,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
    })
}

pub(crate) fn row_to_feed_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<FeedItem> {
    let body = serde_json::from_str(&row.get::<_, String>(4)?).unwrap_or_default();
    Ok(FeedItem {
        id: row.get(0)?,
        team_id: row.get(1)?,
        kind: row.get(2)?,
        actor_id: row.get(3)?,
        body,
        created_at: row.get(5)?,
    })
}

pub(crate) fn row_to_notification(row: &rusqlite::Row<'_>) -> rusqlite::Result<Notification> {
    let body = serde_json::from_str(&row.get::<_, String>(3)?).unwrap_or_default();
    Ok(Notification {
        id: row.get(0)?,
        user_id: row.get(1)?,
        kind: row.get(2)?,
        body,
        created_at: row.get(4)?,
    })
}
