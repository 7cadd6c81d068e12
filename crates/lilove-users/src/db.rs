use rusqlite::Connection;

use crate::error::Result;
use crate::types::User;
use lilove_core::types::Tier;

/// Initialise all tables for the users subsystem. Safe to call on every
/// startup — CREATE IF NOT EXISTS means it's idempotent.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS users (
            id               TEXT PRIMARY KEY NOT NULL,
            display_name     TEXT NOT NULL,
            tier             TEXT NOT NULL DEFAULT 'free',
            streak_days      INTEGER NOT NULL DEFAULT 0,
            last_active_date TEXT,
            created_at       TEXT NOT NULL,
            updated_at       TEXT NOT NULL
        );
        CREATE TABLE IF NOT EXISTS auth_tokens (
            token_hash  TEXT PRIMARY KEY NOT NULL,
            user_id     TEXT NOT NULL REFERENCES users(id),
            created_at  TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_auth_tokens_user
            ON auth_tokens(user_id);",
    )?;
    Ok(())
}

pub(crate) const USER_SELECT_SQL: &str =
    "SELECT id, display_name, tier, streak_days, last_active_date, created_at, updated_at
     FROM users";

/// Map a SELECT row (column order from USER_SELECT_SQL) to a User.
/// Centralised here so every query in this crate stays consistent.
pub(crate) fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    use std::str::FromStr;
    let tier = Tier::from_str(&row.get::<_, String>(2)?).unwrap_or_default();
    Ok(User {
        id: row.get(0)?,
        display_name: row.get(1)?,
        tier,
        streak_days: row.get::<_, i64>(3)? as u32,
        last_active_date: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}
