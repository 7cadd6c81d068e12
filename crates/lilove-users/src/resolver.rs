use std::collections::HashMap;
use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use tracing::{debug, info};
use uuid::Uuid;

use crate::db::{row_to_user, USER_SELECT_SQL};
use crate::error::{Result, UserError};
use crate::types::User;
use lilove_core::types::Tier;

/// Maximum number of token-hash → user_id pairs kept in the in-process
/// cache. Simple eviction: when full, drop the oldest half.
const CACHE_MAX: usize = 256;

/// SQLite-backed user store with a hot-path token cache.
///
/// Every WS handshake calls [`resolve_token`](Self::resolve_token); the
/// cache avoids a DB round-trip for reconnecting clients. Token *minting*
/// belongs to the session collaborator — this store only verifies.
pub struct UserStore {
    db: Mutex<Connection>,
    /// Key: token hash, Value: user_id.
    /// Insertion order tracked in a parallel Vec for eviction (simple; good
    /// enough until profiling justifies a real LRU crate).
    cache: Mutex<HashMap<String, String>>,
    cache_order: Mutex<Vec<String>>,
}

impl UserStore {
    /// Wrap an already-open (and `init_db`-initialised) connection.
    pub fn new(conn: Connection) -> Self {
        Self {
            db: Mutex::new(conn),
            cache: Mutex::new(HashMap::new()),
            cache_order: Mutex::new(Vec::new()),
        }
    }

    /// Create a user row. Tier defaults to free until the payment webhook
    /// says otherwise.
    pub fn create_user(&self, display_name: &str, tier: Tier) -> Result<User> {
        let id = Uuid::now_v7().to_string();
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT INTO users (id, display_name, tier, streak_days, created_at, updated_at)
             VALUES (?1, ?2, ?3, 0, ?4, ?4)",
            rusqlite::params![id, display_name, tier.to_string(), now],
        )?;
        info!(user_id = %id, %display_name, "user created");
        self.get_user(&id)?
            .ok_or_else(|| UserError::NotFound(id))
    }

    /// Look up a user by primary key. Returns None if no user exists.
    pub fn get_user(&self, user_id: &str) -> Result<Option<User>> {
        let db = self.db.lock().unwrap();
        let sql = format!("{USER_SELECT_SQL} WHERE id = ?1");
        match db.query_row(&sql, rusqlite::params![user_id], row_to_user) {
            Ok(u) => Ok(Some(u)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(UserError::Database(e)),
        }
    }

    /// Overwrite the resolved subscription tier (payment webhook collaborator).
    pub fn set_tier(&self, user_id: &str, tier: Tier) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        let rows = db.execute(
            "UPDATE users SET tier = ?1, updated_at = ?2 WHERE id = ?3",
            rusqlite::params![tier.to_string(), now, user_id],
        )?;
        if rows == 0 {
            return Err(UserError::NotFound(user_id.to_string()));
        }
        info!(user_id, %tier, "tier updated");
        Ok(())
    }

    /// Register a bearer token for a user. Only the SHA-256 hash is stored.
    pub fn register_token(&self, user_id: &str, token: &str) -> Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "INSERT OR REPLACE INTO auth_tokens (token_hash, user_id, created_at)
             VALUES (?1, ?2, ?3)",
            rusqlite::params![hash_token(token), user_id, now],
        )?;
        Ok(())
    }

    /// Resolve a bearer token to its user.
    ///
    /// Hot path for every handshake — the (hash → user_id) cache skips the
    /// token table lookup for known tokens.
    pub fn resolve_token(&self, token: &str) -> Result<User> {
        let hash = hash_token(token);

        // Fast path: cache hit avoids one query.
        if let Some(user_id) = self.cache_lookup(&hash) {
            debug!(user_id, "token cache hit");
            if let Some(user) = self.get_user(&user_id)? {
                return Ok(user);
            }
            // User deleted externally; fall through to the full lookup.
            self.cache_remove(&hash);
        }

        let user_id: String = {
            let db = self.db.lock().unwrap();
            match db.query_row(
                "SELECT user_id FROM auth_tokens WHERE token_hash = ?1",
                rusqlite::params![hash],
                |row| row.get(0),
            ) {
                Ok(id) => id,
                Err(rusqlite::Error::QueryReturnedNoRows) => return Err(UserError::UnknownToken),
                Err(e) => return Err(UserError::Database(e)),
            }
        };

        let user = self
            .get_user(&user_id)?
            .ok_or_else(|| UserError::NotFound(user_id.clone()))?;
        self.cache_insert(hash, user_id);
        Ok(user)
    }

    /// Record goal activity on `date` (ISO YYYY-MM-DD) and return the new
    /// streak length.
    ///
    /// Same-day repeats keep the streak; a one-day gap extends it; anything
    /// longer resets to 1.
    pub fn record_activity(&self, user_id: &str, date: &str) -> Result<u32> {
        let user = self
            .get_user(user_id)?
            .ok_or_else(|| UserError::NotFound(user_id.to_string()))?;

        let streak = match &user.last_active_date {
            Some(last) if last == date => user.streak_days,
            Some(last) if is_next_day(last, date) => user.streak_days + 1,
            _ => 1,
        };

        let now = chrono::Utc::now().to_rfc3339();
        let db = self.db.lock().unwrap();
        db.execute(
            "UPDATE users SET streak_days = ?1, last_active_date = ?2, updated_at = ?3
             WHERE id = ?4",
            rusqlite::params![streak, date, now, user_id],
        )?;
        Ok(streak)
    }

    fn cache_lookup(&self, hash: &str) -> Option<String> {
        self.cache.lock().unwrap().get(hash).cloned()
    }

    fn cache_remove(&self, hash: &str) {
        self.cache.lock().unwrap().remove(hash);
        self.cache_order.lock().unwrap().retain(|h| h != hash);
    }

    fn cache_insert(&self, hash: String, user_id: String) {
        let mut cache = self.cache.lock().unwrap();
        let mut order = self.cache_order.lock().unwrap();
        if cache.len() >= CACHE_MAX {
            // Drop the oldest half in one sweep.
            let cutoff = order.len() / 2;
            for old in order.drain(..cutoff) {
                cache.remove(&old);
            }
        }
        if cache.insert(hash.clone(), user_id).is_none() {
            order.push(hash);
        }
    }
}

/// SHA-256 hex digest — tokens never touch the database in plaintext.
fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

fn is_next_day(last: &str, date: &str) -> bool {
    match (
        NaiveDate::parse_from_str(last, "%Y-%m-%d"),
        NaiveDate::parse_from_str(date, "%Y-%m-%d"),
    ) {
        (Ok(a), Ok(b)) => b - a == chrono::Duration::days(1),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> UserStore {
        let conn = Connection::open_in_memory().unwrap();
        crate::db::init_db(&conn).unwrap();
        UserStore::new(conn)
    }

    #[test]
    fn token_resolution_round_trip() {
        let store = store();
        let user = store.create_user("ada", Tier::Premium).unwrap();
        store.register_token(&user.id, "tok-secret").unwrap();

        let resolved = store.resolve_token("tok-secret").unwrap();
        assert_eq!(resolved.id, user.id);
        assert_eq!(resolved.tier, Tier::Premium);

        // second resolve exercises the cache path
        let resolved = store.resolve_token("tok-secret").unwrap();
        assert_eq!(resolved.display_name, "ada");
    }

    #[test]
    fn unknown_token_is_rejected() {
        let store = store();
        assert!(matches!(
            store.resolve_token("nope"),
            Err(UserError::UnknownToken)
        ));
    }

    #[test]
    fn tier_update_changes_entitlements() {
        let store = store();
        let user = store.create_user("bo", Tier::Free).unwrap();
        assert!(!user.entitlements().coach);

        store.set_tier(&user.id, Tier::Team).unwrap();
        let user = store.get_user(&user.id).unwrap().unwrap();
        assert!(user.entitlements().coach && user.entitlements().create_teams);
    }

    #[test]
    fn streak_extends_and_resets() {
        let store = store();
        let user = store.create_user("cy", Tier::Free).unwrap();

        assert_eq!(store.record_activity(&user.id, "2026-08-28").unwrap(), 1);
        // same day: unchanged
        assert_eq!(store.record_activity(&user.id, "2026-08-28").unwrap(), 1);
        // next day: extends
        assert_eq!(store.record_activity(&user.id, "2026-08-29").unwrap(), 2);
        assert_eq!(store.record_activity(&user.id, "2026-08-30").unwrap(), 3);
        // gap: resets
        assert_eq!(store.record_activity(&user.id, "2026-09-05").unwrap(), 1);
    }
}
