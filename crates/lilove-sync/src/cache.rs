use std::collections::HashMap;

use lilove_protocol::patch::{CachePatch, PatchOp, QueryKey};
use serde_json::Value;
use tracing::{debug, warn};

/// Whether a view's items can be trusted or must be refetched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewStatus {
    Fresh,
    Stale,
}

struct View {
    room: String,
    items: Vec<Value>,
    status: ViewStatus,
}

/// In-memory mirror of the client's query cache.
///
/// Views are registered against the room whose events feed them. Seq
/// tracking is per room, not per view — one room event may patch one view
/// and still advance the shared cursor for all of them.
pub struct ViewCache {
    views: HashMap<QueryKey, View>,
    /// Last seq applied per room wire string. Absent = no event seen yet.
    room_seq: HashMap<String, u64>,
    /// Cap on prepend-style views (matches the server's page size).
    view_limit: usize,
}

impl ViewCache {
    pub fn new(view_limit: usize) -> Self {
        Self {
            views: HashMap::new(),
            room_seq: HashMap::new(),
            view_limit,
        }
    }

    /// Register a view fed by `room`, seeded with a fetched snapshot.
    pub fn track(&mut self, query: QueryKey, room: impl Into<String>, items: Vec<Value>) {
        self.views.insert(
            query,
            View {
                room: room.into(),
                items,
                status: ViewStatus::Fresh,
            },
        );
    }

    /// Replace a view's items after a refetch, clearing staleness.
    pub fn seed(&mut self, query: &QueryKey, items: Vec<Value>) {
        if let Some(view) = self.views.get_mut(query) {
            view.items = items;
            view.status = ViewStatus::Fresh;
        }
    }

    /// Apply one room event. `patch` is `None` for events that only toast
    /// (they still advance the room cursor).
    ///
    /// Ordering rules per room:
    /// - first event seen, or `seq == last + 1`: in order, splice.
    /// - `seq <= last`: duplicate redelivery, ignore.
    /// - `seq > last + 1`: gap — every view fed by the room goes stale, the
    ///   cursor jumps forward, and the patch is still applied (splice ops are
    ///   idempotent and the refetch will overwrite anyway).
    pub fn apply(&mut self, room: &str, seq: u64, patch: Option<&CachePatch>) {
        match self.room_seq.get(room).copied() {
            Some(last) if seq <= last => {
                debug!(room, seq, last, "duplicate event ignored");
                return;
            }
            Some(last) if seq > last + 1 => {
                warn!(room, seq, last, "seq gap — marking room views stale");
                self.mark_room_stale(room);
            }
            _ => {}
        }
        self.room_seq.insert(room.to_string(), seq);

        if let Some(patch) = patch {
            self.splice(patch);
        }
    }

    /// Handle the resume outcome for one room after a reconnect.
    ///
    /// Replayed events are fed through [`apply`](Self::apply) by the caller;
    /// a refetch outcome can't be patched over — everything scoped to the
    /// room is stale and the cursor resets to the server's position lazily
    /// (the next in-order event re-establishes it).
    pub fn on_refetch(&mut self, room: &str) {
        self.mark_room_stale(room);
        self.room_seq.remove(room);
    }

    /// Current items of a view, if tracked.
    pub fn items(&self, query: &QueryKey) -> Option<&[Value]> {
        self.views.get(query).map(|v| v.items.as_slice())
    }

    pub fn status(&self, query: &QueryKey) -> Option<ViewStatus> {
        self.views.get(query).map(|v| v.status)
    }

    /// Queries currently needing a refetch, sorted for deterministic output.
    pub fn stale_queries(&self) -> Vec<QueryKey> {
        let mut stale: Vec<QueryKey> = self
            .views
            .iter()
            .filter(|(_, v)| v.status == ViewStatus::Stale)
            .map(|(q, _)| q.clone())
            .collect();
        stale.sort_by(|a, b| a.as_str().cmp(b.as_str()));
        stale
    }

    fn mark_room_stale(&mut self, room: &str) {
        for view in self.views.values_mut().filter(|v| v.room == room) {
            view.status = ViewStatus::Stale;
        }
    }

    fn splice(&mut self, patch: &CachePatch) {
        let limit = self.view_limit;
        let Some(view) = self.views.get_mut(&patch.query) else {
            // View not mounted on this client — nothing to splice.
            return;
        };

        match &patch.op {
            PatchOp::Prepend { item } => {
                view.items.insert(0, item.clone());
                view.items.truncate(limit);
            }
            PatchOp::Upsert { key, item } => upsert(&mut view.items, key, item),
            PatchOp::Remove { key } => {
                view.items.retain(|it| item_key(it) != Some(key.as_str()));
            }
            PatchOp::Replace { items } => {
                view.items = items.clone();
                view.status = ViewStatus::Fresh;
            }
            PatchOp::Invalidate => {
                view.status = ViewStatus::Stale;
            }
        }
    }
}

fn item_key(item: &Value) -> Option<&str> {
    item.get("id").and_then(Value::as_str)
}

/// Merge `item` into the entry with matching `id`, appending when absent.
/// Object fields merge shallowly; anything else replaces wholesale.
fn upsert(items: &mut Vec<Value>, key: &str, item: &Value) {
    match items.iter_mut().find(|it| item_key(it) == Some(key)) {
        Some(existing) => match (existing.as_object_mut(), item.as_object()) {
            (Some(target), Some(source)) => {
                for (k, v) in source {
                    target.insert(k.clone(), v.clone());
                }
            }
            _ => *existing = item.clone(),
        },
        None => items.push(item.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn feed_query() -> QueryKey {
        QueryKey::feed_team("t1")
    }

    fn cache_with_feed() -> ViewCache {
        let mut cache = ViewCache::new(3);
        cache.track(
            feed_query(),
            "team:t1",
            vec![json!({"id": "f2", "text": "old"}), json!({"id": "f1"})],
        );
        cache
    }

    fn prepend_patch(id: &str) -> CachePatch {
        CachePatch::prepend(feed_query(), json!({"id": id}))
    }

    #[test]
    fn in_order_prepend_splices_at_head() {
        let mut cache = cache_with_feed();
        cache.apply("team:t1", 1, Some(&prepend_patch("f3")));

        let items = cache.items(&feed_query()).unwrap();
        assert_eq!(items[0]["id"], "f3");
        assert_eq!(cache.status(&feed_query()), Some(ViewStatus::Fresh));
    }

    #[test]
    fn prepend_respects_view_limit() {
        let mut cache = cache_with_feed();
        cache.apply("team:t1", 1, Some(&prepend_patch("f3")));
        cache.apply("team:t1", 2, Some(&prepend_patch("f4")));

        let items = cache.items(&feed_query()).unwrap();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0]["id"], "f4");
        assert_eq!(items[2]["id"], "f2");
    }

    #[test]
    fn duplicate_seq_is_ignored() {
        let mut cache = cache_with_feed();
        cache.apply("team:t1", 1, Some(&prepend_patch("f3")));
        cache.apply("team:t1", 1, Some(&prepend_patch("f3")));

        assert_eq!(cache.items(&feed_query()).unwrap().len(), 3);
    }

    #[test]
    fn seq_gap_marks_room_views_stale() {
        let mut cache = cache_with_feed();
        let lb = QueryKey::leaderboard("c1");
        cache.track(lb.clone(), "challenge:c1", vec![]);

        cache.apply("team:t1", 1, None);
        cache.apply("team:t1", 5, Some(&prepend_patch("f9")));

        assert_eq!(cache.status(&feed_query()), Some(ViewStatus::Stale));
        // other rooms untouched
        assert_eq!(cache.status(&lb), Some(ViewStatus::Fresh));
        assert_eq!(cache.stale_queries(), vec![feed_query()]);
    }

    #[test]
    fn events_after_gap_keep_applying_in_order() {
        let mut cache = cache_with_feed();
        cache.apply("team:t1", 1, None);
        cache.apply("team:t1", 5, None);
        // cursor jumped to 5; 6 is in order again
        cache.apply("team:t1", 6, Some(&prepend_patch("f6")));
        assert_eq!(cache.items(&feed_query()).unwrap()[0]["id"], "f6");
    }

    #[test]
    fn upsert_merges_by_id_and_appends_when_absent() {
        let mut cache = ViewCache::new(10);
        let lb = QueryKey::leaderboard("c1");
        cache.track(
            lb.clone(),
            "challenge:c1",
            vec![json!({"id": "u1", "points": 10, "name": "ada"})],
        );

        cache.apply(
            "challenge:c1",
            1,
            Some(&CachePatch::upsert(lb.clone(), "u1", json!({"id": "u1", "points": 25}))),
        );
        cache.apply(
            "challenge:c1",
            2,
            Some(&CachePatch::upsert(lb.clone(), "u2", json!({"id": "u2", "points": 5}))),
        );

        let items = cache.items(&lb).unwrap();
        assert_eq!(items[0]["points"], 25);
        // shallow merge keeps fields the patch did not carry
        assert_eq!(items[0]["name"], "ada");
        assert_eq!(items[1]["id"], "u2");
    }

    #[test]
    fn upsert_is_idempotent_under_redelivery() {
        let mut cache = ViewCache::new(10);
        let lb = QueryKey::leaderboard("c1");
        cache.track(lb.clone(), "challenge:c1", vec![]);
        let patch = CachePatch::upsert(lb.clone(), "u1", json!({"id": "u1", "points": 5}));

        // same patch under a gap-jumped cursor: applied once, ignored once
        cache.apply("challenge:c1", 3, Some(&patch));
        cache.apply("challenge:c1", 3, Some(&patch));

        assert_eq!(cache.items(&lb).unwrap().len(), 1);
    }

    #[test]
    fn remove_deletes_by_id() {
        let mut cache = cache_with_feed();
        cache.apply(
            "team:t1",
            1,
            Some(&CachePatch::remove(feed_query(), "f1")),
        );
        let items = cache.items(&feed_query()).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["id"], "f2");
    }

    #[test]
    fn invalidate_marks_single_view_stale() {
        let mut cache = cache_with_feed();
        cache.apply(
            "team:t1",
            1,
            Some(&CachePatch::invalidate(feed_query())),
        );
        assert_eq!(cache.status(&feed_query()), Some(ViewStatus::Stale));
    }

    #[test]
    fn seed_clears_staleness() {
        let mut cache = cache_with_feed();
        cache.on_refetch("team:t1");
        assert_eq!(cache.status(&feed_query()), Some(ViewStatus::Stale));

        cache.seed(&feed_query(), vec![json!({"id": "fresh"})]);
        assert_eq!(cache.status(&feed_query()), Some(ViewStatus::Fresh));
        assert_eq!(cache.items(&feed_query()).unwrap().len(), 1);
    }

    #[test]
    fn refetch_resets_room_cursor() {
        let mut cache = cache_with_feed();
        cache.apply("team:t1", 40, None);
        cache.on_refetch("team:t1");

        // first event after refetch is treated as a fresh baseline, not a gap
        cache.seed(&feed_query(), vec![]);
        cache.apply("team:t1", 44, Some(&prepend_patch("f44")));
        assert_eq!(cache.status(&feed_query()), Some(ViewStatus::Fresh));
    }

    #[test]
    fn untracked_view_patch_is_a_noop() {
        let mut cache = ViewCache::new(5);
        cache.apply("team:t1", 1, Some(&prepend_patch("f1")));
        assert!(cache.items(&feed_query()).is_none());
    }
}
