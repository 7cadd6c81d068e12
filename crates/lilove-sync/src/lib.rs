//! Client-side view cache: the reference implementation of the cache-update
//! protocol the web and mobile clients mirror.
//!
//! Each cached query (a "view") is a list the UI renders directly — a feed,
//! a leaderboard, a notification tray, a chat scrollback. Incoming room
//! events carry an optional [`CachePatch`] describing how to splice the event
//! into a view without a refetch. Consistency rests on per-room seqs: an
//! in-order event is spliced, a duplicate is ignored, and a gap marks every
//! view scoped to that room stale so the UI refetches instead of rendering a
//! hole. No reordering, no holding back patches — the transport is
//! at-most-once and the cache never pretends otherwise.

pub mod cache;

pub use cache::{ViewCache, ViewStatus};
