pub mod db;
pub mod engine;
pub mod error;
pub mod store;
pub mod types;

pub use engine::{ChallengeEngine, Transition};
pub use error::SocialError;
pub use store::SocialStore;
pub use types::{Challenge, ChallengePhase, FeedItem, LeaderboardEntry, Notification, Team};
