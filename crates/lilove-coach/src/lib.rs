pub mod anthropic;
pub mod canned;
pub mod provider;
pub mod runtime;

pub use provider::{CoachContext, CoachProvider, CoachReply, CoachRequest, ProviderError};
pub use runtime::CoachRuntime;
