pub mod registry;

pub use registry::{Replay, RoomRegistry};
