pub mod frames;
pub mod handshake;
pub mod methods;
pub mod patch;
pub mod rooms;

pub use frames::{ErrorShape, EventFrame, InboundFrame, ReqFrame, ResFrame};
pub use patch::{CachePatch, PatchOp, QueryKey};
pub use rooms::RoomId;
