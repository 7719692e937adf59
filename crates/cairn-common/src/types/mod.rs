//! Core types for the cairn storage core.

mod codec;
mod ids;

pub use codec::FixedCodec;
pub use ids::{FrameId, PageId, RecordId};
