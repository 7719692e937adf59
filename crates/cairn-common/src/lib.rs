//! # cairn-common
//!
//! Common types and constants for the cairn storage core.
//!
//! This crate provides the foundational vocabulary shared by every storage
//! component:
//!
//! - **Types**: identifier newtypes (`PageId`, `FrameId`, `RecordId`) and the
//!   fixed-width slot codec used by in-page layouts
//! - **Constants**: page geometry and hash-directory limits
//!
//! ## Example
//!
//! ```rust
//! use cairn_common::types::{PageId, RecordId};
//!
//! let page = PageId::new(42);
//! assert!(page.is_valid());
//!
//! let rid = RecordId::new(page, 7);
//! assert_eq!(rid.page_id(), page);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod constants;
pub mod types;

// Re-export commonly used items at the crate root
pub use constants::*;
pub use types::{FixedCodec, FrameId, PageId, RecordId};
