//! In-page layouts for the extendible hash index.
//!
//! The buffer pool hands out opaque byte buffers; the types in this module
//! interpret those bytes. Layouts use explicit offsets and fixed-width
//! little-endian integers — native struct layout and padding are never
//! relied upon. Each page type comes as a read view over `&[u8]` and a
//! mutable view over `&mut [u8]`, both borrowing a pinned page's data.
//!
//! - [`HashDirectoryPage`] / [`HashDirectoryPageMut`]: the directory —
//!   global depth plus one (bucket page ID, local depth) entry per slot
//! - [`HashBucketPage`] / [`HashBucketPageMut`]: a bucket — occupied and
//!   readable bitmaps over a fixed array of (key, value) slots

mod bucket;
mod directory;

pub use bucket::{HashBucketPage, HashBucketPageMut};
pub use directory::{HashDirectoryPage, HashDirectoryPageMut};
