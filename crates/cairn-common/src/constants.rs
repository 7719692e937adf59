//! System-wide constants for the cairn storage core.

// =============================================================================
// Page and Memory Constants
// =============================================================================

/// Size of a disk page in bytes (4 KB).
///
/// Pages are the unit of both disk I/O and buffer-pool caching. The buffer
/// pool treats page contents as opaque; interpretation belongs to the page
/// layout types.
pub const PAGE_SIZE: usize = 4 * 1024;

/// Default number of frames in a single buffer-pool instance.
pub const DEFAULT_POOL_SIZE: usize = 64;

/// Default number of buffer-pool instances in a parallel pool.
pub const DEFAULT_NUM_INSTANCES: usize = 1;

// =============================================================================
// Hash Index Constants
// =============================================================================

/// Number of bucket slots in a hash directory page.
///
/// The directory array must grow in powers of two; 512 entries leave room in
/// one page for the global depth and the per-entry local depths.
pub const DIRECTORY_ARRAY_SIZE: usize = 512;

/// Maximum global depth of a hash directory (`2^9 = 512` entries).
pub const DIRECTORY_MAX_DEPTH: u32 = 9;

/// Number of (key, value) slots that fit in one hash bucket page.
///
/// Each slot costs `entry_len` bytes of payload plus two bitmap bits
/// (occupied and readable), i.e. a quarter byte:
/// `4 * PAGE_SIZE / (4 * entry_len + 1)`.
pub const fn bucket_capacity(entry_len: usize) -> usize {
    (4 * PAGE_SIZE) / (4 * entry_len + 1)
}
