/*!
 * Core Types
 * Common types used across the allocator
 */

/// Offset into the managed region. `0` doubles as the null link.
pub type Address = usize;

/// Size type for memory operations
pub type Size = usize;

/// Index of a segment within the manager's segment table
pub type SegmentId = usize;

/// Index of a free list within a segment
pub type ClassIndex = usize;

/// Null value stored in free-list link fields
pub const NULL_ADDRESS: Address = 0;
