/*!
 * Off-Heap Memory Manager Library
 * Segmented concurrent allocator over a single off-heap region
 */

pub mod core;
pub mod memory;

// Re-exports
pub use crate::core::types::{Address, SegmentId, Size};
pub use memory::{
    Allocator, AllocatorConfig, MemoryError, MemoryInfo, MemoryManager, MemoryPressure,
    MemoryResult, MemoryStats, SegmentReport, SegmentStats,
};
