/*!
 * Memory Traits
 * Memory management abstractions
 */

use super::types::*;
use crate::core::types::{Address, Size};

/// Memory allocator interface
pub trait Allocator: Send + Sync {
    /// Store a payload in a new block and return its handle
    fn allocate(&self, payload: &[u8]) -> MemoryResult<Address>;

    /// Release the block at an address
    fn deallocate(&self, address: Address) -> MemoryResult<()>;

    /// Copy out the payload stored at an address
    fn read(&self, address: Address) -> MemoryResult<Vec<u8>>;

    /// Overwrite a payload in place; the length must not change
    fn write(&self, address: Address, payload: &[u8]) -> MemoryResult<()>;

    /// Check if an address is a live block
    fn is_valid(&self, address: Address) -> bool;

    /// Get the payload length of a live block
    fn block_size(&self, address: Address) -> Option<Size>;
}

/// Memory statistics provider
pub trait MemoryInfo: Send + Sync {
    /// Get overall memory statistics
    fn stats(&self) -> MemoryStats;

    /// Get memory info as (total, used, available)
    fn info(&self) -> (Size, Size, Size);

    /// Get memory pressure level
    fn pressure(&self) -> MemoryPressure {
        self.stats().memory_pressure()
    }
}
