/*!
 * Allocator Configuration
 *
 * Construction parameters for the memory manager. Raw values are kept as
 * given; `effective_*` accessors apply the region floor and block-size cap.
 */

use super::types::{MemoryError, MemoryResult};
use crate::core::limits::{
    DEFAULT_REGION_SIZE, DEFAULT_WORKER_COUNT, MAX_BLOCK_SIZE, MAX_REGION_SIZE, MIN_LINKED_BLOCK,
};
use crate::core::types::Size;
use serde::{Deserialize, Serialize};

/// Memory manager configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocatorConfig {
    /// Requested region size in bytes
    pub total_size: u64,
    /// Number of independently locked segments
    pub segment_count: u32,
    /// Size of the free blocks each segment starts with (and the coalescing cap)
    pub init_block_size: u32,
}

impl Default for AllocatorConfig {
    fn default() -> Self {
        let cpus = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(DEFAULT_WORKER_COUNT);
        Self {
            total_size: DEFAULT_REGION_SIZE as u64,
            segment_count: cpus as u32,
            init_block_size: MAX_BLOCK_SIZE as u32,
        }
    }
}

impl AllocatorConfig {
    pub fn new(total_size: u64, segment_count: u32, init_block_size: u32) -> Self {
        Self {
            total_size,
            segment_count,
            init_block_size,
        }
    }

    pub fn with_total_size(mut self, total_size: u64) -> Self {
        self.total_size = total_size;
        self
    }

    pub fn with_segments(mut self, segment_count: u32) -> Self {
        self.segment_count = segment_count;
        self
    }

    pub fn with_init_block_size(mut self, init_block_size: u32) -> Self {
        self.init_block_size = init_block_size;
        self
    }

    /// Parse a JSON configuration; missing fields take their defaults
    pub fn from_json(json: &str) -> MemoryResult<Self> {
        serde_json::from_str(json).map_err(|e| MemoryError::InvalidConfig(e.to_string()))
    }

    /// Initial block size after applying the hard cap
    pub fn effective_init_block_size(&self) -> Size {
        (self.init_block_size as Size).min(MAX_BLOCK_SIZE)
    }

    /// Region size: large enough for one full block (plus markers) per segment
    pub fn effective_region_size(&self) -> Size {
        let floor = self.segment_count as u64 * (self.init_block_size as u64 + 2);
        self.total_size.max(floor) as Size
    }

    pub fn validate(&self) -> MemoryResult<()> {
        if self.segment_count == 0 {
            return Err(MemoryError::InvalidConfig(
                "segment_count must be at least 1".to_string(),
            ));
        }
        if self.effective_init_block_size() < MIN_LINKED_BLOCK {
            return Err(MemoryError::InvalidConfig(format!(
                "init_block_size {} is below the minimum linkable block of {} bytes",
                self.init_block_size, MIN_LINKED_BLOCK
            )));
        }
        let floor = self.segment_count as u64 * (self.init_block_size as u64 + 2);
        let region = self.total_size.max(floor);
        if region >= MAX_REGION_SIZE as u64 || region > Size::MAX as u64 {
            return Err(MemoryError::InvalidConfig(format!(
                "region of {} bytes exceeds the 40-bit address space",
                region
            )));
        }
        Ok(())
    }
}
