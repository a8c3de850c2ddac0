/*!
 * Memory Types
 * Common types for memory management
 */

use crate::core::limits::{PRESSURE_CRITICAL, PRESSURE_HIGH, PRESSURE_MEDIUM};
use crate::core::types::{Address, SegmentId, Size};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Memory operation result
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Memory errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemoryError {
    #[error("Out of memory: no free block of {requested} bytes in segment {segment}")]
    OutOfMemory { requested: Size, segment: SegmentId },

    #[error("Invalid memory address: 0x{0:x}")]
    InvalidAddress(Address),

    #[error("Size mismatch at 0x{address:x}: block holds {stored} bytes, write supplied {provided}")]
    SizeMismatch {
        address: Address,
        stored: Size,
        provided: Size,
    },

    #[error("No object at address 0x{0:x}")]
    NotFound(Address),

    #[error("Invalid allocator configuration: {0}")]
    InvalidConfig(String),

    #[error("Initialization of segment {0} failed")]
    InitializationFailed(SegmentId),

    #[error("Memory corruption detected in segment {segment} at 0x{address:x}")]
    CorruptionDetected { segment: SegmentId, address: Address },
}

/// Lock-free readable usage counters of one segment
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentUsage {
    /// Bytes held by used blocks, including their length fields
    pub used_bytes: Size,
    /// Number of live allocations
    pub live_blocks: usize,
}

/// Per-segment statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentStats {
    pub index: SegmentId,
    pub start: Address,
    pub end: Address,
    pub used_bytes: Size,
    pub live_blocks: usize,
}

impl SegmentStats {
    pub fn width(&self) -> Size {
        self.end - self.start
    }
}

/// Result of walking one segment block by block
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentReport {
    pub index: SegmentId,
    pub free_bytes: Size,
    pub used_bytes: Size,
    pub marker_bytes: Size,
    pub free_blocks: usize,
    pub used_blocks: usize,
    /// Free blocks too small to carry list links
    pub unlinked_free_blocks: usize,
    pub largest_free_block: Size,
}

impl SegmentReport {
    /// Every byte of the segment accounted for by a block or a marker
    pub fn accounted_bytes(&self) -> Size {
        self.free_bytes + self.used_bytes + self.marker_bytes
    }
}

/// Memory statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryStats {
    pub total_memory: usize,
    pub used_memory: usize,
    pub available_memory: usize,
    pub usage_percentage: f64,
    pub allocated_blocks: usize,
    pub segments: Vec<SegmentStats>,
}

impl MemoryStats {
    pub fn memory_pressure(&self) -> MemoryPressure {
        MemoryPressure::from_ratio(self.usage_percentage / 100.0)
    }
}

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MemoryPressure {
    Low,
    Medium,
    High,
    Critical,
}

impl MemoryPressure {
    pub fn from_ratio(ratio: f64) -> Self {
        if ratio >= PRESSURE_CRITICAL {
            MemoryPressure::Critical
        } else if ratio >= PRESSURE_HIGH {
            MemoryPressure::High
        } else if ratio >= PRESSURE_MEDIUM {
            MemoryPressure::Medium
        } else {
            MemoryPressure::Low
        }
    }
}

impl std::fmt::Display for MemoryPressure {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            MemoryPressure::Low => write!(f, "LOW"),
            MemoryPressure::Medium => write!(f, "MEDIUM"),
            MemoryPressure::High => write!(f, "HIGH"),
            MemoryPressure::Critical => write!(f, "CRITICAL"),
        }
    }
}
