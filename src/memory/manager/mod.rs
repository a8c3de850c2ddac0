/*!
 * Memory Manager
 *
 * Segmented concurrent allocator over one off-heap region.
 *
 * ## Layout
 *
 * The region is split into equal-width segments, each guarded by its own
 * versioned lock. Blocks never cross a segment boundary, so a request only
 * ever locks one segment:
 *
 * ```text
 *   ┌──────────── segment 0 ────────────┐┌──────────── segment 1 ────────────┐
 *   │m│ block │m│ block │m│ ... │ rem │m││m│ block │m│ block │m│ ... │ rem │m│ ...
 *   └───────────────────────────────────┘└───────────────────────────────────┘
 * ```
 *
 * ## Features
 *
 * - **Least-loaded placement**: allocations go to the segment with the
 *   smallest used byte count, read lock-free from seqlocked counters
 * - **Segregated free lists**: 25 size classes per segment, first fit
 *   within a class
 * - **Boundary tags**: O(1) coalescing with both neighbours, capped at the
 *   initial block size
 * - **Optimistic reads**: readers never block unless a writer keeps
 *   invalidating their stamp
 */

mod allocator;
mod free_list;
mod init;
mod inspect;
mod storage;

use super::codec::BlockCodec;
use super::config::AllocatorConfig;
use super::region::RawRegion;
use super::segment::SegmentHeader;
use super::traits::{Allocator, MemoryInfo};
use super::types::{MemoryResult, MemoryStats};
use crate::core::types::{Address, SegmentId, Size};
use init::SegmentLayout;
use log::info;

/// Memory manager
pub struct MemoryManager {
    region: RawRegion,
    segments: Vec<SegmentHeader>,
    init_block_size: Size,
}

impl MemoryManager {
    /// Create a manager with an explicit initial block size
    pub fn new(total_size: u64, segment_count: u32, init_block_size: u32) -> MemoryResult<Self> {
        Self::from_config(AllocatorConfig::new(
            total_size,
            segment_count,
            init_block_size,
        ))
    }

    /// Create a manager whose segments start as maximal blocks
    pub fn with_segments(total_size: u64, segment_count: u32) -> MemoryResult<Self> {
        Self::from_config(
            AllocatorConfig::default()
                .with_total_size(total_size)
                .with_segments(segment_count),
        )
    }

    pub fn from_config(config: AllocatorConfig) -> MemoryResult<Self> {
        config.validate()?;

        let region_size = config.effective_region_size();
        let init_block_size = config.effective_init_block_size();
        let segment_count = config.segment_count as usize;
        let width = region_size / segment_count;

        let layouts: Vec<SegmentLayout> = (0..segment_count)
            .map(|index| SegmentLayout::plan(index * width, width, init_block_size))
            .collect();

        let region = RawRegion::allocate(region_size)?;
        let segments: Vec<SegmentHeader> = layouts
            .iter()
            .enumerate()
            .map(|(index, layout)| SegmentHeader::new(index, layout.start, layout.end))
            .collect();

        let manager = Self {
            region,
            segments,
            init_block_size,
        };
        init::initialize_segments(&manager, &layouts)?;

        info!(
            "Memory manager initialized with {} bytes in {} segments ({} byte segments, {} byte initial blocks)",
            region_size, segment_count, width, init_block_size
        );
        Ok(manager)
    }

    #[inline]
    pub(super) fn codec(&self) -> BlockCodec<'_> {
        BlockCodec::new(&self.region)
    }

    pub fn segments(&self) -> &[SegmentHeader] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Size of the blocks each segment starts with; also the coalescing cap
    pub fn init_block_size(&self) -> Size {
        self.init_block_size
    }

    pub fn region_size(&self) -> Size {
        self.region.len()
    }

    /// Segment with the fewest used bytes; the lowest index wins ties
    fn least_loaded_segment(&self) -> &SegmentHeader {
        let mut best = &self.segments[0];
        let mut best_used = best.used_bytes();
        for segment in &self.segments[1..] {
            let used = segment.used_bytes();
            if used < best_used {
                best = segment;
                best_used = used;
            }
        }
        best
    }

    /// Segment whose block range contains `address`
    fn segment_for(&self, address: Address) -> Option<&SegmentHeader> {
        self.segments.iter().find(|s| s.contains(address))
    }

    pub fn segment_of(&self, address: Address) -> Option<SegmentId> {
        self.segment_for(address).map(SegmentHeader::index)
    }

    /// Release the region. Consuming `self` makes later use unrepresentable.
    pub fn cleanup(self) {
        let stats = self.stats();
        info!(
            "Memory manager cleanup: releasing {} bytes ({} bytes in {} live blocks)",
            stats.total_memory, stats.used_memory, stats.allocated_blocks
        );
        drop(self);
    }
}

impl Allocator for MemoryManager {
    fn allocate(&self, payload: &[u8]) -> MemoryResult<Address> {
        MemoryManager::allocate(self, payload)
    }

    fn deallocate(&self, address: Address) -> MemoryResult<()> {
        MemoryManager::deallocate(self, address)
    }

    fn read(&self, address: Address) -> MemoryResult<Vec<u8>> {
        MemoryManager::read(self, address)
    }

    fn write(&self, address: Address, payload: &[u8]) -> MemoryResult<()> {
        MemoryManager::write(self, address, payload)
    }

    fn is_valid(&self, address: Address) -> bool {
        MemoryManager::is_valid(self, address)
    }

    fn block_size(&self, address: Address) -> Option<Size> {
        MemoryManager::block_size(self, address)
    }
}

impl MemoryInfo for MemoryManager {
    fn stats(&self) -> MemoryStats {
        MemoryManager::stats(self)
    }

    fn info(&self) -> (Size, Size, Size) {
        MemoryManager::info(self)
    }
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager")
            .field("region", &self.region)
            .field("segments", &self.segments.len())
            .field("init_block_size", &self.init_block_size)
            .finish()
    }
}
