/*!
 * Memory Inspection
 * Statistics and heap verification
 */

use super::MemoryManager;
use crate::core::types::{Address, Size, NULL_ADDRESS};
use crate::memory::codec::{classify_free, classify_used, BlockCodec, Boundary, Marker};
use crate::memory::segment::{class_for_size_exact, FreeListIndex, SegmentHeader};
use crate::memory::types::{MemoryError, MemoryResult, MemoryStats, SegmentReport};
use log::error;

impl MemoryManager {
    /// Get memory statistics
    pub fn stats(&self) -> MemoryStats {
        let segments: Vec<_> = self.segments.iter().map(SegmentHeader::stats).collect();
        let total = self.region.len();
        let used: Size = segments.iter().map(|s| s.used_bytes).sum();
        let allocated_blocks = segments.iter().map(|s| s.live_blocks).sum();

        MemoryStats {
            total_memory: total,
            used_memory: used,
            available_memory: total.saturating_sub(used),
            usage_percentage: (used as f64 / total as f64) * 100.0,
            allocated_blocks,
            segments,
        }
    }

    /// Get memory info as (total, used, available)
    pub fn info(&self) -> (Size, Size, Size) {
        let total = self.region.len();
        let used: Size = self.segments.iter().map(SegmentHeader::used_bytes).sum();
        (total, used, total.saturating_sub(used))
    }

    /// Walk every segment block by block and check its structure.
    ///
    /// Each segment is held under its shared lock while it is walked, so the
    /// reports are consistent per segment but not across segments.
    pub fn verify(&self) -> MemoryResult<Vec<SegmentReport>> {
        let codec = self.codec();
        self.segments
            .iter()
            .map(|segment| {
                let lists = segment.lock_shared();
                let report = walk_blocks(codec, segment)?;
                check_lists(codec, segment, &lists, &report)?;
                Ok(report)
            })
            .collect()
    }
}

fn corruption(segment: &SegmentHeader, address: Address, what: &str) -> MemoryError {
    error!(
        "Corruption in segment {} at 0x{:x}: {}",
        segment.index(),
        address,
        what
    );
    MemoryError::CorruptionDetected {
        segment: segment.index(),
        address,
    }
}

fn walk_blocks(codec: BlockCodec<'_>, segment: &SegmentHeader) -> MemoryResult<SegmentReport> {
    let mut report = SegmentReport {
        index: segment.index(),
        marker_bytes: 1,
        ..Default::default()
    };

    let mut block = segment.first_block();
    while block < segment.end() {
        let (marker, size) = codec
            .block_size(block)
            .ok_or_else(|| corruption(segment, block, "unknown leading marker"))?;
        if block + size >= segment.end() {
            return Err(corruption(segment, block, "block overruns segment"));
        }
        if Boundary::after(block, size).high(codec.region()) != marker.nibble() {
            return Err(corruption(segment, block, "trailing marker disagrees"));
        }

        match marker {
            Marker::Used(width) => {
                let payload = size - 2 * width as usize;
                if classify_used(payload) != marker {
                    return Err(corruption(segment, block, "length field width"));
                }
                report.used_bytes += size;
                report.used_blocks += 1;
            }
            _ => {
                if classify_free(size) != marker {
                    return Err(corruption(segment, block, "free block size/marker"));
                }
                report.free_bytes += size;
                report.free_blocks += 1;
                report.largest_free_block = report.largest_free_block.max(size);
                if !marker.is_linked() {
                    report.unlinked_free_blocks += 1;
                }
            }
        }

        report.marker_bytes += 1;
        block += size + 1;
    }

    if report.accounted_bytes() != segment.width() {
        return Err(corruption(segment, segment.start(), "bytes unaccounted for"));
    }
    let usage = segment.usage();
    if usage.used_bytes != report.used_bytes || usage.live_blocks != report.used_blocks {
        return Err(corruption(segment, segment.start(), "usage counters drifted"));
    }
    Ok(report)
}

fn check_lists(
    codec: BlockCodec<'_>,
    segment: &SegmentHeader,
    lists: &FreeListIndex,
    report: &SegmentReport,
) -> MemoryResult<()> {
    let linked = report.free_blocks - report.unlinked_free_blocks;
    let mut listed = 0;

    for (class, head) in lists.populated() {
        let mut prev = NULL_ADDRESS;
        let mut block = head;
        while block != NULL_ADDRESS {
            if !segment.contains(block) {
                return Err(corruption(segment, block, "list link leaves segment"));
            }
            let size = match codec.block_size(block) {
                Some((Marker::Linked(_), size)) => size,
                _ => return Err(corruption(segment, block, "listed block not free")),
            };
            if class_for_size_exact(size) != Some(class) {
                return Err(corruption(segment, block, "block filed in wrong class"));
            }
            if codec.prev_free(block) != prev {
                return Err(corruption(segment, block, "broken prev link"));
            }
            listed += 1;
            if listed > linked {
                return Err(corruption(segment, block, "list longer than free blocks"));
            }
            prev = block;
            block = codec.next_free(block);
        }
    }

    if listed != linked {
        return Err(corruption(segment, segment.start(), "free block missing from lists"));
    }
    Ok(())
}
