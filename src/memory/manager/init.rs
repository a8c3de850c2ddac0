/*!
 * Segment Initialization
 * Carves each segment into a chain of initial free blocks, in parallel
 */

use super::free_list;
use super::MemoryManager;
use crate::core::limits::DEFAULT_WORKER_COUNT;
use crate::core::types::{Address, Size, NULL_ADDRESS};
use crate::memory::codec::BlockCodec;
use crate::memory::segment::{class_for_size_exact, SegmentHeader};
use crate::memory::types::{MemoryError, MemoryResult};
use log::{debug, error};
use std::thread;

/// Planned block layout of one segment
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct SegmentLayout {
    pub start: Address,
    pub end: Address,
    pub block_size: Size,
    pub full_blocks: usize,
    /// Size of the trailing block smaller than `block_size`, 0 if none
    pub remainder: Size,
}

impl SegmentLayout {
    /// Plan a segment of `width` bytes at `start`.
    ///
    /// After the leading marker every block consumes its size plus one
    /// marker byte. A single spare byte at the tail cannot hold a block, so
    /// it is left outside the segment.
    pub fn plan(start: Address, width: Size, block_size: Size) -> Self {
        let body = width - 1;
        let full_blocks = body / (block_size + 1);
        let tail = body % (block_size + 1);
        let (end, remainder) = match tail {
            0 => (start + width, 0),
            1 => (start + width - 1, 0),
            t => (start + width, t - 1),
        };
        Self {
            start,
            end,
            block_size,
            full_blocks,
            remainder,
        }
    }

    fn block_at(&self, n: usize) -> Address {
        self.start + 1 + n * (self.block_size + 1)
    }
}

/// Lay down the initial free blocks of one segment
pub(super) fn init_segment(codec: BlockCodec<'_>, segment: &SegmentHeader, layout: &SegmentLayout) {
    let mut lists = segment.lock();

    // One chain through all full blocks, in address order
    for n in 0..layout.full_blocks {
        let block = layout.block_at(n);
        codec.write_free_block(block, layout.block_size);
        let prev = if n == 0 {
            NULL_ADDRESS
        } else {
            layout.block_at(n - 1)
        };
        let next = if n + 1 == layout.full_blocks {
            NULL_ADDRESS
        } else {
            layout.block_at(n + 1)
        };
        codec.set_prev_free(block, prev);
        codec.set_next_free(block, next);
    }
    if layout.full_blocks > 0 {
        if let Some(class) = class_for_size_exact(layout.block_size) {
            lists.set_anchor(class, layout.block_at(0));
        }
    }

    if layout.remainder > 0 {
        let block = layout.block_at(layout.full_blocks);
        free_list::release(codec, &mut lists, block, layout.remainder);
    }

    debug!(
        "Segment {} initialized: [0x{:x}, 0x{:x}), {} blocks of {} bytes, remainder {}",
        segment.index(),
        layout.start,
        layout.end,
        layout.full_blocks,
        layout.block_size,
        layout.remainder
    );
}

/// Initialize every segment on a bounded set of scoped workers
pub(super) fn initialize_segments(
    manager: &MemoryManager,
    layouts: &[SegmentLayout],
) -> MemoryResult<()> {
    let workers = thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(DEFAULT_WORKER_COUNT)
        .min(manager.segments.len())
        .max(1);
    let chunk = manager.segments.len().div_ceil(workers);
    let codec = manager.codec();

    thread::scope(|scope| {
        let handles: Vec<_> = manager
            .segments
            .chunks(chunk)
            .zip(layouts.chunks(chunk))
            .map(|(segments, layouts)| {
                let first = segments[0].index();
                let handle = scope.spawn(move || {
                    for (segment, layout) in segments.iter().zip(layouts) {
                        init_segment(codec, segment, layout);
                    }
                });
                (first, handle)
            })
            .collect();

        // Join all before reporting so no worker outlives a failure
        let mut result = Ok(());
        for (first, handle) in handles {
            if handle.join().is_err() {
                error!("Initialization worker for segment {} panicked", first);
                if result.is_ok() {
                    result = Err(MemoryError::InitializationFailed(first));
                }
            }
        }
        result
    })
}
