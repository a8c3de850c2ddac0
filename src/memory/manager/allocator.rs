/*!
 * Memory Allocator Implementation
 * Allocation and deallocation logic
 */

use super::free_list;
use super::MemoryManager;
use crate::core::limits::MAX_PAYLOAD_SIZE;
use crate::core::types::{Address, Size};
use crate::memory::codec::used_block_size;
use crate::memory::segment::SegmentHeader;
use crate::memory::types::{MemoryError, MemoryPressure, MemoryResult};
use log::{debug, warn};

impl MemoryManager {
    /// Copy `payload` into a new block and return its handle.
    ///
    /// The block is placed in the least-loaded segment, in the first listed
    /// free block that fits; any usable surplus is split off as a new free
    /// block.
    pub fn allocate(&self, payload: &[u8]) -> MemoryResult<Address> {
        let segment = self.least_loaded_segment();
        let total = used_block_size(payload.len());

        if payload.len() > MAX_PAYLOAD_SIZE || total > self.init_block_size {
            warn!(
                "OOM: {} byte block can never fit (initial block size {})",
                total, self.init_block_size
            );
            return Err(MemoryError::OutOfMemory {
                requested: total,
                segment: segment.index(),
            });
        }

        let codec = self.codec();
        let mut lists = segment.lock();

        let Some((block, size)) = free_list::find_fit(codec, &lists, total) else {
            drop(lists);
            warn!(
                "OOM: no free block of {} bytes in segment {} ({} bytes used of {})",
                total,
                segment.index(),
                segment.used_bytes(),
                segment.width()
            );
            return Err(MemoryError::OutOfMemory {
                requested: total,
                segment: segment.index(),
            });
        };

        free_list::unlink(codec, &mut lists, block, size);
        let written = codec.write_used_block(block, payload);
        debug_assert_eq!(written, total);

        if size > total {
            // Leftover starts after the shared marker byte
            free_list::release(codec, &mut lists, block + total + 1, size - total - 1);
        }

        let before = segment.used_bytes();
        segment.add_used(total);
        drop(lists);

        self.note_pressure(segment, before, before + total);
        Ok(block)
    }

    /// Allocate each payload in order, stopping at the first failure
    pub fn allocate_many(&self, payloads: &[&[u8]]) -> MemoryResult<Vec<Address>> {
        payloads.iter().map(|payload| self.allocate(payload)).collect()
    }

    /// Free the block at `address`, merging it with free neighbours.
    ///
    /// A merge is skipped when the combined block would exceed the initial
    /// block size.
    pub fn deallocate(&self, address: Address) -> MemoryResult<()> {
        let segment = self.segment_for(address).ok_or_else(|| {
            warn!("Deallocate at 0x{:x}: address outside every segment", address);
            MemoryError::InvalidAddress(address)
        })?;

        let codec = self.codec();
        let mut lists = segment.lock();

        let Some(used) = Self::decode_used(codec, segment, address) else {
            drop(lists);
            warn!("Deallocate at 0x{:x}: not an allocated block", address);
            return Err(MemoryError::InvalidAddress(address));
        };
        let size = used.size();

        let before = segment.used_bytes();
        segment.sub_used(size);

        let mut start = address;
        let mut merged = size;

        // Backward; the first block's leading byte is the segment marker
        if address - 1 > segment.start() {
            if let Some((prev, marker, prev_size)) = codec.previous_free_block(address) {
                if prev_size + 1 + merged <= self.init_block_size {
                    if marker.is_linked() {
                        free_list::unlink(codec, &mut lists, prev, prev_size);
                    }
                    start = prev;
                    merged += prev_size + 1;
                }
            }
        }

        // Forward; the last block's trailing byte is the segment marker
        if address + size < segment.end() - 1 {
            let next = address + size + 1;
            if let Some(marker) = codec.leading_marker(next).filter(|m| m.is_free()) {
                let next_size = codec.free_block_size(next, marker);
                if merged + 1 + next_size <= self.init_block_size {
                    if marker.is_linked() {
                        free_list::unlink(codec, &mut lists, next, next_size);
                    }
                    merged += next_size + 1;
                }
            }
        }

        free_list::release(codec, &mut lists, start, merged);
        drop(lists);

        if merged > size {
            debug!(
                "Deallocated 0x{:x}: coalesced into {} byte block at 0x{:x}",
                address, merged, start
            );
        }
        self.note_pressure(segment, before, before.saturating_sub(size));
        Ok(())
    }

    /// Log when a segment crosses a pressure threshold
    fn note_pressure(&self, segment: &SegmentHeader, before: Size, after: Size) {
        let width = segment.width() as f64;
        let old = MemoryPressure::from_ratio(before as f64 / width);
        let new = MemoryPressure::from_ratio(after as f64 / width);
        if new > old {
            warn!(
                "Memory pressure {} in segment {} ({:.1}% used: {} / {})",
                new,
                segment.index(),
                after as f64 / width * 100.0,
                after,
                segment.width()
            );
        } else if new < old {
            debug!(
                "Memory pressure in segment {} eased to {}",
                segment.index(),
                new
            );
        }
    }
}
