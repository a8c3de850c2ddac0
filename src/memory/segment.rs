/*!
 * Segment Header
 * Per-segment free-list index, usage counters, and lock
 *
 * ## Size classes
 *
 * ```text
 *   class 0   [12, 23]      class 4   [64, 128)
 *   class 1   [24, 35]      class 5   [128, 256)
 *   class 2   [36, 47]      ...
 *   class 3   [48, 63]      class c   [2^(c+2), 2^(c+3))
 *                           class 24  [2^26, ∞)   overflow
 * ```
 *
 * Free blocks below 12 bytes cannot carry list links and belong to no class.
 */

use super::types::{SegmentStats, SegmentUsage};
use crate::core::limits::{FIXED_CLASS_BOUNDS, FREE_LIST_CLASSES, MIN_LINKED_BLOCK, OVERFLOW_CLASS};
use crate::core::sync::{SeqlockStats, Stamp, VersionedLock, VersionedWriteGuard};
use crate::core::types::{Address, ClassIndex, SegmentId, Size, NULL_ADDRESS};
use parking_lot::RwLockReadGuard;

/// Class a block of exactly `size` bytes is filed under; `None` below 12 bytes
pub fn class_for_size_exact(size: Size) -> Option<ClassIndex> {
    if size < MIN_LINKED_BLOCK {
        return None;
    }
    if let Some(class) = FIXED_CLASS_BOUNDS.iter().position(|&upper| size <= upper) {
        return Some(class);
    }
    // size >= 64, so floor(log2) >= 6 and the class is >= 4
    let log2 = (usize::BITS - 1 - size.leading_zeros()) as usize;
    Some((log2 - 2).min(OVERFLOW_CLASS))
}

/// Segregated free-list anchors of one segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FreeListIndex {
    anchors: [Address; FREE_LIST_CLASSES],
}

impl FreeListIndex {
    pub fn new() -> Self {
        Self {
            anchors: [NULL_ADDRESS; FREE_LIST_CLASSES],
        }
    }

    pub fn class_for_size_exact(&self, size: Size) -> Option<ClassIndex> {
        class_for_size_exact(size)
    }

    /// First class at or above `size`'s own class with a non-empty list.
    ///
    /// Granularity is per list, so the caller still has to check each
    /// candidate's real size. Returns the overflow class when nothing above
    /// is populated, even if that list is empty too.
    pub fn class_for_size_search(&self, size: Size) -> ClassIndex {
        let mut class = class_for_size_exact(size).unwrap_or(0);
        while class < OVERFLOW_CLASS && self.anchors[class] == NULL_ADDRESS {
            class += 1;
        }
        class
    }

    #[inline]
    pub fn get_anchor(&self, class: ClassIndex) -> Address {
        self.anchors[class]
    }

    #[inline]
    pub fn set_anchor(&mut self, class: ClassIndex, address: Address) {
        self.anchors[class] = address;
    }

    /// Classes with at least one free block
    pub fn populated(&self) -> impl Iterator<Item = (ClassIndex, Address)> + '_ {
        self.anchors
            .iter()
            .copied()
            .enumerate()
            .filter(|&(_, anchor)| anchor != NULL_ADDRESS)
    }
}

impl Default for FreeListIndex {
    fn default() -> Self {
        Self::new()
    }
}

/// One disjoint sub-range `[start, end)` of the region
///
/// Byte `start` and byte `end - 1` are marker bytes, so every block handle
/// lies strictly inside the range.
#[derive(Debug)]
pub struct SegmentHeader {
    index: SegmentId,
    start: Address,
    end: Address,
    lists: VersionedLock<FreeListIndex>,
    usage: SeqlockStats<SegmentUsage>,
}

impl SegmentHeader {
    pub fn new(index: SegmentId, start: Address, end: Address) -> Self {
        debug_assert!(start < end);
        Self {
            index,
            start,
            end,
            lists: VersionedLock::new(FreeListIndex::new()),
            usage: SeqlockStats::default(),
        }
    }

    pub fn index(&self) -> SegmentId {
        self.index
    }

    pub fn start(&self) -> Address {
        self.start
    }

    pub fn end(&self) -> Address {
        self.end
    }

    pub fn width(&self) -> Size {
        self.end - self.start
    }

    /// True if `address` can be a block handle in this segment
    #[inline]
    pub fn contains(&self, address: Address) -> bool {
        address > self.start && address < self.end
    }

    /// Handle of the segment's first block
    pub fn first_block(&self) -> Address {
        self.start + 1
    }

    /// Exclusive access to the free lists; also invalidates optimistic readers
    #[inline]
    pub fn lock(&self) -> VersionedWriteGuard<'_, FreeListIndex> {
        self.lists.write()
    }

    #[inline]
    pub fn lock_shared(&self) -> RwLockReadGuard<'_, FreeListIndex> {
        self.lists.read()
    }

    #[inline]
    pub fn begin_optimistic(&self) -> Option<Stamp> {
        self.lists.begin_optimistic()
    }

    #[inline]
    pub fn validate(&self, stamp: Stamp) -> bool {
        self.lists.validate(stamp)
    }

    /// Bytes held by used blocks (lock-free)
    #[inline]
    pub fn used_bytes(&self) -> Size {
        self.usage.read().used_bytes
    }

    pub fn usage(&self) -> SegmentUsage {
        self.usage.read()
    }

    /// Record a new used block; call with the segment locked
    pub fn add_used(&self, bytes: Size) {
        self.usage.write(|u| {
            u.used_bytes += bytes;
            u.live_blocks += 1;
        });
    }

    /// Record a released used block; call with the segment locked
    pub fn sub_used(&self, bytes: Size) {
        self.usage.write(|u| {
            debug_assert!(u.used_bytes >= bytes && u.live_blocks > 0);
            u.used_bytes = u.used_bytes.saturating_sub(bytes);
            u.live_blocks = u.live_blocks.saturating_sub(1);
        });
    }

    pub fn stats(&self) -> SegmentStats {
        let usage = self.usage.read();
        SegmentStats {
            index: self.index,
            start: self.start,
            end: self.end,
            used_bytes: usage.used_bytes,
            live_blocks: usage.live_blocks,
        }
    }
}
