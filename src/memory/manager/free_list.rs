/*!
 * Free List Operations
 * Splicing blocks in and out of a segment's segregated lists
 *
 * All functions expect the owning segment to be locked exclusively; the
 * `&mut FreeListIndex` borrowed from the write guard enforces that.
 */

use crate::core::limits::OVERFLOW_CLASS;
use crate::core::types::{Address, ClassIndex, Size, NULL_ADDRESS};
use crate::memory::codec::{BlockCodec, Marker};
use crate::memory::segment::{class_for_size_exact, FreeListIndex};

/// A free block of `size` can hold a used block of `total` bytes.
///
/// The leftover after carving needs room for a marker byte plus at least a
/// one-byte block, so a block exactly one byte too large does not fit.
#[inline]
pub(super) fn fits(size: Size, total: Size) -> bool {
    size == total || size >= total + 2
}

/// Insert a linked free block at the head of its class list
pub(super) fn push_front(
    codec: BlockCodec<'_>,
    lists: &mut FreeListIndex,
    class: ClassIndex,
    block: Address,
) {
    let head = lists.get_anchor(class);
    codec.set_next_free(block, head);
    codec.set_prev_free(block, NULL_ADDRESS);
    if head != NULL_ADDRESS {
        codec.set_prev_free(head, block);
    }
    lists.set_anchor(class, block);
}

/// Remove a free block of `size` from its class list; no-op for unlinked sizes
pub(super) fn unlink(codec: BlockCodec<'_>, lists: &mut FreeListIndex, block: Address, size: Size) {
    let Some(class) = class_for_size_exact(size) else {
        return;
    };
    let next = codec.next_free(block);
    let prev = codec.prev_free(block);

    let is_head = lists.get_anchor(class) == block;
    if is_head {
        lists.set_anchor(class, next);
    } else if prev != NULL_ADDRESS {
        codec.set_next_free(prev, next);
    }
    if next != NULL_ADDRESS {
        let new_prev = if is_head { NULL_ADDRESS } else { prev };
        codec.set_prev_free(next, new_prev);
    }

    codec.set_next_free(block, NULL_ADDRESS);
    codec.set_prev_free(block, NULL_ADDRESS);
}

/// First listed block that fits `total`, searching upward from its class
pub(super) fn find_fit(
    codec: BlockCodec<'_>,
    lists: &FreeListIndex,
    total: Size,
) -> Option<(Address, Size)> {
    let mut class = lists.class_for_size_search(total);
    loop {
        let mut block = lists.get_anchor(class);
        while block != NULL_ADDRESS {
            let size = match codec.leading_marker(block) {
                Some(marker @ Marker::Linked(_)) => codec.free_block_size(block, marker),
                other => {
                    debug_assert!(false, "listed block 0x{block:x} has marker {other:?}");
                    break;
                }
            };
            if fits(size, total) {
                return Some((block, size));
            }
            block = codec.next_free(block);
        }
        if class >= OVERFLOW_CLASS {
            return None;
        }
        class += 1;
    }
}

/// Write a free block and, if it is large enough to carry links, list it
pub(super) fn release(codec: BlockCodec<'_>, lists: &mut FreeListIndex, block: Address, size: Size) {
    let marker = codec.write_free_block(block, size);
    if marker.is_linked() {
        if let Some(class) = class_for_size_exact(size) {
            push_front(codec, lists, class, block);
        }
    }
}
