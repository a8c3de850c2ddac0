/*!
 * Memory Storage Operations
 * Reading and writing block payloads
 *
 * Writes take the segment lock exclusively. Reads first try up to
 * `OPTIMISTIC_READ_ATTEMPTS` lock-free passes validated by the segment
 * stamp, then fall back to a shared lock.
 */

use super::MemoryManager;
use crate::core::limits::OPTIMISTIC_READ_ATTEMPTS;
use crate::core::types::{Address, Size};
use crate::memory::codec::{BlockCodec, Boundary, Marker};
use crate::memory::segment::SegmentHeader;
use crate::memory::types::{MemoryError, MemoryResult};
use log::{debug, warn};

/// Header of a used block as decoded from the region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct UsedBlock {
    pub width: usize,
    pub payload_len: Size,
}

impl UsedBlock {
    /// Total block size including both length fields
    pub fn size(&self) -> Size {
        self.payload_len + 2 * self.width
    }
}

impl MemoryManager {
    /// Decode the used block at `address`, or `None` if there is none.
    ///
    /// Every offset is checked against the segment before it is read, so this
    /// is safe to run on bytes a concurrent writer is changing.
    pub(super) fn decode_used(
        codec: BlockCodec<'_>,
        segment: &SegmentHeader,
        address: Address,
    ) -> Option<UsedBlock> {
        let width = match codec.leading_marker(address)? {
            marker @ Marker::Used(_) => marker.length_width(),
            _ => return None,
        };
        if address + width >= segment.end() {
            return None;
        }
        let payload_len = codec.payload_len(address, width);
        let used = UsedBlock { width, payload_len };
        let trailer = address + used.size();
        if trailer >= segment.end() {
            return None;
        }
        let marker = Marker::Used(width as u8);
        if Boundary::after(address, used.size()).high(codec.region()) != marker.nibble() {
            return None;
        }
        Some(used)
    }

    /// Overwrite the payload of the block at `address` in place.
    ///
    /// The new payload must have exactly the stored length.
    pub fn write(&self, address: Address, payload: &[u8]) -> MemoryResult<()> {
        let segment = self.segment_for(address).ok_or_else(|| {
            warn!("Write at 0x{:x}: address outside every segment", address);
            MemoryError::InvalidAddress(address)
        })?;

        let codec = self.codec();
        let _lists = segment.lock();

        let used = Self::decode_used(codec, segment, address).ok_or_else(|| {
            warn!("Write at 0x{:x}: not an allocated block", address);
            MemoryError::InvalidAddress(address)
        })?;

        if used.payload_len != payload.len() {
            warn!(
                "Write at 0x{:x}: block holds {} bytes, got {}",
                address,
                used.payload_len,
                payload.len()
            );
            return Err(MemoryError::SizeMismatch {
                address,
                stored: used.payload_len,
                provided: payload.len(),
            });
        }

        codec.write_payload(address, used.width, payload);
        Ok(())
    }

    /// Copy out the payload of the block at `address`
    pub fn read(&self, address: Address) -> MemoryResult<Vec<u8>> {
        let segment = self.segment_for(address).ok_or_else(|| {
            warn!("Read at 0x{:x}: address outside every segment", address);
            MemoryError::InvalidAddress(address)
        })?;
        let codec = self.codec();

        for _ in 0..OPTIMISTIC_READ_ATTEMPTS {
            let Some(stamp) = segment.begin_optimistic() else {
                std::hint::spin_loop();
                continue;
            };
            let result = Self::decode_used(codec, segment, address)
                .map(|used| codec.read_payload(address, used.width, used.payload_len));
            if segment.validate(stamp) {
                return result.ok_or(MemoryError::NotFound(address));
            }
        }

        debug!(
            "Read at 0x{:x}: optimistic attempts exhausted in segment {}, taking shared lock",
            address,
            segment.index()
        );
        let _lists = segment.lock_shared();
        Self::decode_used(codec, segment, address)
            .map(|used| codec.read_payload(address, used.width, used.payload_len))
            .ok_or(MemoryError::NotFound(address))
    }

    /// Payload length of the live block at `address`
    pub fn block_size(&self, address: Address) -> Option<Size> {
        let segment = self.segment_for(address)?;
        let _lists = segment.lock_shared();
        Self::decode_used(self.codec(), segment, address).map(|used| used.payload_len)
    }

    /// True if `address` is the handle of a live block
    pub fn is_valid(&self, address: Address) -> bool {
        self.block_size(address).is_some()
    }
}
