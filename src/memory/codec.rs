/*!
 * Block Codec
 * Boundary-tag encoding of blocks inside the raw region
 *
 * ## Layout
 *
 * ```text
 *   marker byte            block content (size s)                   marker byte
 *  ┌─────┬─────┐┌────────┬─────────┬─────────┬─────┬────────┐┌─────┬─────┐
 *  │ hi  │ lo  ││ len(L) │ next(5) │ prev(5) │ ... │ len(L) ││ hi  │ lo  │
 *  └─────┴─────┘└────────┴─────────┴─────────┴─────┴────────┘└─────┴─────┘
 *     a-1        a                                              a+s
 *   hi: trailing marker of the previous block
 *   lo: leading marker of this block
 * ```
 *
 * A block handle is the address of its first content byte. Adjacent blocks
 * share the marker byte between them, which is what makes neighbour lookup
 * during coalescing O(1).
 *
 * | nibble | meaning                                          |
 * |--------|--------------------------------------------------|
 * | 15     | free, exactly 1 byte, no fields                  |
 * | 0      | free, 2-11 bytes, 1-byte length at both ends     |
 * | 1-3    | free, L-byte length at both ends + next/prev     |
 * | 9-11   | used, (n-8)-byte payload length at both ends     |
 *
 * Nothing here locks: callers hold the owning segment's lock or are inside
 * an optimistic read that will be validated afterwards.
 */

use super::region::RawRegion;
use crate::core::limits::{ADDRESS_SIZE, MAX_LENGTH_FIELD, MIN_LINKED_BLOCK};
use crate::core::types::{Address, Size, NULL_ADDRESS};

/// Decoded marker nibble
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// Free, exactly one byte
    Tiny,
    /// Free, 2-11 bytes, never linked
    Small,
    /// Free and linked into a size-class list; length field width 1-3
    Linked(u8),
    /// Holds a payload; length field width 1-3
    Used(u8),
}

const TINY_NIBBLE: u8 = 15;
const SMALL_NIBBLE: u8 = 0;
const USED_BIAS: u8 = 8;

impl Marker {
    pub fn from_nibble(nibble: u8) -> Option<Self> {
        match nibble {
            TINY_NIBBLE => Some(Marker::Tiny),
            SMALL_NIBBLE => Some(Marker::Small),
            1..=3 => Some(Marker::Linked(nibble)),
            9..=11 => Some(Marker::Used(nibble - USED_BIAS)),
            _ => None,
        }
    }

    pub fn nibble(self) -> u8 {
        match self {
            Marker::Tiny => TINY_NIBBLE,
            Marker::Small => SMALL_NIBBLE,
            Marker::Linked(width) => width,
            Marker::Used(width) => width + USED_BIAS,
        }
    }

    pub fn is_free(self) -> bool {
        !self.is_used()
    }

    pub fn is_used(self) -> bool {
        matches!(self, Marker::Used(_))
    }

    /// Carries next/prev link fields
    pub fn is_linked(self) -> bool {
        matches!(self, Marker::Linked(_))
    }

    /// Width in bytes of the length field at each end of the block
    pub fn length_width(self) -> usize {
        match self {
            Marker::Tiny => 0,
            Marker::Small => 1,
            Marker::Linked(width) | Marker::Used(width) => width as usize,
        }
    }
}

/// Marker for a free block of `size` bytes
pub fn classify_free(size: Size) -> Marker {
    if size == 1 {
        Marker::Tiny
    } else if size < MIN_LINKED_BLOCK {
        Marker::Small
    } else {
        Marker::Linked(field_width(size))
    }
}

/// Marker for a used block carrying `payload_len` bytes
pub fn classify_used(payload_len: Size) -> Marker {
    Marker::Used(field_width(payload_len))
}

/// Total block size for a payload, length fields included
pub fn used_block_size(payload_len: Size) -> Size {
    payload_len + 2 * classify_used(payload_len).length_width()
}

fn field_width(value: Size) -> u8 {
    if value < 1 << 8 {
        1
    } else if value < 1 << 16 {
        2
    } else {
        3
    }
}

/// The marker byte shared by two adjacent blocks
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Boundary(Address);

impl Boundary {
    /// Boundary holding `block`'s leading marker
    pub fn before(block: Address) -> Self {
        Boundary(block - 1)
    }

    /// Boundary holding the trailing marker of a block of `size` bytes at `block`
    pub fn after(block: Address, size: Size) -> Self {
        Boundary(block + size)
    }

    pub fn address(self) -> Address {
        self.0
    }

    /// Leading marker of the block that follows this boundary
    pub fn low(self, region: &RawRegion) -> u8 {
        region.read_byte(self.0) & 0x0F
    }

    /// Trailing marker of the block that precedes this boundary
    pub fn high(self, region: &RawRegion) -> u8 {
        region.read_byte(self.0) >> 4
    }

    pub fn set_low(self, region: &RawRegion, nibble: u8) {
        debug_assert!(nibble <= 0x0F);
        let byte = region.read_byte(self.0);
        region.write_byte(self.0, (byte & 0xF0) | nibble);
    }

    pub fn set_high(self, region: &RawRegion, nibble: u8) {
        debug_assert!(nibble <= 0x0F);
        let byte = region.read_byte(self.0);
        region.write_byte(self.0, (byte & 0x0F) | (nibble << 4));
    }
}

/// Stateless view that reads and writes block encodings in a region
#[derive(Clone, Copy)]
pub struct BlockCodec<'a> {
    region: &'a RawRegion,
}

impl<'a> BlockCodec<'a> {
    pub fn new(region: &'a RawRegion) -> Self {
        Self { region }
    }

    pub fn region(&self) -> &'a RawRegion {
        self.region
    }

    // -------------------------------------------------------------------------
    // Fields
    // -------------------------------------------------------------------------

    /// Big-endian length field of `width` bytes
    pub fn write_length_field(&self, address: Address, value: Size, width: usize) {
        debug_assert!((1..=MAX_LENGTH_FIELD).contains(&width));
        debug_assert!(value < 1 << (8 * width));
        for i in 0..width {
            let shift = 8 * (width - 1 - i);
            self.region.write_byte(address + i, (value >> shift) as u8);
        }
    }

    pub fn read_length_field(&self, address: Address, width: usize) -> Size {
        (0..width).fold(0, |acc, i| {
            (acc << 8) | self.region.read_byte(address + i) as Size
        })
    }

    /// 5-byte big-endian address; 0 is null
    pub fn write_address_field(&self, address: Address, value: Address) {
        for i in 0..ADDRESS_SIZE {
            let shift = 8 * (ADDRESS_SIZE - 1 - i);
            self.region.write_byte(address + i, (value >> shift) as u8);
        }
    }

    pub fn read_address_field(&self, address: Address) -> Address {
        (0..ADDRESS_SIZE).fold(0, |acc, i| {
            (acc << 8) | self.region.read_byte(address + i) as Address
        })
    }

    // -------------------------------------------------------------------------
    // Markers
    // -------------------------------------------------------------------------

    pub fn leading_marker(&self, block: Address) -> Option<Marker> {
        Marker::from_nibble(Boundary::before(block).low(self.region))
    }

    /// Trailing marker of the block that ends right before `block`
    pub fn previous_trailing_marker(&self, block: Address) -> Option<Marker> {
        Marker::from_nibble(Boundary::before(block).high(self.region))
    }

    /// Leading marker of the block that starts right after `block`
    pub fn next_leading_marker(&self, block: Address, size: Size) -> Option<Marker> {
        Marker::from_nibble(Boundary::after(block, size).low(self.region))
    }

    fn write_markers(&self, block: Address, size: Size, marker: Marker) {
        Boundary::before(block).set_low(self.region, marker.nibble());
        Boundary::after(block, size).set_high(self.region, marker.nibble());
    }

    // -------------------------------------------------------------------------
    // Sizes
    // -------------------------------------------------------------------------

    /// Size of a free block read from its leading length field
    pub fn free_block_size(&self, block: Address, marker: Marker) -> Size {
        match marker {
            Marker::Tiny => 1,
            Marker::Small | Marker::Linked(_) => {
                self.read_length_field(block, marker.length_width())
            }
            Marker::Used(_) => {
                debug_assert!(false, "free_block_size on used block 0x{block:x}");
                0
            }
        }
    }

    /// Payload length recorded in a used block's leading length field
    pub fn payload_len(&self, block: Address, width: usize) -> Size {
        self.read_length_field(block, width)
    }

    /// Marker and total size of the block at `block`
    pub fn block_size(&self, block: Address) -> Option<(Marker, Size)> {
        let marker = self.leading_marker(block)?;
        let size = match marker {
            Marker::Used(_) => {
                let width = marker.length_width();
                self.payload_len(block, width) + 2 * width
            }
            _ => self.free_block_size(block, marker),
        };
        Some((marker, size))
    }

    /// Start, marker and size of the free block ending right before `block`,
    /// decoded from its trailing tag. `None` if that block is used.
    pub fn previous_free_block(&self, block: Address) -> Option<(Address, Marker, Size)> {
        let marker = self.previous_trailing_marker(block)?;
        let size = match marker {
            Marker::Tiny => 1,
            Marker::Small | Marker::Linked(_) => {
                let width = marker.length_width();
                self.read_length_field(block - 1 - width, width)
            }
            Marker::Used(_) => return None,
        };
        Some((block - 1 - size, marker, size))
    }

    // -------------------------------------------------------------------------
    // Free-list links
    // -------------------------------------------------------------------------

    fn next_field(block: Address, marker: Marker) -> Address {
        block + marker.length_width()
    }

    fn prev_field(block: Address, marker: Marker) -> Address {
        block + marker.length_width() + ADDRESS_SIZE
    }

    pub fn next_free(&self, block: Address) -> Address {
        match self.leading_marker(block) {
            Some(marker @ Marker::Linked(_)) => {
                self.read_address_field(Self::next_field(block, marker))
            }
            _ => NULL_ADDRESS,
        }
    }

    pub fn prev_free(&self, block: Address) -> Address {
        match self.leading_marker(block) {
            Some(marker @ Marker::Linked(_)) => {
                self.read_address_field(Self::prev_field(block, marker))
            }
            _ => NULL_ADDRESS,
        }
    }

    pub fn set_next_free(&self, block: Address, next: Address) {
        if let Some(marker @ Marker::Linked(_)) = self.leading_marker(block) {
            self.write_address_field(Self::next_field(block, marker), next);
        }
    }

    pub fn set_prev_free(&self, block: Address, prev: Address) {
        if let Some(marker @ Marker::Linked(_)) = self.leading_marker(block) {
            self.write_address_field(Self::prev_field(block, marker), prev);
        }
    }

    // -------------------------------------------------------------------------
    // Whole blocks
    // -------------------------------------------------------------------------

    /// Lay down a free block with null links and return its marker
    pub fn write_free_block(&self, block: Address, size: Size) -> Marker {
        let marker = classify_free(size);
        self.write_markers(block, size, marker);
        match marker {
            Marker::Tiny => {}
            Marker::Small => {
                self.write_length_field(block, size, 1);
                self.write_length_field(block + size - 1, size, 1);
            }
            Marker::Linked(_) => {
                let width = marker.length_width();
                self.write_length_field(block, size, width);
                self.write_address_field(Self::next_field(block, marker), NULL_ADDRESS);
                self.write_address_field(Self::prev_field(block, marker), NULL_ADDRESS);
                self.write_length_field(block + size - width, size, width);
            }
            Marker::Used(_) => unreachable!("classify_free never yields a used marker"),
        }
        marker
    }

    /// Write `len | payload | len` and both markers; returns total block size
    pub fn write_used_block(&self, block: Address, payload: &[u8]) -> Size {
        let marker = classify_used(payload.len());
        let width = marker.length_width();
        let size = payload.len() + 2 * width;
        self.write_markers(block, size, marker);
        self.write_length_field(block, payload.len(), width);
        self.region.write_from(block + width, payload);
        self.write_length_field(block + width + payload.len(), payload.len(), width);
        size
    }

    pub fn write_payload(&self, block: Address, width: usize, payload: &[u8]) {
        self.region.write_from(block + width, payload);
    }

    pub fn read_payload(&self, block: Address, width: usize, len: Size) -> Vec<u8> {
        let mut buf = vec![0u8; len];
        self.region.read_into(block + width, &mut buf);
        buf
    }
}
