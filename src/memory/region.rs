/*!
 * Raw Region
 * One contiguous, zero-initialized byte range obtained from the system allocator
 *
 * This is the only place in the crate that touches raw pointers. Every byte is
 * exposed as an `AtomicU8` so optimistic readers may race a segment writer
 * without undefined behaviour; all accesses use relaxed ordering and rely on
 * the segment lock (or its stamp validation) for ordering.
 */

use super::types::{MemoryError, MemoryResult};
use crate::core::types::{Address, Size};
use log::debug;
use std::alloc::{self, Layout};
use std::ptr::NonNull;
use std::sync::atomic::{AtomicU8, Ordering};

/// Owned off-heap byte region, released exactly once on drop
pub struct RawRegion {
    ptr: NonNull<AtomicU8>,
    len: Size,
    layout: Layout,
}

// SAFETY: the region is only ever accessed through `&[AtomicU8]`, which is
// `Sync`; the pointer is uniquely owned and freed once in `Drop`.
unsafe impl Send for RawRegion {}
unsafe impl Sync for RawRegion {}

impl RawRegion {
    /// Allocate and zero `size` bytes
    pub fn allocate(size: Size) -> MemoryResult<Self> {
        if size == 0 {
            return Err(MemoryError::InvalidConfig(
                "region size must be non-zero".to_string(),
            ));
        }
        let layout = Layout::array::<AtomicU8>(size).map_err(|_| MemoryError::OutOfMemory {
            requested: size,
            segment: 0,
        })?;

        // SAFETY: layout has non-zero size. A zeroed byte is a valid `AtomicU8`
        // (same size and alignment as `u8`).
        let raw = unsafe { alloc::alloc_zeroed(layout) };
        let ptr = NonNull::new(raw.cast::<AtomicU8>()).ok_or(MemoryError::OutOfMemory {
            requested: size,
            segment: 0,
        })?;

        debug!("Reserved {} byte region at {:p}", size, raw);
        Ok(Self {
            ptr,
            len: size,
            layout,
        })
    }

    #[inline(always)]
    fn bytes(&self) -> &[AtomicU8] {
        // SAFETY: `ptr` points at `len` initialized `AtomicU8`s that live until drop.
        unsafe { std::slice::from_raw_parts(self.ptr.as_ptr(), self.len) }
    }

    pub fn len(&self) -> Size {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    #[inline(always)]
    pub fn read_byte(&self, address: Address) -> u8 {
        self.bytes()[address].load(Ordering::Relaxed)
    }

    #[inline(always)]
    pub fn write_byte(&self, address: Address, value: u8) {
        self.bytes()[address].store(value, Ordering::Relaxed);
    }

    /// Copy `buf.len()` bytes starting at `address` into `buf`
    pub fn read_into(&self, address: Address, buf: &mut [u8]) {
        let src = &self.bytes()[address..address + buf.len()];
        for (dst, byte) in buf.iter_mut().zip(src) {
            *dst = byte.load(Ordering::Relaxed);
        }
    }

    /// Copy `data` into the region starting at `address`
    pub fn write_from(&self, address: Address, data: &[u8]) {
        let dst = &self.bytes()[address..address + data.len()];
        for (byte, value) in dst.iter().zip(data) {
            byte.store(*value, Ordering::Relaxed);
        }
    }
}

impl Drop for RawRegion {
    fn drop(&mut self) {
        debug!("Releasing {} byte region at {:p}", self.len, self.ptr);
        // SAFETY: allocated in `allocate` with exactly this layout, freed once.
        unsafe { alloc::dealloc(self.ptr.as_ptr().cast::<u8>(), self.layout) };
    }
}

impl std::fmt::Debug for RawRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RawRegion")
            .field("ptr", &self.ptr)
            .field("len", &self.len)
            .finish()
    }
}
