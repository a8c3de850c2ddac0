/*!
 * Seqlock-based Statistics Wrapper
 *
 * Lock-free reads for small, frequently-read counters using sequence locks.
 *
 * # Design
 *
 * **Read path** (lock-free):
 * 1. Read sequence number (odd = writer active)
 * 2. Copy data
 * 3. Re-read sequence number (retry if changed)
 *
 * **Write path**: takes the seqlock's internal mutex and bumps the sequence
 * number around the update.
 *
 * Segment usage counters are read on every allocation by the segment
 * selector and written only while the owning segment is locked, which is
 * exactly the read-mostly shape seqlocks are built for.
 */

use seqlock::SeqLock as InnerSeqLock;

/// Seqlock wrapper for `Copy` statistics structures
pub struct SeqlockStats<T: Copy> {
    inner: InnerSeqLock<T>,
}

impl<T: Copy> SeqlockStats<T> {
    /// Create new seqlock-protected stats
    #[inline]
    pub fn new(initial: T) -> Self {
        Self {
            inner: InnerSeqLock::new(initial),
        }
    }

    /// Read current stats (lock-free)
    #[inline(always)]
    pub fn read(&self) -> T {
        self.inner.read()
    }

    /// Update stats with a closure
    #[inline]
    pub fn write<F>(&self, f: F)
    where
        F: FnOnce(&mut T),
    {
        let mut guard = self.inner.lock_write();
        f(&mut *guard);
    }
}

impl<T: Copy + Default> Default for SeqlockStats<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Copy + std::fmt::Debug> std::fmt::Debug for SeqlockStats<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SeqlockStats").field(&self.read()).finish()
    }
}
