/*!
 * Versioned Reader/Writer Lock
 *
 * A `parking_lot::RwLock` paired with a monotonic write stamp, giving three
 * access modes:
 *
 * - **Exclusive**: blocks everyone; bumps the stamp on acquire (odd) and on
 *   release (even)
 * - **Shared**: blocks writers only
 * - **Optimistic**: blocks nobody; the reader takes a stamp, reads, then
 *   validates that no writer ran in between
 *
 * Data read optimistically must be read through atomics (the region stores
 * `AtomicU8`), otherwise a racing writer is undefined behaviour rather than a
 * failed validation.
 */

use parking_lot::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::ops::{Deref, DerefMut};
use std::sync::atomic::{fence, AtomicU64, Ordering};

/// Stamp handed out by [`VersionedLock::begin_optimistic`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stamp(u64);

/// Reader/writer lock with an optimistic read mode
///
/// `T` is the state only touched under the lock (a segment's free-list
/// anchors); bytes validated optimistically live outside it.
#[derive(Debug, Default)]
pub struct VersionedLock<T> {
    lock: RwLock<T>,
    stamp: AtomicU64,
}

/// Exclusive access; the stamp goes back to even when dropped
pub struct VersionedWriteGuard<'a, T> {
    stamp: &'a AtomicU64,
    guard: RwLockWriteGuard<'a, T>,
}

impl<T> VersionedLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            lock: RwLock::new(value),
            stamp: AtomicU64::new(0),
        }
    }

    /// Acquire exclusive access
    #[inline]
    pub fn write(&self) -> VersionedWriteGuard<'_, T> {
        let guard = self.lock.write();
        self.stamp.fetch_add(1, Ordering::Relaxed);
        // Odd stamp must be visible before any protected write
        fence(Ordering::Release);
        VersionedWriteGuard {
            stamp: &self.stamp,
            guard,
        }
    }

    /// Acquire shared access (blocks writers, not other readers)
    #[inline]
    pub fn read(&self) -> RwLockReadGuard<'_, T> {
        self.lock.read()
    }

    /// Take a stamp for an optimistic read, or `None` while a writer holds the lock
    #[inline]
    pub fn begin_optimistic(&self) -> Option<Stamp> {
        let stamp = self.stamp.load(Ordering::Acquire);
        if stamp & 1 == 1 {
            None
        } else {
            Some(Stamp(stamp))
        }
    }

    /// True if no writer acquired the lock since `stamp` was taken
    #[inline]
    pub fn validate(&self, stamp: Stamp) -> bool {
        fence(Ordering::Acquire);
        self.stamp.load(Ordering::Relaxed) == stamp.0
    }

    /// Current raw stamp value (odd while a writer is active)
    pub fn version(&self) -> u64 {
        self.stamp.load(Ordering::Acquire)
    }
}

impl<T> Deref for VersionedWriteGuard<'_, T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.guard
    }
}

impl<T> DerefMut for VersionedWriteGuard<'_, T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.guard
    }
}

impl<T> Drop for VersionedWriteGuard<'_, T> {
    fn drop(&mut self) {
        self.stamp.fetch_add(1, Ordering::Release);
    }
}
