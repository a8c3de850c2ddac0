/*!
 * Synchronization Primitives
 *
 * - `VersionedLock`: per-segment reader/writer lock with an optimistic read mode
 * - `SeqlockStats`: lock-free readable counters for segment selection
 */

mod seqlock_stats;
mod versioned_lock;

pub use seqlock_stats::SeqlockStats;
pub use versioned_lock::{Stamp, VersionedLock, VersionedWriteGuard};
