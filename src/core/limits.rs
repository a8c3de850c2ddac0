/*!
 * System Limits and Constants
 *
 * Centralized location for the allocator's layout limits, thresholds, and magic numbers.
 *
 * ## Conventions
 * - Values are grouped by domain (layout, free lists, locking, pressure)
 * - Performance-critical constants are marked with [PERF]
 * - Values that fix the on-region byte format are marked with [FORMAT]
 */

// =============================================================================
// BLOCK LAYOUT
// =============================================================================

/// Width of a free-list link field in bytes (40-bit offsets)
/// [FORMAT] Changing this changes the minimum linkable block size
pub const ADDRESS_SIZE: usize = 5;

/// Largest offset a link field can encode
pub const MAX_REGION_SIZE: usize = 1 << (ADDRESS_SIZE * 8);

/// Hard cap on the initial (and coalesced) block size
/// Keeps every free-block length field within 3 bytes
/// [FORMAT]
pub const MAX_BLOCK_SIZE: usize = 16_000_000;

/// Smallest free block that can carry `len | next | prev | len`
/// [FORMAT] 1 + 5 + 5 + 1
pub const MIN_LINKED_BLOCK: usize = 1 + 2 * ADDRESS_SIZE + 1;

/// Widest length field a block header may use
pub const MAX_LENGTH_FIELD: usize = 3;

/// Largest payload whose length fits in a 3-byte length field
pub const MAX_PAYLOAD_SIZE: usize = (1 << (MAX_LENGTH_FIELD * 8)) - 1;

// =============================================================================
// FREE LISTS
// =============================================================================

/// Number of segregated free lists per segment
/// Classes 0-3 are fixed ranges, 4-24 are power-of-two ranges
pub const FREE_LIST_CLASSES: usize = 25;

/// Index of the overflow class (everything >= 2^26)
pub const OVERFLOW_CLASS: usize = FREE_LIST_CLASSES - 1;

/// Inclusive upper bounds of the fixed-width classes 0-3
pub const FIXED_CLASS_BOUNDS: [usize; 4] = [23, 35, 47, 63];

// =============================================================================
// LOCKING
// =============================================================================

/// Optimistic read attempts before falling back to a shared lock
/// [PERF] Bounds reader interference with writers without spinning forever
pub const OPTIMISTIC_READ_ATTEMPTS: usize = 3;

// =============================================================================
// DEFAULTS
// =============================================================================

/// Default region size (1GB)
pub const DEFAULT_REGION_SIZE: usize = 1024 * 1024 * 1024;

/// Fallback worker count when hardware concurrency cannot be detected
pub const DEFAULT_WORKER_COUNT: usize = 8;

// =============================================================================
// MEMORY PRESSURE
// =============================================================================

/// Usage ratio reported as medium pressure
pub const PRESSURE_MEDIUM: f64 = 0.60;

/// Usage ratio reported as high pressure
pub const PRESSURE_HIGH: f64 = 0.80;

/// Usage ratio reported as critical pressure
pub const PRESSURE_CRITICAL: f64 = 0.95;
