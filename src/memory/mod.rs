/*!
 * Memory Module
 * Off-heap region, block encoding, and the segmented allocator
 */

pub mod codec;
pub mod config;
pub mod manager;
pub mod region;
pub mod segment;
pub mod traits;
pub mod types;

// Re-export for convenience
pub use config::AllocatorConfig;
pub use manager::MemoryManager;
pub use traits::*;
pub use types::*;
