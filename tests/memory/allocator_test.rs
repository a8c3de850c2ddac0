/*!
 * Allocator Tests
 * Allocation, payload access, and error handling through the public API
 */

use offheap_mm::memory::{Allocator, AllocatorConfig, MemoryError, MemoryInfo, MemoryManager};
use pretty_assertions::assert_eq;

#[test]
fn test_manager_initialization() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();
    let (total, used, available) = mm.info();

    assert_eq!(total, 1_000_000);
    assert_eq!(used, 0);
    assert_eq!(available, total);
    assert_eq!(mm.segment_count(), 4);
    assert_eq!(mm.init_block_size(), 1000);
}

#[test]
fn test_round_trip() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();
    let payload = b"the quick brown fox".to_vec();

    let addr = mm.allocate(&payload).unwrap();
    assert_eq!(mm.read(addr).unwrap(), payload);
    assert_eq!(mm.block_size(addr), Some(payload.len()));
}

#[test]
fn test_overwrite_is_idempotent() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();
    let addr = mm.allocate(&[0u8; 64]).unwrap();

    let update = [0xEEu8; 64];
    mm.write(addr, &update).unwrap();
    mm.write(addr, &update).unwrap();
    assert_eq!(mm.read(addr).unwrap(), update.to_vec());

    let err = mm.write(addr, &[1u8; 63]).unwrap_err();
    assert_eq!(
        err,
        MemoryError::SizeMismatch {
            address: addr,
            stored: 64,
            provided: 63
        }
    );
    assert_eq!(mm.read(addr).unwrap(), update.to_vec());
}

#[test]
fn test_three_hundred_byte_payload() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();
    let payload: Vec<u8> = (0..300).map(|i| (i % 251) as u8).collect();

    let addr = mm.allocate(&payload).unwrap();
    assert_eq!(mm.read(addr).unwrap(), payload);
    // Two-byte length fields at both ends
    assert_eq!(mm.info().1, 304);
}

#[test]
fn test_invalid_addresses() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();
    let outside = mm.region_size() + 10;

    assert_eq!(mm.read(0), Err(MemoryError::InvalidAddress(0)));
    assert_eq!(mm.deallocate(0), Err(MemoryError::InvalidAddress(0)));
    assert_eq!(mm.write(0, b"x"), Err(MemoryError::InvalidAddress(0)));

    assert_eq!(mm.read(outside), Err(MemoryError::InvalidAddress(outside)));
    assert_eq!(
        mm.deallocate(outside),
        Err(MemoryError::InvalidAddress(outside))
    );
    assert!(!mm.is_valid(outside));
}

#[test]
fn test_deallocate_free_block_rejected() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();
    let first = mm.segments()[2].first_block();

    assert_eq!(mm.deallocate(first), Err(MemoryError::InvalidAddress(first)));
    assert_eq!(mm.read(first), Err(MemoryError::NotFound(first)));
    mm.verify().unwrap();
}

#[test]
fn test_reuse_after_deallocate() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();

    let addr = mm.allocate(&[5u8; 50]).unwrap();
    mm.deallocate(addr).unwrap();
    let again = mm.allocate(&[6u8; 50]).unwrap();

    assert_eq!(again, addr);
    assert_eq!(mm.read(again).unwrap(), vec![6u8; 50]);
}

#[test]
fn test_round_robin_scenario() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();
    let initial: Vec<usize> = mm.verify().unwrap().iter().map(|r| r.free_blocks).collect();

    let addrs: Vec<_> = (0..10u8)
        .map(|i| mm.allocate(&[i; 50]).unwrap())
        .collect();

    // Least-loaded placement walks the segments in order
    let placed: Vec<_> = addrs.iter().map(|&a| mm.segment_of(a).unwrap()).collect();
    assert_eq!(placed, vec![0, 1, 2, 3, 0, 1, 2, 3, 0, 1]);

    let stats = mm.stats();
    assert_eq!(stats.used_memory, 10 * 52);
    assert_eq!(stats.allocated_blocks, 10);

    for (i, &addr) in addrs.iter().enumerate() {
        assert_eq!(mm.read(addr).unwrap(), vec![i as u8; 50]);
    }
    for addr in addrs {
        mm.deallocate(addr).unwrap();
    }

    assert_eq!(mm.info().1, 0);
    let after: Vec<usize> = mm.verify().unwrap().iter().map(|r| r.free_blocks).collect();
    assert_eq!(after, initial);
}

#[test]
fn test_exhaust_and_recover() {
    super::init_logging();
    let mm = MemoryManager::new(4 * 102, 4, 100).unwrap();

    let addrs: Vec<_> = (0..4).map(|_| mm.allocate(&[0u8; 98]).unwrap()).collect();
    assert!(matches!(
        mm.allocate(&[0u8; 10]),
        Err(MemoryError::OutOfMemory { .. })
    ));

    mm.deallocate(addrs[2]).unwrap();
    let addr = mm.allocate(&[1u8; 10]).unwrap();
    assert_eq!(mm.segment_of(addr), Some(2));
}

#[test]
fn test_from_json_config() {
    super::init_logging();
    let config = AllocatorConfig::from_json(
        r#"{"total_size": 65536, "segment_count": 2, "init_block_size": 4096}"#,
    )
    .unwrap();
    let mm = MemoryManager::from_config(config).unwrap();
    assert_eq!(mm.segment_count(), 2);

    let addr = mm.allocate(b"configured").unwrap();
    assert_eq!(mm.read(addr).unwrap(), b"configured".to_vec());
    mm.cleanup();
}

#[test]
fn test_trait_objects() {
    super::init_logging();
    let mm = MemoryManager::new(65_536, 2, 1024).unwrap();
    let allocator: &dyn Allocator = &mm;
    let info: &dyn MemoryInfo = &mm;

    let addr = allocator.allocate(b"dyn").unwrap();
    assert!(allocator.is_valid(addr));
    assert_eq!(allocator.read(addr).unwrap(), b"dyn".to_vec());
    assert_eq!(info.stats().allocated_blocks, 1);
    assert_eq!(info.pressure(), offheap_mm::MemoryPressure::Low);
}
