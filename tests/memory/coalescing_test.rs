/*!
 * Coalescing Tests
 * Neighbour merging, the block size cap, and segment accounting
 */

use offheap_mm::memory::MemoryManager;
use pretty_assertions::assert_eq;

#[test]
fn test_merge_restores_initial_block() {
    super::init_logging();
    let mm = MemoryManager::new(1, 1, 200).unwrap();

    let a = mm.allocate(&[1u8; 30]).unwrap();
    let b = mm.allocate(&[2u8; 30]).unwrap();
    let c = mm.allocate(&[3u8; 30]).unwrap();

    // Free the middle block first so both later frees merge in each direction
    mm.deallocate(b).unwrap();
    mm.deallocate(a).unwrap();
    mm.deallocate(c).unwrap();

    let reports = mm.verify().unwrap();
    assert_eq!(reports[0].free_blocks, 1);
    assert_eq!(reports[0].largest_free_block, 200);
    assert_eq!(reports[0].used_blocks, 0);
}

#[test]
fn test_merge_never_exceeds_initial_block_size() {
    super::init_logging();
    let mm = MemoryManager::new(1_000_000, 4, 1000).unwrap();

    let addrs: Vec<_> = (0..2000)
        .map(|i| mm.allocate(&vec![(i % 256) as u8; 20 + i % 180]).unwrap())
        .collect();
    for addr in addrs.iter().step_by(2) {
        mm.deallocate(*addr).unwrap();
    }
    for addr in addrs.iter().skip(1).step_by(2) {
        mm.deallocate(*addr).unwrap();
    }

    for report in mm.verify().unwrap() {
        assert!(report.largest_free_block <= mm.init_block_size());
        assert_eq!(report.used_bytes, 0);
    }
    assert_eq!(mm.stats().allocated_blocks, 0);
}

#[test]
fn test_accounting_holds_with_live_blocks() {
    super::init_logging();
    let mm = MemoryManager::new(100_000, 3, 500).unwrap();

    let mut live = vec![];
    for i in 0..300usize {
        let addr = mm.allocate(&vec![7u8; i % 90]).unwrap();
        if i % 3 == 0 {
            mm.deallocate(addr).unwrap();
        } else {
            live.push(addr);
        }
    }

    let reports = mm.verify().unwrap();
    for (report, segment) in reports.iter().zip(mm.segments()) {
        assert_eq!(report.accounted_bytes(), segment.width());
        assert_eq!(report.used_bytes, segment.used_bytes());
    }
    let used_blocks: usize = reports.iter().map(|r| r.used_blocks).sum();
    assert_eq!(used_blocks, live.len());
}

#[test]
fn test_small_remnants_are_tracked() {
    super::init_logging();
    // A 20-byte hole refilled by a 14-byte block leaves a 5-byte remnant
    let mm = MemoryManager::new(1, 1, 100).unwrap();
    let a = mm.allocate(&[0u8; 18]).unwrap();
    let _b = mm.allocate(&[0u8; 18]).unwrap();
    mm.deallocate(a).unwrap();
    mm.allocate(&[0u8; 12]).unwrap();

    let report = &mm.verify().unwrap()[0];
    assert_eq!(report.unlinked_free_blocks, 1);
}
