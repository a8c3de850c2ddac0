/*!
 * Concurrency Tests
 * Parallel allocation, address uniqueness, and reads racing writers
 */

use offheap_mm::memory::MemoryManager;
use pretty_assertions::assert_eq;
use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

const THREADS: usize = 8;
const PER_THREAD: usize = 500;

fn payload_for(thread: usize, i: usize) -> Vec<u8> {
    let len = 8 + (thread * 31 + i * 7) % 120;
    let mut payload = vec![thread as u8; len];
    payload[..8].copy_from_slice(&(i as u64).to_be_bytes());
    payload
}

#[test]
fn test_concurrent_allocations_never_alias() {
    super::init_logging();
    let mm = Arc::new(MemoryManager::new(8 * 1024 * 1024, 8, 4096).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let mm = Arc::clone(&mm);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|i| (mm.allocate(&payload_for(t, i)).unwrap(), t, i))
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let all: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();

    let unique: HashSet<_> = all.iter().map(|(addr, _, _)| *addr).collect();
    assert_eq!(unique.len(), THREADS * PER_THREAD);

    for (addr, t, i) in &all {
        assert_eq!(mm.read(*addr).unwrap(), payload_for(*t, *i));
    }
    mm.verify().unwrap();
}

#[test]
fn test_concurrent_alloc_free_cycles() {
    super::init_logging();
    let mm = Arc::new(MemoryManager::new(4 * 1024 * 1024, 4, 2048).unwrap());

    let handles: Vec<_> = (0..THREADS)
        .map(|t| {
            let mm = Arc::clone(&mm);
            thread::spawn(move || {
                for round in 0..20 {
                    let addrs: Vec<_> = (0..100)
                        .map(|i| mm.allocate(&payload_for(t, round * 100 + i)).unwrap())
                        .collect();
                    for (i, addr) in addrs.iter().enumerate() {
                        assert_eq!(mm.read(*addr).unwrap(), payload_for(t, round * 100 + i));
                    }
                    for addr in addrs {
                        mm.deallocate(addr).unwrap();
                    }
                }
            })
        })
        .collect();

    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(mm.info().1, 0);
    for report in mm.verify().unwrap() {
        assert_eq!(report.used_blocks, 0);
        assert!(report.largest_free_block <= 2048);
    }
}

#[test]
fn test_reads_never_observe_torn_writes() {
    super::init_logging();
    let mm = Arc::new(MemoryManager::new(1024 * 1024, 2, 4096).unwrap());
    let addr = mm.allocate(&[0xAA; 1000]).unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let writer = {
        let mm = Arc::clone(&mm);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut fill = 0xAAu8;
            while !stop.load(Ordering::Relaxed) {
                fill = if fill == 0xAA { 0x55 } else { 0xAA };
                mm.write(addr, &[fill; 1000]).unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let mm = Arc::clone(&mm);
            thread::spawn(move || {
                for _ in 0..2000 {
                    let data = mm.read(addr).unwrap();
                    assert_eq!(data.len(), 1000);
                    assert!(data.iter().all(|&b| b == data[0]));
                }
            })
        })
        .collect();

    for reader in readers {
        reader.join().unwrap();
    }
    stop.store(true, Ordering::Relaxed);
    writer.join().unwrap();
}

#[test]
fn test_reads_during_neighbour_churn() {
    super::init_logging();
    let mm = Arc::new(MemoryManager::new(256 * 1024, 1, 8192).unwrap());
    let fixed = mm.allocate(b"stable payload").unwrap();
    let stop = Arc::new(AtomicBool::new(false));

    let churn = {
        let mm = Arc::clone(&mm);
        let stop = Arc::clone(&stop);
        thread::spawn(move || {
            let mut i = 0usize;
            while !stop.load(Ordering::Relaxed) {
                let addr = mm.allocate(&vec![i as u8; 1 + i % 300]).unwrap();
                mm.deallocate(addr).unwrap();
                i += 1;
            }
        })
    };

    for _ in 0..5000 {
        assert_eq!(mm.read(fixed).unwrap(), b"stable payload".to_vec());
    }
    stop.store(true, Ordering::Relaxed);
    churn.join().unwrap();
    mm.verify().unwrap();
}
