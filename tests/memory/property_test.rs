/*!
 * Property Tests
 * Randomized operation sequences checked against a shadow map
 */

use offheap_mm::memory::{MemoryError, MemoryManager};
use proptest::prelude::*;
use std::collections::HashMap;

#[derive(Debug, Clone)]
enum Op {
    Allocate(Vec<u8>),
    Free(usize),
    Write(usize, u8),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        3 => prop::collection::vec(any::<u8>(), 0..400).prop_map(Op::Allocate),
        2 => any::<usize>().prop_map(Op::Free),
        1 => (any::<usize>(), any::<u8>()).prop_map(|(i, b)| Op::Write(i, b)),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_round_trip(payload in prop::collection::vec(any::<u8>(), 0..2000)) {
        let mm = MemoryManager::new(64 * 1024, 2, 4096).unwrap();
        let addr = mm.allocate(&payload).unwrap();
        prop_assert_eq!(mm.read(addr).unwrap(), payload);
    }

    #[test]
    fn prop_heap_stays_consistent(ops in prop::collection::vec(op_strategy(), 1..200)) {
        let mm = MemoryManager::new(32 * 1024, 3, 1024).unwrap();
        let mut live: HashMap<usize, Vec<u8>> = HashMap::new();
        let mut order: Vec<usize> = vec![];

        for op in ops {
            match op {
                Op::Allocate(payload) => match mm.allocate(&payload) {
                    Ok(addr) => {
                        prop_assert!(!live.contains_key(&addr));
                        live.insert(addr, payload);
                        order.push(addr);
                    }
                    Err(MemoryError::OutOfMemory { .. }) => {}
                    Err(e) => return Err(TestCaseError::fail(e.to_string())),
                },
                Op::Free(pick) if !order.is_empty() => {
                    let addr = order.swap_remove(pick % order.len());
                    live.remove(&addr);
                    prop_assert!(mm.deallocate(addr).is_ok());
                }
                Op::Write(pick, fill) if !order.is_empty() => {
                    let addr = order[pick % order.len()];
                    let payload = vec![fill; live[&addr].len()];
                    prop_assert!(mm.write(addr, &payload).is_ok());
                    live.insert(addr, payload);
                }
                _ => {}
            }
        }

        for (addr, payload) in &live {
            prop_assert_eq!(&mm.read(*addr).unwrap(), payload);
        }
        let reports = mm.verify().unwrap();
        let used: usize = reports.iter().map(|r| r.used_blocks).sum();
        prop_assert_eq!(used, live.len());
        for report in reports {
            prop_assert!(report.largest_free_block <= 1024);
        }
    }
}
