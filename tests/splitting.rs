use anyhow::Result;
use receiptflow::hook::NoDelay;
use receiptflow::*;

/// Collects every element it sees, so a lost or duplicated leaf shows up.
struct CollectIndices;

impl CombineFn<usize, Vec<usize>, Vec<usize>> for CollectIndices {
    fn create(&self) -> Vec<usize> {
        Vec::new()
    }

    fn add_input(&self, acc: &mut Vec<usize>, v: &usize) {
        acc.push(*v);
    }

    fn merge(&self, acc: &mut Vec<usize>, other: Vec<usize>) {
        acc.extend(other);
    }

    fn finish(&self, mut acc: Vec<usize>) -> Vec<usize> {
        acc.sort_unstable();
        acc
    }
}

fn visit(mut s: RangeSplitter<'_, usize>, seen: &mut [u32], leaves: &mut usize) {
    match s.try_split() {
        Some(prefix) => {
            visit(prefix, seen, leaves);
            visit(s, seen, leaves);
        }
        None => {
            *leaves += 1;
            s.for_each_remaining(|&i| seen[i] += 1);
        }
    }
}

#[test]
fn every_index_is_visited_exactly_once() {
    let data: Vec<usize> = (0..4_097).collect();
    for min in [1, 3, 256, 4_096, 4_097, 50_000] {
        let mut seen = vec![0u32; data.len()];
        let mut leaves = 0;
        visit(RangeSplitter::new(&data, min), &mut seen, &mut leaves);
        assert!(seen.iter().all(|&n| n == 1), "min={min}");
        if min >= data.len() {
            assert_eq!(leaves, 1);
        } else {
            assert!(leaves >= data.len().div_ceil(min) / 2, "min={min} leaves={leaves}");
        }
    }
}

#[test]
fn small_ranges_do_not_split() {
    let data = [0usize; 8];
    assert!(RangeSplitter::new(&data, 8).try_split().is_none());
    assert!(RangeSplitter::new(&data[..0], 1).try_split().is_none());
}

#[test]
fn parallel_engine_covers_every_element() -> Result<()> {
    let data: Vec<usize> = (0..10_001).collect();
    for min in [1, 5, 64, 20_000] {
        let engine = ParallelEngine::new(&EngineConfig::default().with_min_batch_size(min))?;
        assert_eq!(engine.run(&data, &CollectIndices, &NoDelay)?, data);
    }
    Ok(())
}

#[test]
fn batched_engine_covers_every_element() -> Result<()> {
    let data: Vec<usize> = (0..1_003).collect();
    let engine = BatchedEngine::new(&EngineConfig::default().with_batch_size(10).with_workers(3))?;
    let done = engine.run(&data, &CollectIndices, &NoDelay)?;
    assert_eq!(done.output, data);
    assert_eq!(done.flow.batches_dispatched, 101);
    Ok(())
}
