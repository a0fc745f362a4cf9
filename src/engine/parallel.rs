use super::fold_into;
use crate::combine::CombineFn;
use crate::config::EngineConfig;
use crate::hook::ItemHook;
use crate::splitter::RangeSplitter;
use anyhow::{Context, Result};
use log::{debug, trace};
use rayon::{ThreadPool, ThreadPoolBuilder};

/// Fork/join engine on a dedicated rayon pool.
///
/// The input is split with [`RangeSplitter::try_split`] until each leaf is no
/// larger than `min_batch_size`. Leaves fold sequentially, then sibling
/// accumulators merge left-into-right on the way back up, so the merge tree
/// mirrors the split tree.
pub struct ParallelEngine {
    pool: ThreadPool,
    min_batch_size: usize,
}

impl std::fmt::Debug for ParallelEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelEngine")
            .field("threads", &self.pool.current_num_threads())
            .field("min_batch_size", &self.min_batch_size)
            .finish()
    }
}

impl ParallelEngine {
    /// Build a pool with `config.workers` threads.
    ///
    /// # Errors
    /// Fails if the configuration is invalid or the pool cannot be created.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.workers)
            .thread_name(|i| format!("receiptflow-fork-{i}"))
            .build()
            .context("building fork/join thread pool")?;
        Ok(Self {
            pool,
            min_batch_size: config.min_batch_size,
        })
    }

    #[must_use]
    pub const fn min_batch_size(&self) -> usize {
        self.min_batch_size
    }

    #[must_use]
    pub fn threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Aggregate `records` on the pool and finish the root accumulator.
    ///
    /// # Errors
    /// Propagates the first hook error any leaf reports. Sibling leaves
    /// already running finish their fold but their results are discarded.
    pub fn run<T, A, O, C, H>(&self, records: &[T], comb: &C, hook: &H) -> Result<O>
    where
        T: Sync,
        A: Send,
        C: CombineFn<T, A, O> + ?Sized,
        H: ItemHook<T> + ?Sized,
    {
        debug!(
            "fork/join run over {} records (min batch {}, {} threads)",
            records.len(),
            self.min_batch_size,
            self.threads()
        );
        let root = RangeSplitter::new(records, self.min_batch_size);
        let acc = self.pool.install(|| fork_merge(root, comb, hook))?;
        Ok(comb.finish(acc))
    }
}

fn fork_merge<T, A, O, C, H>(mut range: RangeSplitter<'_, T>, comb: &C, hook: &H) -> Result<A>
where
    T: Sync,
    A: Send,
    C: CombineFn<T, A, O> + ?Sized,
    H: ItemHook<T> + ?Sized,
{
    match range.try_split() {
        Some(prefix) => {
            let (left, right) = rayon::join(
                || fork_merge(prefix, comb, hook),
                || fork_merge(range, comb, hook),
            );
            let mut left = left?;
            comb.merge(&mut left, right?);
            Ok(left)
        }
        None => {
            trace!("leaf {:?}", range.range());
            fold_into(range, comb, hook)
        }
    }
}
