use crate::combine::{CombineFn, ReceiptStatsFn};
use crate::config::EngineConfig;
use crate::engine::{BatchedEngine, ParallelEngine, SequentialEngine};
use crate::hook::{ItemHook, NoDelay};
use crate::model::Receipt;
use crate::statistics::ReceiptStatistics;
use anyhow::Result;
use log::debug;

/// Which engine a [`Runner`] drives.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ExecMode {
    Sequential,
    #[default]
    Parallel,
    Batched,
}

impl ExecMode {
    pub const ALL: [ExecMode; 3] = [ExecMode::Sequential, ExecMode::Parallel, ExecMode::Batched];
}

/// Picks an engine and configuration, then runs receipt statistics (or any
/// other [`CombineFn`]) through it.
#[derive(Clone, Debug, Default)]
pub struct Runner {
    pub mode: ExecMode,
    pub config: EngineConfig,
}

impl Runner {
    #[must_use]
    pub fn new(mode: ExecMode, config: EngineConfig) -> Self {
        Self { mode, config }
    }

    #[must_use]
    pub fn sequential() -> Self {
        Self::new(ExecMode::Sequential, EngineConfig::default())
    }

    #[must_use]
    pub fn parallel(config: EngineConfig) -> Self {
        Self::new(ExecMode::Parallel, config)
    }

    #[must_use]
    pub fn batched(config: EngineConfig) -> Self {
        Self::new(ExecMode::Batched, config)
    }

    /// Receipt statistics with no per-item hook.
    ///
    /// # Errors
    /// Fails on invalid configuration or when the batched pipeline fails or
    /// times out.
    pub fn run(&self, records: &[Receipt]) -> Result<ReceiptStatistics> {
        self.run_with_hook(records, &NoDelay)
    }

    /// Receipt statistics, calling `hook` before each record is folded.
    ///
    /// # Errors
    /// See [`run`](Self::run); hook errors are propagated too.
    pub fn run_with_hook<H>(&self, records: &[Receipt], hook: &H) -> Result<ReceiptStatistics>
    where
        H: ItemHook<Receipt> + ?Sized,
    {
        self.run_combine(records, &ReceiptStatsFn::new(self.config.top_n), hook)
    }

    /// Run an arbitrary combiner through the selected engine.
    ///
    /// # Errors
    /// See [`run_with_hook`](Self::run_with_hook).
    pub fn run_combine<T, A, O, C, H>(&self, records: &[T], comb: &C, hook: &H) -> Result<O>
    where
        T: Sync,
        A: Send,
        C: CombineFn<T, A, O> + ?Sized,
        H: ItemHook<T> + ?Sized,
    {
        debug!("running {:?} over {} records", self.mode, records.len());
        match self.mode {
            ExecMode::Sequential => SequentialEngine::new().run(records, comb, hook),
            ExecMode::Parallel => ParallelEngine::new(&self.config)?.run(records, comb, hook),
            ExecMode::Batched => {
                let done = BatchedEngine::new(&self.config)?.run(records, comb, hook)?;
                debug!("batched flow: {:?}", done.flow);
                Ok(done.output)
            }
        }
    }
}

impl ReceiptStatistics {
    /// Statistics of `records` using the default parallel runner.
    ///
    /// # Errors
    /// Fails only if the worker pool cannot be built.
    pub fn compute(records: &[Receipt]) -> Result<Self> {
        Runner::default().run(records)
    }
}
