use super::fold_into;
use crate::combine::CombineFn;
use crate::hook::ItemHook;
use anyhow::Result;
use log::debug;

/// Single-threaded reference engine.
#[derive(Clone, Copy, Debug, Default)]
pub struct SequentialEngine;

impl SequentialEngine {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Fold every record in order, then finish.
    ///
    /// # Errors
    /// Propagates the first error returned by `hook`.
    pub fn run<T, A, O, C, H>(&self, records: &[T], comb: &C, hook: &H) -> Result<O>
    where
        C: CombineFn<T, A, O> + ?Sized,
        H: ItemHook<T> + ?Sized,
    {
        debug!("sequential run over {} records", records.len());
        let acc = fold_into(records, comb, hook)?;
        Ok(comb.finish(acc))
    }
}
