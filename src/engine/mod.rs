//! Aggregation engines.
//!
//! All three engines drive the same [`CombineFn`] over a borrowed slice of
//! records and must produce equal outputs for equal inputs. They differ only
//! in how the work is scheduled:
//!
//! * [`SequentialEngine`] folds the records in order on the calling thread.
//! * [`ParallelEngine`] recursively splits the input with a
//!   [`RangeSplitter`](crate::splitter::RangeSplitter) and merges partial
//!   accumulators up a fork/join tree on a dedicated rayon pool.
//! * [`BatchedEngine`] streams fixed-size batches from a producer thread to a
//!   worker pool under demand-driven backpressure, merging partials in a
//!   single reducer.

mod batched;
mod parallel;
mod sequential;

pub use batched::{
    BatchedEngine, Completed, FlowSnapshot, PipelineError, RecordSource, slice_source,
};
pub use crate::cancel::CancelToken;
pub use parallel::ParallelEngine;
pub use sequential::SequentialEngine;

use crate::combine::CombineFn;
use crate::hook::ItemHook;
use anyhow::Result;

/// Fold `items` into a fresh accumulator, calling `hook` before each one.
pub(crate) fn fold_into<'a, T, A, O, C, H>(
    items: impl IntoIterator<Item = &'a T>,
    comb: &C,
    hook: &H,
) -> Result<A>
where
    T: 'a,
    C: CombineFn<T, A, O> + ?Sized,
    H: ItemHook<T> + ?Sized,
{
    let mut acc = comb.create();
    for item in items {
        hook.before_item(item)?;
        comb.add_input(&mut acc, item);
    }
    Ok(acc)
}
