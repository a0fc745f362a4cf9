//! The combiner contract the engines are generic over.
//!
//! A [`CombineFn`] describes an aggregation as four steps (create an empty
//! accumulator, add one input, merge two accumulators, finish into an output).
//! Every engine drives the same four steps; only the shape of the reduction
//! tree differs. [`ReceiptStatsFn`] is the receipt statistics combiner.

use crate::accumulator::ReceiptAccumulator;
use crate::model::Receipt;
use crate::ranking::DEFAULT_TOP_LIMIT;
use crate::statistics::ReceiptStatistics;

/// Associative aggregation over inputs of type `V` with accumulator `A` and
/// output `O`.
///
/// Implementations must make `merge` associative and commutative so that any
/// split of the input reduces to the same output.
pub trait CombineFn<V: ?Sized, A, O>: Send + Sync {
    fn create(&self) -> A;
    fn add_input(&self, acc: &mut A, v: &V);
    fn merge(&self, acc: &mut A, other: A);
    fn finish(&self, acc: A) -> O;
}

/// Receipt statistics as a [`CombineFn`].
#[derive(Clone, Copy, Debug)]
pub struct ReceiptStatsFn {
    /// Entries kept in each bounded ranking.
    pub top_n: usize,
}

impl ReceiptStatsFn {
    #[must_use]
    pub const fn new(top_n: usize) -> Self {
        Self { top_n }
    }
}

impl Default for ReceiptStatsFn {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_LIMIT)
    }
}

impl CombineFn<Receipt, ReceiptAccumulator, ReceiptStatistics> for ReceiptStatsFn {
    fn create(&self) -> ReceiptAccumulator {
        ReceiptAccumulator::empty()
    }

    fn add_input(&self, acc: &mut ReceiptAccumulator, v: &Receipt) {
        acc.absorb(v);
    }

    fn merge(&self, acc: &mut ReceiptAccumulator, other: ReceiptAccumulator) {
        acc.merge(other);
    }

    fn finish(&self, acc: ReceiptAccumulator) -> ReceiptStatistics {
        acc.finalize_top(self.top_n)
    }
}
