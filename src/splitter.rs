//! Divide-and-conquer range splitter.
//!
//! [`RangeSplitter`] walks a contiguous index range `[origin, fence)` of a
//! borrowed slice and can hand off a prefix of what remains to another task.
//! The parallel engine splits recursively until a range is no larger than the
//! minimum batch size, then folds each leaf sequentially.
//!
//! The minimum batch size is the single knob trading scheduling overhead
//! (many tiny leaves and merges) against load imbalance (few coarse leaves).
//!
//! ```
//! use receiptflow::splitter::RangeSplitter;
//!
//! let data: Vec<u32> = (0..10).collect();
//! let mut rest = RangeSplitter::new(&data, 3);
//! let prefix = rest.try_split().unwrap();
//! assert_eq!(prefix.range(), 0..5);
//! assert_eq!(rest.range(), 5..10);
//! ```

use std::fmt;
use std::iter::FusedIterator;
use std::ops::{BitOr, Range};

/// Default minimum number of elements in a leaf range.
pub const DEFAULT_MIN_BATCH_SIZE: usize = 256;

/// Properties a splitter guarantees to whoever schedules it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Characteristics(u8);

impl Characteristics {
    /// Elements are yielded in slice order.
    pub const ORDERED: Self = Self(1);
    /// `estimate_size` is exact.
    pub const SIZED: Self = Self(1 << 1);
    /// Every split half is itself `SIZED`.
    pub const SUBSIZED: Self = Self(1 << 2);
    /// No element is ever absent.
    pub const NONNULL: Self = Self(1 << 3);

    #[must_use]
    pub const fn empty() -> Self {
        Self(0)
    }

    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    #[must_use]
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Characteristics {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        self.union(rhs)
    }
}

impl fmt::Debug for Characteristics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = [
            (Self::ORDERED, "ORDERED"),
            (Self::SIZED, "SIZED"),
            (Self::SUBSIZED, "SUBSIZED"),
            (Self::NONNULL, "NONNULL"),
        ];
        let mut set = f.debug_set();
        for (flag, name) in names {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}

/// Splittable cursor over `source[index..fence]`.
pub struct RangeSplitter<'a, T> {
    source: &'a [T],
    index: usize,
    fence: usize,
    min_batch_size: usize,
}

impl<'a, T> RangeSplitter<'a, T> {
    /// Cover the whole slice. A `min_batch_size` of `0` is treated as `1`.
    #[must_use]
    pub fn new(source: &'a [T], min_batch_size: usize) -> Self {
        Self::over(source, 0, source.len(), min_batch_size)
    }

    fn over(source: &'a [T], origin: usize, fence: usize, min_batch_size: usize) -> Self {
        Self {
            source,
            index: origin,
            fence,
            min_batch_size: min_batch_size.max(1),
        }
    }

    /// Hand off a prefix of the remaining range.
    ///
    /// Returns `None` when the remaining size is at most the minimum batch
    /// size; the caller should then process this range sequentially.
    /// Otherwise the returned splitter covers
    /// `[index, index + max(remaining / 2, min_batch_size))` and `self` keeps
    /// the rest.
    pub fn try_split(&mut self) -> Option<Self> {
        let remaining = self.fence - self.index;
        if remaining <= self.min_batch_size {
            return None;
        }
        let split_size = (remaining / 2).max(self.min_batch_size);
        let split_fence = self.index + split_size;
        let prefix = Self::over(self.source, self.index, split_fence, self.min_batch_size);
        self.index = split_fence;
        Some(prefix)
    }

    /// Next element in range order, or `None` once the cursor reaches the fence.
    pub fn try_advance(&mut self) -> Option<&'a T> {
        if self.index < self.fence {
            let item = &self.source[self.index];
            self.index += 1;
            Some(item)
        } else {
            None
        }
    }

    /// Feed every remaining element to `action`, exhausting the splitter.
    pub fn for_each_remaining<F: FnMut(&'a T)>(&mut self, mut action: F) {
        while let Some(item) = self.try_advance() {
            action(item);
        }
    }

    /// Exact number of remaining elements.
    #[must_use]
    pub const fn estimate_size(&self) -> usize {
        self.fence - self.index
    }

    /// Remaining index range within the source slice.
    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.index..self.fence
    }

    /// Remaining elements as a slice.
    #[must_use]
    pub fn as_slice(&self) -> &'a [T] {
        &self.source[self.index..self.fence]
    }

    #[must_use]
    pub const fn min_batch_size(&self) -> usize {
        self.min_batch_size
    }

    #[must_use]
    pub const fn characteristics(&self) -> Characteristics {
        Characteristics::ORDERED
            .union(Characteristics::SIZED)
            .union(Characteristics::SUBSIZED)
            .union(Characteristics::NONNULL)
    }
}

impl<T> Clone for RangeSplitter<'_, T> {
    fn clone(&self) -> Self {
        Self { ..*self }
    }
}

impl<T> fmt::Debug for RangeSplitter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RangeSplitter")
            .field("index", &self.index)
            .field("fence", &self.fence)
            .field("min_batch_size", &self.min_batch_size)
            .finish()
    }
}

impl<'a, T> Iterator for RangeSplitter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        self.try_advance()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let n = self.estimate_size();
        (n, Some(n))
    }
}

impl<T> ExactSizeIterator for RangeSplitter<'_, T> {}

impl<T> FusedIterator for RangeSplitter<'_, T> {}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaves<T>(mut s: RangeSplitter<'_, T>, out: &mut Vec<Range<usize>>) {
        match s.try_split() {
            Some(prefix) => {
                leaves(prefix, out);
                leaves(s, out);
            }
            None => out.push(s.range()),
        }
    }

    #[test]
    fn leaves_tile_the_range_exactly() {
        let data: Vec<usize> = (0..1_003).collect();
        for min in [1, 2, 7, 64, 256, 1_003, 5_000] {
            let mut out = Vec::new();
            leaves(RangeSplitter::new(&data, min), &mut out);
            let mut next = 0;
            for r in &out {
                assert_eq!(r.start, next, "gap or overlap at {r:?} (min={min})");
                assert!(r.len() <= min || r.len() == data.len(), "oversized leaf {r:?}");
                next = r.end;
            }
            assert_eq!(next, data.len());
            assert_eq!(out.iter().map(|r| r.len()).sum::<usize>(), data.len());
        }
    }

    #[test]
    fn split_prefix_is_at_least_min_batch() {
        let data = [0u8; 10];
        let mut s = RangeSplitter::new(&data, 6);
        let prefix = s.try_split().unwrap();
        assert_eq!(prefix.estimate_size(), 6);
        assert_eq!(s.estimate_size(), 4);
        assert!(s.try_split().is_none());
    }

    #[test]
    fn zero_min_batch_is_clamped() {
        let data = [1, 2];
        let mut s = RangeSplitter::new(&data, 0);
        assert_eq!(s.min_batch_size(), 1);
        let prefix = s.try_split().unwrap();
        assert_eq!(prefix.as_slice(), &[1]);
        assert_eq!(s.as_slice(), &[2]);
    }

    #[test]
    fn advance_walks_in_order_then_exhausts() {
        let data = [10, 20, 30];
        let mut s = RangeSplitter::new(&data, 1);
        assert_eq!(s.try_advance(), Some(&10));
        let mut seen = Vec::new();
        s.for_each_remaining(|x| seen.push(*x));
        assert_eq!(seen, [20, 30]);
        assert_eq!(s.try_advance(), None);
        assert_eq!(s.len(), 0);
    }

    #[test]
    fn exposes_scheduler_characteristics() {
        let data = [(); 4];
        let c = RangeSplitter::new(&data, 1).characteristics();
        assert!(c.contains(Characteristics::ORDERED | Characteristics::SIZED));
        assert!(c.contains(Characteristics::SUBSIZED | Characteristics::NONNULL));
        assert_eq!(format!("{c:?}"), "{ORDERED, SIZED, SUBSIZED, NONNULL}");
    }
}
