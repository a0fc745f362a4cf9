//! Per-item processing hooks.
//!
//! Engines call [`ItemHook::before_item`] once for every input element, right
//! before folding it into an accumulator. The default [`NoDelay`] does
//! nothing. [`FixedDelay`] emulates slow per-item work for benchmarks, and
//! [`from_fn`] wraps a closure, which is how callers inject failures or count
//! calls.
//!
//! A hook is always passed to an engine as a value; there is no process-wide
//! hook state.
//!
//! The batched pipeline calls [`ItemHook::before_item_until`] instead, handing
//! over the run's [`CancelToken`]. Hooks that block should wait on the token so
//! a timed-out or failed run is not held open by the item in progress.

use crate::cancel::CancelToken;
use anyhow::Result;
use std::fmt;
use std::thread;
use std::time::Duration;

pub trait ItemHook<T: ?Sized>: Send + Sync {
    /// Runs before `item` is folded. An error aborts the engine run.
    fn before_item(&self, item: &T) -> Result<()>;

    /// Like [`before_item`](Self::before_item), but may return early once
    /// `cancel` fires. Returning `Ok` after cancellation is fine; the engine
    /// checks the token before folding the next item.
    fn before_item_until(&self, item: &T, cancel: &CancelToken) -> Result<()> {
        let _ = cancel;
        self.before_item(item)
    }
}

/// The default hook: no work, never fails.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDelay;

impl<T: ?Sized> ItemHook<T> for NoDelay {
    #[inline]
    fn before_item(&self, _item: &T) -> Result<()> {
        Ok(())
    }
}

/// Sleep for a fixed duration before every item.
///
/// Under a batched run the sleep ends as soon as the run is cancelled.
#[derive(Clone, Copy, Debug, Default)]
pub struct FixedDelay(pub Duration);

impl FixedDelay {
    #[must_use]
    pub const fn from_millis(millis: u64) -> Self {
        Self(Duration::from_millis(millis))
    }
}

impl<T: ?Sized> ItemHook<T> for FixedDelay {
    fn before_item(&self, _item: &T) -> Result<()> {
        if !self.0.is_zero() {
            thread::sleep(self.0);
        }
        Ok(())
    }

    fn before_item_until(&self, _item: &T, cancel: &CancelToken) -> Result<()> {
        if !self.0.is_zero() {
            cancel.sleep(self.0);
        }
        Ok(())
    }
}

/// Closure-backed hook, see [`from_fn`].
#[derive(Clone, Copy)]
pub struct FnHook<F>(F);

impl<F> fmt::Debug for FnHook<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FnHook")
    }
}

impl<T: ?Sized, F> ItemHook<T> for FnHook<F>
where
    F: Fn(&T) -> Result<()> + Send + Sync,
{
    fn before_item(&self, item: &T) -> Result<()> {
        (self.0)(item)
    }
}

/// Build a hook from a closure.
///
/// ```
/// use receiptflow::hook::{from_fn, ItemHook};
///
/// let reject_odd = from_fn(|n: &u32| {
///     anyhow::ensure!(n % 2 == 0, "odd input {n}");
///     Ok(())
/// });
/// assert!(reject_odd.before_item(&2).is_ok());
/// assert!(reject_odd.before_item(&3).is_err());
/// ```
pub const fn from_fn<F>(f: F) -> FnHook<F> {
    FnHook(f)
}
