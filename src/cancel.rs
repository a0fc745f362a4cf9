//! Cooperative cancellation shared by a pipeline run and its hooks.

use crossbeam_channel::{Receiver, Sender, bounded, select};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Shared stop signal for one run.
///
/// Cancelling sets a flag (polled between items) and drops the only sender of
/// a silent channel, which wakes every thread parked in a `select!`. A token
/// is spent once cancelled; pipeline failures cancel the token they run with.
#[derive(Clone, Debug)]
pub struct CancelToken {
    inner: Arc<CancelInner>,
}

#[derive(Debug)]
struct CancelInner {
    flag: AtomicBool,
    guard: Mutex<Option<Sender<()>>>,
    signal: Receiver<()>,
}

impl Default for CancelToken {
    fn default() -> Self {
        Self::new()
    }
}

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        let (tx, rx) = bounded(0);
        Self {
            inner: Arc::new(CancelInner {
                flag: AtomicBool::new(false),
                guard: Mutex::new(Some(tx)),
                signal: rx,
            }),
        }
    }

    pub fn cancel(&self) {
        self.inner.flag.store(true, Ordering::SeqCst);
        match self.inner.guard.lock() {
            Ok(mut guard) => drop(guard.take()),
            Err(poisoned) => drop(poisoned.into_inner().take()),
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.inner.flag.load(Ordering::SeqCst)
    }

    /// Block for `timeout` or until the token is cancelled, whichever comes
    /// first. Returns `true` if the wait was cut short by cancellation.
    pub fn sleep(&self, timeout: Duration) -> bool {
        select! {
            recv(self.signal()) -> _ => true,
            default(timeout) => self.is_cancelled(),
        }
    }

    /// Becomes ready (disconnected) once the token is cancelled.
    pub(crate) fn signal(&self) -> &Receiver<()> {
        &self.inner.signal
    }
}
