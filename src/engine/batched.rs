//! Demand-driven batched pipeline.
//!
//! Three kinds of named threads cooperate over crossbeam channels:
//!
//! ```text
//!  source ─▶ producer ══batches══▶ workers ──partials──▶ reducer
//!               ▲                                          │
//!               └──────────────── demand ◀─────────────────┘
//! ```
//!
//! The reducer owns the running accumulator and is the only thread that
//! merges. It grants the producer an initial quota of
//! `max_in_flight * batch_size` records and one more `batch_size` after every
//! merged batch. The producer never pulls a record from its source without
//! unspent quota, so the number of records emitted can never exceed the number
//! requested, and at most `max_in_flight` batches are ever outstanding.
//!
//! Completion is published once on a one-shot channel. The caller waits on it
//! with the configured timeout; a timeout cancels the pipeline and is reported
//! as [`PipelineError::TimedOut`], never as a partial result.

use crate::cancel::CancelToken;
use crate::combine::CombineFn;
use crate::config::EngineConfig;
use crate::hook::ItemHook;
use anyhow::Result;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, bounded, select, unbounded};
use log::{debug, trace, warn};
use std::any::Any;
use std::error::Error as StdError;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::Duration;
use thiserror::Error;

type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Most record slots reserved up front for a pending batch.
const BATCH_PREALLOC: usize = 4096;

/// Why a batched run produced no statistics.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("pipeline did not complete within {0:?}")]
    TimedOut(Duration),
    #[error("record source failed after {emitted} records")]
    Producer {
        emitted: usize,
        #[source]
        source: BoxError,
    },
    #[error("worker failed on batch {batch}")]
    Worker {
        batch: usize,
        #[source]
        source: BoxError,
    },
    #[error("worker panicked on batch {batch}: {message}")]
    WorkerPanic { batch: usize, message: String },
    #[error("pipeline was cancelled")]
    Cancelled,
    #[error("pipeline stopped after merging {merged} batches without completing")]
    Disconnected { merged: usize },
    #[error("failed to spawn a pipeline thread")]
    Spawn(#[from] std::io::Error),
}

impl PipelineError {
    #[must_use]
    pub const fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut(_))
    }
}

/// A fallible, pull-based supply of borrowed records.
///
/// Any `Iterator<Item = anyhow::Result<&T>> + Send` is a source.
pub trait RecordSource<'a, T: 'a>: Send {
    fn next_record(&mut self) -> Option<Result<&'a T>>;
}

impl<'a, T: 'a, I> RecordSource<'a, T> for I
where
    I: Iterator<Item = Result<&'a T>> + Send,
{
    fn next_record(&mut self) -> Option<Result<&'a T>> {
        self.next()
    }
}

/// Infallible source over a slice.
pub fn slice_source<T: Sync>(records: &[T]) -> impl RecordSource<'_, T> {
    records.iter().map(anyhow::Ok)
}

/// Flow-control counters of a finished run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlowSnapshot {
    /// Records the reducer has asked for, cumulatively.
    pub requested: usize,
    /// Records the producer pulled from the source.
    pub emitted: usize,
    pub batches_dispatched: usize,
    pub batches_merged: usize,
}

#[derive(Debug, Default)]
struct FlowCounters {
    requested: AtomicUsize,
    emitted: AtomicUsize,
    batches_dispatched: AtomicUsize,
    batches_merged: AtomicUsize,
}

impl FlowCounters {
    fn snapshot(&self) -> FlowSnapshot {
        FlowSnapshot {
            requested: self.requested.load(Ordering::SeqCst),
            emitted: self.emitted.load(Ordering::SeqCst),
            batches_dispatched: self.batches_dispatched.load(Ordering::SeqCst),
            batches_merged: self.batches_merged.load(Ordering::SeqCst),
        }
    }
}

/// Output of a successful batched run.
#[derive(Clone, Debug)]
pub struct Completed<O> {
    pub output: O,
    pub flow: FlowSnapshot,
}

type Batch<'a, T> = (usize, Vec<&'a T>);

enum Event<A> {
    Partial { batch: usize, acc: A },
    Failed(PipelineError),
    Exhausted { batches: usize },
}

/// Producer/worker/reducer engine with request-quota backpressure.
#[derive(Clone, Debug)]
pub struct BatchedEngine {
    workers: usize,
    batch_size: usize,
    max_in_flight: usize,
    timeout: Duration,
}

impl BatchedEngine {
    /// # Errors
    /// Fails if the configuration does not validate.
    pub fn new(config: &EngineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            workers: config.workers,
            batch_size: config.batch_size,
            max_in_flight: config.max_in_flight,
            timeout: config.completion_timeout(),
        })
    }

    /// Records the producer may hold un-merged at any instant.
    #[must_use]
    pub const fn in_flight_limit(&self) -> usize {
        self.max_in_flight.saturating_mul(self.batch_size)
    }

    /// Aggregate a slice.
    ///
    /// # Errors
    /// See [`run_source`](Self::run_source).
    pub fn run<T, A, O, C, H>(
        &self,
        records: &[T],
        comb: &C,
        hook: &H,
    ) -> Result<Completed<O>, PipelineError>
    where
        T: Sync,
        A: Send,
        C: CombineFn<T, A, O> + ?Sized,
        H: ItemHook<T> + ?Sized,
    {
        self.run_source(slice_source(records), comb, hook, &CancelToken::new())
    }

    /// Aggregate everything `source` yields, stopping early if `cancel` fires.
    ///
    /// # Errors
    /// * [`PipelineError::TimedOut`] if the reducer has not published a result
    ///   within the configured completion timeout.
    /// * [`PipelineError::Producer`], [`PipelineError::Worker`] or
    ///   [`PipelineError::WorkerPanic`] for the first failure observed; merged
    ///   partial results are discarded.
    /// * [`PipelineError::Cancelled`] if `cancel` was triggered externally.
    pub fn run_source<'a, T, S, A, O, C, H>(
        &self,
        source: S,
        comb: &C,
        hook: &H,
        cancel: &CancelToken,
    ) -> Result<Completed<O>, PipelineError>
    where
        T: Sync + 'a,
        S: RecordSource<'a, T>,
        A: Send,
        C: CombineFn<T, A, O> + ?Sized,
        H: ItemHook<T> + ?Sized,
    {
        debug!(
            "batched run: {} workers, batch size {}, {} batches in flight",
            self.workers, self.batch_size, self.max_in_flight
        );
        let flow = FlowCounters::default();
        let flow = &flow;

        let outcome = thread::scope(|scope| -> Result<A, PipelineError> {
            let (batch_tx, batch_rx) = bounded::<Batch<'a, T>>(self.max_in_flight);
            let (event_tx, event_rx) = unbounded::<Event<A>>();
            let (demand_tx, demand_rx) = unbounded::<usize>();
            let (done_tx, done_rx) = bounded::<Result<A, PipelineError>>(1);

            let abort = |e: std::io::Error| {
                cancel.cancel();
                PipelineError::Spawn(e)
            };
            let mut handles = Vec::with_capacity(self.workers + 2);

            let reducer = Reducer {
                events: event_rx,
                demand: demand_tx,
                batch_size: self.batch_size,
                flow,
                cancel,
            };
            let initial = self.in_flight_limit();
            handles.push(
                thread::Builder::new()
                    .name("receiptflow-reducer".into())
                    .spawn_scoped(scope, move || {
                        let result = reducer.run(comb, initial);
                        if result.is_err() {
                            cancel.cancel();
                        }
                        let _ = done_tx.send(result);
                    })
                    .map_err(abort)?,
            );

            for i in 0..self.workers {
                let batches = batch_rx.clone();
                let events = event_tx.clone();
                handles.push(
                    thread::Builder::new()
                        .name(format!("receiptflow-worker-{i}"))
                        .spawn_scoped(scope, move || work(&batches, &events, comb, hook, cancel))
                        .map_err(abort)?,
                );
            }
            drop(batch_rx);

            let producer = Producer {
                source,
                batches: batch_tx,
                demand: demand_rx,
                events: event_tx,
                batch: Vec::with_capacity(self.batch_size.min(BATCH_PREALLOC)),
                batch_size: self.batch_size,
                quota: 0,
                dispatched: 0,
                flow,
                cancel,
            };
            handles.push(
                thread::Builder::new()
                    .name("receiptflow-producer".into())
                    .spawn_scoped(scope, move || producer.run())
                    .map_err(abort)?,
            );

            let outcome = match done_rx.recv_timeout(self.timeout) {
                Ok(result) => result,
                Err(RecvTimeoutError::Timeout) => {
                    warn!("batched pipeline timed out after {:?}", self.timeout);
                    Err(PipelineError::TimedOut(self.timeout))
                }
                Err(RecvTimeoutError::Disconnected) => Err(PipelineError::Disconnected {
                    merged: flow.batches_merged.load(Ordering::SeqCst),
                }),
            };
            if outcome.is_err() {
                cancel.cancel();
            }
            for handle in handles {
                if let Err(payload) = handle.join() {
                    warn!("pipeline thread panicked: {}", panic_message(payload.as_ref()));
                }
            }
            outcome
        });

        match outcome {
            Ok(acc) => {
                let flow = flow.snapshot();
                debug!(
                    "batched run complete: {} records in {} batches",
                    flow.emitted, flow.batches_merged
                );
                Ok(Completed {
                    output: comb.finish(acc),
                    flow,
                })
            }
            Err(e) => {
                warn!("batched run failed: {e}");
                Err(e)
            }
        }
    }
}

struct Producer<'a, 's, T, S, A> {
    source: S,
    batches: Sender<Batch<'a, T>>,
    demand: Receiver<usize>,
    events: Sender<Event<A>>,
    batch: Vec<&'a T>,
    batch_size: usize,
    quota: usize,
    dispatched: usize,
    flow: &'s FlowCounters,
    cancel: &'s CancelToken,
}

impl<'a, T, S, A> Producer<'a, '_, T, S, A>
where
    T: Sync + 'a,
    S: RecordSource<'a, T>,
{
    fn run(mut self) {
        loop {
            if self.cancel.is_cancelled() {
                return;
            }
            if self.quota == 0 {
                // Flush before parking: the reducer only grants more once
                // everything already emitted has been merged.
                if !self.flush() {
                    return;
                }
                select! {
                    recv(self.demand) -> grant => match grant {
                        Ok(n) => self.quota = self.quota.saturating_add(n),
                        Err(_) => return,
                    },
                    recv(self.cancel.signal()) -> _ => return,
                }
                continue;
            }
            match self.source.next_record() {
                Some(Ok(record)) => {
                    self.quota -= 1;
                    self.flow.emitted.fetch_add(1, Ordering::SeqCst);
                    self.batch.push(record);
                    if self.batch.len() == self.batch_size && !self.flush() {
                        return;
                    }
                }
                Some(Err(e)) => {
                    let emitted = self.flow.emitted.load(Ordering::SeqCst);
                    warn!("record source failed after {emitted} records: {e:#}");
                    let _ = self.events.send(Event::Failed(PipelineError::Producer {
                        emitted,
                        source: e.into(),
                    }));
                    return;
                }
                None => {
                    if self.flush() {
                        let _ = self.events.send(Event::Exhausted {
                            batches: self.dispatched,
                        });
                    }
                    return;
                }
            }
        }
    }

    /// Send the pending batch, if any. Returns `false` once the pipeline is
    /// shutting down.
    fn flush(&mut self) -> bool {
        if self.batch.is_empty() {
            return true;
        }
        let fresh = Vec::with_capacity(self.batch_size.min(BATCH_PREALLOC));
        let records = std::mem::replace(&mut self.batch, fresh);
        let index = self.dispatched;
        trace!("dispatching batch {index} ({} records)", records.len());
        select! {
            send(self.batches, (index, records)) -> sent => {
                if sent.is_err() {
                    return false;
                }
            },
            recv(self.cancel.signal()) -> _ => return false,
        }
        self.dispatched += 1;
        self.flow.batches_dispatched.fetch_add(1, Ordering::SeqCst);
        true
    }
}

fn work<'a, T, A, O, C, H>(
    batches: &Receiver<Batch<'a, T>>,
    events: &Sender<Event<A>>,
    comb: &C,
    hook: &H,
    cancel: &CancelToken,
) where
    T: 'a,
    C: CombineFn<T, A, O> + ?Sized,
    H: ItemHook<T> + ?Sized,
{
    loop {
        let (batch, records) = select! {
            recv(batches) -> msg => match msg {
                Ok(b) => b,
                Err(_) => return,
            },
            recv(cancel.signal()) -> _ => return,
        };
        let folded = panic::catch_unwind(AssertUnwindSafe(|| {
            fold_batch(batch, &records, comb, hook, cancel)
        }));
        let event = match folded {
            Ok(Ok(acc)) => Event::Partial { batch, acc },
            Ok(Err(e)) => Event::Failed(e),
            Err(payload) => Event::Failed(PipelineError::WorkerPanic {
                batch,
                message: panic_message(payload.as_ref()),
            }),
        };
        let failed = matches!(event, Event::Failed(_));
        if events.send(event).is_err() || failed {
            return;
        }
    }
}

fn fold_batch<T, A, O, C, H>(
    batch: usize,
    records: &[&T],
    comb: &C,
    hook: &H,
    cancel: &CancelToken,
) -> Result<A, PipelineError>
where
    C: CombineFn<T, A, O> + ?Sized,
    H: ItemHook<T> + ?Sized,
{
    let mut acc = comb.create();
    for &record in records {
        if cancel.is_cancelled() {
            return Err(PipelineError::Cancelled);
        }
        hook.before_item_until(record, cancel).map_err(|e| PipelineError::Worker {
            batch,
            source: e.into(),
        })?;
        comb.add_input(&mut acc, record);
    }
    Ok(acc)
}

struct Reducer<'s, A> {
    events: Receiver<Event<A>>,
    demand: Sender<usize>,
    batch_size: usize,
    flow: &'s FlowCounters,
    cancel: &'s CancelToken,
}

impl<A> Reducer<'_, A> {
    fn grant(&self, n: usize) {
        let _ = self
            .flow
            .requested
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |r| Some(r.saturating_add(n)));
        // The producer may already be gone after exhausting its source.
        let _ = self.demand.send(n);
    }

    fn run<T, O, C>(self, comb: &C, initial: usize) -> Result<A, PipelineError>
    where
        C: CombineFn<T, A, O> + ?Sized,
    {
        self.grant(initial);
        let mut running = comb.create();
        let mut merged = 0usize;
        let mut expected = None;
        loop {
            if expected == Some(merged) {
                return Ok(running);
            }
            select! {
                recv(self.events) -> event => match event {
                    Ok(Event::Partial { batch, acc }) => {
                        comb.merge(&mut running, acc);
                        merged += 1;
                        self.flow.batches_merged.fetch_add(1, Ordering::SeqCst);
                        trace!("merged batch {batch}");
                        self.grant(self.batch_size);
                    }
                    Ok(Event::Failed(e)) => return Err(e),
                    Ok(Event::Exhausted { batches }) => expected = Some(batches),
                    Err(_) if self.cancel.is_cancelled() => return Err(PipelineError::Cancelled),
                    Err(_) => return Err(PipelineError::Disconnected { merged }),
                },
                recv(self.cancel.signal()) -> _ => return Err(PipelineError::Cancelled),
            }
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| (*s).to_owned())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "opaque panic payload".to_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combine::ReceiptStatsFn;
    use crate::hook::NoDelay;
    use crate::model::Receipt;
    use crate::statistics::ReceiptStatistics;
    use crate::testing::{ReceiptGenerator, three_receipt_scenario};

    fn small() -> BatchedEngine {
        let cfg = EngineConfig::default()
            .with_workers(2)
            .with_batch_size(4)
            .with_max_in_flight(2);
        BatchedEngine::new(&cfg).unwrap()
    }

    #[test]
    fn empty_input_completes_with_no_batches() {
        let done = small()
            .run::<Receipt, _, _, _, _>(&[], &ReceiptStatsFn::default(), &NoDelay)
            .unwrap();
        assert_eq!(done.output, ReceiptStatistics::empty());
        assert_eq!(done.flow.batches_dispatched, 0);
        assert_eq!(done.flow.emitted, 0);
    }

    #[test]
    fn counts_every_batch() {
        let records = ReceiptGenerator::seeded(5).generate(10);
        let done = small()
            .run(&records, &ReceiptStatsFn::default(), &NoDelay)
            .unwrap();
        assert_eq!(done.flow.emitted, 10);
        assert_eq!(done.flow.batches_dispatched, 3);
        assert_eq!(done.flow.batches_merged, 3);
        assert!(done.flow.emitted <= done.flow.requested);
    }

    #[test]
    fn unbounded_batch_size_saturates_the_quota() {
        let cfg = EngineConfig::default()
            .with_workers(2)
            .with_batch_size(usize::MAX)
            .with_max_in_flight(1);
        let engine = BatchedEngine::new(&cfg).unwrap();
        assert_eq!(engine.in_flight_limit(), usize::MAX);

        let records = ReceiptGenerator::seeded(7).generate(25);
        let done = engine
            .run(&records, &ReceiptStatsFn::default(), &NoDelay)
            .unwrap();
        assert_eq!(done.output.total_orders, 25);
        assert_eq!(done.flow.batches_merged, 1);
        assert_eq!(done.flow.requested, usize::MAX);
    }

    #[test]
    fn pre_cancelled_token_reports_cancelled() {
        let records = three_receipt_scenario();
        let token = CancelToken::new();
        token.cancel();
        let err = small()
            .run_source(slice_source(&records), &ReceiptStatsFn::default(), &NoDelay, &token)
            .unwrap_err();
        assert!(matches!(err, PipelineError::Cancelled), "{err:?}");
    }

    #[test]
    fn panic_messages_are_recovered() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(boxed.as_ref()), "boom");
        let owned: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(owned.as_ref()), "bang");
    }
}
