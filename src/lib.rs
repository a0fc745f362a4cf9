//! # Receiptflow
//!
//! An **aggregation engine** for receipt statistics. Receiptflow folds a large,
//! static, in-memory collection of transaction records into one
//! [`ReceiptStatistics`] value (revenue, order counts, per-key breakdowns and
//! top-N rankings) and can schedule that fold three interchangeable ways.
//!
//! ## Key Features
//!
//! - **One accumulator, one merge** - every engine builds private
//!   [`ReceiptAccumulator`]s and combines them with the same associative merge
//! - **Sequential, fork/join and batched execution** - pick the schedule, get
//!   the same statistics within floating-point tolerance
//! - **Custom range splitting** - [`RangeSplitter`] drives the fork/join tree
//!   down to a tunable minimum batch size
//! - **Backpressure** - the batched pipeline never pulls more records than its
//!   reducer has requested
//! - **Bounded completion wait** - a batched run that overruns its timeout is
//!   reported as [`PipelineError::TimedOut`], never as a partial result
//! - **Injectable per-item hook** - emulate slow work or inject failures
//!   without global state
//!
//! ## Quick Start
//!
//! ```
//! use receiptflow::*;
//! use receiptflow::testing::three_receipt_scenario;
//! # use anyhow::Result;
//!
//! # fn main() -> Result<()> {
//! let records = three_receipt_scenario();
//!
//! let stats = Runner::new(ExecMode::Parallel, EngineConfig::default()).run(&records)?;
//! assert_eq!(stats.total_orders, 3);
//! assert_eq!(stats.top_items_by_quantity[0].item_name, "widget");
//! # Ok(())
//! # }
//! ```
//!
//! ## Core Concepts
//!
//! ### Accumulator
//!
//! A [`ReceiptAccumulator`] is the partial aggregate of some subset of the
//! records. Accumulators are owned by one task at a time and handed over by
//! value when merged; there is no shared mutable aggregate state anywhere.
//!
//! ### Combiner
//!
//! Engines are generic over [`CombineFn`], a create / add / merge / finish
//! contract. [`ReceiptStatsFn`] is the receipt statistics combiner; any other
//! associative aggregation can run through the same engines.
//!
//! ### Engines
//!
//! - [`SequentialEngine`] - a single in-order fold
//! - [`ParallelEngine`] - recursive [`RangeSplitter`] splits joined on a
//!   dedicated rayon pool
//! - [`BatchedEngine`] - producer, workers and a single reducer connected by
//!   crossbeam channels under a request-quota protocol
//!
//! [`Runner`] selects one by [`ExecMode`] and an [`EngineConfig`].
//!
//! ### Ranking
//!
//! After the final merge, [`ranking`] turns the raw per-key tallies into
//! deterministic ordered lists. Every tie is broken by a secondary metric and
//! then by the key itself.
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade (`debug!` per run, `trace!` per
//! batch or skipped record, `warn!` on failures and timeouts) and never
//! installs a logger itself.

pub mod accumulator;
pub mod cancel;
pub mod combine;
pub mod config;
pub mod engine;
pub mod hook;
pub mod model;
pub mod ranking;
pub mod runner;
pub mod splitter;
pub mod statistics;
pub mod testing;

// General re-exports
pub use accumulator::ReceiptAccumulator;
pub use combine::{CombineFn, ReceiptStatsFn};
pub use config::EngineConfig;
pub use engine::{
    BatchedEngine, CancelToken, Completed, FlowSnapshot, ParallelEngine, PipelineError,
    RecordSource, SequentialEngine, slice_source,
};
pub use hook::{FixedDelay, ItemHook, NoDelay};
pub use model::{Customer, LineItem, PriceTier, Receipt, ReceiptStatus, ShippingAddress};
pub use runner::{ExecMode, Runner};
pub use splitter::RangeSplitter;
pub use statistics::{
    CityRevenue, CustomerOrderProfile, CustomerSpending, ItemAverageReceipt, ItemSales,
    PriceTierSales, ReceiptStatistics, StateRevenue, StatusRevenue, Tally, TotalAverage,
};
