//! Testing utilities for receipt aggregation.
//!
//! This module is public so downstream benchmarks and tests can reuse it:
//!
//! - **Fixtures**: small hand-checked record sets ([`three_receipt_scenario`],
//!   [`malformed_receipts`], [`sample_receipts`])
//! - **Builders**: [`ReceiptBuilder`] for one-off records and the seeded
//!   [`ReceiptGenerator`] for large reproducible inputs
//! - **Assertions**: [`assert_statistics_close`] compares two
//!   [`ReceiptStatistics`](crate::ReceiptStatistics) values exactly on counts
//!   and keys, and within a relative tolerance on floating-point sums
//!
//! # Quick Start
//!
//! ```
//! use receiptflow::testing::*;
//! use receiptflow::{EngineConfig, ExecMode, Runner};
//!
//! # fn main() -> anyhow::Result<()> {
//! let records = ReceiptGenerator::seeded(7).generate(1_000);
//! let expected = Runner::sequential().run(&records)?;
//! let actual = Runner::new(ExecMode::Batched, EngineConfig::default()).run(&records)?;
//! assert_statistics_close(&actual, &expected, 1e-9);
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod builders;
pub mod fixtures;

pub use assertions::*;
pub use builders::*;
pub use fixtures::*;
