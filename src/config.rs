//! Engine configuration.
//!
//! [`EngineConfig`] is the whole tuning surface the engines consume. It has
//! sensible defaults, fluent `with_*` setters, and can be deserialized from
//! JSON so a benchmark harness can keep its settings in a file.
//!
//! ```
//! use receiptflow::EngineConfig;
//!
//! let cfg = EngineConfig::from_json_str(r#"{ "min_batch_size": 64, "workers": 2 }"#)?;
//! assert_eq!(cfg.min_batch_size, 64);
//! assert_eq!(cfg.batch_size, EngineConfig::default().batch_size);
//! # Ok::<_, anyhow::Error>(())
//! ```

use crate::ranking::DEFAULT_TOP_LIMIT;
use crate::splitter::DEFAULT_MIN_BATCH_SIZE;
use anyhow::{Context, Result, ensure};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Records per batch in the batched pipeline.
pub const DEFAULT_BATCH_SIZE: usize = 256;

/// Wait bound for batched pipeline completion.
pub const DEFAULT_COMPLETION_TIMEOUT_MS: u64 = 60_000;

/// Upper bound on `max_in_flight`; the batch channel preallocates this many slots.
pub const MAX_IN_FLIGHT_LIMIT: usize = 1 << 16;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Leaf size at which the range splitter stops splitting.
    pub min_batch_size: usize,
    /// Worker threads for the parallel pool and the batched pipeline.
    pub workers: usize,
    /// Records per batch in the batched pipeline.
    pub batch_size: usize,
    /// Batches the batched pipeline may have requested but not yet merged.
    pub max_in_flight: usize,
    /// How long a batched run may take before it is reported as timed out.
    pub completion_timeout_ms: u64,
    /// Entries kept in every bounded ranking.
    pub top_n: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        let workers = num_cpus::get().max(1);
        Self {
            min_batch_size: DEFAULT_MIN_BATCH_SIZE,
            workers,
            batch_size: DEFAULT_BATCH_SIZE,
            max_in_flight: 2 * workers,
            completion_timeout_ms: DEFAULT_COMPLETION_TIMEOUT_MS,
            top_n: DEFAULT_TOP_LIMIT,
        }
    }
}

impl EngineConfig {
    /// Parse a (possibly partial) JSON object; missing fields take defaults.
    ///
    /// # Errors
    /// Fails on malformed JSON, unknown fields, or values rejected by
    /// [`validate`](Self::validate).
    pub fn from_json_str(json: &str) -> Result<Self> {
        let cfg: Self = serde_json::from_str(json).context("parsing engine configuration")?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Check every knob is usable.
    ///
    /// # Errors
    /// Fails when a size, count or timeout is zero, when `max_in_flight`
    /// exceeds [`MAX_IN_FLIGHT_LIMIT`], or when `max_in_flight * batch_size`
    /// does not fit in a `usize`.
    pub fn validate(&self) -> Result<()> {
        ensure!(self.min_batch_size >= 1, "min_batch_size must be at least 1");
        ensure!(self.workers >= 1, "workers must be at least 1");
        ensure!(self.batch_size >= 1, "batch_size must be at least 1");
        ensure!(self.max_in_flight >= 1, "max_in_flight must be at least 1");
        ensure!(
            self.max_in_flight <= MAX_IN_FLIGHT_LIMIT,
            "max_in_flight must be at most {MAX_IN_FLIGHT_LIMIT}"
        );
        ensure!(
            self.max_in_flight.checked_mul(self.batch_size).is_some(),
            "max_in_flight * batch_size overflows"
        );
        ensure!(self.completion_timeout_ms > 0, "completion_timeout_ms must be positive");
        Ok(())
    }

    #[must_use]
    pub const fn completion_timeout(&self) -> Duration {
        Duration::from_millis(self.completion_timeout_ms)
    }

    #[must_use]
    pub const fn with_min_batch_size(mut self, n: usize) -> Self {
        self.min_batch_size = n;
        self
    }

    #[must_use]
    pub const fn with_workers(mut self, n: usize) -> Self {
        self.workers = n;
        self
    }

    #[must_use]
    pub const fn with_batch_size(mut self, n: usize) -> Self {
        self.batch_size = n;
        self
    }

    #[must_use]
    pub const fn with_max_in_flight(mut self, n: usize) -> Self {
        self.max_in_flight = n;
        self
    }

    #[must_use]
    pub fn with_completion_timeout(mut self, timeout: Duration) -> Self {
        self.completion_timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
        self
    }

    #[must_use]
    pub const fn with_top_n(mut self, n: usize) -> Self {
        self.top_n = n;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = EngineConfig::default();
        cfg.validate().unwrap();
        assert_eq!(cfg.min_batch_size, 256);
        assert_eq!(cfg.top_n, 5);
        assert_eq!(cfg.max_in_flight, 2 * cfg.workers);
    }

    #[test]
    fn zero_values_are_rejected() {
        assert!(EngineConfig::default().with_workers(0).validate().is_err());
        assert!(EngineConfig::default().with_batch_size(0).validate().is_err());
        assert!(
            EngineConfig::default()
                .with_completion_timeout(Duration::ZERO)
                .validate()
                .is_err()
        );
    }

    #[test]
    fn in_flight_product_overflow_is_rejected() {
        let cfg = EngineConfig::default()
            .with_batch_size(usize::MAX / 2 + 1)
            .with_max_in_flight(2);
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("overflows"), "{err}");
        let single = EngineConfig::default()
            .with_batch_size(usize::MAX)
            .with_max_in_flight(1);
        assert!(single.validate().is_ok());
    }

    #[test]
    fn oversized_in_flight_window_is_rejected() {
        let cfg = EngineConfig::default().with_max_in_flight(usize::MAX);
        assert!(cfg.validate().is_err());
        let cfg = EngineConfig::default().with_max_in_flight(MAX_IN_FLIGHT_LIMIT);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn json_rejects_unknown_fields() {
        let err = EngineConfig::from_json_str(r#"{ "batchsize": 3 }"#).unwrap_err();
        assert!(format!("{err:#}").contains("unknown field"));
    }
}
