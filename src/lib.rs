//! # barscan — technical screening engine
//!
//! Evaluates a universe of instrument price histories against a battery of
//! technical-analysis rules (breakouts, trend classification, candle/chart
//! patterns, volume anomalies) and reports which instruments currently
//! satisfy which rules.
//!
//! ## Quick Start
//!
//! ```rust
//! use barscan::prelude::*;
//! use std::collections::HashMap;
//!
//! struct MapFetch(HashMap<String, PriceHistory>);
//!
//! impl Fetch for MapFetch {
//!     fn fetch(&self, symbol: &str) -> Option<PriceHistory> {
//!         self.0.get(symbol).cloned()
//!     }
//! }
//!
//! let config = ScanConfig::default();
//! let rules = RuleSet::with_defaults(&config);
//! let fetch = std::sync::Arc::new(MapFetch(HashMap::new()));
//! let scheduler = ScanScheduler::new(config, rules, fetch);
//!
//! let cancel = CancelToken::new();
//! let outcomes = scheduler.scan(vec![], &cancel);
//! assert!(outcomes.is_empty());
//! ```

pub mod aggregate;
pub mod config;
pub mod detectors;
pub mod preprocess;
pub mod record;
pub mod rules;
pub mod scheduler;

pub mod prelude {
    pub use crate::{
        aggregate::{AggregatedReport, BasketRow, ResultAggregator},
        config::ScanConfig,
        detectors::{
            CandleContext, CandleDetector, Direction, PatternDetector, PatternId, PatternMatch,
        },
        preprocess::{preprocess, preprocess_windowed, DerivedSeries},
        record::{ScanOutcome, ScanResult, ScanTask, ScreenRecord},
        rules::{Rule, RuleContext, RuleSet},
        scheduler::{CancelToken, Fetch, ScanScheduler},
        Ohlcv, OhlcvExt, PriceBar, PriceHistory, Result, ScanError, Trend,
    };
}

// ============================================================
// ERRORS
// ============================================================

pub type Result<T> = std::result::Result<T, ScanError>;

/// Errors surfaced by the scan pipeline.
///
/// Predicate-level faults never appear here: a rule that misbehaves is
/// caught at the rule boundary and degrades to its negative result.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    /// The fetch collaborator had no data for the symbol, or the history
    /// was empty.
    #[error("no price data for {symbol}")]
    MissingData { symbol: String },

    /// A column required by the pipeline carried NaN/Inf where a finite
    /// value was mandatory.
    #[error("invalid {column} value at bar {index}")]
    InvalidData { column: &'static str, index: usize },

    /// Fetch or per-symbol evaluation failed as a whole; the task is
    /// excluded from the report and the scan continues.
    #[error("task failed for {symbol}: {reason}")]
    TaskFault { symbol: String, reason: String },
}

// ============================================================
// PRICE BARS
// ============================================================

/// One OHLCV observation for a fixed time period.
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct PriceBar {
    pub date: chrono::NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
}

/// An ordered bar series, strictly increasing by date, oldest first.
/// The most recent bar is **last**.
pub type PriceHistory = Vec<PriceBar>;

/// Core OHLCV accessor trait. Pattern detectors are generic over this so
/// tests and callers can bring their own bar type.
pub trait Ohlcv {
    fn open(&self) -> f64;
    fn high(&self) -> f64;
    fn low(&self) -> f64;
    fn close(&self) -> f64;
    fn volume(&self) -> f64;
}

impl Ohlcv for PriceBar {
    fn open(&self) -> f64 {
        self.open
    }

    fn high(&self) -> f64 {
        self.high
    }

    fn low(&self) -> f64 {
        self.low
    }

    fn close(&self) -> f64 {
        self.close
    }

    fn volume(&self) -> f64 {
        self.volume
    }
}

/// Extension trait with computed candle properties.
pub trait OhlcvExt: Ohlcv {
    #[inline]
    fn body(&self) -> f64 {
        (self.close() - self.open()).abs()
    }

    #[inline]
    fn range(&self) -> f64 {
        self.high() - self.low()
    }

    #[inline]
    fn upper_shadow(&self) -> f64 {
        self.high() - self.open().max(self.close())
    }

    #[inline]
    fn lower_shadow(&self) -> f64 {
        self.open().min(self.close()) - self.low()
    }

    #[inline]
    fn is_bullish(&self) -> bool {
        self.close() > self.open()
    }

    #[inline]
    fn is_bearish(&self) -> bool {
        self.close() < self.open()
    }

    /// Body as ratio of range. Returns None when range ≈ 0.
    #[inline]
    fn body_ratio(&self) -> Option<f64> {
        let range = self.range();
        (range > f64::EPSILON).then(|| self.body() / range)
    }

    /// A bar is valid when every field is finite, the close is positive
    /// and high >= low. Invalid bars must not reach derived computations.
    fn is_valid(&self) -> bool {
        let fields = [
            self.open(),
            self.high(),
            self.low(),
            self.close(),
            self.volume(),
        ];
        fields.iter().all(|v| v.is_finite()) && self.close() > 0.0 && self.high() >= self.low()
    }
}

impl<T: Ohlcv> OhlcvExt for T {}

// ============================================================
// TREND
// ============================================================

/// Trend bucket produced by regression-slope classification.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Trend {
    StrongUp,
    WeakUp,
    Sideways,
    WeakDown,
    StrongDown,
    #[default]
    Unknown,
}

impl Trend {
    #[inline]
    pub fn is_up(self) -> bool {
        matches!(self, Trend::WeakUp | Trend::StrongUp)
    }

    #[inline]
    pub fn is_down(self) -> bool {
        matches!(self, Trend::WeakDown | Trend::StrongDown)
    }

    /// True for any directional bucket (used by range rules that only fire
    /// once a trend has been established).
    #[inline]
    pub fn is_directional(self) -> bool {
        self.is_up() || self.is_down()
    }

    pub fn label(self) -> &'static str {
        match self {
            Trend::StrongUp => "Strong Up",
            Trend::WeakUp => "Weak Up",
            Trend::Sideways => "Sideways",
            Trend::WeakDown => "Weak Down",
            Trend::StrongDown => "Strong Down",
            Trend::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Trend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// ============================================================
// TEST SUPPORT
// ============================================================


// ============================================================
// TESTS
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn bar(o: f64, h: f64, l: f64, c: f64) -> PriceBar {
        PriceBar {
            date: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            open: o,
            high: h,
            low: l,
            close: c,
            volume: 1000.0,
        }
    }

    #[test]
    fn test_ohlcv_ext() {
        let b = bar(100.0, 110.0, 90.0, 105.0);
        assert_eq!(b.body(), 5.0);
        assert_eq!(b.range(), 20.0);
        assert_eq!(b.upper_shadow(), 5.0);
        assert_eq!(b.lower_shadow(), 10.0);
        assert!(b.is_bullish());
        assert!(!b.is_bearish());
        assert!((b.body_ratio().unwrap() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_bar_validity() {
        assert!(bar(100.0, 110.0, 90.0, 105.0).is_valid());
        assert!(!bar(100.0, 110.0, 90.0, f64::NAN).is_valid());
        assert!(!bar(100.0, f64::INFINITY, 90.0, 105.0).is_valid());
        assert!(!bar(100.0, 110.0, 90.0, -5.0).is_valid());
        assert!(!bar(100.0, 90.0, 110.0, 105.0).is_valid());
    }

    #[test]
    fn test_trend_helpers() {
        assert!(Trend::StrongUp.is_up());
        assert!(Trend::WeakDown.is_down());
        assert!(!Trend::Sideways.is_directional());
        assert!(!Trend::Unknown.is_directional());
        assert_eq!(Trend::WeakUp.label(), "Weak Up");
        assert_eq!(Trend::default(), Trend::Unknown);
    }
}
