//! Screening rules.
//!
//! Every rule answers one yes/no question about a symbol and annotates the
//! [`ScreenRecord`] with what it measured. Rules are pure over their
//! inputs and fail closed: missing history, NaN or Inf always produce
//! `false`, never an error. A rule that panics is caught at the rule
//! boundary, logged, and degraded to `false`; the remaining rules still
//! run.

pub mod breakout;
pub mod candles;
pub mod cup_handle;
pub mod oscillator;
pub mod trend;

pub use breakout::*;
pub use candles::*;
pub use cup_handle::*;
pub use oscillator::*;
pub use trend::*;

use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::{config::ScanConfig, preprocess::DerivedSeries, record::ScreenRecord, PriceBar};

/// Shared read-only inputs for one symbol's evaluation.
pub struct RuleContext<'a> {
    /// Full bar history, oldest first.
    pub history: &'a [PriceBar],
    /// Derived columns aligned with `history`.
    pub derived: &'a DerivedSeries,
    /// Derived columns restricted to the configured lookback window.
    /// Rules that only look at the recent window read from here.
    pub trimmed: &'a DerivedSeries,
    pub config: &'a ScanConfig,
}

impl RuleContext<'_> {
    /// Last `n` bars of history (all of it when shorter).
    pub fn tail(&self, n: usize) -> &[PriceBar] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Bars inside the configured lookback window.
    pub fn lookback(&self) -> &[PriceBar] {
        self.tail(self.config.days_to_lookback)
    }
}

/// One screening predicate.
pub trait Rule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Evaluates the rule, annotating `record` with whatever was measured
    /// (measurements are recorded even when the predicate fails).
    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool;
}

/// Ordered rule registry. Order matters: later rules may read record
/// fields written by earlier ones (e.g. CCI gating on trend).
#[derive(Default)]
pub struct RuleSet {
    rules: Vec<Box<dyn Rule>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The full default battery in evaluation order.
    pub fn with_defaults(config: &ScanConfig) -> Self {
        let mut set = Self::new();
        set.register(Box::new(LtpBounds));
        set.register(Box::new(Consolidation));
        set.register(Box::new(TrendClassification));
        set.register(Box::new(MaSignal));
        set.register(Box::new(Confluence));
        set.register(Box::new(BreakoutValue));
        set.register(Box::new(PotentialBreakout));
        set.register(Box::new(High52WeekBreakout));
        set.register(Box::new(Low52WeekBreakout));
        set.register(Box::new(Low10DayBreakout));
        set.register(Box::new(RsiRange));
        set.register(Box::new(CciRange));
        set.register(Box::new(VolumeJump));
        set.register(Box::new(LowestVolume::default()));
        set.register(Box::new(NarrowRange { k: config.nr }));
        set.register(Box::new(MomentumGainer));
        set.register(Box::new(PriceRisingSteadily));
        set.register(Box::new(HigherHighsHigherLows));
        set.register(Box::new(BullishDivergence));
        set.register(Box::new(VolumeSpreadAnalysis));
        set.register(Box::new(InsideBar::default()));
        set.register(Box::new(IpoBase));
        set.register(Box::new(CandlePatterns::default()));
        set.register(Box::new(CupHandleRule));
        set
    }

    pub fn register(&mut self, rule: Box<dyn Rule>) {
        self.rules.push(rule);
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&dyn Rule> {
        self.rules
            .iter()
            .find(|rule| rule.name() == name)
            .map(|rule| rule.as_ref())
    }

    /// Runs every rule in registry order and returns how many matched.
    /// A panicking rule counts as a non-match.
    pub fn evaluate_all(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> usize {
        let mut matched = 0;
        for rule in &self.rules {
            let outcome = catch_unwind(AssertUnwindSafe(|| rule.evaluate(ctx, record)));
            match outcome {
                Ok(true) => matched += 1,
                Ok(false) => {}
                Err(_) => {
                    tracing::warn!(rule = rule.name(), symbol = %record.symbol, "rule panicked");
                }
            }
        }
        matched
    }
}

/// Last element of a derived column, if finite.
pub(crate) fn last_finite(values: &[f64]) -> Option<f64> {
    values.last().copied().filter(|v| v.is_finite())
}

pub(crate) fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
