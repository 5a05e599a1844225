//! Scan configuration.
//!
//! All knobs have sensible defaults; deserializing a partial document
//! (e.g. a user config file) fills in the rest.

use serde::{Deserialize, Serialize};

/// Parameters shared by the rule battery and the scheduler.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    /// Lower bound for the last traded price filter.
    pub min_ltp: f64,
    /// Upper bound for the last traded price filter.
    pub max_ltp: f64,
    /// Trailing window, in bars, used by breakout/consolidation/trend rules.
    pub days_to_lookback: usize,
    /// `k` for the narrow-range rule (NRk): the latest bar must have the
    /// smallest true range of the last `k` bars.
    pub nr: usize,
    /// Relative tolerance used by the confluence and IPO-base rules
    /// (0.1 = 10%).
    pub percentage: f64,
    /// Maximum close-to-close spread, percent, for a window to count as
    /// consolidating.
    pub consolidation_pct: f64,
    /// Minimum volume / trailing-volume-average ratio for the volume-jump
    /// rule.
    pub volume_ratio: f64,
    /// Inclusive RSI band.
    pub min_rsi: i32,
    pub max_rsi: i32,
    /// Inclusive CCI band.
    pub min_cci: i32,
    pub max_cci: i32,
    /// When set, moving-average columns use EMA instead of SMA.
    pub use_alternate_average: bool,
    /// Worker threads for the scan pool. `None` uses the machine's
    /// available parallelism.
    pub worker_count: Option<usize>,
    /// True while the trading session is open; changes how forming-bar
    /// rules label their output.
    pub session_open: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            min_ltp: 20.0,
            max_ltp: 50_000.0,
            days_to_lookback: 30,
            nr: 4,
            percentage: 0.1,
            consolidation_pct: 10.0,
            volume_ratio: 2.5,
            min_rsi: 0,
            max_rsi: 100,
            min_cci: -100,
            max_cci: 100,
            use_alternate_average: false,
            worker_count: None,
            session_open: false,
        }
    }
}
