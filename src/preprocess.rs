//! Indicator preprocessing.
//!
//! Turns a raw bar history into the derived columns the rule battery reads:
//! moving averages, RSI, CCI and fast stochastics. Output vectors are
//! index-aligned with the input history; entries that lack enough trailing
//! data are NaN. Rules treat NaN as "unknown" and fail closed.

use crate::{config::ScanConfig, PriceBar};

pub const SMA_PERIOD: usize = 50;
pub const LMA_PERIOD: usize = 200;
pub const SSMA_PERIOD: usize = 9;
pub const SSMA20_PERIOD: usize = 20;
pub const VOLMA_PERIOD: usize = 20;
pub const RSI_PERIOD: usize = 14;
pub const CCI_PERIOD: usize = 14;
pub const FASTK_PERIOD: usize = 5;
pub const FASTD_PERIOD: usize = 3;

/// Derived columns, index-aligned with the source history.
#[derive(Debug, Clone, Default)]
pub struct DerivedSeries {
    /// 50-bar close average (EMA when the alternate-average flag is set).
    pub sma: Vec<f64>,
    /// 200-bar close average.
    pub lma: Vec<f64>,
    /// 9-bar close average.
    pub ssma: Vec<f64>,
    /// 20-bar close average.
    pub ssma20: Vec<f64>,
    /// 20-bar volume average.
    pub vol_ma: Vec<f64>,
    /// Wilder RSI, 14 bars.
    pub rsi: Vec<f64>,
    /// Commodity channel index, 14 bars.
    pub cci: Vec<f64>,
    /// Fast stochastic %K (5 bars).
    pub fast_k: Vec<f64>,
    /// Fast stochastic %D (3-bar average of %K).
    pub fast_d: Vec<f64>,
}

impl DerivedSeries {
    pub fn len(&self) -> usize {
        self.sma.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sma.is_empty()
    }

    /// Last `n` entries of every column. Returns a full clone when the
    /// series is shorter than `n`.
    pub fn tail(&self, n: usize) -> DerivedSeries {
        let start = self.len().saturating_sub(n);
        DerivedSeries {
            sma: self.sma[start..].to_vec(),
            lma: self.lma[start..].to_vec(),
            ssma: self.ssma[start..].to_vec(),
            ssma20: self.ssma20[start..].to_vec(),
            vol_ma: self.vol_ma[start..].to_vec(),
            rsi: self.rsi[start..].to_vec(),
            cci: self.cci[start..].to_vec(),
            fast_k: self.fast_k[start..].to_vec(),
            fast_d: self.fast_d[start..].to_vec(),
        }
    }
}

/// Computes every derived column for `history`. An empty history yields an
/// empty series.
pub fn preprocess(history: &[PriceBar], config: &ScanConfig) -> DerivedSeries {
    if history.is_empty() {
        return DerivedSeries::default();
    }
    let closes: Vec<f64> = history.iter().map(|b| b.close).collect();
    let highs: Vec<f64> = history.iter().map(|b| b.high).collect();
    let lows: Vec<f64> = history.iter().map(|b| b.low).collect();
    let volumes: Vec<f64> = history.iter().map(|b| b.volume).collect();

    let avg: fn(&[f64], usize) -> Vec<f64> = if config.use_alternate_average {
        ema
    } else {
        sma
    };

    let fast_k = stoch_fast_k(&highs, &lows, &closes, FASTK_PERIOD);
    let fast_d = sma(&fast_k, FASTD_PERIOD);

    DerivedSeries {
        sma: avg(&closes, SMA_PERIOD),
        lma: avg(&closes, LMA_PERIOD),
        ssma: avg(&closes, SSMA_PERIOD),
        ssma20: avg(&closes, SSMA20_PERIOD),
        vol_ma: sma(&volumes, VOLMA_PERIOD),
        rsi: wilder_rsi(&closes, RSI_PERIOD),
        cci: cci(&highs, &lows, &closes, CCI_PERIOD),
        fast_k,
        fast_d,
    }
}

/// [`preprocess`] plus a trimmed view of the configured lookback window:
/// `(full, last days_to_lookback rows)`.
pub fn preprocess_windowed(
    history: &[PriceBar],
    config: &ScanConfig,
) -> (DerivedSeries, DerivedSeries) {
    let full = preprocess(history, config);
    let trimmed = full.tail(config.days_to_lookback);
    (full, trimmed)
}

/// Simple moving average. NaN until `period` samples are available; a NaN
/// anywhere in the window yields NaN for that entry.
pub fn sma(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    for i in (period - 1)..values.len() {
        let window = &values[i + 1 - period..=i];
        if window.iter().all(|v| v.is_finite()) {
            out[i] = window.iter().sum::<f64>() / period as f64;
        }
    }
    out
}

/// Exponential moving average seeded with the SMA of the first `period`
/// samples. A non-finite sample poisons the tail, which is the intended
/// fail-closed behavior.
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; values.len()];
    if period == 0 || values.len() < period {
        return out;
    }
    let alpha = 2.0 / (period as f64 + 1.0);
    let seed = values[..period].iter().sum::<f64>() / period as f64;
    out[period - 1] = seed;
    for i in period..values.len() {
        out[i] = values[i] * alpha + out[i - 1] * (1.0 - alpha);
    }
    out
}

/// Wilder-smoothed relative strength index.
pub fn wilder_rsi(closes: &[f64], period: usize) -> Vec<f64> {
    let mut out = vec![f64::NAN; closes.len()];
    if period == 0 || closes.len() <= period {
        return out;
    }
    let mut avg_gain = 0.0;
    let mut avg_loss = 0.0;
    for i in 1..=period {
        let change = closes[i] - closes[i - 1];
        avg_gain += change.max(0.0);
        avg_loss += (-change).max(0.0);
    }
    avg_gain /= period as f64;
    avg_loss /= period as f64;
    out[period] = rsi_value(avg_gain, avg_loss);
    for i in (period + 1)..closes.len() {
        let change = closes[i] - closes[i - 1];
        avg_gain = (avg_gain * (period as f64 - 1.0) + change.max(0.0)) / period as f64;
        avg_loss = (avg_loss * (period as f64 - 1.0) + (-change).max(0.0)) / period as f64;
        out[i] = rsi_value(avg_gain, avg_loss);
    }
    out
}

fn rsi_value(avg_gain: f64, avg_loss: f64) -> f64 {
    if !avg_gain.is_finite() || !avg_loss.is_finite() {
        f64::NAN
    } else if avg_loss == 0.0 {
        100.0
    } else {
        100.0 - 100.0 / (1.0 + avg_gain / avg_loss)
    }
}

/// Commodity channel index over typical prices. Zero mean deviation (a
/// perfectly flat window) maps to 0.
pub fn cci(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }
    let tp: Vec<f64> = (0..n)
        .map(|i| (highs[i] + lows[i] + closes[i]) / 3.0)
        .collect();
    for i in (period - 1)..n {
        let window = &tp[i + 1 - period..=i];
        if !window.iter().all(|v| v.is_finite()) {
            continue;
        }
        let mean = window.iter().sum::<f64>() / period as f64;
        let mean_dev = window.iter().map(|v| (v - mean).abs()).sum::<f64>() / period as f64;
        out[i] = if mean_dev == 0.0 {
            0.0
        } else {
            (tp[i] - mean) / (0.015 * mean_dev)
        };
    }
    out
}

/// Fast stochastic %K. A flat window (highest high == lowest low) yields
/// NaN rather than an arbitrary midpoint.
pub fn stoch_fast_k(highs: &[f64], lows: &[f64], closes: &[f64], period: usize) -> Vec<f64> {
    let n = closes.len();
    let mut out = vec![f64::NAN; n];
    if period == 0 || n < period {
        return out;
    }
    for i in (period - 1)..n {
        let h = &highs[i + 1 - period..=i];
        let l = &lows[i + 1 - period..=i];
        if !h.iter().chain(l.iter()).all(|v| v.is_finite()) || !closes[i].is_finite() {
            continue;
        }
        let hh = h.iter().cloned().fold(f64::MIN, f64::max);
        let ll = l.iter().cloned().fold(f64::MAX, f64::min);
        if hh > ll {
            out[i] = 100.0 * (closes[i] - ll) / (hh - ll);
        }
    }
    out
}
