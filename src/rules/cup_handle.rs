//! Cup-and-handle detection with volatility-adaptive extrema smoothing.
//!
//! The extrema window (`order`) scales with measured volatility, so noisy
//! series demand wider confirmation around each rim and quiet series can
//! resolve tighter structures.

use super::{Rule, RuleContext};
use crate::{record::ScreenRecord, PriceBar};

/// Rolling standard-deviation window for the volatility estimate.
const VOLATILITY_WINDOW: usize = 20;
const ORDER_MIN: usize = 3;
const ORDER_MAX: usize = 15;
/// Right rim must close within this fraction of the left rim.
const RIM_TOLERANCE: f64 = 0.15;
/// Band above the bottom close, as a fraction of depth, that counts as
/// "near the bottom" for the rounded-bowl check.
const BOWL_BAND: f64 = 0.25;
/// Maximum handle retracement as a fraction of cup depth.
const HANDLE_MAX_RETRACE: f64 = 0.5;

/// Key bar indices of a detected formation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CupHandle {
    pub left_rim: usize,
    pub bottom: usize,
    pub right_rim: usize,
    pub handle_low: usize,
    pub breakout: usize,
}

/// Extrema window derived from volatility: rolling std of closes, scaled
/// by the mean close. Monotone in volatility, clamped to [3, 15].
pub fn dynamic_order(closes: &[f64]) -> usize {
    let mean_close = closes.iter().sum::<f64>() / closes.len().max(1) as f64;
    if !mean_close.is_finite() || mean_close <= 0.0 {
        return ORDER_MIN;
    }
    let mut stds = Vec::new();
    if closes.len() >= VOLATILITY_WINDOW {
        for window in closes.windows(VOLATILITY_WINDOW) {
            stds.push(std_dev(window));
        }
    } else if closes.len() >= 2 {
        stds.push(std_dev(closes));
    }
    if stds.is_empty() {
        return ORDER_MIN;
    }
    let mean_std = stds.iter().sum::<f64>() / stds.len() as f64;
    if !mean_std.is_finite() {
        return ORDER_MIN;
    }
    let order = (mean_std / mean_close * 400.0).round() as isize;
    order.clamp(ORDER_MIN as isize, ORDER_MAX as isize) as usize
}

fn std_dev(values: &[f64]) -> f64 {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0).max(1.0);
    var.sqrt()
}

/// Indices that are the strict max (or min) of their `i ± order` window.
fn local_extrema(closes: &[f64], order: usize, maxima: bool) -> Vec<usize> {
    let mut out = Vec::new();
    if closes.len() < 2 * order + 1 {
        return out;
    }
    for i in order..closes.len() - order {
        let center = closes[i];
        let strict = closes[i - order..=i + order]
            .iter()
            .enumerate()
            .all(|(j, &v)| j + i - order == i || if maxima { center > v } else { center < v });
        if strict {
            out.push(i);
        }
    }
    out
}

/// Scans the close series for a cup (rounded bowl between two rims) and a
/// shallow handle resolved by a breakout above the right rim.
pub fn find_cup_and_handle(history: &[PriceBar]) -> Option<CupHandle> {
    let closes: Vec<f64> = history.iter().map(|b| b.close).collect();
    if closes.iter().any(|c| !c.is_finite()) {
        return None;
    }
    let order = dynamic_order(&closes);
    if closes.len() < 2 * order + 10 {
        return None;
    }

    let maxima = local_extrema(&closes, order, true);
    let minima = local_extrema(&closes, order, false);

    // deepest local minimum is the cup bottom
    let bottom = *minima.iter().min_by(|&&a, &&b| {
        closes[a].partial_cmp(&closes[b]).unwrap_or(std::cmp::Ordering::Equal)
    })?;

    let left_rim = *maxima
        .iter()
        .filter(|&&i| i < bottom)
        .max_by(|&&a, &&b| {
            closes[a].partial_cmp(&closes[b]).unwrap_or(std::cmp::Ordering::Equal)
        })?;

    let right_rim = *maxima.iter().find(|&&i| {
        i > bottom && (closes[i] - closes[left_rim]).abs() <= closes[left_rim] * RIM_TOLERANCE
    })?;

    let rim = closes[left_rim].min(closes[right_rim]);
    let depth = rim - closes[bottom];
    if depth <= 0.0 {
        return None;
    }

    // rounded bowl: enough bars lingering near the bottom
    let near_bottom = closes[left_rim..=right_rim]
        .iter()
        .filter(|&&c| c <= closes[bottom] + depth * BOWL_BAND)
        .count();
    if near_bottom < order {
        return None;
    }

    // handle: shallow retracement after the right rim
    if right_rim + 1 >= closes.len() {
        return None;
    }
    let handle_low = (right_rim + 1..closes.len()).min_by(|&a, &b| {
        closes[a].partial_cmp(&closes[b]).unwrap_or(std::cmp::Ordering::Equal)
    })?;
    if closes[right_rim] - closes[handle_low] > depth * HANDLE_MAX_RETRACE {
        return None;
    }

    // breakout: a close above the right rim after the handle low
    let breakout = (handle_low + 1..closes.len()).find(|&i| closes[i] > closes[right_rim])?;

    Some(CupHandle {
        left_rim,
        bottom,
        right_rim,
        handle_low,
        breakout,
    })
}

/// Appends `Cup and Handle` when the formation is present in the lookback
/// history.
pub struct CupHandleRule;

impl Rule for CupHandleRule {
    fn name(&self) -> &'static str {
        "cup_and_handle"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        if find_cup_and_handle(ctx.history).is_some() {
            record.append_pattern("Cup and Handle");
            return true;
        }
        false
    }
}
