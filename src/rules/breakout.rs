//! Price-level rules: LTP bounds, consolidation, resistance breakouts and
//! the 52-week / 10-day extremes.

use super::{round1, round2, Rule, RuleContext};
use crate::record::ScreenRecord;

/// Bars constituting the 52-week extreme window.
const WEEK52_WINDOW: usize = 52;
/// Bars constituting the 10-day low window.
const DAY10_WINDOW: usize = 10;

/// Maximum over an iterator; `None` when empty or any element is
/// non-finite.
fn strict_max(values: impl Iterator<Item = f64>) -> Option<f64> {
    let mut max: Option<f64> = None;
    for v in values {
        if !v.is_finite() {
            return None;
        }
        max = Some(max.map_or(v, |m: f64| m.max(v)));
    }
    max
}

fn strict_min(values: impl Iterator<Item = f64>) -> Option<f64> {
    strict_max(values.map(|v| -v)).map(|v| -v)
}

/// Records the last traded price and its one-bar change; passes when the
/// price sits inside the configured band.
pub struct LtpBounds;

impl Rule for LtpBounds {
    fn name(&self) -> &'static str {
        "ltp_bounds"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let Some(last) = ctx.history.last() else {
            return false;
        };
        if !last.close.is_finite() {
            return false;
        }
        record.ltp = Some(round2(last.close));
        if ctx.history.len() >= 2 {
            let prev = ctx.history[ctx.history.len() - 2].close;
            if prev.is_finite() {
                record.delta = Some(round2(last.close - prev));
            }
        }
        last.close >= ctx.config.min_ltp && last.close <= ctx.config.max_ltp
    }
}

/// Close-to-close spread over the lookback window, as percent of the
/// window maximum.
pub struct Consolidation;

impl Rule for Consolidation {
    fn name(&self) -> &'static str {
        "consolidation"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let window = ctx.lookback();
        if window.len() < 2 {
            return false;
        }
        let max = match strict_max(window.iter().map(|b| b.close)) {
            Some(v) if v > 0.0 => v,
            _ => return false,
        };
        let min = match strict_min(window.iter().map(|b| b.close)) {
            Some(v) => v,
            None => return false,
        };
        let spread = round1((max - min) / max * 100.0);
        record.consolidation_pct = Some(spread);
        spread <= ctx.config.consolidation_pct
    }
}

/// Resistance = highest high of the lookback window excluding the latest
/// bar. Records the level; passes when the latest close clears it.
pub struct BreakoutValue;

impl Rule for BreakoutValue {
    fn name(&self) -> &'static str {
        "breakout_value"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let window = ctx.tail(ctx.config.days_to_lookback + 1);
        if window.len() < 2 {
            return false;
        }
        let (last, prior) = window.split_last().unwrap_or((&window[0], &[]));
        let Some(resistance) = strict_max(prior.iter().map(|b| b.high)) else {
            return false;
        };
        record.breakout = format!("{:.2}", resistance);
        last.close.is_finite() && last.close > resistance
    }
}

/// The latest close prints at or above every high of the lookback window,
/// its own bar included. Tags the recorded breakout level.
pub struct PotentialBreakout;

impl Rule for PotentialBreakout {
    fn name(&self) -> &'static str {
        "potential_breakout"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let window = ctx.lookback();
        let Some(last) = window.last() else {
            return false;
        };
        let Some(highest) = strict_max(window.iter().map(|b| b.high)) else {
            return false;
        };
        if last.close.is_finite() && last.close >= highest {
            if record.breakout.is_empty() {
                record.breakout = format!("{:.2}", highest);
            }
            record.breakout.push_str("(Potential)");
            return true;
        }
        false
    }
}

/// Latest high exceeds every prior high of the 52-bar window.
pub struct High52WeekBreakout;

impl Rule for High52WeekBreakout {
    fn name(&self) -> &'static str {
        "high_52wk_breakout"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let window = ctx.tail(WEEK52_WINDOW);
        if let Some(high) = strict_max(window.iter().map(|b| b.high)) {
            record.high_52wk = Some(round2(high));
        }
        let Some((last, prior)) = window.split_last() else {
            return false;
        };
        match strict_max(prior.iter().map(|b| b.high)) {
            Some(ceiling) => last.high.is_finite() && last.high > ceiling,
            None => false,
        }
    }
}

/// Latest low undercuts every prior low of the 52-bar window.
pub struct Low52WeekBreakout;

impl Rule for Low52WeekBreakout {
    fn name(&self) -> &'static str {
        "low_52wk_breakout"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let window = ctx.tail(WEEK52_WINDOW);
        if let Some(low) = strict_min(window.iter().map(|b| b.low)) {
            record.low_52wk = Some(round2(low));
        }
        let Some((last, prior)) = window.split_last() else {
            return false;
        };
        match strict_min(prior.iter().map(|b| b.low)) {
            Some(floor) => last.low.is_finite() && last.low < floor,
            None => false,
        }
    }
}

/// Latest low undercuts every prior low of the last 10 bars.
pub struct Low10DayBreakout;

impl Rule for Low10DayBreakout {
    fn name(&self) -> &'static str {
        "low_10day_breakout"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _record: &mut ScreenRecord) -> bool {
        let window = ctx.tail(DAY10_WINDOW);
        let Some((last, prior)) = window.split_last() else {
            return false;
        };
        match strict_min(prior.iter().map(|b| b.low)) {
            Some(floor) => last.low.is_finite() && last.low < floor,
            None => false,
        }
    }
}
