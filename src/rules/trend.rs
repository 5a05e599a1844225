//! Trend classification and chart-structure rules.

use super::{last_finite, round1, Rule, RuleContext};
use crate::{record::ScreenRecord, OhlcvExt, Trend};

/// Maps a regression angle (degrees) to a trend bucket.
///
/// A zero or non-finite angle is Unknown: a perfectly flat fit means the
/// tops carried no signal, which is different from a genuine sideways
/// drift.
pub fn bucket_angle(angle: f64) -> Trend {
    if !angle.is_finite() || angle == 0.0 {
        Trend::Unknown
    } else if angle.abs() <= 30.0 {
        Trend::Sideways
    } else if angle > 60.0 {
        Trend::StrongUp
    } else if angle > 30.0 {
        Trend::WeakUp
    } else if angle < -60.0 {
        Trend::StrongDown
    } else {
        Trend::WeakDown
    }
}

/// Least-squares slope; `None` for degenerate input.
fn fit_slope(points: &[(f64, f64)]) -> Option<f64> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let sx: f64 = points.iter().map(|p| p.0).sum();
    let sy: f64 = points.iter().map(|p| p.1).sum();
    let sxx: f64 = points.iter().map(|p| p.0 * p.0).sum();
    let sxy: f64 = points.iter().map(|p| p.0 * p.1).sum();
    let denom = n * sxx - sx * sx;
    if denom.abs() < f64::EPSILON {
        return None;
    }
    Some((n * sxy - sx * sy) / denom)
}

/// Interior local maxima of `values` (strict against both neighbors).
fn local_tops(values: &[f64]) -> Vec<(f64, f64)> {
    let mut tops = Vec::new();
    for i in 1..values.len().saturating_sub(1) {
        if values[i] > values[i - 1] && values[i] > values[i + 1] {
            tops.push((i as f64, values[i]));
        }
    }
    tops
}

/// Fits a regression line through the local tops of the lookback window
/// and buckets its angle. Fewer than two tops, or any NaN in the window,
/// classifies as Unknown.
pub struct TrendClassification;

impl TrendClassification {
    /// Classification without the rule plumbing, usable on any close
    /// series.
    pub fn classify(closes: &[f64]) -> Trend {
        if closes.len() < 3 || closes.iter().any(|c| !c.is_finite()) {
            return Trend::Unknown;
        }
        let tops = local_tops(closes);
        if tops.len() < 2 {
            return Trend::Unknown;
        }
        match fit_slope(&tops) {
            Some(slope) => bucket_angle(slope.atan().to_degrees()),
            None => Trend::Unknown,
        }
    }
}

impl Rule for TrendClassification {
    fn name(&self) -> &'static str {
        "trend_classification"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let closes: Vec<f64> = ctx.lookback().iter().map(|b| b.close).collect();
        record.trend = Self::classify(&closes);
        record.trend.is_up()
    }
}

/// Close against the 50- and 200-bar averages. Appends the signal label
/// and passes only on the bullish configuration.
pub struct MaSignal;

impl Rule for MaSignal {
    fn name(&self) -> &'static str {
        "ma_signal"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let (Some(sma), Some(lma)) = (last_finite(&ctx.derived.sma), last_finite(&ctx.derived.lma))
        else {
            return false;
        };
        let Some(close) = ctx.history.last().map(|b| b.close).filter(|c| c.is_finite()) else {
            return false;
        };
        if close > sma && close > lma {
            record.append_ma_signal("Bullish");
            true
        } else if close < sma && close < lma {
            record.append_ma_signal("Bearish");
            false
        } else {
            record.append_ma_signal("Neutral");
            false
        }
    }
}

/// 50- and 200-bar averages within the configured tolerance of each
/// other, i.e. a pending golden/death cross zone.
pub struct Confluence;

impl Rule for Confluence {
    fn name(&self) -> &'static str {
        "confluence"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let (Some(sma), Some(lma)) = (last_finite(&ctx.derived.sma), last_finite(&ctx.derived.lma))
        else {
            return false;
        };
        let Some(close) = ctx.history.last().map(|b| b.close).filter(|c| c.is_finite()) else {
            return false;
        };
        if close <= 0.0 {
            return false;
        }
        let diff = (sma - lma).abs();
        if diff <= ctx.config.percentage * close {
            let pct = diff / close * 100.0;
            record.append_ma_signal(&format!("Confluence ({pct:.1}%)"));
            return true;
        }
        false
    }
}

/// Three consecutive bullish bars, each closing above and opening at or
/// above the previous close.
pub struct MomentumGainer;

impl Rule for MomentumGainer {
    fn name(&self) -> &'static str {
        "momentum_gainer"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let window = ctx.tail(3);
        if window.len() < 3 || window.iter().any(|b| !b.is_valid()) {
            return false;
        }
        let rising = window.iter().all(|b| b.is_bullish())
            && window.windows(2).all(|pair| {
                pair[1].close > pair[0].close && pair[1].open >= pair[0].close
            });
        if rising {
            record.append_pattern("Momentum Gainer");
        }
        rising
    }
}

/// Each of the last three close-to-close steps gained at least 2%.
pub struct PriceRisingSteadily;

const STEADY_RISE_PCT: f64 = 2.0;

impl Rule for PriceRisingSteadily {
    fn name(&self) -> &'static str {
        "price_rising_steadily"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let window = ctx.tail(4);
        if window.len() < 4 {
            return false;
        }
        let closes: Vec<f64> = window.iter().map(|b| b.close).collect();
        if closes.iter().any(|c| !c.is_finite() || *c <= 0.0) {
            return false;
        }
        let steps: Vec<f64> = closes
            .windows(2)
            .map(|pair| (pair[1] - pair[0]) / pair[0] * 100.0)
            .collect();
        if steps.iter().all(|s| *s >= STEADY_RISE_PCT) {
            // most recent step first
            record.pct_change = format!(
                "{:.1}% ({:.1}%, {:.1}%)",
                round1(steps[2]),
                round1(steps[1]),
                round1(steps[0]),
            );
            return true;
        }
        false
    }
}

/// Strictly rising highs, lows and closes over the last three bars.
pub struct HigherHighsHigherLows;

impl Rule for HigherHighsHigherLows {
    fn name(&self) -> &'static str {
        "higher_highs_higher_lows"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _record: &mut ScreenRecord) -> bool {
        let window = ctx.tail(3);
        if window.len() < 3 || window.iter().any(|b| !b.is_valid()) {
            return false;
        }
        window.windows(2).all(|pair| {
            pair[1].high > pair[0].high
                && pair[1].low > pair[0].low
                && pair[1].close > pair[0].close
        })
    }
}

/// Falling price structure with rising RSI over the last four bars: the
/// classic bullish divergence setup.
pub struct BullishDivergence;

impl Rule for BullishDivergence {
    fn name(&self) -> &'static str {
        "bullish_divergence"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _record: &mut ScreenRecord) -> bool {
        const WINDOW: usize = 4;
        let window = ctx.tail(WINDOW);
        if window.len() < WINDOW || window.iter().any(|b| !b.is_valid()) {
            return false;
        }
        let rsi = &ctx.trimmed.rsi;
        if rsi.len() < WINDOW {
            return false;
        }
        let rsi_tail = &rsi[rsi.len() - WINDOW..];
        if rsi_tail.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let price_falling = window.windows(2).all(|pair| {
            pair[1].high < pair[0].high && pair[1].low < pair[0].low
        });
        let rsi_rising = rsi_tail.windows(2).all(|pair| pair[1] > pair[0]);
        price_falling && rsi_rising
    }
}

/// The last `n <= lookback` bars all trade inside an earlier reference
/// bar's range, in an established trend.
pub struct InsideBar {
    pub lookback: usize,
}

impl Default for InsideBar {
    fn default() -> Self {
        Self { lookback: 7 }
    }
}

impl Rule for InsideBar {
    fn name(&self) -> &'static str {
        "inside_bar"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        if !record.trend.is_directional() {
            return false;
        }
        let history = ctx.history;
        let mut best = 0;
        for n in 1..=self.lookback {
            if history.len() < n + 1 {
                break;
            }
            let reference = &history[history.len() - n - 1];
            if !reference.is_valid() {
                break;
            }
            let inside = history[history.len() - n..].iter().all(|b| {
                b.is_valid() && b.high < reference.high && b.low > reference.low
            });
            if inside {
                best = n;
            }
        }
        if best > 0 {
            record.append_pattern(&format!("Inside Bar ({best})"));
            return true;
        }
        false
    }
}

/// NRk: the latest bar has the strictly smallest range of the last `k`
/// bars.
pub struct NarrowRange {
    pub k: usize,
}

impl Rule for NarrowRange {
    fn name(&self) -> &'static str {
        "narrow_range"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        if self.k < 2 {
            return false;
        }
        let window = ctx.tail(self.k);
        if window.len() < self.k || window.iter().any(|b| !b.is_valid()) {
            return false;
        }
        let (last, prior) = window.split_last().unwrap_or((&window[0], &[]));
        let narrowest = prior.iter().all(|b| last.range() < b.range());
        if narrowest {
            let label = if ctx.config.session_open {
                format!("Buy-NR{}", self.k)
            } else {
                format!("NR{}", self.k)
            };
            record.append_pattern(&label);
        }
        narrowest
    }
}

/// Post-listing base: price never broke far below the listing-day low and
/// currently trades within twice the tolerance of the post-listing high.
pub struct IpoBase;

impl Rule for IpoBase {
    fn name(&self) -> &'static str {
        "ipo_base"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let history = ctx.history;
        if history.len() < 2 {
            return false;
        }
        let listing_low = history[0].low;
        if !listing_low.is_finite() || listing_low <= 0.0 {
            return false;
        }
        let closes: Vec<f64> = history.iter().map(|b| b.close).collect();
        if closes.iter().any(|c| !c.is_finite()) {
            return false;
        }
        let min_close = closes.iter().cloned().fold(f64::MAX, f64::min);
        let max_close = closes.iter().cloned().fold(f64::MIN, f64::max);
        let last_close = closes[closes.len() - 1];

        let base_held = (listing_low - min_close) / listing_low <= ctx.config.percentage;
        let near_highs = last_close >= max_close * (1.0 - 2.0 * ctx.config.percentage);
        if base_held && near_highs {
            let pct = (min_close - listing_low) / listing_low * 100.0;
            record.append_pattern(&format!("IPO Base ({pct:.1} %)"));
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::preprocess::preprocess_windowed;
    use crate::testutil::history_from_closes;

    fn eval(rule: &dyn Rule, closes: &[f64], config: &ScanConfig) -> (bool, ScreenRecord) {
        let history = history_from_closes(closes);
        let (derived, trimmed) = preprocess_windowed(&history, config);
        let ctx = RuleContext {
            history: &history,
            derived: &derived,
            trimmed: &trimmed,
            config,
        };
        let mut record = ScreenRecord::new("T");
        let verdict = rule.evaluate(&ctx, &mut record);
        (verdict, record)
    }

    #[test]
    fn test_bucket_angle_boundaries() {
        assert_eq!(bucket_angle(0.0), Trend::Unknown);
        assert_eq!(bucket_angle(f64::NAN), Trend::Unknown);
        assert_eq!(bucket_angle(10.0), Trend::Sideways);
        assert_eq!(bucket_angle(-20.0), Trend::Sideways);
        assert_eq!(bucket_angle(30.0), Trend::Sideways);
        assert_eq!(bucket_angle(-30.0), Trend::Sideways);
        assert_eq!(bucket_angle(60.0), Trend::WeakUp);
        assert_eq!(bucket_angle(61.0), Trend::StrongUp);
        assert_eq!(bucket_angle(-45.0), Trend::WeakDown);
        assert_eq!(bucket_angle(-61.0), Trend::StrongDown);
    }

    #[test]
    fn test_classify_needs_two_tops() {
        // strictly increasing closes have no interior top
        let closes: Vec<f64> = (1..=20).map(|v| v as f64).collect();
        assert_eq!(TrendClassification::classify(&closes), Trend::Unknown);

        let mut with_nan = closes.clone();
        with_nan[5] = f64::NAN;
        assert_eq!(TrendClassification::classify(&with_nan), Trend::Unknown);
    }

    #[test]
    fn test_classify_rising_tops() {
        // zig-zag with steeply rising tops: 0, 10, 1, 14, 2, 18, ...
        let mut closes = Vec::new();
        for i in 0..10 {
            closes.push(i as f64);
            closes.push(10.0 + 4.0 * i as f64);
        }
        let trend = TrendClassification::classify(&closes);
        assert!(trend.is_up(), "got {trend:?}");
    }

    #[test]
    fn test_classify_flat_tops_sideways() {
        // tops all at 10: slope 0 through equal tops -> flat fit
        let mut closes = Vec::new();
        for i in 0..10 {
            closes.push(1.0 + 0.001 * i as f64);
            closes.push(10.0);
        }
        // equal tops produce slope 0 -> angle 0 -> Unknown by policy
        assert_eq!(TrendClassification::classify(&closes), Trend::Unknown);
    }

    #[test]
    fn test_momentum_gainer() {
        let config = ScanConfig::default();
        let (ok, record) = eval(&MomentumGainer, &[100.0, 103.0, 107.0, 112.0], &config);
        assert!(ok);
        assert_eq!(record.pattern, "Momentum Gainer");

        let (ok, _) = eval(&MomentumGainer, &[100.0, 103.0, 101.0, 104.0], &config);
        assert!(!ok);
    }

    #[test]
    fn test_price_rising_steadily() {
        let config = ScanConfig::default();
        let (ok, record) = eval(
            &PriceRisingSteadily,
            &[100.0, 105.0, 110.04, 114.99],
            &config,
        );
        assert!(ok);
        assert_eq!(record.pct_change, "4.5% (4.8%, 5.0%)");

        let (ok, record) = eval(&PriceRisingSteadily, &[100.0, 101.0, 102.0, 103.0], &config);
        assert!(!ok, "1% steps are below the threshold");
        assert_eq!(record.pct_change, "");
    }

    #[test]
    fn test_higher_highs_higher_lows() {
        let config = ScanConfig::default();
        let (ok, _) = eval(&HigherHighsHigherLows, &[100.0, 102.0, 104.0, 106.0], &config);
        assert!(ok);
        let (ok, _) = eval(&HigherHighsHigherLows, &[100.0, 104.0, 102.0, 106.0], &config);
        assert!(!ok);
    }

    #[test]
    fn test_narrow_range() {
        let config = ScanConfig::default();
        let mut history = history_from_closes(&[100.0, 100.0, 100.0, 100.0, 100.0]);
        // shrink the last bar's range below every other
        let last = history.last_mut().unwrap();
        last.high = 100.4;
        last.low = 100.0 - 0.4;
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let ctx = RuleContext {
            history: &history,
            derived: &derived,
            trimmed: &trimmed,
            config: &config,
        };
        let mut record = ScreenRecord::new("T");
        assert!(NarrowRange { k: 4 }.evaluate(&ctx, &mut record));
        assert_eq!(record.pattern, "NR4");

        let open_session = ScanConfig {
            session_open: true,
            ..ScanConfig::default()
        };
        let ctx = RuleContext {
            history: &history,
            derived: &derived,
            trimmed: &trimmed,
            config: &open_session,
        };
        let mut record = ScreenRecord::new("T");
        assert!(NarrowRange { k: 4 }.evaluate(&ctx, &mut record));
        assert_eq!(record.pattern, "Buy-NR4");
    }

    #[test]
    fn test_inside_bar_requires_trend() {
        let config = ScanConfig::default();
        let mut history = history_from_closes(&[100.0, 120.0, 110.0, 112.0]);
        // reference bar with a wide range, then two bars inside it
        history[1].high = 130.0;
        history[1].low = 90.0;
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let ctx = RuleContext {
            history: &history,
            derived: &derived,
            trimmed: &trimmed,
            config: &config,
        };
        let mut record = ScreenRecord::new("T");
        assert!(
            !InsideBar::default().evaluate(&ctx, &mut record),
            "no trend, no inside-bar signal"
        );

        record.trend = Trend::WeakUp;
        assert!(InsideBar::default().evaluate(&ctx, &mut record));
        assert_eq!(record.pattern, "Inside Bar (2)");
    }

    #[test]
    fn test_ipo_base() {
        let config = ScanConfig::default();
        // base broke 15% below the listing-day low of 100
        let (ok, _) = eval(&IpoBase, &[101.0, 97.0, 85.0, 103.0, 105.0], &config);
        assert!(!ok);

        // shallow dip to 95 against a listing-day low of 99
        let (ok, record) = eval(&IpoBase, &[100.0, 96.0, 95.0, 103.0, 105.0], &config);
        assert!(ok);
        assert_eq!(record.pattern, "IPO Base (-4.0 %)");
    }

    #[test]
    fn test_ipo_base_allows_twice_the_tolerance_off_the_high() {
        // last close sits 16.7% under the high of 120: inside the doubled
        // 10% band, outside a single band. Base never broke the listing
        // low of 99.
        let config = ScanConfig::default();
        let (ok, record) = eval(&IpoBase, &[100.0, 108.0, 120.0, 112.0, 100.0], &config);
        assert!(ok);
        assert_eq!(record.pattern, "IPO Base (1.0 %)");
    }
}
