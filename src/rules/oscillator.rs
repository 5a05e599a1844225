//! Oscillator-band and volume rules.

use super::{last_finite, round2, Rule, RuleContext};
use crate::{record::ScreenRecord, OhlcvExt};

/// Records the latest RSI and passes when it sits inside the configured
/// band (inclusive).
pub struct RsiRange;

impl Rule for RsiRange {
    fn name(&self) -> &'static str {
        "rsi_range"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let Some(rsi) = last_finite(&ctx.trimmed.rsi) else {
            return false;
        };
        let rounded = rsi.round() as i32;
        record.rsi = Some(rounded);
        rounded >= ctx.config.min_rsi && rounded <= ctx.config.max_rsi
    }
}

/// Records the latest CCI and passes when it sits inside the band and a
/// directional trend has already been established.
pub struct CciRange;

impl Rule for CciRange {
    fn name(&self) -> &'static str {
        "cci_range"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let Some(cci) = last_finite(&ctx.trimmed.cci) else {
            return false;
        };
        let rounded = cci.round() as i32;
        record.cci = Some(rounded);
        record.trend.is_directional()
            && rounded >= ctx.config.min_cci
            && rounded <= ctx.config.max_cci
    }
}

/// Latest volume against its trailing average. The ratio is recorded even
/// when it misses the threshold.
pub struct VolumeJump;

impl Rule for VolumeJump {
    fn name(&self) -> &'static str {
        "volume_jump"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let Some(last) = ctx.history.last() else {
            return false;
        };
        let Some(vol_ma) = last_finite(&ctx.derived.vol_ma).filter(|v| *v > 0.0) else {
            return false;
        };
        if !last.volume.is_finite() {
            return false;
        }
        let ratio = round2(last.volume / vol_ma);
        record.volume_ratio = Some(ratio);
        ratio >= ctx.config.volume_ratio
    }
}

/// The latest bar traded the lowest volume of the window: interest has
/// dried up, often ahead of a move.
pub struct LowestVolume {
    pub days: usize,
}

impl Default for LowestVolume {
    fn default() -> Self {
        Self { days: 7 }
    }
}

impl Rule for LowestVolume {
    fn name(&self) -> &'static str {
        "lowest_volume"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, _record: &mut ScreenRecord) -> bool {
        let window = ctx.tail(self.days);
        if window.len() < self.days {
            return false;
        }
        let volumes: Vec<f64> = window.iter().map(|b| b.volume).collect();
        if volumes.iter().any(|v| !v.is_finite()) {
            return false;
        }
        let (last, prior) = volumes.split_last().unwrap_or((&volumes[0], &[]));
        prior.iter().all(|v| last <= v)
    }
}

/// Volume-spread read of two consecutive down bars with a narrowing
/// spread: the selling dried up (volume contracting below its average) or
/// buyers stepped in (volume expanding above it).
pub struct VolumeSpreadAnalysis;

impl Rule for VolumeSpreadAnalysis {
    fn name(&self) -> &'static str {
        "volume_spread_analysis"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        if ctx.history.len() < 2 {
            return false;
        }
        let last = &ctx.history[ctx.history.len() - 1];
        let prev = &ctx.history[ctx.history.len() - 2];
        if !last.is_valid() || !prev.is_valid() {
            return false;
        }
        if !last.is_bearish() || !prev.is_bearish() {
            return false;
        }
        let Some(vol_ma) = last_finite(&ctx.derived.vol_ma).filter(|v| *v > 0.0) else {
            return false;
        };
        let spread = last.open - last.close;
        let prev_spread = prev.open - prev.close;
        if spread >= prev_spread {
            return false;
        }
        if last.volume < prev.volume && last.volume < vol_ma {
            record.append_pattern("Supply Drought");
            return true;
        }
        if last.volume > prev.volume && last.volume > vol_ma {
            record.append_pattern("Demand Rise");
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::preprocess::{preprocess_windowed, DerivedSeries};
    use crate::testutil::{history_from_closes, with_volumes};
    use crate::{PriceBar, Trend};

    fn ctx<'a>(
        history: &'a [PriceBar],
        derived: &'a DerivedSeries,
        trimmed: &'a DerivedSeries,
        config: &'a ScanConfig,
    ) -> RuleContext<'a> {
        RuleContext {
            history,
            derived,
            trimmed,
            config,
        }
    }

    #[test]
    fn test_rsi_range() {
        let config = ScanConfig {
            min_rsi: 60,
            max_rsi: 80,
            ..ScanConfig::default()
        };
        // steady gains keep RSI pinned high
        let closes: Vec<f64> = (1..=30).map(|v| 100.0 + v as f64).collect();
        let history = history_from_closes(&closes);
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let c = ctx(&history, &derived, &trimmed, &config);
        let mut record = ScreenRecord::new("T");
        assert!(!RsiRange.evaluate(&c, &mut record), "RSI 100 exceeds band");
        assert_eq!(record.rsi, Some(100));
    }

    #[test]
    fn test_rsi_short_history_fails_closed() {
        let config = ScanConfig::default();
        let history = history_from_closes(&[100.0, 101.0]);
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let c = ctx(&history, &derived, &trimmed, &config);
        let mut record = ScreenRecord::new("T");
        assert!(!RsiRange.evaluate(&c, &mut record));
        assert_eq!(record.rsi, None);
    }

    #[test]
    fn test_cci_requires_trend() {
        let config = ScanConfig::default();
        let closes: Vec<f64> = (1..=30).map(|v| 100.0 + (v % 3) as f64).collect();
        let history = history_from_closes(&closes);
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let c = ctx(&history, &derived, &trimmed, &config);

        let mut record = ScreenRecord::new("T");
        let without_trend = CciRange.evaluate(&c, &mut record);
        assert!(!without_trend);
        assert!(record.cci.is_some(), "value recorded even when gated");

        record.trend = Trend::WeakUp;
        let cci = record.cci.unwrap();
        let with_trend = CciRange.evaluate(&c, &mut record);
        assert_eq!(with_trend, (-100..=100).contains(&cci));
    }

    #[test]
    fn test_volume_jump() {
        let config = ScanConfig::default();
        let closes = vec![100.0; 25];
        let mut volumes = vec![1000.0; 25];
        volumes[24] = 3000.0;
        let history = with_volumes(history_from_closes(&closes), &volumes);
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let c = ctx(&history, &derived, &trimmed, &config);
        let mut record = ScreenRecord::new("T");
        assert!(VolumeJump.evaluate(&c, &mut record));
        // trailing 20-bar average includes the 3000 print
        assert_eq!(record.volume_ratio, Some(2.73));
    }

    #[test]
    fn test_volume_jump_below_threshold_still_records() {
        let config = ScanConfig::default();
        let history = history_from_closes(&vec![100.0; 25]);
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let c = ctx(&history, &derived, &trimmed, &config);
        let mut record = ScreenRecord::new("T");
        assert!(!VolumeJump.evaluate(&c, &mut record));
        assert_eq!(record.volume_ratio, Some(1.0));
    }

    #[test]
    fn test_lowest_volume() {
        let config = ScanConfig::default();
        let closes = vec![100.0; 10];
        let mut volumes = vec![5000.0; 10];
        volumes[9] = 100.0;
        let history = with_volumes(history_from_closes(&closes), &volumes);
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let c = ctx(&history, &derived, &trimmed, &config);
        let mut record = ScreenRecord::new("T");
        assert!(LowestVolume::default().evaluate(&c, &mut record));

        let volumes: Vec<f64> = (1..=10).map(|v| (v * 100) as f64).collect();
        let history = with_volumes(history_from_closes(&closes), &volumes);
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let c = ctx(&history, &derived, &trimmed, &config);
        assert!(!LowestVolume::default().evaluate(&c, &mut record));
    }

    /// 23 flat bars, then two bearish bars with a narrowing spread
    /// (8 then 4) and the given volumes on those two bars.
    fn vsa_history(prev_volume: f64, last_volume: f64) -> Vec<PriceBar> {
        let mut closes = vec![100.0; 23];
        closes.push(92.0);
        closes.push(88.0);
        let mut history = history_from_closes(&closes);
        let n = history.len();
        history[n - 2].volume = prev_volume;
        history[n - 1].volume = last_volume;
        history
    }

    fn run_vsa(history: &[PriceBar]) -> (bool, ScreenRecord) {
        let config = ScanConfig::default();
        let (derived, trimmed) = preprocess_windowed(history, &config);
        let c = ctx(history, &derived, &trimmed, &config);
        let mut record = ScreenRecord::new("T");
        let verdict = VolumeSpreadAnalysis.evaluate(&c, &mut record);
        (verdict, record)
    }

    #[test]
    fn test_vsa_supply_drought() {
        // spread 8 -> 4, volume 1000 -> 200, both below the 20-bar MA
        let (verdict, record) = run_vsa(&vsa_history(1000.0, 200.0));
        assert!(verdict);
        assert_eq!(record.pattern, "Supply Drought");
    }

    #[test]
    fn test_vsa_demand_rise() {
        // spread narrows while volume expands above the 20-bar MA
        let (verdict, record) = run_vsa(&vsa_history(1000.0, 3000.0));
        assert!(verdict);
        assert_eq!(record.pattern, "Demand Rise");
    }

    #[test]
    fn test_vsa_rejects_widening_spread() {
        // two bearish bars, spread 2 -> 8, volume rising but under the MA
        let mut closes = vec![100.0; 23];
        closes.push(98.0);
        closes.push(90.0);
        let mut history = history_from_closes(&closes);
        let n = history.len();
        history[n - 2].volume = 500.0;
        history[n - 1].volume = 900.0;
        let (verdict, record) = run_vsa(&history);
        assert!(!verdict);
        assert!(record.pattern.is_empty());
    }

    #[test]
    fn test_vsa_rejects_low_volume_without_contraction() {
        // narrowing spread but volume grows vs the prior bar while staying
        // under the MA: neither signal applies
        let (verdict, record) = run_vsa(&vsa_history(200.0, 800.0));
        assert!(!verdict);
        assert!(record.pattern.is_empty());
    }

    #[test]
    fn test_vsa_needs_down_bar() {
        let (verdict, record) = run_vsa(&history_from_closes(&[100.0; 25]));
        assert!(!verdict);
        assert!(record.pattern.is_empty());
    }
}
