//! Candle pattern aggregation over the latest bar.

use super::{Rule, RuleContext};
use crate::detectors::{CandleContext, CandleDetector};
use crate::{record::ScreenRecord, OhlcvExt};

/// Runs the detector battery at the most recent bar and appends every
/// matching label to the record, in battery order.
pub struct CandlePatterns {
    battery: Vec<CandleDetector>,
}

impl Default for CandlePatterns {
    fn default() -> Self {
        Self {
            battery: CandleDetector::battery(),
        }
    }
}

impl CandlePatterns {
    pub fn with_battery(battery: Vec<CandleDetector>) -> Self {
        Self { battery }
    }
}

impl Rule for CandlePatterns {
    fn name(&self) -> &'static str {
        "candle_patterns"
    }

    fn evaluate(&self, ctx: &RuleContext<'_>, record: &mut ScreenRecord) -> bool {
        let bars = ctx.history;
        let Some(last) = bars.last() else {
            return false;
        };
        if !last.is_valid() {
            return false;
        }
        let index = bars.len() - 1;
        let candle_ctx = CandleContext::compute(bars, index);
        let mut matched = false;
        for detector in &self.battery {
            if bars.len() < detector.min_bars() {
                continue;
            }
            if let Some(hit) = detector.detect(bars, index, &candle_ctx) {
                record.append_pattern(hit.id.0);
                matched = true;
            }
        }
        matched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ScanConfig;
    use crate::preprocess::preprocess_windowed;
    use crate::testutil::day;
    use crate::PriceBar;

    fn bar(i: usize, open: f64, high: f64, low: f64, close: f64) -> PriceBar {
        PriceBar {
            date: day(i),
            open,
            high,
            low,
            close,
            volume: 1000.0,
        }
    }

    fn evaluate(history: &[PriceBar]) -> ScreenRecord {
        let config = ScanConfig::default();
        let (derived, trimmed) = preprocess_windowed(history, &config);
        let ctx = RuleContext {
            history,
            derived: &derived,
            trimmed: &trimmed,
            config: &config,
        };
        let mut record = ScreenRecord::new("T");
        record.append_pattern("Existing");
        CandlePatterns::default().evaluate(&ctx, &mut record);
        record
    }

    #[test]
    fn test_doji_appends_after_existing() {
        // ordinary bars, then a doji
        let history = vec![
            bar(0, 100.0, 104.0, 99.0, 103.0),
            bar(1, 103.0, 106.0, 101.0, 102.0),
            bar(2, 102.0, 104.0, 100.0, 102.05),
        ];
        let record = evaluate(&history);
        assert!(record.pattern.starts_with("Existing, Doji"));
    }

    #[test]
    fn test_bullish_engulfing_label() {
        let history = vec![
            bar(0, 105.0, 106.0, 99.0, 100.0),
            bar(1, 99.0, 107.0, 98.0, 106.0),
        ];
        let record = evaluate(&history);
        assert!(
            record.pattern.contains("Bullish Engulfing"),
            "got {}",
            record.pattern
        );
    }

    #[test]
    fn test_no_pattern_means_empty_string() {
        let config = ScanConfig::default();
        // a plain trending bar matching nothing
        let history = vec![
            bar(0, 100.0, 103.5, 99.0, 103.0),
            bar(1, 103.0, 106.5, 102.0, 106.0),
            bar(2, 106.0, 108.5, 105.0, 107.5),
        ];
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let ctx = RuleContext {
            history: &history,
            derived: &derived,
            trimmed: &trimmed,
            config: &config,
        };
        let mut record = ScreenRecord::new("T");
        let matched = CandlePatterns::default().evaluate(&ctx, &mut record);
        assert!(!matched);
        assert_eq!(record.pattern, "");
        assert!(!record.has_pattern());
    }

    #[test]
    fn test_invalid_last_bar_fails_closed() {
        let history = vec![
            bar(0, 100.0, 104.0, 99.0, 103.0),
            bar(1, 103.0, f64::NAN, 101.0, 104.0),
        ];
        let config = ScanConfig::default();
        let (derived, trimmed) = preprocess_windowed(&history, &config);
        let ctx = RuleContext {
            history: &history,
            derived: &derived,
            trimmed: &trimmed,
            config: &config,
        };
        let mut record = ScreenRecord::new("T");
        assert!(!CandlePatterns::default().evaluate(&ctx, &mut record));
    }
}
