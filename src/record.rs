//! Scan work items and their results.

use serde::{Deserialize, Serialize};

use crate::{ScanError, Trend};

/// One unit of scan work: a symbol plus the group (watchlist, sector,
/// exchange segment) it was submitted under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanTask {
    pub symbol: String,
    pub group: String,
}

impl ScanTask {
    pub fn new(symbol: impl Into<String>, group: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            group: group.into(),
        }
    }
}

/// Everything the rule battery learned about one symbol.
///
/// Single-valued fields are overwritten by the rule that owns them.
/// `pattern` and `ma_signal` accumulate: each matching rule appends its
/// label, comma separated, in registry order. An empty `pattern` means no
/// pattern was found.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScreenRecord {
    pub symbol: String,
    /// Last traded price (last close).
    pub ltp: Option<f64>,
    /// Close-to-close change over the last bar.
    pub delta: Option<f64>,
    pub trend: Trend,
    pub rsi: Option<i32>,
    pub cci: Option<i32>,
    /// Last volume over its trailing average.
    pub volume_ratio: Option<f64>,
    /// Close spread over the lookback window, percent.
    pub consolidation_pct: Option<f64>,
    pub high_52wk: Option<f64>,
    pub low_52wk: Option<f64>,
    /// Resistance/breakout annotation, e.g. `"105.50"` or
    /// `"105.50(Potential)"`.
    pub breakout: String,
    /// Rendered momentum steps, e.g. `"4.5% (4.8%, 5.0%)"`.
    pub pct_change: String,
    /// Comma-separated pattern labels, oldest append first.
    pub pattern: String,
    /// Comma-separated moving-average signals.
    pub ma_signal: String,
}

impl ScreenRecord {
    pub fn new(symbol: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            ..Self::default()
        }
    }

    /// Appends a pattern label, comma separated when one is already set.
    pub fn append_pattern(&mut self, label: &str) {
        append_csv(&mut self.pattern, label);
    }

    /// Appends a moving-average signal label.
    pub fn append_ma_signal(&mut self, label: &str) {
        append_csv(&mut self.ma_signal, label);
    }

    pub fn has_pattern(&self) -> bool {
        !self.pattern.is_empty()
    }
}

fn append_csv(field: &mut String, label: &str) {
    if !field.is_empty() {
        field.push_str(", ");
    }
    field.push_str(label);
}

/// Result of evaluating the full rule battery over one symbol.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub symbol: String,
    pub group: String,
    pub record: ScreenRecord,
    /// Number of rules that matched.
    pub matched_rules: usize,
    /// True when at least one rule matched.
    pub verdict: bool,
}

/// Terminal state of one scan task. Failures carry the error but never
/// abort the scan.
#[derive(Debug, Clone, PartialEq)]
pub enum ScanOutcome {
    Completed(ScanResult),
    Failed { symbol: String, error: ScanError },
}

impl ScanOutcome {
    pub fn symbol(&self) -> &str {
        match self {
            ScanOutcome::Completed(result) => &result.symbol,
            ScanOutcome::Failed { symbol, .. } => symbol,
        }
    }

    pub fn as_completed(&self) -> Option<&ScanResult> {
        match self {
            ScanOutcome::Completed(result) => Some(result),
            ScanOutcome::Failed { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_pattern_comma_separates() {
        let mut record = ScreenRecord::new("TCS");
        assert!(!record.has_pattern());
        record.append_pattern("Existing");
        assert_eq!(record.pattern, "Existing");
        record.append_pattern("Doji");
        assert_eq!(record.pattern, "Existing, Doji");
        assert!(record.has_pattern());
    }

    #[test]
    fn test_append_ma_signal() {
        let mut record = ScreenRecord::new("INFY");
        record.append_ma_signal("Bullish");
        record.append_ma_signal("Confluence (0.8%)");
        assert_eq!(record.ma_signal, "Bullish, Confluence (0.8%)");
    }

    #[test]
    fn test_outcome_accessors() {
        let failed = ScanOutcome::Failed {
            symbol: "SBIN".into(),
            error: ScanError::MissingData {
                symbol: "SBIN".into(),
            },
        };
        assert_eq!(failed.symbol(), "SBIN");
        assert!(failed.as_completed().is_none());
    }
}
