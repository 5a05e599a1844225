//! Scan result aggregation.
//!
//! Collects worker outcomes (which arrive in nondeterministic completion
//! order) into a deterministic report: rows follow the submission order of
//! the task list, duplicate symbols keep the first result pushed, and each
//! group plus the whole report gets a summary basket row.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::record::{ScanOutcome, ScanResult, ScanTask};
use crate::ScanError;

/// Summary row for a group: component LTPs and deltas summed, with the
/// percentage move of the summed position. Any part that cannot be
/// computed is omitted, never zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasketRow {
    pub group: String,
    pub ltp_sum: Option<f64>,
    pub delta_sum: Option<f64>,
    /// Rendered delta, e.g. `"-1(-3.33%)"`; the percentage is dropped when
    /// the LTP sum is unavailable or zero.
    pub delta_display: Option<String>,
}

/// The finished report.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregatedReport {
    /// Deduplicated results in submission order.
    pub rows: Vec<ScanResult>,
    /// One basket per group, in first-submission order.
    pub baskets: Vec<BasketRow>,
    /// Basket over every retained row.
    pub master: BasketRow,
    /// Failed tasks, in push order.
    pub failures: Vec<(String, ScanError)>,
}

/// Accumulates outcomes against a known submission order.
pub struct ResultAggregator {
    submitted: Vec<ScanTask>,
    results: HashMap<String, ScanResult>,
    failures: Vec<(String, ScanError)>,
}

impl ResultAggregator {
    /// `submitted` fixes the report order; outcomes may arrive in any
    /// order afterwards.
    pub fn new(submitted: &[ScanTask]) -> Self {
        Self {
            submitted: submitted.to_vec(),
            results: HashMap::new(),
            failures: Vec::new(),
        }
    }

    /// Records one outcome. For a symbol seen before, the first pushed
    /// result wins and later ones are dropped.
    pub fn push(&mut self, outcome: ScanOutcome) {
        match outcome {
            ScanOutcome::Completed(result) => {
                self.results.entry(result.symbol.clone()).or_insert(result);
            }
            ScanOutcome::Failed { symbol, error } => {
                self.failures.push((symbol, error));
            }
        }
    }

    pub fn finish(self) -> AggregatedReport {
        let mut seen = HashSet::new();
        let mut rows: Vec<ScanResult> = Vec::new();
        let mut group_order: Vec<String> = Vec::new();
        for task in &self.submitted {
            if !group_order.contains(&task.group) {
                group_order.push(task.group.clone());
            }
            if !seen.insert(task.symbol.clone()) {
                continue;
            }
            if let Some(result) = self.results.get(&task.symbol) {
                rows.push(result.clone());
            }
        }

        let baskets = group_order
            .iter()
            .map(|group| {
                let members: Vec<&ScanResult> =
                    rows.iter().filter(|r| &r.group == group).collect();
                basket(group.clone(), &members)
            })
            .collect();
        let master = basket("BASKET".to_string(), &rows.iter().collect::<Vec<_>>());

        AggregatedReport {
            rows,
            baskets,
            master,
            failures: self.failures,
        }
    }
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

fn sum_present(values: impl Iterator<Item = Option<f64>>) -> Option<f64> {
    let mut sum = 0.0;
    let mut any = false;
    for v in values.flatten() {
        sum += v;
        any = true;
    }
    any.then_some(round2(sum))
}

fn basket(group: String, members: &[&ScanResult]) -> BasketRow {
    let ltp_sum = sum_present(members.iter().map(|r| r.record.ltp));
    let delta_sum = sum_present(members.iter().map(|r| r.record.delta));
    let delta_display = delta_sum.map(|delta| match ltp_sum {
        Some(ltp) if ltp != 0.0 => {
            format!("{}({}%)", delta, round2(delta / ltp * 100.0))
        }
        _ => format!("{delta}"),
    });
    BasketRow {
        group,
        ltp_sum,
        delta_sum,
        delta_display,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::ScreenRecord;

    fn completed(symbol: &str, group: &str, ltp: Option<f64>, delta: Option<f64>) -> ScanOutcome {
        let mut record = ScreenRecord::new(symbol);
        record.ltp = ltp;
        record.delta = delta;
        ScanOutcome::Completed(ScanResult {
            symbol: symbol.into(),
            group: group.into(),
            record,
            matched_rules: 1,
            verdict: true,
        })
    }

    fn tasks(pairs: &[(&str, &str)]) -> Vec<ScanTask> {
        pairs.iter().map(|(s, g)| ScanTask::new(*s, *g)).collect()
    }

    #[test]
    fn test_rows_follow_submission_order() {
        let submitted = tasks(&[("A", "G1"), ("B", "G1"), ("C", "G2")]);
        let mut agg = ResultAggregator::new(&submitted);
        // arrival order scrambled
        agg.push(completed("C", "G2", Some(5.0), None));
        agg.push(completed("A", "G1", Some(1.0), None));
        agg.push(completed("B", "G1", Some(2.0), None));
        let report = agg.finish();
        let symbols: Vec<&str> = report.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, ["A", "B", "C"]);
    }

    #[test]
    fn test_first_pushed_result_wins() {
        let submitted = tasks(&[("A", "G1"), ("A", "G2")]);
        let mut agg = ResultAggregator::new(&submitted);
        agg.push(completed("A", "G2", Some(10.0), None));
        agg.push(completed("A", "G1", Some(99.0), None));
        let report = agg.finish();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].record.ltp, Some(10.0));
        assert_eq!(report.rows[0].group, "G2");
    }

    #[test]
    fn test_basket_percentage() {
        let submitted = tasks(&[("A", "G"), ("B", "G")]);
        let mut agg = ResultAggregator::new(&submitted);
        agg.push(completed("A", "G", Some(10.0), Some(1.0)));
        agg.push(completed("B", "G", Some(20.0), Some(-2.0)));
        let report = agg.finish();
        assert_eq!(report.baskets.len(), 1);
        let basket = &report.baskets[0];
        assert_eq!(basket.ltp_sum, Some(30.0));
        assert_eq!(basket.delta_sum, Some(-1.0));
        assert_eq!(basket.delta_display.as_deref(), Some("-1(-3.33%)"));
        assert_eq!(report.master.ltp_sum, Some(30.0));
    }

    #[test]
    fn test_missing_operand_omits_percentage() {
        let submitted = tasks(&[("A", "G"), ("B", "G")]);
        let mut agg = ResultAggregator::new(&submitted);
        agg.push(completed("A", "G", None, Some(1.5)));
        agg.push(completed("B", "G", None, Some(0.5)));
        let report = agg.finish();
        let basket = &report.baskets[0];
        assert_eq!(basket.ltp_sum, None);
        assert_eq!(basket.delta_sum, Some(2.0));
        assert_eq!(basket.delta_display.as_deref(), Some("2"));
    }

    #[test]
    fn test_all_missing_yields_empty_basket() {
        let submitted = tasks(&[("A", "G")]);
        let mut agg = ResultAggregator::new(&submitted);
        agg.push(completed("A", "G", None, None));
        let report = agg.finish();
        let basket = &report.baskets[0];
        assert_eq!(basket.ltp_sum, None);
        assert_eq!(basket.delta_sum, None);
        assert_eq!(basket.delta_display, None);
    }

    #[test]
    fn test_failures_kept_apart_from_rows() {
        let submitted = tasks(&[("A", "G"), ("B", "G")]);
        let mut agg = ResultAggregator::new(&submitted);
        agg.push(completed("A", "G", Some(100.0), Some(1.0)));
        agg.push(ScanOutcome::Failed {
            symbol: "B".into(),
            error: ScanError::MissingData { symbol: "B".into() },
        });
        let report = agg.finish();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "B");
    }
}
