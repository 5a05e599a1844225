//! Property tests: totality and fail-closed behavior over arbitrary input.

use barscan::prelude::*;
use barscan::rules::{dynamic_order, find_cup_and_handle, TrendClassification};
use chrono::{Days, NaiveDate};
use proptest::prelude::*;

fn bars_from_closes(closes: &[f64]) -> PriceHistory {
    closes
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let open = if i == 0 { c } else { closes[i - 1] };
            PriceBar {
                date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + Days::new(i as u64),
                open,
                high: open.max(c) * 1.01,
                low: open.min(c) * 0.99,
                close: c,
                volume: 1000.0,
            }
        })
        .collect()
}

proptest! {
    #[test]
    fn bucket_angle_is_total(angle in prop::num::f64::ANY) {
        let trend = barscan::rules::bucket_angle(angle);
        prop_assert!(!trend.label().is_empty());
        if !angle.is_finite() || angle == 0.0 {
            prop_assert_eq!(trend, Trend::Unknown);
        }
    }

    #[test]
    fn classify_never_panics(closes in prop::collection::vec(prop::num::f64::ANY, 0..60)) {
        let _ = TrendClassification::classify(&closes);
    }

    #[test]
    fn classify_rejects_non_finite(
        mut closes in prop::collection::vec(1.0f64..1000.0, 10..60),
        index in 0usize..10,
    ) {
        let i = index % closes.len();
        closes[i] = f64::NAN;
        prop_assert_eq!(TrendClassification::classify(&closes), Trend::Unknown);
    }

    #[test]
    fn dynamic_order_stays_clamped(closes in prop::collection::vec(1.0f64..1000.0, 2..120)) {
        let order = dynamic_order(&closes);
        prop_assert!((3..=15).contains(&order));
    }

    #[test]
    fn cup_and_handle_indices_are_ordered(
        closes in prop::collection::vec(50.0f64..150.0, 20..120),
    ) {
        if let Some(cup) = find_cup_and_handle(&bars_from_closes(&closes)) {
            prop_assert!(cup.left_rim < cup.bottom);
            prop_assert!(cup.bottom < cup.right_rim);
            prop_assert!(cup.right_rim < cup.handle_low);
            prop_assert!(cup.handle_low < cup.breakout);
            prop_assert!(cup.breakout < closes.len());
        }
    }

    #[test]
    fn cup_and_handle_fails_closed_on_nan(
        closes in prop::collection::vec(50.0f64..150.0, 30..80),
        index in 0usize..30,
    ) {
        let mut bars = bars_from_closes(&closes);
        let i = index % bars.len();
        bars[i].close = f64::NAN;
        prop_assert_eq!(find_cup_and_handle(&bars), None);
    }

    #[test]
    fn candle_context_is_finite(closes in prop::collection::vec(1.0f64..1000.0, 1..60)) {
        let bars = bars_from_closes(&closes);
        let ctx = CandleContext::compute(&bars, bars.len() - 1);
        prop_assert!(ctx.avg_body.is_finite() && ctx.avg_body >= 0.0);
        prop_assert!(ctx.avg_range.is_finite() && ctx.avg_range >= 0.0);
    }

    #[test]
    fn bar_anatomy_sums_to_range(closes in prop::collection::vec(1.0f64..1000.0, 2..40)) {
        for bar in &bars_from_closes(&closes) {
            let parts = bar.body() + bar.upper_shadow() + bar.lower_shadow();
            prop_assert!((parts - bar.range()).abs() <= bar.range() * 1e-12 + 1e-12);
        }
    }
}
