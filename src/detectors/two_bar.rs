//! Two-bar reversal detectors: engulfing and the harami pair.

use super::helpers::{is_body_long, is_body_short, is_doji};
use super::{CandleContext, Direction, PatternDetector, PatternId, PatternMatch};
use crate::{Ohlcv, OhlcvExt};

impl_with_defaults!(EngulfingDetector, HaramiDetector, HaramiCrossDetector);

/// Current body strictly swallows the previous body, opposite color.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngulfingDetector;

impl PatternDetector for EngulfingDetector {
    fn id(&self) -> PatternId {
        PatternId("Engulfing")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        _ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let prev = bars.get(index.checked_sub(1)?)?;

        let bullish = bar.is_bullish()
            && prev.is_bearish()
            && bar.open() < prev.close()
            && bar.close() > prev.open();
        let bearish = bar.is_bearish()
            && prev.is_bullish()
            && bar.open() > prev.close()
            && bar.close() < prev.open();

        let (id, direction) = if bullish {
            (PatternId("Bullish Engulfing"), Direction::Bullish)
        } else if bearish {
            (PatternId("Bearish Engulfing"), Direction::Bearish)
        } else {
            return None;
        };
        Some(PatternMatch {
            id,
            direction,
            start_index: index - 1,
            end_index: index,
        })
    }
}

fn body_top<T: Ohlcv>(bar: &T) -> f64 {
    bar.open().max(bar.close())
}

fn body_bottom<T: Ohlcv>(bar: &T) -> f64 {
    bar.open().min(bar.close())
}

/// Small opposite-color body contained inside a long previous body.
fn harami_containment<T: Ohlcv>(bar: &T, prev: &T, ctx: &CandleContext) -> bool {
    is_body_long(prev.body(), ctx.avg_body, prev.range())
        && is_body_short(bar.body(), ctx.avg_body, bar.range())
        && body_top(bar) < body_top(prev)
        && body_bottom(bar) > body_bottom(prev)
}

#[derive(Debug, Clone, Copy, Default)]
pub struct HaramiDetector;

impl PatternDetector for HaramiDetector {
    fn id(&self) -> PatternId {
        PatternId("Harami")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let prev = bars.get(index.checked_sub(1)?)?;
        if !harami_containment(bar, prev, ctx) {
            return None;
        }
        // Signal direction is against the previous bar.
        let (id, direction) = if prev.is_bearish() {
            (PatternId("Bullish Harami"), Direction::Bullish)
        } else if prev.is_bullish() {
            (PatternId("Bearish Harami"), Direction::Bearish)
        } else {
            return None;
        };
        Some(PatternMatch {
            id,
            direction,
            start_index: index - 1,
            end_index: index,
        })
    }
}

/// Harami whose inside bar is a doji.
#[derive(Debug, Clone, Copy, Default)]
pub struct HaramiCrossDetector;

impl PatternDetector for HaramiCrossDetector {
    fn id(&self) -> PatternId {
        PatternId("Harami Cross")
    }

    fn min_bars(&self) -> usize {
        2
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let prev = bars.get(index.checked_sub(1)?)?;
        let contained = is_body_long(prev.body(), ctx.avg_body, prev.range())
            && is_doji(bar.body(), ctx.avg_range, bar.range())
            && body_top(bar) < body_top(prev)
            && body_bottom(bar) > body_bottom(prev);
        if !contained {
            return None;
        }
        let (id, direction) = if prev.is_bearish() {
            (PatternId("Bullish Harami Cross"), Direction::Bullish)
        } else if prev.is_bullish() {
            (PatternId("Bearish Harami Cross"), Direction::Bearish)
        } else {
            return None;
        };
        Some(PatternMatch {
            id,
            direction,
            start_index: index - 1,
            end_index: index,
        })
    }
}
