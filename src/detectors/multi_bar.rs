//! Detectors spanning four or more bars.

use super::{CandleContext, Direction, PatternDetector, PatternId, PatternMatch};
use crate::{Ohlcv, OhlcvExt};

impl_with_defaults!(ThreeLineStrikeDetector, LadderBottomDetector);

/// Three advancing (or declining) bars wiped out by a fourth opposite bar
/// that engulfs the whole run.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeLineStrikeDetector;

impl PatternDetector for ThreeLineStrikeDetector {
    fn id(&self) -> PatternId {
        PatternId("3 Line Strike")
    }

    fn min_bars(&self) -> usize {
        4
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        _ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let a = bars.get(index.checked_sub(3)?)?;
        let b = bars.get(index - 2)?;
        let c = bars.get(index - 1)?;
        let strike = bars.get(index)?;

        let bullish_strike = a.is_bearish()
            && b.is_bearish()
            && c.is_bearish()
            && b.close() < a.close()
            && c.close() < b.close()
            && strike.is_bullish()
            && strike.open() < c.close()
            && strike.close() > a.open();
        let bearish_strike = a.is_bullish()
            && b.is_bullish()
            && c.is_bullish()
            && b.close() > a.close()
            && c.close() > b.close()
            && strike.is_bearish()
            && strike.open() > c.close()
            && strike.close() < a.open();

        let direction = if bullish_strike {
            Direction::Bullish
        } else if bearish_strike {
            Direction::Bearish
        } else {
            return None;
        };
        Some(PatternMatch {
            id: PatternId("3 Line Strike"),
            direction,
            start_index: index - 3,
            end_index: index,
        })
    }
}

/// Three declining bearish bars, a fourth bearish bar showing an upper
/// shadow, then a bullish bar gapping above it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LadderBottomDetector;

impl PatternDetector for LadderBottomDetector {
    fn id(&self) -> PatternId {
        PatternId("Ladder Bottom")
    }

    fn min_bars(&self) -> usize {
        5
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        _ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let a = bars.get(index.checked_sub(4)?)?;
        let b = bars.get(index - 3)?;
        let c = bars.get(index - 2)?;
        let d = bars.get(index - 1)?;
        let e = bars.get(index)?;

        let declining = a.is_bearish()
            && b.is_bearish()
            && c.is_bearish()
            && b.open() < a.open()
            && c.open() < b.open()
            && b.close() < a.close()
            && c.close() < b.close();
        let hesitation = d.is_bearish() && d.upper_shadow() > d.body();
        let reversal = e.is_bullish() && e.open() > d.close() && e.close() > d.open();

        (declining && hesitation && reversal).then_some(PatternMatch {
            id: PatternId("Ladder Bottom"),
            direction: Direction::Bullish,
            start_index: index - 4,
            end_index: index,
        })
    }
}
