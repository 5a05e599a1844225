//! Three-bar detectors: star reversals, soldiers/crows and the
//! inside/outside confirmations.

use super::helpers::{is_body_long, is_body_short, is_doji, is_shadow_very_short};
use super::{CandleContext, Direction, PatternDetector, PatternId, PatternMatch};
use crate::{Ohlcv, OhlcvExt};

impl_with_defaults!(
    MorningStarDetector,
    MorningDojiStarDetector,
    EveningStarDetector,
    EveningDojiStarDetector,
    ThreeWhiteSoldiersDetector,
    ThreeBlackCrowsDetector,
    ThreeInsideDetector,
    ThreeOutsideDetector,
);

fn body_top<T: Ohlcv>(bar: &T) -> f64 {
    bar.open().max(bar.close())
}

fn body_bottom<T: Ohlcv>(bar: &T) -> f64 {
    bar.open().min(bar.close())
}

fn three<'a, T: Ohlcv>(bars: &'a [T], index: usize) -> Option<(&'a T, &'a T, &'a T)> {
    let first = bars.get(index.checked_sub(2)?)?;
    let star = bars.get(index - 1)?;
    let last = bars.get(index)?;
    Some((first, star, last))
}

// ============================================================
// STARS
// ============================================================

/// Shared morning-star shape; `doji_star` requires the middle bar to be
/// a doji rather than merely short.
fn morning_star<T: Ohlcv>(
    bars: &[T],
    index: usize,
    ctx: &CandleContext,
    doji_star: bool,
) -> Option<(usize, usize)> {
    let (first, star, last) = three(bars, index)?;
    let star_ok = if doji_star {
        is_doji(star.body(), ctx.avg_range, star.range())
    } else {
        is_body_short(star.body(), ctx.avg_body, star.range())
    };
    let shape = first.is_bearish()
        && is_body_long(first.body(), ctx.avg_body, first.range())
        && star_ok
        && body_top(star) < first.close()
        && last.is_bullish()
        && last.close() > (first.open() + first.close()) / 2.0;
    shape.then_some((index - 2, index))
}

fn evening_star<T: Ohlcv>(
    bars: &[T],
    index: usize,
    ctx: &CandleContext,
    doji_star: bool,
) -> Option<(usize, usize)> {
    let (first, star, last) = three(bars, index)?;
    let star_ok = if doji_star {
        is_doji(star.body(), ctx.avg_range, star.range())
    } else {
        is_body_short(star.body(), ctx.avg_body, star.range())
    };
    let shape = first.is_bullish()
        && is_body_long(first.body(), ctx.avg_body, first.range())
        && star_ok
        && body_bottom(star) > first.close()
        && last.is_bearish()
        && last.close() < (first.open() + first.close()) / 2.0;
    shape.then_some((index - 2, index))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MorningStarDetector;

impl PatternDetector for MorningStarDetector {
    fn id(&self) -> PatternId {
        PatternId("Morning Star")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let (start, end) = morning_star(bars, index, ctx, false)?;
        Some(PatternMatch {
            id: PatternId("Morning Star"),
            direction: Direction::Bullish,
            start_index: start,
            end_index: end,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MorningDojiStarDetector;

impl PatternDetector for MorningDojiStarDetector {
    fn id(&self) -> PatternId {
        PatternId("Morning Doji Star")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let (start, end) = morning_star(bars, index, ctx, true)?;
        Some(PatternMatch {
            id: PatternId("Morning Doji Star"),
            direction: Direction::Bullish,
            start_index: start,
            end_index: end,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EveningStarDetector;

impl PatternDetector for EveningStarDetector {
    fn id(&self) -> PatternId {
        PatternId("Evening Star")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let (start, end) = evening_star(bars, index, ctx, false)?;
        Some(PatternMatch {
            id: PatternId("Evening Star"),
            direction: Direction::Bearish,
            start_index: start,
            end_index: end,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EveningDojiStarDetector;

impl PatternDetector for EveningDojiStarDetector {
    fn id(&self) -> PatternId {
        PatternId("Evening Doji Star")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let (start, end) = evening_star(bars, index, ctx, true)?;
        Some(PatternMatch {
            id: PatternId("Evening Doji Star"),
            direction: Direction::Bearish,
            start_index: start,
            end_index: end,
        })
    }
}

// ============================================================
// SOLDIERS / CROWS
// ============================================================

/// Three advancing bullish bars, each opening inside the prior body and
/// closing near its high.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeWhiteSoldiersDetector;

impl PatternDetector for ThreeWhiteSoldiersDetector {
    fn id(&self) -> PatternId {
        PatternId("3 White Soldiers")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let (a, b, c) = three(bars, index)?;
        let advancing = [a, b, c].iter().all(|bar| {
            bar.is_bullish() && is_shadow_very_short(bar.upper_shadow(), ctx.avg_range, bar.range())
        }) && b.close() > a.close()
            && c.close() > b.close()
            && b.open() > a.open()
            && b.open() < a.close()
            && c.open() > b.open()
            && c.open() < b.close();
        advancing.then_some(PatternMatch {
            id: PatternId("3 White Soldiers"),
            direction: Direction::Bullish,
            start_index: index - 2,
            end_index: index,
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeBlackCrowsDetector;

impl PatternDetector for ThreeBlackCrowsDetector {
    fn id(&self) -> PatternId {
        PatternId("3 Black Crows")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let (a, b, c) = three(bars, index)?;
        let declining = [a, b, c].iter().all(|bar| {
            bar.is_bearish() && is_shadow_very_short(bar.lower_shadow(), ctx.avg_range, bar.range())
        }) && b.close() < a.close()
            && c.close() < b.close()
            && b.open() < a.open()
            && b.open() > a.close()
            && c.open() < b.open()
            && c.open() > b.close();
        declining.then_some(PatternMatch {
            id: PatternId("3 Black Crows"),
            direction: Direction::Bearish,
            start_index: index - 2,
            end_index: index,
        })
    }
}

// ============================================================
// INSIDE / OUTSIDE CONFIRMATIONS
// ============================================================

/// Harami pair plus a third bar confirming beyond the first body.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeInsideDetector;

impl PatternDetector for ThreeInsideDetector {
    fn id(&self) -> PatternId {
        PatternId("3 Inside")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let (a, b, c) = three(bars, index)?;
        let contained = is_body_long(a.body(), ctx.avg_body, a.range())
            && is_body_short(b.body(), ctx.avg_body, b.range())
            && body_top(b) < body_top(a)
            && body_bottom(b) > body_bottom(a);
        if !contained {
            return None;
        }
        let up = a.is_bearish() && b.is_bullish() && c.is_bullish() && c.close() > a.open();
        let down = a.is_bullish() && b.is_bearish() && c.is_bearish() && c.close() < a.open();
        let (id, direction) = if up {
            (PatternId("3 Inside Up"), Direction::Bullish)
        } else if down {
            (PatternId("3 Inside Down"), Direction::Bearish)
        } else {
            return None;
        };
        Some(PatternMatch {
            id,
            direction,
            start_index: index - 2,
            end_index: index,
        })
    }
}

/// Engulfing pair plus a third bar extending the reversal.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreeOutsideDetector;

impl PatternDetector for ThreeOutsideDetector {
    fn id(&self) -> PatternId {
        PatternId("3 Outside")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        _ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let (a, b, c) = three(bars, index)?;
        let up = a.is_bearish()
            && b.is_bullish()
            && b.open() < a.close()
            && b.close() > a.open()
            && c.is_bullish()
            && c.close() > b.close();
        let down = a.is_bullish()
            && b.is_bearish()
            && b.open() > a.close()
            && b.close() < a.open()
            && c.is_bearish()
            && c.close() < b.close();
        let (id, direction) = if up {
            (PatternId("3 Outside Up"), Direction::Bullish)
        } else if down {
            (PatternId("3 Outside Down"), Direction::Bearish)
        } else {
            return None;
        };
        Some(PatternMatch {
            id,
            direction,
            start_index: index - 2,
            end_index: index,
        })
    }
}
