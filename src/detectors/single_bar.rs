//! Single-bar shape detectors: the doji family, hammer family and
//! marubozu. The hammer family reads one trailing bar as a trend proxy,
//! so those detectors need two bars.

use super::helpers::{
    self, is_body_long, is_body_short, is_doji, is_shadow_very_long, is_shadow_very_short,
};
use super::{CandleContext, Direction, PatternDetector, PatternId, PatternMatch};
use crate::{Ohlcv, OhlcvExt};

impl_with_defaults!(
    DojiDetector,
    DragonflyDojiDetector,
    GravestoneDojiDetector,
    HammerDetector,
    HangingManDetector,
    InvertedHammerDetector,
    ShootingStarDetector,
    MarubozuDetector,
);

// ============================================================
// DOJI FAMILY
// ============================================================

#[derive(Debug, Clone, Copy)]
pub struct DojiDetector {
    pub doji_factor: f64,
}

impl Default for DojiDetector {
    fn default() -> Self {
        Self {
            doji_factor: helpers::DOJI_FACTOR,
        }
    }
}

impl PatternDetector for DojiDetector {
    fn id(&self) -> PatternId {
        PatternId("Doji")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let shape = if ctx.avg_range > 0.0 {
            bar.body() <= ctx.avg_range * self.doji_factor
        } else {
            is_doji(bar.body(), 0.0, bar.range())
        };
        if !shape {
            return None;
        }
        Some(PatternMatch {
            id: PatternId("Doji"),
            direction: Direction::Neutral,
            start_index: index,
            end_index: index,
        })
    }
}

/// Doji with the body at the top of the range: long lower shadow, next to
/// no upper shadow.
#[derive(Debug, Clone, Copy, Default)]
pub struct DragonflyDojiDetector;

impl PatternDetector for DragonflyDojiDetector {
    fn id(&self) -> PatternId {
        PatternId("Dragonfly Doji")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let shape = is_doji(bar.body(), ctx.avg_range, bar.range())
            && is_shadow_very_short(bar.upper_shadow(), ctx.avg_range, bar.range())
            && !is_shadow_very_short(bar.lower_shadow(), ctx.avg_range, bar.range());
        shape.then_some(PatternMatch {
            id: PatternId("Dragonfly Doji"),
            direction: Direction::Bullish,
            start_index: index,
            end_index: index,
        })
    }
}

/// Doji with the body at the bottom of the range.
#[derive(Debug, Clone, Copy, Default)]
pub struct GravestoneDojiDetector;

impl PatternDetector for GravestoneDojiDetector {
    fn id(&self) -> PatternId {
        PatternId("Gravestone Doji")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let shape = is_doji(bar.body(), ctx.avg_range, bar.range())
            && is_shadow_very_short(bar.lower_shadow(), ctx.avg_range, bar.range())
            && !is_shadow_very_short(bar.upper_shadow(), ctx.avg_range, bar.range());
        shape.then_some(PatternMatch {
            id: PatternId("Gravestone Doji"),
            direction: Direction::Bearish,
            start_index: index,
            end_index: index,
        })
    }
}

// ============================================================
// HAMMER FAMILY
// ============================================================

fn hammer_shape<T: Ohlcv>(bar: &T, ctx: &CandleContext) -> bool {
    is_body_short(bar.body(), ctx.avg_body, bar.range())
        && is_shadow_very_long(bar.lower_shadow(), bar.body())
        && is_shadow_very_short(bar.upper_shadow(), ctx.avg_range, bar.range())
        && bar.body() > 0.0
}

fn inverted_hammer_shape<T: Ohlcv>(bar: &T, ctx: &CandleContext) -> bool {
    is_body_short(bar.body(), ctx.avg_body, bar.range())
        && is_shadow_very_long(bar.upper_shadow(), bar.body())
        && is_shadow_very_short(bar.lower_shadow(), ctx.avg_range, bar.range())
        && bar.body() > 0.0
}

/// Hammer: small body at the top, long lower shadow, arriving after a
/// down bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct HammerDetector;

impl PatternDetector for HammerDetector {
    fn id(&self) -> PatternId {
        PatternId("Hammer")
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
        (prev.is_bearish() && hammer_shape(bar, ctx)).then_some(PatternMatch {
            id: PatternId("Hammer"),
            direction: Direction::Bullish,
            start_index: index,
            end_index: index,
        })
    }
}

/// Hanging man: hammer shape after an up bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct HangingManDetector;

impl PatternDetector for HangingManDetector {
    fn id(&self) -> PatternId {
        PatternId("Hanging Man")
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
        (prev.is_bullish() && hammer_shape(bar, ctx)).then_some(PatternMatch {
            id: PatternId("Hanging Man"),
            direction: Direction::Bearish,
            start_index: index,
            end_index: index,
        })
    }
}

/// Inverted hammer: small body at the bottom, long upper shadow, after a
/// down bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct InvertedHammerDetector;

impl PatternDetector for InvertedHammerDetector {
    fn id(&self) -> PatternId {
        PatternId("Inverted Hammer")
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
        (prev.is_bearish() && inverted_hammer_shape(bar, ctx)).then_some(PatternMatch {
            id: PatternId("Inverted Hammer"),
            direction: Direction::Bullish,
            start_index: index,
            end_index: index,
        })
    }
}

/// Shooting star: inverted-hammer shape after an up bar.
#[derive(Debug, Clone, Copy, Default)]
pub struct ShootingStarDetector;

impl PatternDetector for ShootingStarDetector {
    fn id(&self) -> PatternId {
        PatternId("Shooting Star")
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
        (prev.is_bullish() && inverted_hammer_shape(bar, ctx)).then_some(PatternMatch {
            id: PatternId("Shooting Star"),
            direction: Direction::Bearish,
            start_index: index,
            end_index: index,
        })
    }
}

// ============================================================
// MARUBOZU
// ============================================================

/// Long body with no meaningful shadow on either side.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarubozuDetector;

impl PatternDetector for MarubozuDetector {
    fn id(&self) -> PatternId {
        PatternId("Marubozu")
    }

    fn min_bars(&self) -> usize {
        1
    }

    fn detect<T: Ohlcv>(
        &self,
        bars: &[T],
        index: usize,
        ctx: &CandleContext,
    ) -> Option<PatternMatch> {
        let bar = bars.get(index)?;
        let shape = is_body_long(bar.body(), ctx.avg_body, bar.range())
            && is_shadow_very_short(bar.upper_shadow(), ctx.avg_range, bar.range())
            && is_shadow_very_short(bar.lower_shadow(), ctx.avg_range, bar.range());
        if !shape {
            return None;
        }
        let (id, direction) = if bar.is_bullish() {
            (PatternId("Bullish Marubozu"), Direction::Bullish)
        } else {
            (PatternId("Bearish Marubozu"), Direction::Bearish)
        };
        Some(PatternMatch {
            id,
            direction,
            start_index: index,
            end_index: index,
        })
    }
}
