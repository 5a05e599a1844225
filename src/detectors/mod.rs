//! Candlestick pattern detectors.
//!
//! Shape checks use TA-Lib style thresholds against trailing body/range
//! averages (see [`helpers`]), with ratio fallbacks when no trailing
//! history is available. Detection is evaluated at a single bar index,
//! normally the most recent bar.

pub mod helpers;

/// Generate `with_defaults()` -> `Self::default()` for multiple detector types.
macro_rules! impl_with_defaults {
  ($($detector:ty),* $(,)?) => {
    $(impl $detector {
      pub fn with_defaults() -> Self { Self::default() }
    })*
  };
}

pub mod multi_bar;
pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

pub use helpers::*;
pub use multi_bar::*;
pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;

use crate::Ohlcv;

/// Pattern label. Detectors return direction-qualified labels
/// (e.g. `"Bullish Engulfing"`); `PatternDetector::id` gives the
/// canonical detector name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct PatternId(pub &'static str);

impl std::fmt::Display for PatternId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Direction {
    Bullish,
    Neutral,
    Bearish,
}

/// A pattern hit at `end_index` (the bar the pattern completes on).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PatternMatch {
    pub id: PatternId,
    pub direction: Direction,
    pub start_index: usize,
    pub end_index: usize,
}

/// Trailing candle statistics used by TA-Lib style threshold checks.
/// Averages cover up to [`CandleContext::LOOKBACK`] bars strictly before
/// the evaluation index; both are 0 when there is no trailing history,
/// which switches helpers to their ratio fallbacks.
#[derive(Debug, Clone, Copy, Default)]
pub struct CandleContext {
    pub avg_body: f64,
    pub avg_range: f64,
}

impl CandleContext {
    pub const LOOKBACK: usize = 10;

    pub fn compute<T: Ohlcv>(bars: &[T], index: usize) -> Self {
        use crate::OhlcvExt;
        let start = index.saturating_sub(Self::LOOKBACK);
        let window = &bars[start..index.min(bars.len())];
        if window.is_empty() {
            return Self::default();
        }
        let n = window.len() as f64;
        Self {
            avg_body: window.iter().map(|b| b.body()).sum::<f64>() / n,
            avg_range: window.iter().map(|b| b.range()).sum::<f64>() / n,
        }
    }
}

/// A candlestick shape detector evaluated at one bar index.
pub trait PatternDetector {
    /// Canonical detector name.
    fn id(&self) -> PatternId;

    /// Bars required up to and including the evaluation index.
    fn min_bars(&self) -> usize;

    fn detect<T: Ohlcv>(&self, bars: &[T], index: usize, ctx: &CandleContext)
        -> Option<PatternMatch>;
}

macro_rules! define_candle_detectors {
    (
        $(
            $variant:ident($detector:ty)
        ),* $(,)?
    ) => {
        /// All battery detectors, dispatched without boxing.
        #[derive(Debug, Clone)]
        pub enum CandleDetector {
            $($variant($detector)),*
        }

        impl CandleDetector {
            #[inline]
            pub fn detect<T: Ohlcv>(
                &self,
                bars: &[T],
                index: usize,
                ctx: &CandleContext,
            ) -> Option<PatternMatch> {
                match self {
                    $(Self::$variant(d) => PatternDetector::detect(d, bars, index, ctx)),*
                }
            }

            #[inline]
            pub fn id(&self) -> PatternId {
                match self {
                    $(Self::$variant(d) => PatternDetector::id(d)),*
                }
            }

            #[inline]
            pub fn min_bars(&self) -> usize {
                match self {
                    $(Self::$variant(d) => PatternDetector::min_bars(d)),*
                }
            }
        }
    };
}

define_candle_detectors! {
    Doji(DojiDetector),
    MorningStar(MorningStarDetector),
    MorningDojiStar(MorningDojiStarDetector),
    EveningStar(EveningStarDetector),
    EveningDojiStar(EveningDojiStarDetector),
    LadderBottom(LadderBottomDetector),
    ThreeLineStrike(ThreeLineStrikeDetector),
    ThreeBlackCrows(ThreeBlackCrowsDetector),
    ThreeInside(ThreeInsideDetector),
    ThreeOutside(ThreeOutsideDetector),
    ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector),
    Harami(HaramiDetector),
    HaramiCross(HaramiCrossDetector),
    Marubozu(MarubozuDetector),
    HangingMan(HangingManDetector),
    Hammer(HammerDetector),
    InvertedHammer(InvertedHammerDetector),
    ShootingStar(ShootingStarDetector),
    DragonflyDoji(DragonflyDojiDetector),
    GravestoneDoji(GravestoneDojiDetector),
    Engulfing(EngulfingDetector),
}

impl CandleDetector {
    /// The default battery, in reporting order. Every detector that
    /// matches at the evaluated bar contributes its label.
    pub fn battery() -> Vec<CandleDetector> {
        vec![
            Self::Doji(DojiDetector::with_defaults()),
            Self::MorningStar(MorningStarDetector::with_defaults()),
            Self::MorningDojiStar(MorningDojiStarDetector::with_defaults()),
            Self::EveningStar(EveningStarDetector::with_defaults()),
            Self::EveningDojiStar(EveningDojiStarDetector::with_defaults()),
            Self::LadderBottom(LadderBottomDetector::with_defaults()),
            Self::ThreeLineStrike(ThreeLineStrikeDetector::with_defaults()),
            Self::ThreeBlackCrows(ThreeBlackCrowsDetector::with_defaults()),
            Self::ThreeInside(ThreeInsideDetector::with_defaults()),
            Self::ThreeOutside(ThreeOutsideDetector::with_defaults()),
            Self::ThreeWhiteSoldiers(ThreeWhiteSoldiersDetector::with_defaults()),
            Self::Harami(HaramiDetector::with_defaults()),
            Self::HaramiCross(HaramiCrossDetector::with_defaults()),
            Self::Marubozu(MarubozuDetector::with_defaults()),
            Self::HangingMan(HangingManDetector::with_defaults()),
            Self::Hammer(HammerDetector::with_defaults()),
            Self::InvertedHammer(InvertedHammerDetector::with_defaults()),
            Self::ShootingStar(ShootingStarDetector::with_defaults()),
            Self::DragonflyDoji(DragonflyDojiDetector::with_defaults()),
            Self::GravestoneDoji(GravestoneDojiDetector::with_defaults()),
            Self::Engulfing(EngulfingDetector::with_defaults()),
        ]
    }
}
