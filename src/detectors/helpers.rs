//! Threshold helpers shared by the detector modules.
//!
//! Comparisons follow TA-Lib's candle settings: a shape property is
//! measured against a trailing average (body or high-low range), with a
//! plain ratio fallback when no trailing history exists.

/// Body is doji-like: body <= avg_range * DOJI_FACTOR.
pub const DOJI_FACTOR: f64 = 0.1;
/// Body is short: body < avg_body * BODY_SHORT_FACTOR.
pub const BODY_SHORT_FACTOR: f64 = 1.0;
/// Body is long: body > avg_body * BODY_LONG_FACTOR.
pub const BODY_LONG_FACTOR: f64 = 1.0;
/// Shadow is very long: shadow > body * SHADOW_VERYLONG_FACTOR.
pub const SHADOW_VERYLONG_FACTOR: f64 = 2.0;
/// Shadow is very short: shadow < avg_range * SHADOW_VERYSHORT_FACTOR.
pub const SHADOW_VERYSHORT_FACTOR: f64 = 0.1;
/// Two prices are near: |a - b| <= avg_range * NEAR_FACTOR.
pub const NEAR_FACTOR: f64 = 0.2;

// Ratio fallbacks against the bar's own range.
pub const DOJI_RATIO: f64 = 0.1;
pub const BODY_SHORT_RATIO: f64 = 0.3;
pub const BODY_LONG_RATIO: f64 = 0.7;
pub const SHADOW_VERYSHORT_RATIO: f64 = 0.1;

/// A zero body is always a doji.
#[inline]
pub fn is_doji(body: f64, avg_range: f64, range: f64) -> bool {
    if body <= 0.0 {
        return true;
    }
    if avg_range > 0.0 {
        body <= avg_range * DOJI_FACTOR
    } else {
        range > 0.0 && body / range <= DOJI_RATIO
    }
}

#[inline]
pub fn is_body_short(body: f64, avg_body: f64, range: f64) -> bool {
    if avg_body > 0.0 {
        body < avg_body * BODY_SHORT_FACTOR
    } else {
        range > 0.0 && body / range <= BODY_SHORT_RATIO
    }
}

#[inline]
pub fn is_body_long(body: f64, avg_body: f64, range: f64) -> bool {
    if avg_body > 0.0 {
        body > avg_body * BODY_LONG_FACTOR
    } else {
        range > 0.0 && body / range >= BODY_LONG_RATIO
    }
}

/// Shadow dwarfs the real body.
#[inline]
pub fn is_shadow_very_long(shadow: f64, body: f64) -> bool {
    shadow > body * SHADOW_VERYLONG_FACTOR && shadow > 0.0
}

#[inline]
pub fn is_shadow_very_short(shadow: f64, avg_range: f64, range: f64) -> bool {
    if avg_range > 0.0 {
        shadow < avg_range * SHADOW_VERYSHORT_FACTOR
    } else {
        range <= 0.0 || shadow / range <= SHADOW_VERYSHORT_RATIO
    }
}

/// Price near-equality within the trailing range tolerance.
#[inline]
pub fn is_near(a: f64, b: f64, avg_range: f64) -> bool {
    let tolerance = if avg_range > 0.0 {
        avg_range * NEAR_FACTOR
    } else {
        (a.abs().max(b.abs())) * 0.002
    };
    (a - b).abs() <= tolerance
}
