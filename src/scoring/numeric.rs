//! Numeric scorers: hard range cutoff and fuzzy trapezoid.

use crate::error::ConfigError;
use crate::scoring::FeatureScore;

/// Hard biological cutoff: 1.0 inside `[min, max]` (both boundaries
/// inclusive), 0.0 outside, missing when the farm value or a bound is
/// absent. No partial credit.
pub fn numeric_range_score(
    value: Option<f64>,
    min: Option<f64>,
    max: Option<f64>,
) -> FeatureScore {
    let value = match value {
        Some(v) => v,
        None => return FeatureScore::missing("missing farm data"),
    };
    let (min, max) = match (min, max) {
        (Some(min), Some(max)) => (min, max),
        _ => return FeatureScore::missing("missing species data"),
    };

    if value < min {
        FeatureScore::scored(0.0, "below minimum")
    } else if value > max {
        FeatureScore::scored(0.0, "above maximum")
    } else {
        FeatureScore::scored(1.0, "inside preferred range")
    }
}

/// Derive the four trapezoid break points from a species' preferred range
/// widened outward by the configured shoulder tolerances:
/// `a = min - left_tol`, `b = min`, `c = max`, `d = max + right_tol`.
///
/// If the shoulders would overlap (`b > c`, possible with negative
/// tolerances), the plateau collapses to the single midpoint
/// `(min + max) / 2` and the points are re-ordered so `a <= b <= c <= d`
/// always holds.
pub fn derive_trapezoid(
    feature: &str,
    min: f64,
    max: f64,
    left_tol: f64,
    right_tol: f64,
) -> Result<[f64; 4], ConfigError> {
    if max < min {
        return Err(ConfigError::InvalidRange {
            feature: feature.to_string(),
            min,
            max,
        });
    }

    let mut a = min - left_tol;
    let mut b = min;
    let mut c = max;
    let mut d = max + right_tol;

    if b > c {
        let mid = (min + max) / 2.0;
        b = mid;
        c = mid;
    }
    if a > b {
        a = b;
    }
    if d < c {
        d = c;
    }

    Ok([a, b, c, d])
}

/// Piecewise-linear trapezoid score over `[a, b, c, d]`: 0 outside `[a, d]`,
/// a 0→1 ramp across `[a, b]`, 1.0 across the `[b, c]` plateau, and a 1→0
/// ramp across `[c, d]`.
pub fn trapezoid_score(value: f64, points: [f64; 4]) -> FeatureScore {
    let [a, b, c, d] = points;

    if value < a {
        FeatureScore::scored(0.0, "below minimum")
    } else if value > d {
        FeatureScore::scored(0.0, "above maximum")
    } else if value < b {
        // a < b here, otherwise this branch is unreachable.
        let score = (value - a) / (b - a);
        FeatureScore::scored(score, format!("within left shoulder [{a}, {b}]"))
    } else if value <= c {
        FeatureScore::scored(1.0, format!("within plateau [{b}, {c}]"))
    } else {
        let score = (d - value) / (d - c);
        FeatureScore::scored(score, format!("within right shoulder [{c}, {d}]"))
    }
}
