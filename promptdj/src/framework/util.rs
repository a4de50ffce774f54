use ahash::RandomState;
use std::collections::HashSet as StdHashSet;

pub type HashSet<K> = StdHashSet<K, RandomState>;

/// Clamp to the unit interval. NaN maps to 0.
pub fn clamp01(value: f32) -> f32 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, 1.0)
}

/// Linearly map `value` from one range into another.
pub fn map_range(
    value: f32,
    in_min: f32,
    in_max: f32,
    out_min: f32,
    out_max: f32,
) -> f32 {
    if in_min == in_max {
        return out_min;
    }
    out_min + (value - in_min) / (in_max - in_min) * (out_max - out_min)
}

#[cfg(test)]
#[macro_export]
macro_rules! assert_approx_eq {
    ($a:expr, $b:expr) => {
        $crate::assert_approx_eq!($a, $b, 1e-5)
    };
    ($a:expr, $b:expr, $epsilon:expr) => {{
        let (a, b) = ($a as f32, $b as f32);
        assert!(
            (a - b).abs() <= $epsilon,
            "assertion failed: `{} ≈ {}` (epsilon: {})",
            a,
            b,
            $epsilon
        );
    }};
}
