//! Scalar helpers shared by the viewport, animator and keyframe code.

use std::f32::consts::PI;

/// Linear interpolation between `x1` and `x2`.
#[inline]
#[must_use]
pub fn interpolate(x1: f32, x2: f32, f: f32) -> f32 {
    x1 + (x2 - x1) * f
}

/// Inverse of [`interpolate`]: where `value` sits between `x1` and `x2`.
///
/// An empty domain (`x1 == x2`) has no meaningful answer; it maps to `0.0`
/// rather than producing a NaN that would poison later matrix math.
#[inline]
#[must_use]
pub fn uninterpolate(x1: f32, x2: f32, value: f32) -> f32 {
    let span = x2 - x1;
    if span == 0.0 {
        return 0.0;
    }
    (value - x1) / span
}

#[inline]
#[must_use]
pub fn constrain(value: f32, min: f32, max: f32) -> f32 {
    value.clamp(min, max)
}

/// Largest even number not above `n`.
#[inline]
#[must_use]
pub const fn floor_even(n: u32) -> u32 {
    n & !1
}

/// Nearest multiple of four, rounding halves up.
#[inline]
#[must_use]
pub const fn round_mult4(n: u32) -> u32 {
    (n + 2) & !3
}

/// Integer division rounding away from zero.
#[must_use]
pub const fn divide_round_up(num: i32, divisor: i32) -> i32 {
    let sign = (if num > 0 { 1 } else { -1 }) * (if divisor > 0 { 1 } else { -1 });
    sign * (num.abs() + divisor.abs() - 1) / divisor.abs()
}

/// Accelerate/decelerate easing: slow at both ends, fastest at the midpoint.
#[inline]
#[must_use]
pub fn accelerate_decelerate(t: f32) -> f32 {
    ((t + 1.0) * PI).cos() / 2.0 + 0.5
}
