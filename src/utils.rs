use std::f64::consts::TAU;

/// Linear interpolation between two f32 values
pub fn lerp(start: f32, end: f32, alpha: f32) -> f32 {
    start + (end - start) * alpha
}

/// Linear interpolation between two f64 values
pub fn lerp_f64(start: f64, end: f64, alpha: f64) -> f64 {
    start + (end - start) * alpha
}

/// Wraps an angle in radians into [0, 2*PI)
pub fn normalize_angle(radians: f64) -> f64 {
    radians.rem_euclid(TAU)
}

/// Replaces NaN/inf with a fallback, then clamps into [min, max]
pub fn finite_clamp(value: f64, min: f64, max: f64, fallback: f64) -> f64 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback.clamp(min, max)
    }
}
