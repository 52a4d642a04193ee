use crate::math::Vec2;

/// Share of the remaining distance left after one reference interval.
pub const SMOOTHING_EPSILON: f64 = 1e-6;
/// Reference interval for [`SMOOTHING_EPSILON`], in seconds.
pub const SMOOTHING_REFERENCE: f64 = 1.0;
/// Fraction used before the first frame time is known.
pub const INITIAL_FRACTION: f32 = 0.005;

/// Frame-rate independent blend fraction for a frame lasting `dt` seconds.
///
/// Applying the returned fraction once per frame shrinks the remaining
/// distance by the same factor per real second at any frame rate.
pub fn smoothing_fraction(dt: f64) -> f32 {
    if !(dt > 0.0) {
        return 0.0;
    }
    let fraction = 1.0 - SMOOTHING_EPSILON.powf(dt / SMOOTHING_REFERENCE);
    fraction.clamp(0.0, 1.0) as f32
}

pub fn interpolate(current: Vec2, target: Vec2, fraction: f32) -> Vec2 {
    current.lerp(target, fraction)
}

/// Per-axis mean of two estimates of the same position.
pub fn average(a: Vec2, b: Vec2) -> Vec2 {
    a.midpoint(b)
}

/// Holds the current frame's blend fraction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Smoother {
    fraction: f32,
}

impl Smoother {
    pub fn new() -> Self {
        Self {
            fraction: INITIAL_FRACTION,
        }
    }

    /// Recomputes the fraction from the last frame's duration.
    pub fn update(&mut self, dt: f64) {
        self.fraction = smoothing_fraction(dt);
    }

    pub fn fraction(&self) -> f32 {
        self.fraction
    }

    pub fn step(&self, current: Vec2, target: Vec2) -> Vec2 {
        interpolate(current, target, self.fraction)
    }
}

impl Default for Smoother {
    fn default() -> Self {
        Self::new()
    }
}
