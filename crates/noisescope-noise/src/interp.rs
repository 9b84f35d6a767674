//! Interpolation between lattice values.

/// Linear blend of `a` and `b` by `t`.
#[inline]
#[must_use]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

#[inline]
#[must_use]
pub const fn linear(t: f32) -> f32 {
    t
}

/// `3t² - 2t³`
#[inline]
#[must_use]
pub fn smoothstep(t: f32) -> f32 {
    t * t * (3.0 - 2.0 * t)
}

/// `6t⁵ - 15t⁴ + 10t³`
#[inline]
#[must_use]
pub fn smootherstep(t: f32) -> f32 {
    t * t * t * (t * (6.0 * t - 15.0) + 10.0)
}

/// Step function remapping the fractional lattice offset before blending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Interp {
    Linear,
    Smoothstep,
    #[default]
    Smootherstep,
}

impl Interp {
    /// Remap `t` in `[0, 1]`.
    #[must_use]
    pub fn apply(self, t: f32) -> f32 {
        match self {
            Self::Linear => linear(t),
            Self::Smoothstep => smoothstep(t),
            Self::Smootherstep => smootherstep(t),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn step_functions_fix_endpoints_and_midpoint() {
        for interp in [Interp::Linear, Interp::Smoothstep, Interp::Smootherstep] {
            assert_relative_eq!(interp.apply(0.0), 0.0);
            assert_relative_eq!(interp.apply(1.0), 1.0);
            assert_relative_eq!(interp.apply(0.5), 0.5);
        }
    }

    #[test]
    fn smooth_steps_ease_in() {
        assert!(smoothstep(0.1) < linear(0.1));
        assert!(smootherstep(0.1) < smoothstep(0.1));
        assert_relative_eq!(smoothstep(0.25), 0.156_25);
    }

    #[test]
    fn lerp_blends() {
        assert_relative_eq!(lerp(2.0, 4.0, 0.25), 2.5);
        assert_relative_eq!(lerp(1.0, -1.0, 1.0), -1.0);
    }
}
