//! Easing functions
//!
//! Maps linear progress (0.0 to 1.0) onto a shaped curve. Input is
//! clamped so overshooting tick accumulators can't produce values
//! outside the curve's domain.

/// Easing curve applied to normalized progress
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Easing {
    #[default]
    Linear,
    /// Quadratic ease-in
    EaseIn,
    /// Quadratic ease-out
    EaseOut,
    /// Quadratic ease-in-out
    EaseInOut,
    /// Cubic ease-in
    CubicIn,
    /// Cubic ease-out
    CubicOut,
    /// Cubic ease-in-out
    CubicInOut,
    /// Exponential ease-out, very fast start with a long tail
    ExpoOut,
    /// Overshooting ease-out, settles back to 1.0
    BackOut,
}

impl Easing {
    /// Apply the curve to progress `t`
    ///
    /// `t` is clamped to [0.0, 1.0]. Every curve maps 0.0 to 0.0 and
    /// 1.0 to 1.0; `BackOut` exceeds 1.0 in between.
    pub fn apply(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Easing::Linear => t,
            Easing::EaseIn => t * t,
            Easing::EaseOut => t * (2.0 - t),
            Easing::EaseInOut => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    -1.0 + (4.0 - 2.0 * t) * t
                }
            }
            Easing::CubicIn => t * t * t,
            Easing::CubicOut => {
                let u = 1.0 - t;
                1.0 - u * u * u
            }
            Easing::CubicInOut => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    let u = -2.0 * t + 2.0;
                    1.0 - u * u * u / 2.0
                }
            }
            Easing::ExpoOut => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2.0_f32.powf(-10.0 * t)
                }
            }
            Easing::BackOut => {
                const C1: f32 = 1.70158;
                const C3: f32 = C1 + 1.0;
                let u = t - 1.0;
                1.0 + C3 * u * u * u + C1 * u * u
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Easing; 9] = [
        Easing::Linear,
        Easing::EaseIn,
        Easing::EaseOut,
        Easing::EaseInOut,
        Easing::CubicIn,
        Easing::CubicOut,
        Easing::CubicInOut,
        Easing::ExpoOut,
        Easing::BackOut,
    ];

    #[test]
    fn test_endpoints() {
        for easing in ALL {
            assert!(
                easing.apply(0.0).abs() < 1e-4,
                "{easing:?} should map 0 to 0"
            );
            assert!(
                (easing.apply(1.0) - 1.0).abs() < 1e-4,
                "{easing:?} should map 1 to 1"
            );
        }
    }

    #[test]
    fn test_input_is_clamped() {
        for easing in ALL {
            assert_eq!(easing.apply(-0.5), easing.apply(0.0));
            assert_eq!(easing.apply(1.5), easing.apply(1.0));
        }
    }

    #[test]
    fn test_ease_out_front_loads() {
        // Ease-out curves cover more than half the distance by midpoint.
        assert!(Easing::EaseOut.apply(0.5) > 0.5);
        assert!(Easing::CubicOut.apply(0.5) > 0.5);
        assert!(Easing::ExpoOut.apply(0.5) > 0.5);
    }

    #[test]
    fn test_ease_in_back_loads() {
        assert!(Easing::EaseIn.apply(0.5) < 0.5);
        assert!(Easing::CubicIn.apply(0.5) < 0.5);
    }

    #[test]
    fn test_back_out_overshoots() {
        let peak = (0..100)
            .map(|i| Easing::BackOut.apply(i as f32 / 100.0))
            .fold(f32::MIN, f32::max);
        assert!(peak > 1.0);
    }

    #[test]
    fn test_in_out_symmetry() {
        let mid = Easing::EaseInOut.apply(0.5);
        assert!((mid - 0.5).abs() < 1e-4);
        let mid = Easing::CubicInOut.apply(0.5);
        assert!((mid - 0.5).abs() < 1e-4);
    }
}
