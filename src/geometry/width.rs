use crate::error::DrillscopeError;

/// Clamped logarithmic width curve.
///
/// `width = clamp(2 * log10(value + 1), min_width, max_width)`: width grows
/// with the decimal order of magnitude of the assay value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WidthPolicy {
    /// Floor of the curve.
    pub min_width: f32,
    /// Ceiling of the curve.
    pub max_width: f32,
}

impl Default for WidthPolicy {
    fn default() -> Self {
        Self {
            min_width: 0.3,
            max_width: 15.0,
        }
    }
}

impl WidthPolicy {
    /// Width for an assay value.
    ///
    /// # Errors
    ///
    /// Returns [`DrillscopeError::InvalidValue`] for negative or
    /// non-finite values.
    pub fn width_of(&self, value: f32) -> Result<f32, DrillscopeError> {
        if !value.is_finite() || value < 0.0 {
            return Err(DrillscopeError::InvalidValue(value));
        }
        let raw = 2.0 * (value + 1.0).ln() / std::f32::consts::LN_10;
        // `clamp` panics if options invert the bounds.
        Ok(raw.max(self.min_width).min(self.max_width))
    }
}

/// [`WidthPolicy::width_of`] with the default clamps.
///
/// # Errors
///
/// Returns [`DrillscopeError::InvalidValue`] for negative or non-finite
/// values.
pub fn width_of(value: f32) -> Result<f32, DrillscopeError> {
    WidthPolicy::default().width_of(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_clamps_to_floor() {
        assert_eq!(width_of(0.0).unwrap(), 0.3);
    }

    #[test]
    fn huge_values_clamp_to_ceiling() {
        assert_eq!(width_of(1e12).unwrap(), 15.0);
    }

    #[test]
    fn nine_maps_to_two() {
        assert!((width_of(9.0).unwrap() - 2.0).abs() < 1e-5);
        assert!((width_of(99.0).unwrap() - 4.0).abs() < 1e-5);
    }

    #[test]
    fn monotonic_and_bounded() {
        let mut prev = width_of(0.0).unwrap();
        let mut v = 0.0_f32;
        while v < 1e9 {
            v = v * 1.7 + 0.01;
            let w = width_of(v).unwrap();
            assert!(w >= prev, "width decreased at {v}: {w} < {prev}");
            assert!((0.3..=15.0).contains(&w));
            prev = w;
        }
    }

    #[test]
    fn rejects_out_of_domain_values() {
        assert!(matches!(
            width_of(-0.5),
            Err(DrillscopeError::InvalidValue(_))
        ));
        assert!(width_of(f32::NAN).is_err());
        assert!(width_of(f32::INFINITY).is_err());
    }

    #[test]
    fn custom_clamps_apply() {
        let policy = WidthPolicy {
            min_width: 1.0,
            max_width: 3.0,
        };
        assert_eq!(policy.width_of(0.0).unwrap(), 1.0);
        assert_eq!(policy.width_of(1e6).unwrap(), 3.0);
    }
}
