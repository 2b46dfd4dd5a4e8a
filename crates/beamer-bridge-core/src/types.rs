//! Common types shared by the bridge crates.

/// Parameter identifier.
///
/// Dense, stable for the lifetime of a session, and small enough to index
/// an array directly.
pub type ParameterId = u32;

/// Parameter value in the normalized domain (0.0 to 1.0).
pub type NormalizedValue = f64;

/// Identifier of a telemetry stream (meter pair, sample buffer, ...).
///
/// Lives in its own namespace, unrelated to [`ParameterId`].
pub type ControlTag = i32;

/// Number of parameter slots a table or store will hold. Valid ids are
/// `0..MAX_PARAMETER_COUNT`.
pub const MAX_PARAMETER_COUNT: usize = 1 << 16;

/// Clamp a value into the normalized domain.
///
/// NaN maps to 0.0 so that it can never reach a store. Negative zero
/// becomes positive zero, keeping bitwise change detection stable.
#[inline]
pub fn clamp_normalized(value: f64) -> NormalizedValue {
    if value.is_nan() || value <= 0.0 {
        0.0
    } else if value >= 1.0 {
        1.0
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_normalized() {
        assert_eq!(clamp_normalized(0.25), 0.25);
        assert_eq!(clamp_normalized(-3.0), 0.0);
        assert_eq!(clamp_normalized(7.0), 1.0);
        assert_eq!(clamp_normalized(f64::INFINITY), 1.0);
        assert_eq!(clamp_normalized(f64::NEG_INFINITY), 0.0);
        assert_eq!(clamp_normalized(f64::NAN), 0.0);
        assert_eq!(clamp_normalized(-0.0).to_bits(), 0.0f64.to_bits());
    }
}
