//! Range mapping for parameter normalization.
//!
//! This module provides the [`RangeMapper`] trait and one implementation per
//! [`ParameterShape`](crate::parameter_info::ParameterShape). Mappers convert
//! between plain values (in natural units like Hz or ms) and the normalized
//! 0.0 to 1.0 domain the bridge stores and transmits.
//!
//! # Available Mappers
//!
//! - [`LinearMapper`] - Straight interpolation
//! - [`PowerMapper`] - `n^k` curve, fine resolution near the minimum for `k > 1`
//! - [`ExponentialMapper`] - Logarithmic spacing for frequency-like ranges
//! - [`SteppedMapper`] - Evenly spaced discrete values (enums, octaves)
//! - [`BooleanMapper`] - Two states split at 0.5
//!
//! Every mapper clamps its input first and returns `min`/`max` verbatim at
//! the domain edges, so `denormalize(0.0) == min` and `denormalize(1.0) == max`
//! hold exactly regardless of floating point rounding in the curve.
//!
//! # Example
//!
//! ```
//! use beamer_bridge_core::parameter_range::{ExponentialMapper, PowerMapper, RangeMapper};
//!
//! let cutoff = ExponentialMapper::new(20.0, 20000.0);
//! // Geometric mean of 20 and 20000
//! assert!((cutoff.denormalize(0.5) - 632.46).abs() < 0.01);
//!
//! let attack = PowerMapper::new(0.0, 1000.0, 3.0);
//! assert!((attack.denormalize(0.5) - 125.0).abs() < 1e-9);
//! ```

use crate::types::clamp_normalized;

/// Trait for mapping between plain values and normalized values.
pub trait RangeMapper: Send + Sync {
    /// Convert a plain value to normalized (0.0-1.0).
    ///
    /// Values outside the range are clamped.
    fn normalize(&self, plain: f64) -> f64;

    /// Convert a normalized value (0.0-1.0) to plain.
    ///
    /// Values outside 0.0-1.0 are clamped.
    fn denormalize(&self, normalized: f64) -> f64;

    /// Get the plain value range as (min, max).
    fn range(&self) -> (f64, f64);
}

/// Linear range mapping.
#[derive(Debug, Clone)]
pub struct LinearMapper {
    min: f64,
    max: f64,
}

impl LinearMapper {
    /// Create a new linear mapper with the given range.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl RangeMapper for LinearMapper {
    fn normalize(&self, plain: f64) -> f64 {
        let span = self.max - self.min;
        if span.abs() < f64::EPSILON {
            return 0.0;
        }
        clamp_normalized((plain - self.min) / span)
    }

    fn denormalize(&self, normalized: f64) -> f64 {
        let normalized = clamp_normalized(normalized);
        if normalized >= 1.0 {
            return self.max;
        }
        self.min + normalized * (self.max - self.min)
    }

    fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Power curve range mapping.
///
/// `plain = min + n^k * (max - min)`. With `k > 1` more slider travel is
/// spent near the minimum, which is what time parameters (attack, decay,
/// release) want.
///
/// # Panics
///
/// Panics if the exponent is not positive or the range is empty.
#[derive(Debug, Clone)]
pub struct PowerMapper {
    min: f64,
    max: f64,
    exponent: f64,
}

impl PowerMapper {
    /// Create a new power curve mapper.
    pub fn new(min: f64, max: f64, exponent: f64) -> Self {
        assert!(
            max > min,
            "PowerMapper requires max > min, got min={}, max={}",
            min, max
        );
        assert!(
            exponent > 0.0 && exponent.is_finite(),
            "PowerMapper requires positive exponent, got {}",
            exponent
        );
        Self { min, max, exponent }
    }
}

impl RangeMapper for PowerMapper {
    fn normalize(&self, plain: f64) -> f64 {
        let linear = clamp_normalized((plain - self.min) / (self.max - self.min));
        linear.powf(1.0 / self.exponent)
    }

    fn denormalize(&self, normalized: f64) -> f64 {
        let normalized = clamp_normalized(normalized);
        if normalized >= 1.0 {
            return self.max;
        }
        self.min + normalized.powf(self.exponent) * (self.max - self.min)
    }

    fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Exponential range mapping.
///
/// `plain = exp(ln(min) + n * ln(max / min))`, so equal slider travel covers
/// equal frequency ratios.
///
/// # Panics
///
/// Panics if the range start is not positive or the range is empty.
#[derive(Debug, Clone)]
pub struct ExponentialMapper {
    min: f64,
    max: f64,
    min_log: f64,
    ratio_log: f64,
}

impl ExponentialMapper {
    /// Create a new exponential mapper.
    pub fn new(min: f64, max: f64) -> Self {
        assert!(
            min > 0.0,
            "ExponentialMapper requires positive range start, got min={}",
            min
        );
        assert!(
            max > min,
            "ExponentialMapper requires max > min, got min={}, max={}",
            min, max
        );
        Self {
            min,
            max,
            min_log: min.ln(),
            ratio_log: (max / min).ln(),
        }
    }
}

impl RangeMapper for ExponentialMapper {
    fn normalize(&self, plain: f64) -> f64 {
        if plain.is_nan() || plain <= self.min {
            return 0.0;
        }
        if plain >= self.max {
            return 1.0;
        }
        clamp_normalized((plain / self.min).ln() / self.ratio_log)
    }

    fn denormalize(&self, normalized: f64) -> f64 {
        let normalized = clamp_normalized(normalized);
        if normalized <= 0.0 {
            return self.min;
        }
        if normalized >= 1.0 {
            return self.max;
        }
        (self.min_log + normalized * self.ratio_log).exp()
    }

    fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Stepped range mapping for discrete parameters.
///
/// With `count` values, index `i` sits at normalized `i / (count - 1)`.
/// Enum parameters use `min = 0`, `max = count - 1` so the plain value is
/// the variant index. A single-value parameter always normalizes to 0.
#[derive(Debug, Clone)]
pub struct SteppedMapper {
    min: f64,
    max: f64,
    count: usize,
}

impl SteppedMapper {
    /// Create a stepped mapper with `count` evenly spaced values.
    pub fn new(min: f64, max: f64, count: usize) -> Self {
        Self { min, max, count }
    }

    /// Number of discrete values.
    pub fn count(&self) -> usize {
        self.count
    }

    fn last_index(&self) -> usize {
        self.count.saturating_sub(1)
    }
}

impl RangeMapper for SteppedMapper {
    fn normalize(&self, plain: f64) -> f64 {
        let last = self.last_index();
        let span = self.max - self.min;
        if last == 0 || span.abs() < f64::EPSILON {
            return 0.0;
        }
        let position = clamp_normalized((plain - self.min) / span);
        let index = (position * last as f64).round();
        index / last as f64
    }

    fn denormalize(&self, normalized: f64) -> f64 {
        let last = self.last_index();
        if last == 0 {
            return self.min;
        }
        let index = (clamp_normalized(normalized) * last as f64).round() as usize;
        if index >= last {
            return self.max;
        }
        self.min + index as f64 * (self.max - self.min) / last as f64
    }

    fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}

/// Boolean mapping.
///
/// Normalized values strictly above 0.5 are "on"; exactly 0.5 is "off".
#[derive(Debug, Clone)]
pub struct BooleanMapper {
    min: f64,
    max: f64,
}

impl BooleanMapper {
    /// Create a boolean mapper whose off/on states are `min`/`max`.
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }
}

impl RangeMapper for BooleanMapper {
    fn normalize(&self, plain: f64) -> f64 {
        let midpoint = self.min + (self.max - self.min) * 0.5;
        if plain > midpoint {
            1.0
        } else {
            0.0
        }
    }

    fn denormalize(&self, normalized: f64) -> f64 {
        if clamp_normalized(normalized) > 0.5 {
            self.max
        } else {
            self.min
        }
    }

    fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }
}
