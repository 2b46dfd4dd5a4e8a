//! Parameter metadata types.
//!
//! [`ParameterMetadata`] describes one parameter: its physical range, the
//! [`ParameterShape`] used to map it to and from the normalized domain, its
//! unit label and optional enum labels. Metadata is immutable once loaded
//! into a [`ParameterTable`](crate::parameter_table::ParameterTable).
//!
//! Metadata can be built in code:
//!
//! ```
//! use beamer_bridge_core::{ParameterMetadata, ParameterShape};
//!
//! let attack = ParameterMetadata::new(3, "Attack")
//!     .with_range(1.0, 1000.0)
//!     .with_unit("ms")
//!     .with_shape(ParameterShape::Power, 3.0)
//!     .with_default(10.0);
//! assert_eq!(attack.max, 1000.0);
//! ```
//!
//! or deserialized from the JSON document shipped alongside the UI
//! (see [`ParameterTable::from_json`](crate::parameter_table::ParameterTable::from_json)).

use serde::{Deserialize, Serialize};

use crate::parameter_format::Formatter;
use crate::types::ParameterId;

/// Curve family used to map a parameter between normalized and physical values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ParameterShape {
    /// `actual = min + n * (max - min)`.
    #[default]
    Linear,
    /// `actual = min + n^k * (max - min)` with `k` the shape parameter.
    Power,
    /// Logarithmic spacing between `min` and `max` (both positive).
    Exponential,
    /// Discrete steps, `count` evenly spaced values.
    Stepped,
    /// Two states split at 0.5 (exactly 0.5 is "off").
    Boolean,
}

/// Metadata describing a single parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterMetadata {
    /// Parameter identifier.
    pub id: ParameterId,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Physical minimum.
    #[serde(default)]
    pub min: f64,
    /// Physical maximum.
    #[serde(default = "default_max")]
    pub max: f64,
    /// Step size in physical units (0 = continuous).
    #[serde(default)]
    pub step: f64,
    /// Unit label appended to formatted values ("Hz", "ms", "dB").
    #[serde(default)]
    pub unit: String,
    /// Mapping curve.
    #[serde(default)]
    pub shape: ParameterShape,
    /// Exponent for [`ParameterShape::Power`], ignored otherwise.
    #[serde(default = "default_shape_parameter")]
    pub shape_parameter: f64,
    /// Labels for enum parameters, index = physical value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_values: Option<Vec<String>>,
    /// Whether the host may record automation for this parameter.
    #[serde(default = "default_automatable")]
    pub automatable: bool,
    /// Default value in physical units.
    #[serde(default)]
    pub default_value: f64,
    /// Display formatter. Inferred from the shape when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<Formatter>,
}

fn default_max() -> f64 {
    1.0
}

fn default_shape_parameter() -> f64 {
    1.0
}

fn default_automatable() -> bool {
    true
}

impl ParameterMetadata {
    /// Create a linear 0..1 parameter.
    pub fn new(id: ParameterId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            min: 0.0,
            max: 1.0,
            step: 0.0,
            unit: String::new(),
            shape: ParameterShape::Linear,
            shape_parameter: 1.0,
            enum_values: None,
            automatable: true,
            default_value: 0.0,
            formatter: None,
        }
    }

    /// Create a toggle parameter.
    pub fn toggle(id: ParameterId, name: impl Into<String>) -> Self {
        Self::new(id, name)
            .with_shape(ParameterShape::Boolean, 1.0)
            .with_step(1.0)
    }

    /// Create an enum parameter. The range becomes `0..=labels.len() - 1`.
    pub fn choice<S: Into<String>>(
        id: ParameterId,
        name: impl Into<String>,
        labels: impl IntoIterator<Item = S>,
    ) -> Self {
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        let max = labels.len().saturating_sub(1) as f64;
        Self {
            max,
            step: 1.0,
            shape: ParameterShape::Stepped,
            enum_values: Some(labels),
            ..Self::new(id, name)
        }
    }

    /// Set the physical range.
    pub fn with_range(mut self, min: f64, max: f64) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    /// Set the step size.
    pub fn with_step(mut self, step: f64) -> Self {
        self.step = step;
        self
    }

    /// Set the unit label.
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit = unit.into();
        self
    }

    /// Set the mapping shape and its parameter.
    pub fn with_shape(mut self, shape: ParameterShape, shape_parameter: f64) -> Self {
        self.shape = shape;
        self.shape_parameter = shape_parameter;
        self
    }

    /// Set the default value (physical units).
    pub fn with_default(mut self, default_value: f64) -> Self {
        self.default_value = default_value;
        self
    }

    /// Set an explicit display formatter.
    pub fn with_formatter(mut self, formatter: Formatter) -> Self {
        self.formatter = Some(formatter);
        self
    }

    /// Mark the parameter as not automatable.
    pub fn without_automation(mut self) -> Self {
        self.automatable = false;
        self
    }

    /// Number of discrete values for stepped parameters.
    ///
    /// Enum labels win over the step size. Continuous parameters return 0.
    pub fn step_count(&self) -> usize {
        if let Some(labels) = &self.enum_values {
            return labels.len();
        }
        match self.shape {
            ParameterShape::Boolean => 2,
            // Float to int casts saturate, so huge ratios end at usize::MAX
            ParameterShape::Stepped if self.step > 0.0 => {
                (((self.max - self.min) / self.step).round() as usize).saturating_add(1)
            }
            ParameterShape::Stepped => ((self.max - self.min).round() as usize).saturating_add(1),
            _ => 0,
        }
    }

    /// The formatter used for display, explicit or inferred from the shape.
    pub fn effective_formatter(&self) -> Formatter {
        if let Some(formatter) = self.formatter {
            return formatter;
        }
        match self.shape {
            ParameterShape::Boolean => Formatter::OnOff,
            ParameterShape::Stepped if self.enum_values.is_some() => Formatter::Enum,
            ParameterShape::Stepped => Formatter::Integer,
            ParameterShape::Exponential if self.unit.eq_ignore_ascii_case("hz") => {
                Formatter::Frequency
            }
            _ => Formatter::default(),
        }
    }
}
