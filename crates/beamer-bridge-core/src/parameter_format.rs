//! Parameter value formatting and parsing.
//!
//! A [`Formatter`] turns a plain parameter value into the numeric part of a
//! display string and parses user input back. The unit label is metadata
//! and gets appended by [`ParameterTable::format`](crate::parameter_table::ParameterTable::format),
//! so formatters never print units themselves.
//!
//! # Example
//!
//! ```
//! use beamer_bridge_core::Formatter;
//!
//! assert_eq!(Formatter::Frequency.format(440.0, None), "440");
//! assert_eq!(Formatter::Frequency.format(1500.0, None), "1.50k");
//! assert_eq!(Formatter::Frequency.parse("1.5k", None), Some(1500.0));
//! ```

use serde::{Deserialize, Serialize};

/// Parameter value formatter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Formatter {
    /// Generic float with configurable precision (e.g., "1.23").
    Float {
        /// Number of decimal places.
        precision: usize,
    },

    /// Rounded integer (e.g., "-2").
    Integer,

    /// Frequency with automatic kilo scaling.
    ///
    /// Display: "44.0", "440", "1.50k"
    Frequency,

    /// Percentage. Input is 0.0-1.0, display is 0-100.
    Percent {
        /// Number of decimal places.
        precision: usize,
    },

    /// Enum label looked up by the rounded plain value.
    Enum,

    /// "On" above 0.5, "Off" otherwise.
    OnOff,
}

impl Formatter {
    /// Format a plain value.
    ///
    /// `labels` is only consulted by [`Formatter::Enum`]; an index outside
    /// the label list falls back to the integer.
    pub fn format(&self, value: f64, labels: Option<&[String]>) -> String {
        match self {
            Formatter::Float { precision } => {
                format!("{:.prec$}", value, prec = *precision)
            }

            Formatter::Integer => format!("{}", value.round() as i64),

            Formatter::Frequency => {
                if value >= 1000.0 {
                    format!("{:.2}k", value / 1000.0)
                } else if value >= 100.0 {
                    format!("{:.0}", value)
                } else {
                    format!("{:.1}", value)
                }
            }

            Formatter::Percent { precision } => {
                format!("{:.prec$}", value * 100.0, prec = *precision)
            }

            Formatter::Enum => {
                let index = value.round();
                labels
                    .filter(|_| index >= 0.0)
                    .and_then(|labels| labels.get(index as usize))
                    .cloned()
                    .unwrap_or_else(|| format!("{}", index as i64))
            }

            Formatter::OnOff => {
                if value > 0.5 {
                    "On".to_string()
                } else {
                    "Off".to_string()
                }
            }
        }
    }

    /// Parse user input to a plain value.
    ///
    /// The unit label must already be stripped. Returns `None` if the text
    /// cannot be parsed.
    pub fn parse(&self, s: &str, labels: Option<&[String]>) -> Option<f64> {
        let s = s.trim();

        match self {
            Formatter::Float { .. } | Formatter::Integer => s.parse().ok(),

            Formatter::Frequency => {
                if let Some(kilo) = s.strip_suffix('k').or_else(|| s.strip_suffix('K')) {
                    return kilo.trim().parse::<f64>().ok().map(|v| v * 1000.0);
                }
                s.parse().ok()
            }

            Formatter::Percent { .. } => {
                let trimmed = s.trim_end_matches('%').trim();
                trimmed.parse::<f64>().ok().map(|v| v / 100.0)
            }

            Formatter::Enum => labels
                .and_then(|labels| {
                    labels
                        .iter()
                        .position(|label| label.eq_ignore_ascii_case(s))
                })
                .map(|index| index as f64)
                .or_else(|| s.parse().ok()),

            Formatter::OnOff => match s.to_lowercase().as_str() {
                "on" | "true" | "yes" | "1" | "enabled" => Some(1.0),
                "off" | "false" | "no" | "0" | "disabled" => Some(0.0),
                _ => None,
            },
        }
    }
}

impl Default for Formatter {
    fn default() -> Self {
        Formatter::Float { precision: 2 }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_float_precision() {
        assert_eq!(Formatter::Float { precision: 1 }.format(1.2345, None), "1.2");
        assert_eq!(Formatter::default().format(0.5, None), "0.50");
    }

    #[test]
    fn test_frequency_scaling() {
        assert_eq!(Formatter::Frequency.format(44.0, None), "44.0");
        assert_eq!(Formatter::Frequency.format(440.0, None), "440");
        assert_eq!(Formatter::Frequency.format(1500.0, None), "1.50k");
        assert_eq!(Formatter::Frequency.parse("2k", None), Some(2000.0));
        assert_eq!(Formatter::Frequency.parse("880", None), Some(880.0));
    }

    #[test]
    fn test_percent() {
        let f = Formatter::Percent { precision: 0 };
        assert_eq!(f.format(0.75, None), "75");
        assert_eq!(f.parse("50%", None), Some(0.5));
    }

    #[test]
    fn test_enum_labels() {
        let labels = vec!["Sine".to_string(), "Saw".to_string()];
        assert_eq!(Formatter::Enum.format(1.0, Some(&labels)), "Saw");
        assert_eq!(Formatter::Enum.format(5.0, Some(&labels)), "5");
        assert_eq!(Formatter::Enum.parse("sine", Some(&labels)), Some(0.0));
        assert_eq!(Formatter::Enum.parse("1", Some(&labels)), Some(1.0));
        assert_eq!(Formatter::Enum.parse("Square", Some(&labels)), None);
    }

    #[test]
    fn test_on_off() {
        assert_eq!(Formatter::OnOff.format(0.5, None), "Off");
        assert_eq!(Formatter::OnOff.format(1.0, None), "On");
        assert_eq!(Formatter::OnOff.parse("Enabled", None), Some(1.0));
        assert_eq!(Formatter::OnOff.parse("maybe", None), None);
    }

    #[test]
    fn test_deserialize_tagged() {
        let f: Formatter = serde_json::from_str(r#"{"kind": "float", "precision": 3}"#).unwrap();
        assert_eq!(f, Formatter::Float { precision: 3 });
        let f: Formatter = serde_json::from_str(r#"{"kind": "onOff"}"#).unwrap();
        assert_eq!(f, Formatter::OnOff);
    }
}
