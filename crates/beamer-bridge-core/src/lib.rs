//! # beamer-bridge-core
//!
//! Parameter metadata and normalization for the Beamer WebView bridge.
//!
//! This crate knows nothing about transports or stores. It answers one
//! question: how does a parameter's normalized value (0.0 to 1.0) relate to
//! its physical value and to the text shown next to a control.
//!
//! ## Main Types
//!
//! - [`ParameterMetadata`] - Range, shape, unit and labels of one parameter
//! - [`ParameterShape`] - Linear, power, exponential, stepped or boolean curve
//! - [`ParameterTable`] - Data-driven id to conversion table
//! - [`RangeMapper`] - Mapping trait implemented per shape
//! - [`Formatter`] - Display formatting and parsing
//! - [`MetadataError`] - Metadata validation errors

pub mod error;
pub mod parameter_format;
pub mod parameter_info;
pub mod parameter_range;
pub mod parameter_table;
pub mod types;

pub use error::{MetadataError, MetadataResult};
pub use parameter_format::Formatter;
pub use parameter_info::{ParameterMetadata, ParameterShape};
pub use parameter_range::{
    BooleanMapper, ExponentialMapper, LinearMapper, PowerMapper, RangeMapper, SteppedMapper,
};
pub use parameter_table::ParameterTable;
pub use types::{clamp_normalized, ControlTag, NormalizedValue, ParameterId, MAX_PARAMETER_COUNT};
