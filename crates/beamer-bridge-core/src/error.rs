//! Error types for parameter metadata.

use std::fmt;

use crate::types::ParameterId;

/// Errors raised while loading parameter metadata.
#[derive(Debug)]
pub enum MetadataError {
    /// The metadata document could not be parsed.
    Json(String),
    /// The range is not valid for the parameter's shape.
    InvalidRange {
        id: ParameterId,
        min: f64,
        max: f64,
        reason: &'static str,
    },
    /// The shape parameter (power exponent) is not usable.
    InvalidShapeParameter { id: ParameterId, value: f64 },
    /// An enum parameter declared no values.
    EmptyEnum(ParameterId),
    /// Two entries share the same id.
    DuplicateId(ParameterId),
    /// The id does not fit in a value store.
    IdOutOfRange { id: ParameterId, limit: usize },
}

impl fmt::Display for MetadataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Json(msg) => write!(f, "Invalid metadata document: {}", msg),
            Self::InvalidRange {
                id,
                min,
                max,
                reason,
            } => write!(
                f,
                "Parameter {}: invalid range {}..={} ({})",
                id, min, max, reason
            ),
            Self::InvalidShapeParameter { id, value } => {
                write!(f, "Parameter {}: invalid shape parameter {}", id, value)
            }
            Self::EmptyEnum(id) => write!(f, "Parameter {}: enum has no values", id),
            Self::DuplicateId(id) => write!(f, "Duplicate parameter id {}", id),
            Self::IdOutOfRange { id, limit } => {
                write!(f, "Parameter id {} out of range (limit {})", id, limit)
            }
        }
    }
}

impl std::error::Error for MetadataError {}

impl From<serde_json::Error> for MetadataError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type for metadata operations.
pub type MetadataResult<T> = Result<T, MetadataError>;
