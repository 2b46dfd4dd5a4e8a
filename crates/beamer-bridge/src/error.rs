//! Error types for the bridge transport.

use std::fmt;

/// Errors raised while decoding an inbound message.
///
/// These never reach the stores: the adapter logs them and drops the
/// message.
#[derive(Debug, Clone, PartialEq)]
pub enum TransportError {
    /// The message name is not part of the protocol.
    UnknownMessage(String),
    /// The message carried fewer arguments than its kind requires.
    MissingArgument {
        message: &'static str,
        index: usize,
    },
    /// An argument had the wrong type or an out-of-range value.
    InvalidArgument {
        message: &'static str,
        index: usize,
        expected: &'static str,
    },
    /// A binary payload was not valid base64.
    InvalidPayload(String),
    /// The declared byte length disagrees with the decoded payload.
    LengthMismatch { declared: usize, actual: usize },
    /// A JSON-carried message could not be parsed.
    Json(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownMessage(name) => write!(f, "Unknown message '{}'", name),
            Self::MissingArgument { message, index } => {
                write!(f, "{}: missing argument {}", message, index)
            }
            Self::InvalidArgument {
                message,
                index,
                expected,
            } => write!(f, "{}: argument {} must be {}", message, index, expected),
            Self::InvalidPayload(msg) => write!(f, "Invalid payload encoding: {}", msg),
            Self::LengthMismatch { declared, actual } => write!(
                f,
                "Payload length mismatch: declared {} bytes, got {}",
                declared, actual
            ),
            Self::Json(msg) => write!(f, "Invalid message JSON: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<base64::DecodeError> for TransportError {
    fn from(err: base64::DecodeError) -> Self {
        Self::InvalidPayload(err.to_string())
    }
}

impl From<serde_json::Error> for TransportError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        let err = TransportError::LengthMismatch {
            declared: 28,
            actual: 12,
        };
        assert_eq!(
            err.to_string(),
            "Payload length mismatch: declared 28 bytes, got 12"
        );

        let err = TransportError::InvalidArgument {
            message: "SPVFD",
            index: 1,
            expected: "a number",
        };
        assert_eq!(err.to_string(), "SPVFD: argument 1 must be a number");
    }
}
