//! Error type shared by every simulator boundary.

use thiserror::Error;

/// Category of a [`SimError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Wrong kind of argument entirely, e.g. a scalar where an array is required.
    Type,
    /// Wrong rank or mismatched lengths.
    Shape,
    /// Structurally valid but semantically invalid values.
    Value,
    /// Configuration that failed to parse or validate.
    Config,
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SimError {
    #[error("{argument}: expected {expected}")]
    Type {
        argument: &'static str,
        expected: &'static str,
    },
    #[error("{argument} shape mismatch: expected {expected}, got {got}")]
    Shape {
        argument: &'static str,
        expected: String,
        got: String,
    },
    #[error("invalid {argument}: {reason}")]
    Value {
        argument: &'static str,
        reason: String,
    },
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl SimError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SimError::Type { .. } => ErrorKind::Type,
            SimError::Shape { .. } => ErrorKind::Shape,
            SimError::Value { .. } => ErrorKind::Value,
            SimError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn shape(argument: &'static str, expected: impl Into<String>, got: &[usize]) -> Self {
        SimError::Shape {
            argument,
            expected: expected.into(),
            got: format!("{got:?}"),
        }
    }

    pub(crate) fn value(argument: &'static str, reason: impl Into<String>) -> Self {
        SimError::Value {
            argument,
            reason: reason.into(),
        }
    }
}

impl From<toml::de::Error> for SimError {
    fn from(err: toml::de::Error) -> Self {
        SimError::Config(err.to_string())
    }
}
