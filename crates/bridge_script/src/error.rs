use crate::argument::ArgumentState;
use crate::value::{ScriptObject, ScriptValue};
use bridge_core::{EncodingError, StorageError};
use thiserror::Error;

/// Failures while moving values across the bridge.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum MarshalError {
    #[error(transparent)]
    Encoding(#[from] EncodingError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("{value} cannot be represented as {target}")]
    ConversionOverflow { value: String, target: String },

    #[error("cannot unbox {found}: {reason}")]
    Unbox { found: String, reason: String },

    #[error("argument is {state}, expected {expected}")]
    InvalidState {
        state: ArgumentState,
        expected: &'static str,
    },
}

impl MarshalError {
    pub(crate) fn mismatch(expected: impl Into<String>, found: impl Into<String>) -> Self {
        MarshalError::TypeMismatch {
            expected: expected.into(),
            found: found.into(),
        }
    }

    pub(crate) fn overflow(value: impl ToString, target: impl Into<String>) -> Self {
        MarshalError::ConversionOverflow {
            value: value.to_string(),
            target: target.into(),
        }
    }

    pub(crate) fn unbox(found: impl Into<String>, reason: impl Into<String>) -> Self {
        MarshalError::Unbox {
            found: found.into(),
            reason: reason.into(),
        }
    }

    /// Stable name surfaced to scripts.
    pub fn exception_name(&self) -> &'static str {
        match self {
            MarshalError::Encoding(EncodingError::MalformedEncoding { .. }) => "MalformedEncoding",
            MarshalError::Encoding(EncodingError::UnregisteredStruct { .. }) => "UnregisteredStruct",
            MarshalError::Storage(StorageError::OutOfBounds { .. }) => "OutOfBounds",
            MarshalError::Storage(_) => "StorageError",
            MarshalError::TypeMismatch { .. } => "TypeMismatch",
            MarshalError::ConversionOverflow { .. } => "ConversionOverflow",
            MarshalError::Unbox { .. } => "UnboxError",
            MarshalError::InvalidState { .. } => "InvalidState",
        }
    }

    /// True when the same call can succeed once a struct gets registered.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            MarshalError::Encoding(EncodingError::UnregisteredStruct { .. })
        )
    }

    /// `{ name, message }` object handed to scripts.
    pub fn to_script_value(&self) -> ScriptValue {
        ScriptValue::Object(
            ScriptObject::new()
                .with("name", self.exception_name())
                .with("message", self.to_string()),
        )
    }
}
