use thiserror::Error;

/// Errors produced while turning an encoded type string into a descriptor.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EncodingError {
    #[error("malformed type encoding '{encoding}' at offset {position}: {reason}")]
    MalformedEncoding {
        encoding: String,
        position: usize,
        reason: String,
    },

    /// The name is not known yet; the caller may retry after registering it.
    #[error("struct '{name}' is not registered")]
    UnregisteredStruct { name: String },
}

impl EncodingError {
    pub(crate) fn malformed(encoding: &str, position: usize, reason: impl Into<String>) -> Self {
        EncodingError::MalformedEncoding {
            encoding: encoding.to_string(),
            position,
            reason: reason.into(),
        }
    }
}
