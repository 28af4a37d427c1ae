//! Call-time errors of the codec binding.

use thiserror::Error;

use crate::native::{CodecVariant, CompressionLevel};

/// Error returned by a codec operation.
///
/// [`CodecError::Failed`] is the in-band soft failure: the native library
/// returned its `OODLELZ_FAILED` sentinel (0), or the binding refused a call
/// that would have let native code write past a caller buffer. Callers are
/// expected to handle it routinely (grow the buffer, reject the input).
/// Every other variant is a programmer error caught before the foreign call.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// Native call produced no output
    #[error("codec call failed")]
    Failed,

    /// Precondition violated before reaching native code
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A length does not fit the native 64-bit signed size type
    #[error("size {0} exceeds the native size range")]
    SizeOverflow(usize),

    /// The native library has no default options for this combination
    #[error("no default options for {variant} at level {level}")]
    NoDefaultOptions {
        /// Requested compressor
        variant: CodecVariant,
        /// Requested level
        level: CompressionLevel,
    },
}

impl CodecError {
    /// Whether this is the routine soft failure rather than misuse.
    pub fn is_soft_failure(&self) -> bool {
        matches!(self, Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_soft_failure_classification() {
        assert!(CodecError::Failed.is_soft_failure());
        assert!(!CodecError::InvalidArgument("empty").is_soft_failure());
        assert!(!CodecError::SizeOverflow(usize::MAX).is_soft_failure());
    }

    #[test]
    fn test_messages() {
        let err = CodecError::NoDefaultOptions {
            variant: CodecVariant::Invalid,
            level: CompressionLevel::Normal,
        };
        assert_eq!(
            err.to_string(),
            "no default options for invalid at level normal"
        );
    }
}
