//! Error type shared by the special functions, bit-plane extraction and tests.

use thiserror::Error;

/// Broad category of a [`TestError`], independent of batch wrapping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// A precondition on the inputs was violated.
    InvalidArgument,
    /// A numeric routine failed to converge or hit a zero denominator.
    Numerical,
}

/// Failure raised by any engine operation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TestError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("numerical error: {0}")]
    Numerical(String),

    /// A per-bit batch failed; `bit` is the lowest failing bit index.
    #[error("bit {bit}: {source}")]
    AtBit {
        bit: usize,
        #[source]
        source: Box<TestError>,
    },
}

impl TestError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidArgument(msg.into())
    }

    pub(crate) fn numerical(msg: impl Into<String>) -> Self {
        Self::Numerical(msg.into())
    }

    pub(crate) fn at_bit(self, bit: usize) -> Self {
        Self::AtBit {
            bit,
            source: Box::new(self),
        }
    }

    /// Category of the underlying failure, looking through [`TestError::AtBit`].
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidArgument(_) => ErrorKind::InvalidArgument,
            Self::Numerical(_) => ErrorKind::Numerical,
            Self::AtBit { source, .. } => source.kind(),
        }
    }

    /// Bit index the failure is attributed to, if it came from a batch run.
    pub fn bit(&self) -> Option<usize> {
        match self {
            Self::AtBit { bit, .. } => Some(*bit),
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, TestError>;
