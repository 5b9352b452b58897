//! Error types for the codec engine.
//!
//! Every variant is a contract violation: the call cannot produce meaningful
//! coefficients. A Newton iteration that runs out of budget is not an error,
//! see [`crate::mcep::Convergence`].

use mg_core::config::Floor;
use thiserror::Error;

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// Transform length is not a power of two at or above the engine minimum.
    #[error("fft size {size} is not a power of two >= {min}")]
    InvalidFftSize {
        /// Requested length.
        size: usize,
        /// Smallest length the transform accepts.
        min: usize,
    },

    /// A buffer does not have the length the operation requires.
    #[error("{what}: expected length {expected}, got {got}")]
    LengthMismatch {
        /// Which buffer.
        what: &'static str,
        expected: usize,
        got: usize,
    },

    /// A 2x2 pivot of the Toeplitz-plus-Hankel recursion fell under the tolerance.
    #[error("singular Toeplitz-plus-Hankel system at order {order}")]
    SingularSystem {
        /// Recursion order at which the pivot vanished.
        order: usize,
    },

    /// The periodogram has a bin that cannot be log-transformed.
    #[error("periodogram bin {bin} is {value}; set a floor to clamp it")]
    NonPositivePeriodogram { bin: usize, value: f64 },

    /// Floor value has the wrong sign for its mode.
    #[error("invalid floor {0:?}: add floor must be >= 0, relative dB floor must be < 0")]
    InvalidFloor(Floor),

    /// Parameter outside its domain.
    #[error("invalid parameter '{name}': {message}")]
    InvalidParameter {
        name: &'static str,
        message: String,
    },
}

impl CodecError {
    /// Creates an invalid parameter error.
    pub fn invalid_param(name: &'static str, message: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            message: message.into(),
        }
    }

    pub(crate) fn check_len(what: &'static str, expected: usize, got: usize) -> CodecResult<()> {
        if expected == got {
            Ok(())
        } else {
            Err(Self::LengthMismatch {
                what,
                expected,
                got,
            })
        }
    }
}
