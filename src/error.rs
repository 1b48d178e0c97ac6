//! Error kinds reported by every fallible operation.

use thiserror::Error;

/// Typed failures of the encrypted-evaluation pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BfvError {
    /// Parameters rejected before any context is built.
    #[error("Invalid parameters: {reason}")]
    InvalidParameters {
        /// Constraint that failed.
        reason: String,
    },

    /// Parameters that validated but fail the scheme's internal consistency checks.
    #[error("Unsupported parameters: {reason}")]
    UnsupportedParameters {
        /// Check that failed.
        reason: String,
    },

    /// Objects from two different contexts were combined.
    #[error("Context mismatch: {what} belongs to context {found}, expected context {expected}")]
    ContextMismatch {
        /// Kind of the foreign object.
        what: &'static str,
        /// Context of the receiving component.
        expected: u64,
        /// Context the object came from.
        found: u64,
    },

    /// Value not representable modulo the plaintext modulus.
    #[error("Value {value} is outside the representable range [0, {plaintext_modulus})")]
    EncodingRangeError {
        /// Rejected value.
        value: u64,
        /// Exclusive upper bound.
        plaintext_modulus: u64,
    },

    /// The secure random source could not be seeded during key generation.
    #[error("Key generation failed: {reason}")]
    KeyGenerationError {
        /// Underlying random source failure.
        reason: String,
    },

    /// The secure random source could not be seeded during encryption.
    #[error("Entropy unavailable: {reason}")]
    EntropyUnavailable {
        /// Underlying random source failure.
        reason: String,
    },

    /// The ciphertext has no noise budget left; decryption would be unreliable.
    #[error("Noise budget exhausted: ciphertext of size {size} has {budget} bits left")]
    NoiseBudgetExhausted {
        /// Ciphertext size.
        size: usize,
        /// Remaining budget, always 0 when returned by the decryptor.
        budget: u32,
    },
}

impl BfvError {
    /// `InvalidParameters` with `reason`.
    pub fn invalid(reason: impl Into<String>) -> Self {
        BfvError::InvalidParameters {
            reason: reason.into(),
        }
    }

    /// `UnsupportedParameters` with `reason`.
    pub fn unsupported(reason: impl Into<String>) -> Self {
        BfvError::UnsupportedParameters {
            reason: reason.into(),
        }
    }

    /// True when the computation exceeded the parameter set's capacity, as
    /// opposed to any kind of malformed input.
    pub fn is_budget_exhausted(&self) -> bool {
        matches!(self, BfvError::NoiseBudgetExhausted { .. })
    }
}

/// Result type alias for the pipeline.
pub type Result<T> = std::result::Result<T, BfvError>;
