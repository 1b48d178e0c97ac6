//! BFV encrypted evaluation with noise budget accounting.
//!
//! ```no_run
//! use bfv_budget::{
//!     CryptoContext, Decryptor, Encoder, Encryptor, Evaluator, KeyGenerator, ParameterSet,
//! };
//!
//! # fn main() -> bfv_budget::Result<()> {
//! let context: CryptoContext = CryptoContext::new(ParameterSet::new(4096, 1024)?)?;
//! let (secret_key, keygen) = KeyGenerator::generate(&context)?;
//! let encryptor = Encryptor::new(&context, &keygen.create_public_key()?)?;
//! let decryptor = Decryptor::new(&context, secret_key)?;
//! let encoder = Encoder::new(&context);
//! let evaluator = Evaluator::new(&context);
//!
//! let x = encryptor.encrypt(&encoder.encode(4)?)?;
//! let x2 = evaluator.square(&x)?;
//! assert!(decryptor.invariant_noise_budget(&x2)? > 0);
//! assert_eq!(encoder.decode(&decryptor.decrypt(&x2)?)?, 16);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(clippy::pedantic, missing_docs)]

pub mod backend;
pub mod cipher;
pub mod context;
pub mod decryptor;
pub mod encoder;
pub mod encryptor;
pub mod error;
pub mod evaluator;
pub mod keys;
pub mod params;
pub mod tracker;

pub use backend::{Bfv, HomomorphicBackend};
pub use cipher::{Ciphertext, Plaintext};
pub use context::{ContextId, CryptoContext};
pub use decryptor::Decryptor;
pub use encoder::{BatchEncoder, Encoder};
pub use encryptor::Encryptor;
pub use error::{BfvError, Result};
pub use evaluator::Evaluator;
pub use keys::{KeyGenerator, PublicKey, SecretKey};
pub use params::{ParameterSet, SecurityLevel};
pub use tracker::{EvaluationTrace, NoiseBudgetTracker, Operation, TraceRecord};
