//! Primitives library behind the protocol layer.
//!
//! [`HomomorphicBackend`] is the capability interface the pipeline needs;
//! [`Bfv`] implements it with RNS polynomials and a negacyclic NTT.

/// Word-sized modular arithmetic and prime search.
pub mod arith;
mod bfv;
/// Noise growth estimates.
pub mod noise;
/// Negacyclic number-theoretic transform.
pub mod ntt;
/// RNS polynomials.
pub mod poly;
/// CRT bases.
pub mod rns;

use std::fmt;

use rand::{CryptoRng, RngCore};

use crate::error::Result;
use crate::params::ParameterSet;

pub use bfv::{Bfv, BfvCiphertext, BfvPlaintext, BfvPublicKey, BfvSecretKey};

/// Capability interface: encode, encrypt, evaluate, decrypt, measure.
///
/// Implementations trust their inputs: context matching, range checks and the
/// budget precondition are enforced by the protocol layer.
pub trait HomomorphicBackend: Sized + Send + Sync + 'static {
    /// Coefficients in `[0, t)`, lowest degree first.
    type Plaintext: Clone + fmt::Debug + PartialEq + AsRef<[u64]> + Send + Sync;
    /// Ordered polynomial components; the size is their count.
    type Ciphertext: Clone + fmt::Debug + Send + Sync;
    /// Decryption key. Implementations should wipe it on drop.
    type SecretKey: Send + Sync;
    /// Encryption key.
    type PublicKey: Clone + Send + Sync;

    /// Runs the consistency checks and precomputes every table.
    fn from_parameters(params: &ParameterSet) -> Result<Self>;

    /// Ring dimension `n`.
    fn degree(&self) -> usize;

    /// Plaintext modulus `t`.
    fn plaintext_modulus(&self) -> u64;

    /// Budget of every fresh encryption under these parameters.
    fn max_noise_budget(&self) -> u32;

    /// `coeffs` are already reduced below the plaintext modulus and at most
    /// `degree()` long.
    fn encode(&self, coeffs: &[u64]) -> Self::Plaintext;

    /// All `degree()` coefficients, lowest first.
    fn decode(&self, plaintext: &Self::Plaintext) -> Vec<u64> {
        plaintext.as_ref().to_vec()
    }

    /// Samples a fresh secret key.
    fn generate_secret_key<R: RngCore + CryptoRng>(&self, rng: &mut R) -> Self::SecretKey;

    /// Any number of public keys may share one secret key.
    fn generate_public_key<R: RngCore + CryptoRng>(
        &self,
        secret_key: &Self::SecretKey,
        rng: &mut R,
    ) -> Self::PublicKey;

    /// Public-key encryption of an encoded plaintext.
    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &Self::Plaintext,
        public_key: &Self::PublicKey,
        rng: &mut R,
    ) -> Self::Ciphertext;

    /// Result size is the larger operand size.
    fn add(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Self::Ciphertext;

    /// `a − b`; size as for [`add`](Self::add).
    fn sub(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Self::Ciphertext;

    /// Additive inverse.
    fn negate(&self, a: &Self::Ciphertext) -> Self::Ciphertext;

    /// Fails only if no auxiliary basis wide enough for the operands exists.
    fn multiply(&self, a: &Self::Ciphertext, b: &Self::Ciphertext) -> Result<Self::Ciphertext>;

    /// `a · a`.
    fn square(&self, a: &Self::Ciphertext) -> Result<Self::Ciphertext> {
        self.multiply(a, a)
    }

    /// Size is unchanged.
    fn multiply_plain(&self, a: &Self::Ciphertext, p: &Self::Plaintext) -> Self::Ciphertext;

    /// Size is unchanged.
    fn add_plain(&self, a: &Self::Ciphertext, p: &Self::Plaintext) -> Self::Ciphertext;

    /// Unconditional; correct only while the budget is positive.
    fn decrypt(&self, ct: &Self::Ciphertext, secret_key: &Self::SecretKey) -> Self::Plaintext;

    /// Invariant noise budget in bits; 0 means decryption is unreliable.
    fn noise_budget(&self, ct: &Self::Ciphertext, secret_key: &Self::SecretKey) -> u32;

    /// Number of polynomial components.
    fn size(&self, ct: &Self::Ciphertext) -> usize;
}
