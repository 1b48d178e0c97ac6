//! Homomorphic arithmetic on ciphertexts.
//!
//! The evaluator never refuses an operation because the noise budget is low.
//! Callers sample the budget and stop chaining before decryption.

use tracing::trace;

use crate::backend::{Bfv, HomomorphicBackend};
use crate::cipher::{Ciphertext, Plaintext};
use crate::context::CryptoContext;
use crate::error::Result;

/// Stateless apart from its context; any number may run concurrently.
#[derive(Debug)]
pub struct Evaluator<B: HomomorphicBackend = Bfv> {
    context: CryptoContext<B>,
}

impl<B: HomomorphicBackend> Clone for Evaluator<B> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<B: HomomorphicBackend> Evaluator<B> {
    /// Evaluator bound to `context`.
    pub fn new(context: &CryptoContext<B>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    fn check(&self, ct: &Ciphertext<B>) -> Result<()> {
        self.context.id().expect_same(ct.context_id(), "ciphertext")
    }

    fn check_plain(&self, pt: &Plaintext<B>) -> Result<()> {
        self.context.id().expect_same(pt.context_id(), "plaintext")
    }

    fn wrap(&self, op: &'static str, inner: B::Ciphertext) -> Ciphertext<B> {
        let ct = Ciphertext::new(self.context.id(), self.context.backend(), inner);
        trace!(op, size = ct.size(), "evaluated");
        ct
    }

    /// Size of the result is `max(size(a), size(b))`.
    pub fn add(&self, a: &Ciphertext<B>, b: &Ciphertext<B>) -> Result<Ciphertext<B>> {
        self.check(a)?;
        self.check(b)?;
        let inner = self.context.backend().add(a.inner(), b.inner());
        Ok(self.wrap("add", inner))
    }

    /// `a − b`, sized as [`add`](Self::add).
    pub fn sub(&self, a: &Ciphertext<B>, b: &Ciphertext<B>) -> Result<Ciphertext<B>> {
        self.check(a)?;
        self.check(b)?;
        let inner = self.context.backend().sub(a.inner(), b.inner());
        Ok(self.wrap("sub", inner))
    }

    /// Size is unchanged.
    pub fn negate(&self, a: &Ciphertext<B>) -> Result<Ciphertext<B>> {
        self.check(a)?;
        let inner = self.context.backend().negate(a.inner());
        Ok(self.wrap("negate", inner))
    }

    /// No relinearization: the result has `size(a) + size(b) − 1` parts.
    pub fn multiply(&self, a: &Ciphertext<B>, b: &Ciphertext<B>) -> Result<Ciphertext<B>> {
        self.check(a)?;
        self.check(b)?;
        let inner = self.context.backend().multiply(a.inner(), b.inner())?;
        Ok(self.wrap("multiply", inner))
    }

    /// The result has `2·size(a) − 1` parts.
    pub fn square(&self, a: &Ciphertext<B>) -> Result<Ciphertext<B>> {
        self.check(a)?;
        let inner = self.context.backend().square(a.inner())?;
        Ok(self.wrap("square", inner))
    }

    /// Size is unchanged.
    pub fn multiply_plain(&self, a: &Ciphertext<B>, p: &Plaintext<B>) -> Result<Ciphertext<B>> {
        self.check(a)?;
        self.check_plain(p)?;
        let inner = self.context.backend().multiply_plain(a.inner(), p.inner());
        Ok(self.wrap("multiply_plain", inner))
    }

    /// Size is unchanged.
    pub fn add_plain(&self, a: &Ciphertext<B>, p: &Plaintext<B>) -> Result<Ciphertext<B>> {
        self.check(a)?;
        self.check_plain(p)?;
        let inner = self.context.backend().add_plain(a.inner(), p.inner());
        Ok(self.wrap("add_plain", inner))
    }
}
