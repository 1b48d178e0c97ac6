//! Decryption and noise budget measurement.

use tracing::warn;

use crate::backend::{Bfv, HomomorphicBackend};
use crate::cipher::{Ciphertext, Plaintext};
use crate::context::CryptoContext;
use crate::error::{BfvError, Result};
use crate::keys::SecretKey;

/// Owns the secret key; the only component able to decrypt.
#[derive(Debug)]
pub struct Decryptor<B: HomomorphicBackend = Bfv> {
    context: CryptoContext<B>,
    secret_key: SecretKey<B>,
}

impl<B: HomomorphicBackend> Decryptor<B> {
    /// Takes ownership of `secret_key`. Fails on a key from another context.
    pub fn new(context: &CryptoContext<B>, secret_key: SecretKey<B>) -> Result<Self> {
        context.id().expect_same(secret_key.context_id(), "secret key")?;
        Ok(Self {
            context: context.clone(),
            secret_key,
        })
    }

    /// Refuses with `NoiseBudgetExhausted` when the budget is 0.
    pub fn decrypt(&self, ct: &Ciphertext<B>) -> Result<Plaintext<B>> {
        let budget = self.invariant_noise_budget(ct)?;
        if budget == 0 {
            warn!(size = ct.size(), "decryption refused: noise budget exhausted");
            return Err(BfvError::NoiseBudgetExhausted {
                size: ct.size(),
                budget,
            });
        }
        self.decrypt_unchecked(ct)
    }

    /// Decrypts regardless of the budget. The result is garbage once the
    /// budget has reached 0.
    pub fn decrypt_unchecked(&self, ct: &Ciphertext<B>) -> Result<Plaintext<B>> {
        self.context.id().expect_same(ct.context_id(), "ciphertext")?;
        let inner = self
            .context
            .backend()
            .decrypt(ct.inner(), self.secret_key.inner());
        Ok(Plaintext::new(self.context.id(), inner))
    }

    /// Remaining budget in bits. Never increases along an evaluation chain.
    pub fn invariant_noise_budget(&self, ct: &Ciphertext<B>) -> Result<u32> {
        self.context.id().expect_same(ct.context_id(), "ciphertext")?;
        Ok(self
            .context
            .backend()
            .noise_budget(ct.inner(), self.secret_key.inner()))
    }

    /// Context this decryptor belongs to.
    pub fn context(&self) -> &CryptoContext<B> {
        &self.context
    }
}
