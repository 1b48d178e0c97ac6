//! Key material: one secret key per generation, any number of public keys.

use std::fmt;
use std::sync::Arc;

use rand::rngs::OsRng;
use rand::SeedableRng;
use rand_chacha::ChaCha20Rng;
use tracing::debug;

use crate::backend::{Bfv, HomomorphicBackend};
use crate::context::{ContextId, CryptoContext};
use crate::error::{BfvError, Result};

/// A ChaCha20 stream seeded from the OS for a single operation.
pub(crate) fn fresh_rng() -> std::result::Result<ChaCha20Rng, rand::Error> {
    ChaCha20Rng::from_rng(OsRng)
}

/// Decryption capability. Deliberately not `Clone`; the backend wipes the
/// key material when the last handle is dropped.
pub struct SecretKey<B: HomomorphicBackend = Bfv> {
    context_id: ContextId,
    inner: Arc<B::SecretKey>,
}

impl<B: HomomorphicBackend> SecretKey<B> {
    /// Context that produced this value.
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub(crate) fn inner(&self) -> &B::SecretKey {
        &self.inner
    }
}

impl<B: HomomorphicBackend> fmt::Debug for SecretKey<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretKey")
            .field("context_id", &self.context_id)
            .finish_non_exhaustive()
    }
}

/// Encryption key; freely cloned and shared.
pub struct PublicKey<B: HomomorphicBackend = Bfv> {
    context_id: ContextId,
    inner: B::PublicKey,
}

impl<B: HomomorphicBackend> PublicKey<B> {
    /// Context that produced this value.
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub(crate) fn inner(&self) -> &B::PublicKey {
        &self.inner
    }
}

impl<B: HomomorphicBackend> Clone for PublicKey<B> {
    fn clone(&self) -> Self {
        Self {
            context_id: self.context_id,
            inner: self.inner.clone(),
        }
    }
}

impl<B: HomomorphicBackend> fmt::Debug for PublicKey<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublicKey")
            .field("context_id", &self.context_id)
            .finish_non_exhaustive()
    }
}

/// Handle that mints public keys for the secret key it was generated with.
pub struct KeyGenerator<B: HomomorphicBackend = Bfv> {
    context: CryptoContext<B>,
    secret: Arc<B::SecretKey>,
}

impl<B: HomomorphicBackend> fmt::Debug for KeyGenerator<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyGenerator")
            .field("context_id", &self.context.id())
            .finish_non_exhaustive()
    }
}

impl<B: HomomorphicBackend> KeyGenerator<B> {
    /// Samples a fresh secret key from OS-seeded randomness.
    pub fn generate(context: &CryptoContext<B>) -> Result<(SecretKey<B>, Self)> {
        let mut rng = fresh_rng().map_err(|e| BfvError::KeyGenerationError {
            reason: e.to_string(),
        })?;
        let secret = Arc::new(context.backend().generate_secret_key(&mut rng));
        debug!(context = context.id().get(), "secret key generated");
        let secret_key = SecretKey {
            context_id: context.id(),
            inner: Arc::clone(&secret),
        };
        let generator = Self {
            context: context.clone(),
            secret,
        };
        Ok((secret_key, generator))
    }

    /// Independent public key for the same secret key.
    pub fn create_public_key(&self) -> Result<PublicKey<B>> {
        let mut rng = fresh_rng().map_err(|e| BfvError::KeyGenerationError {
            reason: e.to_string(),
        })?;
        let inner = self
            .context
            .backend()
            .generate_public_key(&self.secret, &mut rng);
        debug!(context = self.context.id().get(), "public key created");
        Ok(PublicKey {
            context_id: self.context.id(),
            inner,
        })
    }

    pub fn context(&self) -> &CryptoContext<B> {
        &self.context
    }
}
