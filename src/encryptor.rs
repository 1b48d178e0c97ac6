//! Public-key encryption.

use tracing::trace;

use crate::backend::{Bfv, HomomorphicBackend};
use crate::cipher::{Ciphertext, Plaintext};
use crate::context::CryptoContext;
use crate::error::{BfvError, Result};
use crate::keys::{fresh_rng, PublicKey};

/// Holds a public key; cannot decrypt.
#[derive(Debug)]
pub struct Encryptor<B: HomomorphicBackend = Bfv> {
    context: CryptoContext<B>,
    public_key: PublicKey<B>,
}

impl<B: HomomorphicBackend> Encryptor<B> {
    /// Fails on a public key from another context.
    pub fn new(context: &CryptoContext<B>, public_key: &PublicKey<B>) -> Result<Self> {
        context.id().expect_same(public_key.context_id(), "public key")?;
        Ok(Self {
            context: context.clone(),
            public_key: public_key.clone(),
        })
    }

    /// Fresh randomness is drawn for every call.
    pub fn encrypt(&self, plaintext: &Plaintext<B>) -> Result<Ciphertext<B>> {
        self.context
            .id()
            .expect_same(plaintext.context_id(), "plaintext")?;
        let mut rng = fresh_rng().map_err(|e| BfvError::EntropyUnavailable {
            reason: e.to_string(),
        })?;
        let backend = self.context.backend();
        let inner = backend.encrypt(plaintext.inner(), self.public_key.inner(), &mut rng);
        let ct = Ciphertext::new(self.context.id(), backend, inner);
        trace!(size = ct.size(), "encrypted");
        Ok(ct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::encoder::Encoder;
    use crate::keys::KeyGenerator;
    use crate::params::ParameterSet;

    #[test]
    fn test_rejects_foreign_public_key() {
        let params = ParameterSet::new(1024, 16).unwrap();
        let a: CryptoContext = CryptoContext::new(params.clone()).unwrap();
        let b: CryptoContext = CryptoContext::new(params).unwrap();
        let (_, keygen) = KeyGenerator::generate(&b).unwrap();
        let pk = keygen.create_public_key().unwrap();
        let err = Encryptor::new(&a, &pk).unwrap_err();
        assert!(matches!(err, BfvError::ContextMismatch { what: "public key", .. }));
    }

    #[test]
    fn test_rejects_foreign_plaintext() {
        let params = ParameterSet::new(1024, 16).unwrap();
        let a: CryptoContext = CryptoContext::new(params.clone()).unwrap();
        let b: CryptoContext = CryptoContext::new(params).unwrap();
        let (_, keygen) = KeyGenerator::generate(&a).unwrap();
        let encryptor = Encryptor::new(&a, &keygen.create_public_key().unwrap()).unwrap();
        let pt = Encoder::new(&b).encode(3).unwrap();
        let err = encryptor.encrypt(&pt).unwrap_err();
        assert!(matches!(err, BfvError::ContextMismatch { what: "plaintext", .. }));
    }

    #[test]
    fn test_fresh_ciphertexts_differ() {
        let ctx: CryptoContext = CryptoContext::new(ParameterSet::new(1024, 16).unwrap()).unwrap();
        let (_, keygen) = KeyGenerator::generate(&ctx).unwrap();
        let encryptor = Encryptor::new(&ctx, &keygen.create_public_key().unwrap()).unwrap();
        let pt = Encoder::new(&ctx).encode(7).unwrap();
        let a = encryptor.encrypt(&pt).unwrap();
        let b = encryptor.encrypt(&pt).unwrap();
        assert_eq!(a.size(), 2);
        assert_ne!(a.inner().parts(), b.inner().parts());
    }
}
