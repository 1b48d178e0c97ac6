//! Validated parameters bound to a backend instance and a unique identity.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::debug;

use crate::backend::arith::is_prime;
use crate::backend::{Bfv, HomomorphicBackend};
use crate::error::{BfvError, Result};
use crate::params::ParameterSet;

static NEXT_CONTEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of a [`CryptoContext`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContextId(u64);

impl ContextId {
    fn next() -> Self {
        ContextId(NEXT_CONTEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw identifier.
    pub fn get(self) -> u64 {
        self.0
    }

    /// `ContextMismatch` unless `self == found`.
    pub(crate) fn expect_same(self, found: ContextId, what: &'static str) -> Result<()> {
        if self == found {
            Ok(())
        } else {
            Err(BfvError::ContextMismatch {
                what,
                expected: self.0,
                found: found.0,
            })
        }
    }
}

impl fmt::Display for ContextId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

struct ContextInner<B> {
    id: ContextId,
    params: ParameterSet,
    backend: B,
}

/// Immutable, cheaply cloneable handle shared by every pipeline component.
pub struct CryptoContext<B: HomomorphicBackend = Bfv> {
    inner: Arc<ContextInner<B>>,
}

impl<B: HomomorphicBackend> Clone for CryptoContext<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<B: HomomorphicBackend> fmt::Debug for CryptoContext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CryptoContext")
            .field("id", &self.inner.id)
            .field("params", &self.inner.params)
            .finish_non_exhaustive()
    }
}

impl<B: HomomorphicBackend> CryptoContext<B> {
    /// Re-validates `params` and precomputes the backend tables.
    ///
    /// Structural problems are `InvalidParameters`; a chain that fails the
    /// backend's consistency checks is `UnsupportedParameters`.
    pub fn new(params: ParameterSet) -> Result<Self> {
        params.validate()?;
        let backend = B::from_parameters(&params)?;
        let id = ContextId::next();
        debug!(
            context = id.get(),
            ring_dimension = params.ring_dimension(),
            plaintext_modulus = params.plaintext_modulus(),
            max_noise_budget = backend.max_noise_budget(),
            "context created"
        );
        Ok(Self {
            inner: Arc::new(ContextInner {
                id,
                params,
                backend,
            }),
        })
    }

    /// Default 128-bit chain for `ring_dimension`, then [`CryptoContext::new`].
    ///
    /// ```
    /// use bfv_budget::CryptoContext;
    ///
    /// let context: CryptoContext = CryptoContext::from_dimensions(1024, 16)?;
    /// assert_eq!(context.max_noise_budget(), 12);
    /// # Ok::<(), bfv_budget::BfvError>(())
    /// ```
    pub fn from_dimensions(ring_dimension: usize, plaintext_modulus: u64) -> Result<Self> {
        Self::new(ParameterSet::new(ring_dimension, plaintext_modulus)?)
    }

    /// Whether `t` is a prime congruent to 1 mod 2n, which slot encoding needs.
    pub fn supports_batching(&self) -> bool {
        let t = self.plaintext_modulus();
        is_prime(t) && t % (2 * self.ring_dimension() as u64) == 1
    }

    /// Identity shared by every object built from this context.
    pub fn id(&self) -> ContextId {
        self.inner.id
    }

    /// Parameters this context was built from.
    pub fn params(&self) -> &ParameterSet {
        &self.inner.params
    }

    /// Primitives instance built for these parameters.
    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    /// Ring dimension `n`.
    pub fn ring_dimension(&self) -> usize {
        self.inner.params.ring_dimension()
    }

    /// Plaintext modulus `t`.
    pub fn plaintext_modulus(&self) -> u64 {
        self.inner.params.plaintext_modulus()
    }

    /// Budget of every fresh ciphertext in this context.
    pub fn max_noise_budget(&self) -> u32 {
        self.inner.backend.max_noise_budget()
    }
}
