//! Context-scoped plaintext and ciphertext values.

use std::fmt;

use crate::backend::{Bfv, HomomorphicBackend};
use crate::context::ContextId;

/// Encoded value, usable only with the context that produced it.
pub struct Plaintext<B: HomomorphicBackend = Bfv> {
    context_id: ContextId,
    inner: B::Plaintext,
}

impl<B: HomomorphicBackend> Plaintext<B> {
    pub(crate) fn new(context_id: ContextId, inner: B::Plaintext) -> Self {
        Self { context_id, inner }
    }

    /// Context that produced this value.
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    pub(crate) fn inner(&self) -> &B::Plaintext {
        &self.inner
    }

    /// Coefficients, lowest degree first, with trailing zeros.
    pub fn coefficients(&self) -> &[u64] {
        self.inner.as_ref()
    }

    /// Index of the highest nonzero coefficient; `None` for the zero polynomial.
    pub fn significant_degree(&self) -> Option<usize> {
        self.coefficients().iter().rposition(|&c| c != 0)
    }
}

impl<B: HomomorphicBackend> Clone for Plaintext<B> {
    fn clone(&self) -> Self {
        Self {
            context_id: self.context_id,
            inner: self.inner.clone(),
        }
    }
}

impl<B: HomomorphicBackend> PartialEq for Plaintext<B> {
    fn eq(&self, other: &Self) -> bool {
        self.context_id == other.context_id && self.inner == other.inner
    }
}

impl<B: HomomorphicBackend> fmt::Debug for Plaintext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plaintext")
            .field("context_id", &self.context_id)
            .field("value", &format_args!("{self}"))
            .finish()
    }
}

/// Hexadecimal polynomial, highest degree first: `1x^2 + 3`, `240`, `0`.
impl<B: HomomorphicBackend> fmt::Display for Plaintext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let coeffs = self.coefficients();
        let Some(top) = self.significant_degree() else {
            return f.write_str("0");
        };
        let mut first = true;
        for k in (0..=top).rev().filter(|&k| coeffs[k] != 0) {
            if !first {
                f.write_str(" + ")?;
            }
            first = false;
            match k {
                0 => write!(f, "{:X}", coeffs[k])?,
                _ => write!(f, "{:X}x^{k}", coeffs[k])?,
            }
        }
        Ok(())
    }
}

/// Encrypted value. Its size grows with multiplicative depth.
pub struct Ciphertext<B: HomomorphicBackend = Bfv> {
    context_id: ContextId,
    size: usize,
    inner: B::Ciphertext,
}

impl<B: HomomorphicBackend> Ciphertext<B> {
    pub(crate) fn new(context_id: ContextId, backend: &B, inner: B::Ciphertext) -> Self {
        Self {
            context_id,
            size: backend.size(&inner),
            inner,
        }
    }

    /// Context that produced this value.
    pub fn context_id(&self) -> ContextId {
        self.context_id
    }

    /// Number of polynomial components.
    pub fn size(&self) -> usize {
        self.size
    }

    pub(crate) fn inner(&self) -> &B::Ciphertext {
        &self.inner
    }
}

impl<B: HomomorphicBackend> Clone for Ciphertext<B> {
    fn clone(&self) -> Self {
        Self {
            context_id: self.context_id,
            size: self.size,
            inner: self.inner.clone(),
        }
    }
}

impl<B: HomomorphicBackend> fmt::Debug for Ciphertext<B> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ciphertext")
            .field("context_id", &self.context_id)
            .field("size", &self.size)
            .finish_non_exhaustive()
    }
}
