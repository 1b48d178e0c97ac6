//! Integers, coefficient vectors and slot vectors to and from plaintexts.

use tracing::debug;

use crate::backend::ntt::NttTable;
use crate::backend::{Bfv, HomomorphicBackend};
use crate::cipher::Plaintext;
use crate::context::CryptoContext;
use crate::error::{BfvError, Result};

/// Encodes values as constant (or explicit) polynomials modulo `t`.
#[derive(Debug)]
pub struct Encoder<B: HomomorphicBackend = Bfv> {
    context: CryptoContext<B>,
}

impl<B: HomomorphicBackend> Clone for Encoder<B> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
        }
    }
}

impl<B: HomomorphicBackend> Encoder<B> {
    /// Encoder bound to `context`.
    pub fn new(context: &CryptoContext<B>) -> Self {
        Self {
            context: context.clone(),
        }
    }

    /// `value` as the constant term. Fails with `EncodingRangeError` unless
    /// `value < t`.
    pub fn encode(&self, value: u64) -> Result<Plaintext<B>> {
        self.encode_coefficients(&[value])
    }

    /// Constant term of `plaintext`.
    pub fn decode(&self, plaintext: &Plaintext<B>) -> Result<u64> {
        self.context
            .id()
            .expect_same(plaintext.context_id(), "plaintext")?;
        Ok(plaintext.coefficients().first().copied().unwrap_or(0))
    }

    /// Polynomial plaintext, lowest degree first.
    pub fn encode_coefficients(&self, coeffs: &[u64]) -> Result<Plaintext<B>> {
        let t = self.context.plaintext_modulus();
        let n = self.context.ring_dimension();
        if coeffs.len() > n {
            return Err(BfvError::invalid(format!(
                "{} coefficients do not fit ring dimension {n}",
                coeffs.len()
            )));
        }
        if let Some(&value) = coeffs.iter().find(|&&c| c >= t) {
            return Err(BfvError::EncodingRangeError {
                value,
                plaintext_modulus: t,
            });
        }
        let inner = self.context.backend().encode(coeffs);
        Ok(Plaintext::new(self.context.id(), inner))
    }

    /// All `n` coefficients, lowest degree first.
    pub fn decode_coefficients(&self, plaintext: &Plaintext<B>) -> Result<Vec<u64>> {
        self.context
            .id()
            .expect_same(plaintext.context_id(), "plaintext")?;
        Ok(self.context.backend().decode(plaintext.inner()))
    }
}

/// Packs up to `n` values modulo `t` into one plaintext, one per slot.
///
/// Slots are the evaluations of the plaintext polynomial at the primitive
/// 2n-th roots of unity modulo `t`, so ciphertext additions and
/// multiplications act slot by slot. Needs a prime `t ≡ 1 (mod 2n)`.
#[derive(Debug)]
pub struct BatchEncoder<B: HomomorphicBackend = Bfv> {
    context: CryptoContext<B>,
    slots: NttTable,
}

impl<B: HomomorphicBackend> Clone for BatchEncoder<B> {
    fn clone(&self) -> Self {
        Self {
            context: self.context.clone(),
            slots: self.slots.clone(),
        }
    }
}

impl<B: HomomorphicBackend> BatchEncoder<B> {
    /// `UnsupportedParameters` unless the context's plaintext modulus allows batching.
    pub fn new(context: &CryptoContext<B>) -> Result<Self> {
        let t = context.plaintext_modulus();
        let n = context.ring_dimension();
        let unsupported = || {
            BfvError::unsupported(format!(
                "plaintext modulus {t} is not a prime congruent to 1 mod {}",
                2 * n
            ))
        };
        if !context.supports_batching() {
            return Err(unsupported());
        }
        let slots = NttTable::new(t, n).ok_or_else(unsupported)?;
        debug!(context = context.id().get(), slot_count = n, "batch encoder ready");
        Ok(Self {
            context: context.clone(),
            slots,
        })
    }

    /// Number of slots, equal to the ring dimension.
    pub fn slot_count(&self) -> usize {
        self.context.ring_dimension()
    }

    /// Missing trailing slots are 0.
    pub fn encode(&self, values: &[u64]) -> Result<Plaintext<B>> {
        let t = self.context.plaintext_modulus();
        let n = self.slot_count();
        if values.len() > n {
            return Err(BfvError::invalid(format!(
                "{} values do not fit {n} slots",
                values.len()
            )));
        }
        if let Some(&value) = values.iter().find(|&&v| v >= t) {
            return Err(BfvError::EncodingRangeError {
                value,
                plaintext_modulus: t,
            });
        }
        let mut coeffs = vec![0; n];
        coeffs[..values.len()].copy_from_slice(values);
        self.slots.inverse(&mut coeffs);
        let inner = self.context.backend().encode(&coeffs);
        Ok(Plaintext::new(self.context.id(), inner))
    }

    /// All `n` slots.
    pub fn decode(&self, plaintext: &Plaintext<B>) -> Result<Vec<u64>> {
        self.context
            .id()
            .expect_same(plaintext.context_id(), "plaintext")?;
        let mut values = self.context.backend().decode(plaintext.inner());
        values.resize(self.slot_count(), 0);
        self.slots.forward(&mut values);
        Ok(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::ParameterSet;

    fn encoder(t: u64) -> Encoder {
        let ctx = CryptoContext::new(ParameterSet::new(1024, t).unwrap()).unwrap();
        Encoder::new(&ctx)
    }

    #[test]
    fn test_encode_decode() {
        let enc = encoder(1024);
        for v in [0, 1, 576, 1023] {
            let pt = enc.encode(v).unwrap();
            assert_eq!(enc.decode(&pt).unwrap(), v);
        }
    }

    #[test]
    fn test_out_of_range() {
        let enc = encoder(1024);
        assert_eq!(
            enc.encode(1024).unwrap_err(),
            BfvError::EncodingRangeError {
                value: 1024,
                plaintext_modulus: 1024
            }
        );
        assert!(enc.encode_coefficients(&[1, 2, 5000]).is_err());
        assert!(enc.encode_coefficients(&vec![0; 1025]).is_err());
    }

    #[test]
    fn test_coefficients_roundtrip() {
        let enc = encoder(16);
        let pt = enc.encode_coefficients(&[3, 0, 15]).unwrap();
        let coeffs = enc.decode_coefficients(&pt).unwrap();
        assert_eq!(coeffs.len(), 1024);
        assert_eq!(&coeffs[..4], &[3, 0, 15, 0]);
    }

    #[test]
    fn test_foreign_plaintext_rejected() {
        let a = encoder(16);
        let b = encoder(16);
        let pt = a.encode(5).unwrap();
        let err = b.decode(&pt).unwrap_err();
        assert!(matches!(err, BfvError::ContextMismatch { what: "plaintext", .. }));
    }

    fn batch_encoder(t: u64) -> Result<BatchEncoder> {
        let ctx = CryptoContext::new(ParameterSet::new(4096, t).unwrap()).unwrap();
        BatchEncoder::new(&ctx)
    }

    #[test]
    fn test_batch_roundtrip() {
        let enc = batch_encoder(40961).unwrap();
        assert_eq!(enc.slot_count(), 4096);
        let values: Vec<u64> = (0..4096).map(|i| (i * i + 7) % 40961).collect();
        let pt = enc.encode(&values).unwrap();
        // slot values are spread over every coefficient
        assert!(pt.significant_degree().unwrap() > 0);
        assert_eq!(enc.decode(&pt).unwrap(), values);

        let short = enc.encode(&[5, 6]).unwrap();
        let slots = enc.decode(&short).unwrap();
        assert_eq!(&slots[..3], &[5, 6, 0]);
    }

    #[test]
    fn test_batch_constant_is_constant_polynomial() {
        let enc = batch_encoder(40961).unwrap();
        let pt = enc.encode(&vec![9; 4096]).unwrap();
        assert_eq!(pt.significant_degree(), Some(0));
        assert_eq!(pt.coefficients()[0], 9);
    }

    #[test]
    fn test_batch_rejects_unfriendly_modulus() {
        for t in [1024, 257, 12289] {
            let err = batch_encoder(t).unwrap_err();
            assert!(matches!(err, BfvError::UnsupportedParameters { .. }), "t = {t}");
        }
        let enc = batch_encoder(40961).unwrap();
        assert!(matches!(
            enc.encode(&[40961]).unwrap_err(),
            BfvError::EncodingRangeError { value: 40961, .. }
        ));
        assert!(enc.encode(&vec![0; 4097]).is_err());
    }
}
