//! Structural scheme parameters: ring dimension, modulus chain, plaintext modulus.

use num_bigint::BigUint;
use serde::{Deserialize, Serialize};

use crate::backend::arith::{bit_length, largest_ntt_prime, MAX_PRIME_BITS};
use crate::error::{BfvError, Result};

/// Ring dimensions with a known security bound.
pub const SUPPORTED_RING_DIMENSIONS: [usize; 6] = [1024, 2048, 4096, 8192, 16384, 32768];

/// Widest accepted plaintext modulus.
pub const MAX_PLAINTEXT_BITS: u32 = 60;

/// Classical security target, bounding the total modulus chain width.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SecurityLevel {
    /// 128-bit classical security.
    #[default]
    Tc128,
    /// 192-bit classical security.
    Tc192,
    /// 256-bit classical security.
    Tc256,
}

impl SecurityLevel {
    /// Nominal security in bits.
    pub fn bits(self) -> u32 {
        match self {
            SecurityLevel::Tc128 => 128,
            SecurityLevel::Tc192 => 192,
            SecurityLevel::Tc256 => 256,
        }
    }

    /// Largest total modulus bit count that keeps this level for `ring_dimension`.
    pub fn max_modulus_bits(self, ring_dimension: usize) -> Option<u64> {
        let idx = SUPPORTED_RING_DIMENSIONS
            .iter()
            .position(|&n| n == ring_dimension)?;
        let table: [u64; 6] = match self {
            SecurityLevel::Tc128 => [27, 54, 109, 218, 438, 881],
            SecurityLevel::Tc192 => [19, 37, 75, 152, 305, 611],
            SecurityLevel::Tc256 => [14, 29, 58, 118, 237, 476],
        };
        Some(table[idx])
    }

    /// Default prime widths for `ring_dimension`.
    pub fn default_chain_bits(self, ring_dimension: usize) -> Option<Vec<u32>> {
        let bits = match (self, ring_dimension) {
            (SecurityLevel::Tc128, 1024) => vec![27],
            (SecurityLevel::Tc128, 2048) => vec![54],
            (SecurityLevel::Tc128, 4096) => vec![36, 36, 37],
            (SecurityLevel::Tc128, 8192) => vec![43, 43, 44, 44, 44],
            (SecurityLevel::Tc128, 16384) => vec![48, 48, 48, 49, 49, 49, 49, 49, 49],
            (SecurityLevel::Tc128, 32768) => vec![55; 16],
            (SecurityLevel::Tc192, 1024) => vec![19],
            (SecurityLevel::Tc192, 2048) => vec![37],
            (SecurityLevel::Tc192, 4096) => vec![25, 25, 25],
            (SecurityLevel::Tc192, 8192) => vec![38, 38, 38, 38],
            (SecurityLevel::Tc192, 16384) => vec![51, 51, 51, 51, 51, 50],
            (SecurityLevel::Tc192, 32768) => [vec![55; 9], vec![56; 2]].concat(),
            (SecurityLevel::Tc256, 1024) => vec![14],
            (SecurityLevel::Tc256, 2048) => vec![29],
            (SecurityLevel::Tc256, 4096) => vec![58],
            (SecurityLevel::Tc256, 8192) => vec![59, 59],
            (SecurityLevel::Tc256, 16384) => vec![47, 47, 47, 48, 48],
            (SecurityLevel::Tc256, 32768) => vec![59; 8],
            _ => return None,
        };
        Some(bits)
    }
}

/// Validated, immutable scheme parameters.
///
/// Deserialization goes through [`ParameterSet::with_modulus_chain`], so a
/// decoded value has passed the same checks as a constructed one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawParameterSet")]
pub struct ParameterSet {
    ring_dimension: usize,
    modulus_chain: Vec<u64>,
    plaintext_modulus: u64,
    security_level: SecurityLevel,
}

/// Wire form of [`ParameterSet`] before validation.
#[derive(Deserialize)]
struct RawParameterSet {
    ring_dimension: usize,
    modulus_chain: Vec<u64>,
    plaintext_modulus: u64,
    #[serde(default)]
    security_level: SecurityLevel,
}

impl TryFrom<RawParameterSet> for ParameterSet {
    type Error = BfvError;

    fn try_from(raw: RawParameterSet) -> Result<Self> {
        Self::with_modulus_chain(
            raw.ring_dimension,
            raw.plaintext_modulus,
            raw.modulus_chain,
            raw.security_level,
        )
    }
}

impl ParameterSet {
    /// Default 128-bit chain for `ring_dimension`.
    pub fn new(ring_dimension: usize, plaintext_modulus: u64) -> Result<Self> {
        Self::with_security_level(ring_dimension, plaintext_modulus, SecurityLevel::default())
    }

    /// Default chain for the given security level.
    pub fn with_security_level(
        ring_dimension: usize,
        plaintext_modulus: u64,
        security_level: SecurityLevel,
    ) -> Result<Self> {
        check_ring_dimension(ring_dimension)?;
        let bits = security_level
            .default_chain_bits(ring_dimension)
            .ok_or_else(|| {
                BfvError::invalid(format!(
                    "no default modulus chain for ring dimension {ring_dimension} at {} bits",
                    security_level.bits()
                ))
            })?;
        Self::with_modulus_bits(ring_dimension, plaintext_modulus, &bits, security_level)
    }

    /// Chain of the largest NTT-friendly primes with the requested widths.
    pub fn with_modulus_bits(
        ring_dimension: usize,
        plaintext_modulus: u64,
        bit_sizes: &[u32],
        security_level: SecurityLevel,
    ) -> Result<Self> {
        check_ring_dimension(ring_dimension)?;
        if bit_sizes.is_empty() {
            return Err(BfvError::invalid("modulus chain is empty"));
        }
        let mut chain: Vec<u64> = Vec::with_capacity(bit_sizes.len());
        for &bits in bit_sizes {
            if bits > MAX_PRIME_BITS {
                return Err(BfvError::invalid(format!(
                    "modulus width {bits} exceeds {MAX_PRIME_BITS} bits"
                )));
            }
            let prime = largest_ntt_prime(bits, ring_dimension, &chain).ok_or_else(|| {
                BfvError::invalid(format!(
                    "no {bits}-bit prime congruent to 1 mod {} is available",
                    2 * ring_dimension
                ))
            })?;
            chain.push(prime);
        }
        Self::with_modulus_chain(ring_dimension, plaintext_modulus, chain, security_level)
    }

    /// Explicit chain. Prime and NTT checks happen when the context is built.
    pub fn with_modulus_chain(
        ring_dimension: usize,
        plaintext_modulus: u64,
        modulus_chain: Vec<u64>,
        security_level: SecurityLevel,
    ) -> Result<Self> {
        let params = Self {
            ring_dimension,
            modulus_chain,
            plaintext_modulus,
            security_level,
        };
        params.validate()?;
        Ok(params)
    }

    /// Largest `bits`-wide prime `t ≡ 1 (mod 2n)`, a plaintext modulus that
    /// allows slot encoding.
    pub fn batching_modulus(ring_dimension: usize, bits: u32) -> Result<u64> {
        check_ring_dimension(ring_dimension)?;
        if bits > MAX_PLAINTEXT_BITS {
            return Err(BfvError::invalid(format!(
                "plaintext modulus width {bits} exceeds {MAX_PLAINTEXT_BITS} bits"
            )));
        }
        largest_ntt_prime(bits, ring_dimension, &[]).ok_or_else(|| {
            BfvError::invalid(format!(
                "no {bits}-bit prime congruent to 1 mod {} is available",
                2 * ring_dimension
            ))
        })
    }

    /// Structural checks shared by every constructor.
    pub fn validate(&self) -> Result<()> {
        check_ring_dimension(self.ring_dimension)?;
        if self.plaintext_modulus <= 1 {
            return Err(BfvError::invalid(format!(
                "plaintext modulus must be greater than 1, got {}",
                self.plaintext_modulus
            )));
        }
        if bit_length(self.plaintext_modulus) > MAX_PLAINTEXT_BITS {
            return Err(BfvError::invalid(format!(
                "plaintext modulus {} exceeds {MAX_PLAINTEXT_BITS} bits",
                self.plaintext_modulus
            )));
        }
        if self.modulus_chain.is_empty() {
            return Err(BfvError::invalid("modulus chain is empty"));
        }
        let max_bits = self
            .security_level
            .max_modulus_bits(self.ring_dimension)
            .ok_or_else(|| {
                BfvError::invalid(format!(
                    "no security bound for ring dimension {}",
                    self.ring_dimension
                ))
            })?;
        let total = self.modulus_bits();
        if total > max_bits {
            return Err(BfvError::invalid(format!(
                "modulus chain of {total} bits exceeds the {max_bits}-bit limit for {}-bit security at ring dimension {}",
                self.security_level.bits(),
                self.ring_dimension
            )));
        }
        Ok(())
    }

    /// Ring dimension `n`, a power of two.
    pub fn ring_dimension(&self) -> usize {
        self.ring_dimension
    }

    /// Primes whose product is the ciphertext modulus `Q`.
    pub fn modulus_chain(&self) -> &[u64] {
        &self.modulus_chain
    }

    /// Plaintext modulus `t`.
    pub fn plaintext_modulus(&self) -> u64 {
        self.plaintext_modulus
    }

    /// Level the chain width was checked against.
    pub fn security_level(&self) -> SecurityLevel {
        self.security_level
    }

    /// Significant bit count of the chain product.
    pub fn modulus_bits(&self) -> u64 {
        self.modulus_chain
            .iter()
            .fold(BigUint::from(1u32), |acc, &q| acc * q)
            .bits()
    }
}

fn check_ring_dimension(ring_dimension: usize) -> Result<()> {
    if SUPPORTED_RING_DIMENSIONS.contains(&ring_dimension) {
        Ok(())
    } else {
        Err(BfvError::invalid(format!(
            "ring dimension {ring_dimension} is not one of {SUPPORTED_RING_DIMENSIONS:?}"
        )))
    }
}
