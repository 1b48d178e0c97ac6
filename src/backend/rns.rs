//! Residue number system basis with CRT composition.

use num_bigint::{BigInt, BigUint, Sign};
use num_traits::Zero;

use super::arith::{inv_mod, neg_mod};
use super::ntt::NttTable;

/// An ordered set of coprime NTT-friendly primes and their product.
#[derive(Clone, Debug)]
pub struct RnsBasis {
    moduli: Vec<u64>,
    tables: Vec<NttTable>,
    product: BigUint,
    half_product: BigUint,
    /// (Q/q_i) · ((Q/q_i)⁻¹ mod q_i)
    crt_factors: Vec<BigUint>,
}

impl RnsBasis {
    /// `None` if some modulus does not support a degree-`n` negacyclic NTT.
    pub fn new(moduli: &[u64], degree: usize) -> Option<Self> {
        let tables = moduli
            .iter()
            .map(|&q| NttTable::new(q, degree))
            .collect::<Option<Vec<_>>>()?;
        let product = moduli
            .iter()
            .fold(BigUint::from(1u32), |acc, &q| acc * q);
        let crt_factors = moduli
            .iter()
            .map(|&q| {
                let punctured = &product / q;
                let inv = inv_mod(residue(&punctured, q), q);
                punctured * inv
            })
            .collect();
        let half_product = &product >> 1;
        Some(Self {
            moduli: moduli.to_vec(),
            tables,
            product,
            half_product,
            crt_factors,
        })
    }

    /// Concatenation of two bases over the same degree.
    pub fn join(&self, other: &RnsBasis) -> RnsBasis {
        let moduli: Vec<u64> = self.moduli.iter().chain(&other.moduli).copied().collect();
        let tables = self.tables.iter().chain(&other.tables).cloned().collect();
        let product = &self.product * &other.product;
        let crt_factors = moduli
            .iter()
            .map(|&q| {
                let punctured = &product / q;
                let inv = inv_mod(residue(&punctured, q), q);
                punctured * inv
            })
            .collect();
        let half_product = &product >> 1;
        RnsBasis {
            moduli,
            tables,
            product,
            half_product,
            crt_factors,
        }
    }

    /// Primes in basis order.
    pub fn moduli(&self) -> &[u64] {
        &self.moduli
    }

    /// One NTT table per modulus, in order.
    pub fn tables(&self) -> &[NttTable] {
        &self.tables
    }

    /// Product of every modulus.
    pub fn product(&self) -> &BigUint {
        &self.product
    }

    /// Number of moduli.
    pub fn len(&self) -> usize {
        self.moduli.len()
    }

    /// True for a basis without moduli.
    pub fn is_empty(&self) -> bool {
        self.moduli.is_empty()
    }

    /// CRT composition into `[0, Q)`.
    pub fn compose<I>(&self, residues: I) -> BigUint
    where
        I: IntoIterator<Item = u64>,
    {
        let sum = residues
            .into_iter()
            .zip(&self.crt_factors)
            .fold(BigUint::zero(), |acc, (r, f)| acc + f * r);
        sum % &self.product
    }

    /// CRT composition into `(−Q/2, Q/2]`.
    pub fn compose_centered<I>(&self, residues: I) -> BigInt
    where
        I: IntoIterator<Item = u64>,
    {
        let x = self.compose(residues);
        if x > self.half_product {
            BigInt::from_biguint(Sign::Minus, &self.product - x)
        } else {
            BigInt::from_biguint(Sign::Plus, x)
        }
    }

    /// Residues of a signed integer, one per modulus.
    pub fn decompose(&self, x: &BigInt) -> Vec<u64> {
        self.moduli.iter().map(|&q| signed_residue(x, q)).collect()
    }

    /// Residues of a non-negative integer, one per modulus.
    pub fn decompose_unsigned(&self, x: &BigUint) -> Vec<u64> {
        self.moduli.iter().map(|&q| residue(x, q)).collect()
    }
}

/// `x mod q` as a machine word.
pub fn residue(x: &BigUint, q: u64) -> u64 {
    (x % q).iter_u64_digits().next().unwrap_or(0)
}

/// `x mod q` in `[0, q)` for a signed `x`.
pub fn signed_residue(x: &BigInt, q: u64) -> u64 {
    let r = residue(x.magnitude(), q);
    if x.sign() == Sign::Minus {
        neg_mod(r, q)
    } else {
        r
    }
}
