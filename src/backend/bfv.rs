//! Textbook BFV over RNS polynomials.

use std::borrow::Cow;
use std::fmt;

use itertools::{EitherOrBoth, Itertools};
use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::Zero;
use rand::{CryptoRng, RngCore};
use rand_distr::Normal;
use tracing::{debug, trace};
use zeroize::Zeroize;

use super::arith::{
    add_mod, bit_length, from_signed, is_prime, largest_ntt_prime, mul_mod, MAX_PRIME_BITS,
};
use super::noise;
use super::poly::RnsPoly;
use super::rns::{residue, signed_residue, RnsBasis};
use super::HomomorphicBackend;
use crate::error::{BfvError, Result};
use crate::params::ParameterSet;

/// Standard deviation of the error distribution.
const ERROR_STD_DEV: f64 = 3.2;
/// Errors are clipped at about 6σ.
const ERROR_BOUND: i64 = 19;
const AUX_PRIME_BITS: u32 = 60;
/// Smaller operand size the precomputed auxiliary basis supports.
const AUX_OPERAND_SIZE: usize = 8;

/// Plaintext polynomial with coefficients in `[0, t)`, always `n` long.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BfvPlaintext {
    coeffs: Vec<u64>,
}

impl BfvPlaintext {
    /// Coefficients, lowest degree first.
    pub fn coefficients(&self) -> &[u64] {
        &self.coeffs
    }
}

impl AsRef<[u64]> for BfvPlaintext {
    fn as_ref(&self) -> &[u64] {
        &self.coeffs
    }
}

/// `(c_0, …, c_{k-1})` with `c(s) = Σ c_i s^i ≈ Δ·m`.
#[derive(Clone)]
pub struct BfvCiphertext {
    parts: Vec<RnsPoly>,
    /// log2 upper estimate of ‖t·c(s) mod Q‖∞.
    pub(crate) noise_log2: f64,
}

impl BfvCiphertext {
    #[cfg(test)]
    pub(crate) fn parts(&self) -> &[RnsPoly] {
        &self.parts
    }
}

impl fmt::Debug for BfvCiphertext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BfvCiphertext")
            .field("size", &self.parts.len())
            .field("degree", &self.parts.first().map_or(0, RnsPoly::degree))
            .finish()
    }
}

/// Ternary secret `s`, wiped on drop.
pub struct BfvSecretKey {
    s: RnsPoly,
}

impl Drop for BfvSecretKey {
    fn drop(&mut self) {
        self.s.zeroize();
    }
}

impl fmt::Debug for BfvSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BfvSecretKey(..)")
    }
}

/// `(−(a·s + e), a)`.
#[derive(Clone)]
pub struct BfvPublicKey {
    p0: RnsPoly,
    p1: RnsPoly,
}

impl fmt::Debug for BfvPublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BfvPublicKey")
            .field("degree", &self.p0.degree())
            .finish_non_exhaustive()
    }
}

/// Precomputed bases and constants for one parameter set.
#[derive(Debug)]
pub struct Bfv {
    degree: usize,
    plaintext_modulus: u64,
    ciphertext_basis: RnsBasis,
    /// `Q ∪ P`, wide enough for tensor products of operands up to
    /// [`AUX_OPERAND_SIZE`].
    extended_basis: RnsBasis,
    modulus_bits: u64,
    fresh_noise_log2: f64,
    error: Normal<f64>,
}

impl Bfv {
    /// Significant bits of `Q`.
    pub fn modulus_bits(&self) -> u64 {
        self.modulus_bits
    }

    /// `⌊Q·m/t⌉` per coefficient.
    fn scaled_message(&self, plaintext: &BfvPlaintext) -> RnsPoly {
        let q = self.ciphertext_basis.product();
        let t = self.plaintext_modulus;
        let zero = vec![0; self.ciphertext_basis.len()];
        let residues: Vec<Vec<u64>> = plaintext
            .coeffs
            .iter()
            .map(|&m| {
                if m == 0 {
                    zero.clone()
                } else {
                    let scaled = (q * (2 * m) + t) / (2 * t);
                    self.ciphertext_basis.decompose_unsigned(&scaled)
                }
            })
            .collect();
        RnsPoly::from_coefficient_residues(&residues, &self.ciphertext_basis)
    }

    /// `c(s) mod Q` by Horner's rule.
    fn evaluate_at_secret(&self, ct: &BfvCiphertext, sk: &BfvSecretKey) -> RnsPoly {
        let mut parts = ct.parts.iter().rev();
        let mut acc = match parts.next() {
            Some(last) => last.clone(),
            None => return RnsPoly::zero(&self.ciphertext_basis, self.degree),
        };
        for part in parts {
            acc = acc.mul_ntt(&sk.s, &self.ciphertext_basis) + part;
        }
        acc
    }

    /// Coefficients of `p` centered into `(−t/2, t/2]`.
    fn centered_plaintext(&self, plaintext: &BfvPlaintext) -> Vec<i64> {
        let t = self.plaintext_modulus;
        plaintext
            .coeffs
            .iter()
            .map(|&c| if c > t / 2 { c as i64 - t as i64 } else { c as i64 })
            .collect()
    }

    /// Centered lift of `poly` from `Q` to `basis ⊇ Q`, returned in NTT form.
    fn lift_ntt(&self, poly: &RnsPoly, basis: &RnsBasis) -> Vec<Vec<u64>> {
        let aux_moduli = &basis.moduli()[self.ciphertext_basis.len()..];
        let mut aux_limbs = vec![vec![0u64; self.degree]; aux_moduli.len()];
        for k in 0..self.degree {
            let x = self.ciphertext_basis.compose_centered(poly.coefficient(k));
            for (limb, &p) in aux_limbs.iter_mut().zip(aux_moduli) {
                limb[k] = signed_residue(&x, p);
            }
        }
        let mut limbs = poly.limbs().to_vec();
        limbs.extend(aux_limbs);
        for (limb, table) in limbs.iter_mut().zip(basis.tables()) {
            table.forward(limb);
        }
        limbs
    }

    /// `⌊t·x/Q⌉` for each coefficient of `x` (given over `basis`), back in `Q`.
    fn scale_down(&self, limbs: &[Vec<u64>], basis: &RnsBasis) -> RnsPoly {
        let q = BigInt::from(self.ciphertext_basis.product().clone());
        let two_q = &q * 2;
        let residues: Vec<Vec<u64>> = (0..self.degree)
            .map(|k| {
                let x = basis.compose_centered(limbs.iter().map(|limb| limb[k]));
                let rounded = (x * (2 * self.plaintext_modulus) + &q).div_floor(&two_q);
                self.ciphertext_basis.decompose(&rounded)
            })
            .collect();
        RnsPoly::from_coefficient_residues(&residues, &self.ciphertext_basis)
    }

    /// `Q ∪ P` for a tensor whose smaller operand has `operand_size` parts.
    fn tensor_basis(&self, operand_size: usize) -> Result<Cow<'_, RnsBasis>> {
        if operand_size <= AUX_OPERAND_SIZE {
            return Ok(Cow::Borrowed(&self.extended_basis));
        }
        trace!(operand_size, "building a wider auxiliary basis");
        let aux = aux_basis(
            self.degree,
            self.ciphertext_basis.moduli(),
            self.modulus_bits,
            operand_size,
        )?;
        Ok(Cow::Owned(self.ciphertext_basis.join(&aux)))
    }
}

/// Primes `P` with `Q·P > min_size·n·Q²/2`, so every tensor coefficient is
/// represented exactly in `Q ∪ P`.
fn aux_basis(
    degree: usize,
    taken: &[u64],
    modulus_bits: u64,
    operand_size: usize,
) -> Result<RnsBasis> {
    let needed = modulus_bits
        + (degree as f64).log2().ceil() as u64
        + (operand_size as f64).log2().ceil() as u64
        + 2;
    let mut excluded = taken.to_vec();
    let mut moduli = Vec::new();
    let mut bits = 0u64;
    while bits < needed {
        let p = largest_ntt_prime(AUX_PRIME_BITS, degree, &excluded).ok_or_else(|| {
            BfvError::unsupported(format!(
                "ran out of {AUX_PRIME_BITS}-bit auxiliary primes for ring dimension {degree}"
            ))
        })?;
        excluded.push(p);
        moduli.push(p);
        // every prime exceeds 2^59
        bits += u64::from(AUX_PRIME_BITS) - 1;
    }
    RnsBasis::new(&moduli, degree)
        .ok_or_else(|| BfvError::unsupported("auxiliary basis does not support the NTT"))
}

impl HomomorphicBackend for Bfv {
    type Plaintext = BfvPlaintext;
    type Ciphertext = BfvCiphertext;
    type SecretKey = BfvSecretKey;
    type PublicKey = BfvPublicKey;

    fn from_parameters(params: &ParameterSet) -> Result<Self> {
        params.validate()?;
        let degree = params.ring_dimension();
        let t = params.plaintext_modulus();
        let chain = params.modulus_chain();
        let two_n = 2 * degree as u64;

        for (i, &q) in chain.iter().enumerate() {
            if bit_length(q) > MAX_PRIME_BITS {
                return Err(BfvError::unsupported(format!(
                    "modulus {q} exceeds {MAX_PRIME_BITS} bits"
                )));
            }
            if !is_prime(q) {
                return Err(BfvError::unsupported(format!("modulus {q} is not prime")));
            }
            if q % two_n != 1 {
                return Err(BfvError::unsupported(format!(
                    "modulus {q} is not 1 mod {two_n}"
                )));
            }
            if chain[..i].contains(&q) {
                return Err(BfvError::unsupported(format!(
                    "modulus {q} appears twice in the chain"
                )));
            }
            if t >= q {
                return Err(BfvError::unsupported(format!(
                    "plaintext modulus {t} is not smaller than chain prime {q}"
                )));
            }
        }

        let ciphertext_basis = RnsBasis::new(chain, degree).ok_or_else(|| {
            BfvError::unsupported(format!("modulus chain {chain:?} does not support the NTT"))
        })?;
        let modulus_bits = ciphertext_basis.product().bits();
        let fresh_noise_log2 = noise::fresh_log2(degree, t, ERROR_STD_DEV);
        let fresh_budget = noise::budget_from_log2(modulus_bits, fresh_noise_log2);
        if fresh_budget == 0 {
            return Err(BfvError::unsupported(format!(
                "plaintext modulus {t} leaves no noise budget in a {modulus_bits}-bit modulus"
            )));
        }

        let aux = aux_basis(degree, chain, modulus_bits, AUX_OPERAND_SIZE)?;
        let extended_basis = ciphertext_basis.join(&aux);
        let error = Normal::new(0.0, ERROR_STD_DEV)
            .map_err(|e| BfvError::unsupported(format!("error distribution: {e}")))?;

        debug!(
            degree,
            plaintext_modulus = t,
            moduli = ?chain,
            modulus_bits,
            aux_moduli = aux.len(),
            fresh_budget,
            "bfv backend ready"
        );

        Ok(Self {
            degree,
            plaintext_modulus: t,
            ciphertext_basis,
            extended_basis,
            modulus_bits,
            fresh_noise_log2,
            error,
        })
    }

    fn degree(&self) -> usize {
        self.degree
    }

    fn plaintext_modulus(&self) -> u64 {
        self.plaintext_modulus
    }

    fn max_noise_budget(&self) -> u32 {
        noise::budget_from_log2(self.modulus_bits, self.fresh_noise_log2)
    }

    fn encode(&self, coeffs: &[u64]) -> BfvPlaintext {
        let mut padded = vec![0; self.degree];
        padded[..coeffs.len()].copy_from_slice(coeffs);
        BfvPlaintext { coeffs: padded }
    }

    fn generate_secret_key<R: RngCore + CryptoRng>(&self, rng: &mut R) -> BfvSecretKey {
        let s = RnsPoly::random_ternary(&self.ciphertext_basis, self.degree, rng);
        BfvSecretKey { s }
    }

    fn generate_public_key<R: RngCore + CryptoRng>(
        &self,
        secret_key: &BfvSecretKey,
        rng: &mut R,
    ) -> BfvPublicKey {
        let basis = &self.ciphertext_basis;
        let a = RnsPoly::random(basis, self.degree, rng);
        let e = RnsPoly::random_error(basis, self.degree, &self.error, ERROR_BOUND, rng);
        let p0 = -(a.mul_ntt(&secret_key.s, basis) + &e);
        BfvPublicKey { p0, p1: a }
    }

    fn encrypt<R: RngCore + CryptoRng>(
        &self,
        plaintext: &BfvPlaintext,
        public_key: &BfvPublicKey,
        rng: &mut R,
    ) -> BfvCiphertext {
        let basis = &self.ciphertext_basis;
        let u = RnsPoly::random_ternary(basis, self.degree, rng);
        let e1 = RnsPoly::random_error(basis, self.degree, &self.error, ERROR_BOUND, rng);
        let e2 = RnsPoly::random_error(basis, self.degree, &self.error, ERROR_BOUND, rng);
        let c0 = public_key.p0.mul_ntt(&u, basis) + &e1 + &self.scaled_message(plaintext);
        let c1 = public_key.p1.mul_ntt(&u, basis) + &e2;
        BfvCiphertext {
            parts: vec![c0, c1],
            noise_log2: self.fresh_noise_log2,
        }
    }

    fn add(&self, a: &BfvCiphertext, b: &BfvCiphertext) -> BfvCiphertext {
        let parts = a
            .parts
            .iter()
            .zip_longest(&b.parts)
            .map(|pair| match pair {
                EitherOrBoth::Both(x, y) => x + y,
                EitherOrBoth::Left(x) | EitherOrBoth::Right(x) => x.clone(),
            })
            .collect();
        BfvCiphertext {
            parts,
            noise_log2: noise::log2_sum(&[a.noise_log2, b.noise_log2]),
        }
    }

    fn sub(&self, a: &BfvCiphertext, b: &BfvCiphertext) -> BfvCiphertext {
        let parts = a
            .parts
            .iter()
            .zip_longest(&b.parts)
            .map(|pair| match pair {
                EitherOrBoth::Both(x, y) => x - y,
                EitherOrBoth::Left(x) => x.clone(),
                EitherOrBoth::Right(y) => -y,
            })
            .collect();
        BfvCiphertext {
            parts,
            noise_log2: noise::log2_sum(&[a.noise_log2, b.noise_log2]),
        }
    }

    fn negate(&self, a: &BfvCiphertext) -> BfvCiphertext {
        BfvCiphertext {
            parts: a.parts.iter().map(|p| -p).collect(),
            noise_log2: a.noise_log2,
        }
    }

    fn multiply(&self, a: &BfvCiphertext, b: &BfvCiphertext) -> Result<BfvCiphertext> {
        let basis = self.tensor_basis(a.parts.len().min(b.parts.len()))?;
        let lift = |ct: &BfvCiphertext| -> Vec<Vec<Vec<u64>>> {
            ct.parts.iter().map(|p| self.lift_ntt(p, &basis)).collect()
        };
        let lifted_a = lift(a);
        let lifted_b = if std::ptr::eq(a, b) { None } else { Some(lift(b)) };
        let lifted_b = lifted_b.as_ref().unwrap_or(&lifted_a);

        let size = a.parts.len() + b.parts.len() - 1;
        let mut tensor = vec![vec![vec![0u64; self.degree]; basis.len()]; size];
        for (i, x) in lifted_a.iter().enumerate() {
            for (j, y) in lifted_b.iter().enumerate() {
                for (l, table) in basis.tables().iter().enumerate() {
                    let q = table.modulus();
                    let acc = &mut tensor[i + j][l];
                    for ((r, &xv), &yv) in acc.iter_mut().zip(&x[l]).zip(&y[l]) {
                        *r = add_mod(*r, mul_mod(xv, yv, q), q);
                    }
                }
            }
        }

        let parts = tensor
            .into_iter()
            .map(|mut limbs| {
                for (limb, table) in limbs.iter_mut().zip(basis.tables()) {
                    table.inverse(limb);
                }
                self.scale_down(&limbs, &basis)
            })
            .collect();
        let noise_log2 = noise::tensor_log2(
            self.degree,
            self.plaintext_modulus,
            self.modulus_bits,
            (a.noise_log2, a.parts.len()),
            (b.noise_log2, b.parts.len()),
        );
        Ok(BfvCiphertext { parts, noise_log2 })
    }

    fn multiply_plain(&self, a: &BfvCiphertext, p: &BfvPlaintext) -> BfvCiphertext {
        let centered = self.centered_plaintext(p);
        let l1: u128 = centered.iter().map(|c| u128::from(c.unsigned_abs())).sum();
        let basis = &self.ciphertext_basis;
        let parts = if centered[1..].iter().all(|&c| c == 0) {
            let scalar: Vec<u64> = basis
                .moduli()
                .iter()
                .map(|&q| from_signed(centered[0], q))
                .collect();
            a.parts.iter().map(|part| part.mul_scalar(&scalar)).collect()
        } else {
            let poly = RnsPoly::from_signed(&centered, basis);
            a.parts.iter().map(|part| part.mul_ntt(&poly, basis)).collect()
        };
        BfvCiphertext {
            parts,
            noise_log2: noise::scale_log2(a.noise_log2, l1),
        }
    }

    fn add_plain(&self, a: &BfvCiphertext, p: &BfvPlaintext) -> BfvCiphertext {
        let mut parts = a.parts.clone();
        parts[0] = &parts[0] + &self.scaled_message(p);
        BfvCiphertext {
            parts,
            noise_log2: noise::shift_log2(a.noise_log2, self.plaintext_modulus),
        }
    }

    fn decrypt(&self, ct: &BfvCiphertext, secret_key: &BfvSecretKey) -> BfvPlaintext {
        let w = self.evaluate_at_secret(ct, secret_key);
        let q = self.ciphertext_basis.product();
        let two_q = q * 2u32;
        let two_t = BigUint::from(2 * self.plaintext_modulus);
        let coeffs = (0..self.degree)
            .map(|k| {
                let x = self.ciphertext_basis.compose(w.coefficient(k));
                let m = (x * &two_t + q) / &two_q;
                residue(&m, self.plaintext_modulus)
            })
            .collect();
        BfvPlaintext { coeffs }
    }

    fn noise_budget(&self, ct: &BfvCiphertext, secret_key: &BfvSecretKey) -> u32 {
        let w = self.evaluate_at_secret(ct, secret_key);
        let q = self.ciphertext_basis.product();
        let half_q = q >> 1;
        let mut norm = BigUint::zero();
        for k in 0..self.degree {
            let x = self.ciphertext_basis.compose(w.coefficient(k));
            let v = (x * self.plaintext_modulus) % q;
            let centered = if v > half_q { q - v } else { v };
            if centered > norm {
                norm = centered;
            }
        }
        let measured = noise::budget_from_bits(self.modulus_bits, norm.bits());
        let estimated = noise::budget_from_log2(self.modulus_bits, ct.noise_log2);
        measured.min(estimated)
    }

    fn size(&self, ct: &BfvCiphertext) -> usize {
        ct.parts.len()
    }
}
