//! Polynomials of `Z_Q[X]/(X^n + 1)` in RNS coefficient form.

use std::ops::{Add, Neg, Sub};
use std::sync::Arc;

use rand::Rng;
use rand_distr::{Distribution, Normal};
use zeroize::Zeroize;

use super::arith::{add_mod, from_signed, mul_mod, neg_mod, sub_mod};
use super::rns::RnsBasis;

/// f(x) = Σ a_k x^k, stored as one residue vector per modulus.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RnsPoly {
    moduli: Arc<[u64]>,
    limbs: Vec<Vec<u64>>,
}

impl RnsPoly {
    /// Zero polynomial over `basis`.
    pub fn zero(basis: &RnsBasis, degree: usize) -> Self {
        Self {
            moduli: basis.moduli().into(),
            limbs: vec![vec![0; degree]; basis.len()],
        }
    }

    /// Lift small signed coefficients into every residue.
    pub fn from_signed(coeffs: &[i64], basis: &RnsBasis) -> Self {
        let limbs = basis
            .moduli()
            .iter()
            .map(|&q| coeffs.iter().map(|&c| from_signed(c, q)).collect())
            .collect();
        Self {
            moduli: basis.moduli().into(),
            limbs,
        }
    }

    /// Build from per-coefficient residue vectors (`coeff_residues[k][i]`).
    pub fn from_coefficient_residues(coeff_residues: &[Vec<u64>], basis: &RnsBasis) -> Self {
        let limbs = (0..basis.len())
            .map(|i| coeff_residues.iter().map(|r| r[i]).collect())
            .collect();
        Self {
            moduli: basis.moduli().into(),
            limbs,
        }
    }

    /// Uniform over `Z_Q` (independently uniform residues).
    pub fn random<R: Rng + ?Sized>(basis: &RnsBasis, degree: usize, rng: &mut R) -> Self {
        let limbs = basis
            .moduli()
            .iter()
            .map(|&q| (0..degree).map(|_| rng.gen_range(0..q)).collect())
            .collect();
        Self {
            moduli: basis.moduli().into(),
            limbs,
        }
    }

    /// Coefficients uniform in {−1, 0, 1}.
    pub fn random_ternary<R: Rng + ?Sized>(basis: &RnsBasis, degree: usize, rng: &mut R) -> Self {
        let coeffs: Vec<i64> = (0..degree).map(|_| rng.gen_range(-1..=1)).collect();
        Self::from_signed(&coeffs, basis)
    }

    /// Rounded normal coefficients clipped to `±bound`.
    pub fn random_error<R: Rng + ?Sized>(
        basis: &RnsBasis,
        degree: usize,
        normal: &Normal<f64>,
        bound: i64,
        rng: &mut R,
    ) -> Self {
        let coeffs: Vec<i64> = (0..degree)
            .map(|_| (normal.sample(rng).round() as i64).clamp(-bound, bound))
            .collect();
        Self::from_signed(&coeffs, basis)
    }

    /// Ring dimension, not the polynomial degree.
    pub fn degree(&self) -> usize {
        self.limbs.first().map_or(0, Vec::len)
    }

    /// Residue vectors, one per modulus.
    pub fn limbs(&self) -> &[Vec<u64>] {
        &self.limbs
    }

    /// Residues of coefficient `k` across the basis.
    pub fn coefficient(&self, k: usize) -> impl Iterator<Item = u64> + '_ {
        self.limbs.iter().map(move |limb| limb[k])
    }

    /// True when every residue is 0.
    pub fn is_zero(&self) -> bool {
        self.limbs.iter().all(|limb| limb.iter().all(|&c| c == 0))
    }

    /// Negacyclic product through the NTT of each modulus.
    pub fn mul_ntt(&self, rhs: &RnsPoly, basis: &RnsBasis) -> RnsPoly {
        assert_eq!(self.moduli, rhs.moduli, "moduli must match");
        let limbs = basis
            .tables()
            .iter()
            .zip(self.limbs.iter().zip(&rhs.limbs))
            .map(|(table, (a, b))| table.multiply(a, b))
            .collect();
        RnsPoly {
            moduli: self.moduli.clone(),
            limbs,
        }
    }

    /// Multiply every coefficient by a constant given as residues.
    pub fn mul_scalar(&self, scalar: &[u64]) -> RnsPoly {
        let limbs = self
            .limbs
            .iter()
            .zip(self.moduli.iter().zip(scalar))
            .map(|(limb, (&q, &s))| limb.iter().map(|&c| mul_mod(c, s, q)).collect())
            .collect();
        RnsPoly {
            moduli: self.moduli.clone(),
            limbs,
        }
    }
}

impl Zeroize for RnsPoly {
    fn zeroize(&mut self) {
        for limb in &mut self.limbs {
            limb.zeroize();
        }
    }
}

fn zip_limbs(lhs: &RnsPoly, rhs: &RnsPoly, op: fn(u64, u64, u64) -> u64) -> RnsPoly {
    assert_eq!(lhs.moduli, rhs.moduli, "moduli must match");
    let limbs = lhs
        .limbs
        .iter()
        .zip(&rhs.limbs)
        .zip(lhs.moduli.iter())
        .map(|((a, b), &q)| a.iter().zip(b).map(|(&x, &y)| op(x, y, q)).collect())
        .collect();
    RnsPoly {
        moduli: lhs.moduli.clone(),
        limbs,
    }
}

impl Add for &RnsPoly {
    type Output = RnsPoly;
    fn add(self, rhs: Self) -> Self::Output {
        zip_limbs(self, rhs, add_mod)
    }
}

impl Add<&RnsPoly> for RnsPoly {
    type Output = RnsPoly;
    fn add(self, rhs: &RnsPoly) -> Self::Output {
        &self + rhs
    }
}

impl Sub for &RnsPoly {
    type Output = RnsPoly;
    fn sub(self, rhs: Self) -> Self::Output {
        zip_limbs(self, rhs, sub_mod)
    }
}

impl Sub<&RnsPoly> for RnsPoly {
    type Output = RnsPoly;
    fn sub(self, rhs: &RnsPoly) -> Self::Output {
        &self - rhs
    }
}

impl Neg for &RnsPoly {
    type Output = RnsPoly;
    fn neg(self) -> Self::Output {
        let limbs = self
            .limbs
            .iter()
            .zip(self.moduli.iter())
            .map(|(limb, &q)| limb.iter().map(|&c| neg_mod(c, q)).collect())
            .collect();
        RnsPoly {
            moduli: self.moduli.clone(),
            limbs,
        }
    }
}

impl Neg for RnsPoly {
    type Output = RnsPoly;
    fn neg(self) -> Self::Output {
        -&self
    }
}
