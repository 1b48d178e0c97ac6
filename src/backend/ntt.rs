//! Negacyclic NTT over a single NTT-friendly prime.

use super::arith::{add_mod, inv_mod, mul_mod, pow_mod, primitive_root_2n, sub_mod};

/// Precomputed twiddles for `Z_q[X]/(X^n + 1)`.
#[derive(Clone, Debug)]
pub struct NttTable {
    q: u64,
    degree: usize,
    /// ψ^i, folds the negacyclic twist into a cyclic transform
    psi_powers: Vec<u64>,
    /// n⁻¹·ψ^{−i}
    psi_inv_powers: Vec<u64>,
    /// ω_len for len = 2, 4, …, n (ω = ψ²)
    stage_roots: Vec<u64>,
    stage_roots_inv: Vec<u64>,
}

impl NttTable {
    /// `None` when `q` has no primitive 2n-th root of unity.
    pub fn new(q: u64, degree: usize) -> Option<Self> {
        assert!(degree.is_power_of_two(), "degree must be a power of two");
        let psi = primitive_root_2n(q, degree)?;
        let psi_inv = inv_mod(psi, q);
        let n_inv = inv_mod(degree as u64 % q, q);

        let mut psi_powers = Vec::with_capacity(degree);
        let mut psi_inv_powers = Vec::with_capacity(degree);
        let (mut fwd, mut inv) = (1u64, n_inv);
        for _ in 0..degree {
            psi_powers.push(fwd);
            psi_inv_powers.push(inv);
            fwd = mul_mod(fwd, psi, q);
            inv = mul_mod(inv, psi_inv, q);
        }

        let omega = mul_mod(psi, psi, q);
        let omega_inv = inv_mod(omega, q);
        let mut stage_roots = Vec::new();
        let mut stage_roots_inv = Vec::new();
        let mut len = 2;
        while len <= degree {
            let exp = (degree / len) as u64;
            stage_roots.push(pow_mod(omega, exp, q));
            stage_roots_inv.push(pow_mod(omega_inv, exp, q));
            len <<= 1;
        }

        Some(Self {
            q,
            degree,
            psi_powers,
            psi_inv_powers,
            stage_roots,
            stage_roots_inv,
        })
    }

    /// Prime `q`.
    pub fn modulus(&self) -> u64 {
        self.q
    }

    /// Coefficients to evaluations at the odd powers of ψ, in place.
    pub fn forward(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.degree);
        for (x, &w) in a.iter_mut().zip(&self.psi_powers) {
            *x = mul_mod(*x, w, self.q);
        }
        transform(a, &self.stage_roots, self.q);
    }

    /// Inverse of [`forward`](Self::forward).
    pub fn inverse(&self, a: &mut [u64]) {
        debug_assert_eq!(a.len(), self.degree);
        transform(a, &self.stage_roots_inv, self.q);
        for (x, &w) in a.iter_mut().zip(&self.psi_inv_powers) {
            *x = mul_mod(*x, w, self.q);
        }
    }

    /// Negacyclic product of two coefficient vectors.
    pub fn multiply(&self, a: &[u64], b: &[u64]) -> Vec<u64> {
        let mut fa = a.to_vec();
        let mut fb = b.to_vec();
        self.forward(&mut fa);
        self.forward(&mut fb);
        for (x, &y) in fa.iter_mut().zip(&fb) {
            *x = mul_mod(*x, y, self.q);
        }
        self.inverse(&mut fa);
        fa
    }
}

fn bit_reverse(vec: &mut [u64]) {
    let n = vec.len();
    let mut j = 0usize;
    for i in 1..n {
        let mut bit = n >> 1;
        while j & bit != 0 {
            j ^= bit;
            bit >>= 1;
        }
        j ^= bit;
        if i < j {
            vec.swap(i, j);
        }
    }
}

/// In-place cyclic Cooley-Tukey transform with one root per stage.
fn transform(a: &mut [u64], roots: &[u64], q: u64) {
    let n = a.len();
    bit_reverse(a);

    let mut len = 2;
    for &root in roots {
        let half = len / 2;
        for i in (0..n).step_by(len) {
            let mut w = 1u64;
            for j in 0..half {
                let u = a[i + j];
                let v = mul_mod(a[i + j + half], w, q);
                a[i + j] = add_mod(u, v, q);
                a[i + j + half] = sub_mod(u, v, q);
                w = mul_mod(w, root, q);
            }
        }
        len <<= 1;
    }
}
