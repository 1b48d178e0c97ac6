//! Heuristic upper estimates of `‖t·c(s) mod Q‖∞`, kept in log2.
//!
//! Every estimate is a high-probability bound (6σ tails) for the sampling
//! distributions used by [`super::Bfv`], so the estimated budget never exceeds
//! the measured one in practice.

/// Tail factor applied to every Gaussian-like quantity.
const TAIL: f64 = 6.0;

/// log2 of Σ 2^xᵢ without leaving the log domain.
pub fn log2_sum(terms: &[f64]) -> f64 {
    let max = terms.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    if max == f64::NEG_INFINITY {
        return max;
    }
    max + terms.iter().map(|&x| (x - max).exp2()).sum::<f64>().log2()
}

/// Expected ‖s^j‖₂² for a uniform ternary secret.
fn secret_power_sq_norm(degree: usize, j: usize) -> f64 {
    (2.0 * degree as f64 / 3.0).powi(j as i32)
}

/// Standard deviation of the coefficients of `c(s)/Q` for a ciphertext of
/// `size` pseudo-uniform components.
fn quotient_std(degree: usize, size: usize) -> f64 {
    let sq: f64 = (0..size).map(|j| secret_power_sq_norm(degree, j)).sum();
    (sq / 12.0).sqrt()
}

/// Bound for a fresh public-key encryption:
/// `t·(e₁ − e·u + e₂·s) + (t·⌊Q·m/t⌉ − Q·m)`.
pub fn fresh_log2(degree: usize, plaintext_modulus: u64, sigma: f64) -> f64 {
    let t = plaintext_modulus as f64;
    let v = TAIL * sigma * ((4.0 * degree as f64 / 3.0).sqrt() + 1.0);
    (t * v + t / 2.0).log2()
}

/// Bound after `round(t/Q · (a ⊗ b))`.
///
/// Dominant term is `t·(k_a·ν_b + k_b·ν_a)` where `k` is the integer quotient
/// of `c(s)` by `Q`; the remaining terms cover the message cross products,
/// `ν_a·ν_b` and the final rounding.
pub fn tensor_log2(
    degree: usize,
    plaintext_modulus: u64,
    modulus_bits: u64,
    (noise_a, size_a): (f64, usize),
    (noise_b, size_b): (f64, usize),
) -> f64 {
    let t = (plaintext_modulus as f64).log2();
    let sqrt_n = (degree as f64).sqrt().log2();
    let tail = TAIL.log2();
    let k_a = quotient_std(degree, size_a).log2();
    let k_b = quotient_std(degree, size_b).log2();
    let rounding = quotient_std(degree, size_a + size_b - 1).log2();

    log2_sum(&[
        t + tail + sqrt_n + k_a + noise_b,
        t + tail + sqrt_n + k_b + noise_a,
        t + sqrt_n + noise_a,
        t + sqrt_n + noise_b,
        (degree as f64).log2() + noise_a + noise_b - modulus_bits as f64,
        t + tail + rounding,
    ])
}

/// Bound after multiplying by a plaintext with centered ℓ₁ norm `l1`.
pub fn scale_log2(noise: f64, l1: u128) -> f64 {
    noise + (l1.max(1) as f64).log2()
}

/// Bound after adding a plaintext (one extra rounding term).
pub fn shift_log2(noise: f64, plaintext_modulus: u64) -> f64 {
    log2_sum(&[noise, (plaintext_modulus as f64 / 2.0).log2()])
}

/// `max(0, bits(Q) − bits(norm) − 1)` where `norm_bits` is the significant bit
/// count of the noise norm.
pub fn budget_from_bits(modulus_bits: u64, norm_bits: u64) -> u32 {
    modulus_bits.saturating_sub(norm_bits).saturating_sub(1) as u32
}

/// Budget implied by a log2 noise estimate.
pub fn budget_from_log2(modulus_bits: u64, noise: f64) -> u32 {
    if !noise.is_finite() {
        return if noise < 0.0 { budget_from_bits(modulus_bits, 0) } else { 0 };
    }
    let norm_bits = noise.max(0.0).floor() as u64 + 1;
    budget_from_bits(modulus_bits, norm_bits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log2_sum() {
        assert!((log2_sum(&[3.0, 3.0]) - 4.0).abs() < 1e-12);
        assert!((log2_sum(&[10.0, f64::NEG_INFINITY]) - 10.0).abs() < 1e-12);
        assert_eq!(log2_sum(&[]), f64::NEG_INFINITY);
        // huge exponents stay finite
        assert!((log2_sum(&[5000.0, 5000.0]) - 5001.0).abs() < 1e-9);
    }

    #[test]
    fn test_fresh_budget_for_reference_parameters() {
        let noise = fresh_log2(4096, 1024, 3.2);
        assert_eq!(budget_from_log2(109, noise), 87);
        let noise = fresh_log2(1024, 16, 3.2);
        assert_eq!(budget_from_log2(27, noise), 12);
    }

    #[test]
    fn test_tensor_growth_dominates_addition() {
        let fresh = fresh_log2(4096, 1024, 3.2);
        let squared = tensor_log2(4096, 1024, 109, (fresh, 2), (fresh, 2));
        let doubled = log2_sum(&[fresh, fresh]);
        assert!(squared - fresh > 20.0);
        assert!((doubled - fresh - 1.0).abs() < 1e-12);
        assert_eq!(budget_from_log2(109, squared), 63);
    }

    #[test]
    fn test_scale_and_budget_edges() {
        assert_eq!(scale_log2(10.0, 4), 12.0);
        assert_eq!(scale_log2(10.0, 0), 10.0);
        assert_eq!(budget_from_bits(27, 30), 0);
        assert_eq!(budget_from_log2(27, f64::INFINITY), 0);
        assert_eq!(budget_from_log2(27, f64::NEG_INFINITY), 26);
    }
}
