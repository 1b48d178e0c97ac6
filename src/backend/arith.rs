//! Word-sized modular arithmetic and NTT-friendly prime search.

/// Witnesses that make Miller-Rabin deterministic for every `u64`.
const MR_WITNESSES: [u64; 12] = [2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37];

/// Largest prime width the backend accepts in a modulus chain.
pub const MAX_PRIME_BITS: u32 = 61;

#[inline]
/// `a·b mod q` through a 128-bit product.
pub fn mul_mod(a: u64, b: u64, q: u64) -> u64 {
    ((a as u128 * b as u128) % q as u128) as u64
}

#[inline]
/// Inputs already reduced.
pub fn add_mod(a: u64, b: u64, q: u64) -> u64 {
    let s = a + b;
    if s >= q {
        s - q
    } else {
        s
    }
}

#[inline]
/// Inputs already reduced.
pub fn sub_mod(a: u64, b: u64, q: u64) -> u64 {
    if a >= b {
        a - b
    } else {
        q - (b - a)
    }
}

#[inline]
/// `−a mod q`.
pub fn neg_mod(a: u64, q: u64) -> u64 {
    if a == 0 {
        0
    } else {
        q - a
    }
}

/// Square and multiply.
pub fn pow_mod(mut base: u64, mut exp: u64, q: u64) -> u64 {
    let mut res = 1u64 % q;
    base %= q;
    while exp > 0 {
        if exp & 1 == 1 {
            res = mul_mod(res, base, q);
        }
        base = mul_mod(base, base, q);
        exp >>= 1;
    }
    res
}

/// Inverse modulo a prime (Fermat).
#[inline]
pub fn inv_mod(x: u64, q: u64) -> u64 {
    pow_mod(x, q - 2, q)
}

/// Residue of a signed small integer.
#[inline]
pub fn from_signed(v: i64, q: u64) -> u64 {
    if v >= 0 {
        v as u64 % q
    } else {
        neg_mod(v.unsigned_abs() % q, q)
    }
}

/// Deterministic Miller-Rabin.
pub fn is_prime(n: u64) -> bool {
    if n < 2 {
        return false;
    }
    for &p in &MR_WITNESSES {
        if n % p == 0 {
            return n == p;
        }
    }
    let mut d = n - 1;
    let mut r = 0;
    while d % 2 == 0 {
        d /= 2;
        r += 1;
    }
    'witness: for &a in &MR_WITNESSES {
        let mut x = pow_mod(a, d, n);
        if x == 1 || x == n - 1 {
            continue;
        }
        for _ in 1..r {
            x = mul_mod(x, x, n);
            if x == n - 1 {
                continue 'witness;
            }
        }
        return false;
    }
    true
}

/// Number of significant bits.
#[inline]
pub fn bit_length(x: u64) -> u32 {
    u64::BITS - x.leading_zeros()
}

/// Largest prime of exactly `bits` bits with `q ≡ 1 (mod 2n)` that is not in `taken`.
pub fn largest_ntt_prime(bits: u32, degree: usize, taken: &[u64]) -> Option<u64> {
    if bits < 2 || bits > MAX_PRIME_BITS {
        return None;
    }
    let step = 2 * degree as u64;
    let upper = (1u64 << bits) - 1;
    let lower = 1u64 << (bits - 1);
    // highest candidate ≡ 1 (mod 2n) at or below `upper`
    let mut candidate = upper - ((upper - 1) % step);
    while candidate > lower {
        if !taken.contains(&candidate) && is_prime(candidate) {
            return Some(candidate);
        }
        candidate = candidate.checked_sub(step)?;
    }
    None
}

/// Minimal primitive 2n-th root of unity modulo `q`.
///
/// `q` must be a prime with `q ≡ 1 (mod 2n)` and `n` a power of two, so `ψ` is
/// primitive exactly when `ψ^n ≡ −1`.
pub fn primitive_root_2n(q: u64, degree: usize) -> Option<u64> {
    let order = 2 * degree as u64;
    if (q - 1) % order != 0 {
        return None;
    }
    let cofactor = (q - 1) / order;
    let psi = (2..q.min(1 << 16))
        .map(|g| pow_mod(g, cofactor, q))
        .find(|&psi| pow_mod(psi, degree as u64, q) == q - 1)?;
    // every primitive root is an odd power of psi; take the smallest
    let psi_sq = mul_mod(psi, psi, q);
    let mut current = psi;
    let mut smallest = psi;
    for _ in 0..degree {
        smallest = smallest.min(current);
        current = mul_mod(current, psi_sq, q);
    }
    Some(smallest)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prime_checks() {
        assert!(is_prime(2));
        assert!(is_prime(12289));
        assert!(is_prime(132120577));
        assert!(is_prime(0x1FFFFFFEA0001));
        assert!(!is_prime(1));
        assert!(!is_prime(12287 * 12289));
        assert!(!is_prime(3215031751)); // strong pseudoprime to bases 2,3,5,7
    }

    #[test]
    fn test_largest_ntt_prime() {
        let q = largest_ntt_prime(27, 1024, &[]).unwrap();
        assert_eq!(bit_length(q), 27);
        assert_eq!(q % 2048, 1);
        assert!(is_prime(q));

        let next = largest_ntt_prime(27, 1024, &[q]).unwrap();
        assert!(next < q);
        assert_eq!(next % 2048, 1);

        assert_eq!(largest_ntt_prime(14, 1024, &[]), Some(12289));
        assert_eq!(largest_ntt_prime(62, 1024, &[]), None);
    }

    #[test]
    fn test_primitive_root() {
        let q = 12289;
        let psi = primitive_root_2n(q, 1024).unwrap();
        assert_eq!(pow_mod(psi, 1024, q), q - 1);
        assert_eq!(pow_mod(psi, 2048, q), 1);
        assert!(primitive_root_2n(q, 8192).is_none());
    }

    #[test]
    fn test_modular_helpers() {
        let q = 97;
        assert_eq!(mul_mod(inv_mod(5, q), 5, q), 1);
        assert_eq!(from_signed(-3, q), 94);
        assert_eq!(sub_mod(3, 5, q), 95);
        assert_eq!(add_mod(96, 5, q), 4);
        assert_eq!(neg_mod(0, q), 0);
    }
}
