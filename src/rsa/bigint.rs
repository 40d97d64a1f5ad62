// RSA Big Integer Operations
// Number theory helpers on top of num-bigint: gcd, modular inverse, modular power

use num_bigint::{BigInt, BigUint};
use num_integer::Integer;
use num_traits::{One, Zero};

/// RSA Big Integer type alias
pub type RsaBigInt = BigUint;

/// Create a big integer from u64
pub fn from_u64(n: u64) -> RsaBigInt {
    RsaBigInt::from(n)
}

/// Create a big integer from bytes (big-endian)
pub fn from_bytes(bytes: &[u8]) -> RsaBigInt {
    RsaBigInt::from_bytes_be(bytes)
}

/// Convert big integer to bytes (big-endian, no leading zeros except for 0 itself)
pub fn to_bytes(n: &RsaBigInt) -> Vec<u8> {
    n.to_bytes_be()
}

/// Number of significant bits, 0 for zero
pub fn bit_length(n: &RsaBigInt) -> u64 {
    n.bits()
}

/// Modular exponentiation: base^exp mod modulus
/// Uses square-and-multiply algorithm
pub fn mod_pow(base: &RsaBigInt, exp: &RsaBigInt, modulus: &RsaBigInt) -> RsaBigInt {
    if modulus.is_one() {
        return RsaBigInt::zero();
    }

    let mut result = RsaBigInt::one();
    let mut base = base % modulus;
    let mut exp = exp.clone();

    while !exp.is_zero() {
        if exp.is_odd() {
            result = (&result * &base) % modulus;
        }
        base = (&base * &base) % modulus;
        exp >>= 1;
    }

    result
}

/// Greatest common divisor by the Euclidean algorithm.
///
/// `ggt(x, 0) == x` for every `x`.
pub fn ggt(x: &RsaBigInt, y: &RsaBigInt) -> RsaBigInt {
    let mut x = x.clone();
    let mut y = y.clone();
    while !y.is_zero() {
        let r = &x % &y;
        x = std::mem::replace(&mut y, r);
    }
    x
}

/// Extended Euclidean Algorithm
/// Returns (gcd, x, y) such that a*x + b*y = gcd = gcd(a, b)
pub fn extended_gcd(a: &BigInt, b: &BigInt) -> (BigInt, BigInt, BigInt) {
    let (mut old_r, mut r) = (a.clone(), b.clone());
    let (mut old_x, mut x) = (BigInt::one(), BigInt::zero());
    let (mut old_y, mut y) = (BigInt::zero(), BigInt::one());

    while !r.is_zero() {
        let q = &old_r / &r;

        let next_r = &old_r - &q * &r;
        old_r = std::mem::replace(&mut r, next_r);

        let next_x = &old_x - &q * &x;
        old_x = std::mem::replace(&mut x, next_x);

        let next_y = &old_y - &q * &y;
        old_y = std::mem::replace(&mut y, next_y);
    }

    (old_r, old_x, old_y)
}

/// Compute modular inverse: a^(-1) mod m
/// Returns None if inverse doesn't exist
pub fn mod_inverse(a: &RsaBigInt, m: &RsaBigInt) -> Option<RsaBigInt> {
    if m <= &RsaBigInt::one() {
        return None;
    }

    let m_signed = BigInt::from(m.clone());
    let (gcd, x, _) = extended_gcd(&BigInt::from(a % m), &m_signed);

    if !gcd.is_one() {
        // Inverse doesn't exist
        return None;
    }

    // x may be negative, mod_floor brings it into [0, m)
    x.mod_floor(&m_signed).to_biguint()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mod_pow() {
        // 3^5 mod 7 = 243 mod 7 = 5
        let base = from_u64(3);
        let exp = from_u64(5);
        let modulus = from_u64(7);
        let result = mod_pow(&base, &exp, &modulus);
        assert_eq!(result, from_u64(5));
    }

    #[test]
    fn test_mod_pow_matches_num_bigint() {
        let base = from_bytes(&[0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc]);
        let exp = from_u64(65537);
        let modulus = from_bytes(&[0xf1, 0x23, 0x45, 0x67, 0x89, 0xab, 0xcd]);
        assert_eq!(mod_pow(&base, &exp, &modulus), base.modpow(&exp, &modulus));
        assert_eq!(mod_pow(&base, &exp, &from_u64(1)), from_u64(0));
    }

    #[test]
    fn test_ggt() {
        assert_eq!(ggt(&from_u64(123456789), &from_u64(987654321)), from_u64(9));
        assert_eq!(ggt(&from_u64(987654321), &from_u64(123456789)), from_u64(9));
        assert_eq!(ggt(&from_u64(17), &from_u64(5)), from_u64(1));
    }

    #[test]
    fn test_ggt_with_zero() {
        for x in [0u64, 1, 2, 97, u64::MAX] {
            assert_eq!(ggt(&from_u64(x), &from_u64(0)), from_u64(x));
        }
    }

    #[test]
    fn test_extended_gcd() {
        let (g, x, y) = extended_gcd(&BigInt::from(240), &BigInt::from(46));
        assert_eq!(g, BigInt::from(2));
        assert_eq!(BigInt::from(240) * x + BigInt::from(46) * y, BigInt::from(2));
    }

    #[test]
    fn test_mod_inverse() {
        // 3 * 5 = 15 ≡ 1 mod 7, so inverse of 3 mod 7 is 5
        let a = from_u64(3);
        let m = from_u64(7);
        let inv = mod_inverse(&a, &m).unwrap();
        assert_eq!(inv, from_u64(5));

        // Verify: 3 * 5 = 15 ≡ 1 (mod 7)
        assert_eq!((a * inv) % m, from_u64(1));
    }

    #[test]
    fn test_mod_inverse_negative_coefficient() {
        // extended_gcd(17, 3120) yields a negative x, the result must still be in [0, m)
        let inv = mod_inverse(&from_u64(17), &from_u64(3120)).unwrap();
        assert_eq!(inv, from_u64(2753));
    }

    #[test]
    fn test_mod_inverse_missing() {
        assert_eq!(mod_inverse(&from_u64(6), &from_u64(9)), None);
        assert_eq!(mod_inverse(&from_u64(0), &from_u64(9)), None);
        assert_eq!(mod_inverse(&from_u64(3), &from_u64(1)), None);
    }

    #[test]
    fn test_bytes_roundtrip() {
        let n = from_bytes(&[0x00, 0x01, 0x02, 0x03, 0x04]);
        assert_eq!(n, from_u64(0x01020304));
        assert_eq!(to_bytes(&n), vec![0x01, 0x02, 0x03, 0x04]);
        assert_eq!(bit_length(&n), 25);
        assert_eq!(bit_length(&from_u64(0)), 0);
    }
}
