// Probable prime generation
// Miller-Rabin testing with an injected random source

use log::trace;
use num_bigint::RandBigInt;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::RngCore;

use super::bigint::{from_u64, mod_pow, RsaBigInt};
use crate::error::{Result, RsaError};

/// Primes below 256, used to reject most candidates before Miller-Rabin
const SMALL_PRIMES: [u32; 54] = [
    2, 3, 5, 7, 11, 13, 17, 19, 23, 29, 31, 37, 41, 43, 47, 53, 59, 61, 67, 71, 73, 79, 83, 89,
    97, 101, 103, 107, 109, 113, 127, 131, 137, 139, 149, 151, 157, 163, 167, 173, 179, 181, 191,
    193, 197, 199, 211, 223, 227, 229, 233, 239, 241, 251,
];

/// Source of probable primes of an exact bit length
pub trait PrimeOracle {
    /// Returns an integer that is prime with overwhelming probability and
    /// whose bit length is exactly `bits`.
    fn generate_prime(&self, bits: u64, rng: &mut dyn RngCore) -> Result<RsaBigInt>;
}

/// Default oracle: random odd candidates filtered by trial division and Miller-Rabin
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MillerRabin {
    rounds: u32,
}

impl Default for MillerRabin {
    fn default() -> Self {
        Self { rounds: 20 }
    }
}

impl MillerRabin {
    pub fn new(rounds: u32) -> Self {
        Self { rounds: rounds.max(1) }
    }

    pub fn rounds(&self) -> u32 {
        self.rounds
    }
}

impl PrimeOracle for MillerRabin {
    fn generate_prime(&self, bits: u64, rng: &mut dyn RngCore) -> Result<RsaBigInt> {
        if bits < 2 {
            return Err(RsaError::InvalidSecurityBits(bits));
        }

        let top = RsaBigInt::one() << (bits - 1);
        let mut tries = 0u64;
        loop {
            tries += 1;
            // Top bit fixes the length, bottom bit makes it odd
            let candidate = rng.gen_biguint(bits) | &top | RsaBigInt::one();

            if is_probable_prime(&candidate, self.rounds, &mut *rng) {
                trace!("found {}-bit prime after {} candidates", bits, tries);
                return Ok(candidate);
            }
        }
    }
}

/// Miller-Rabin primality test
/// Returns true if n is probably prime
pub fn is_probable_prime<R: RngCore + ?Sized>(n: &RsaBigInt, rounds: u32, rng: &mut R) -> bool {
    for &p in SMALL_PRIMES.iter() {
        let p = from_u64(u64::from(p));
        if *n == p {
            return true;
        }
        if (n % &p).is_zero() {
            return false;
        }
    }
    if n < &from_u64(2) {
        return false;
    }

    // Write n-1 as d * 2^s with d odd
    let n_minus_one = n - 1u8;
    let mut d = n_minus_one.clone();
    let mut s = 0u32;
    while d.is_even() {
        d >>= 1;
        s += 1;
    }

    let two = from_u64(2);

    'witness: for _ in 0..rounds {
        // Pick random witness a in [2, n-2]
        let a = rng.gen_biguint_range(&two, &n_minus_one);

        let mut x = mod_pow(&a, &d, n);
        if x.is_one() || x == n_minus_one {
            continue;
        }

        for _ in 1..s {
            x = mod_pow(&x, &two, n);
            if x == n_minus_one {
                continue 'witness;
            }
        }

        // Composite
        return false;
    }

    // Probably prime
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_is_probable_prime() {
        let mut rng = StdRng::seed_from_u64(7);
        for p in [2u64, 3, 7, 251, 257, 65537, 2_147_483_647] {
            assert!(is_probable_prime(&from_u64(p), 10, &mut rng), "{p} is prime");
        }
        for c in [0u64, 1, 4, 9, 255, 65535, 561, 1105, 2_147_483_649] {
            assert!(!is_probable_prime(&from_u64(c), 10, &mut rng), "{c} is composite");
        }
    }

    #[test]
    fn test_generate_prime_exact_bits() {
        let oracle = MillerRabin::default();
        let mut rng = StdRng::seed_from_u64(42);
        for bits in [2u64, 8, 33, 64, 129] {
            let p = oracle.generate_prime(bits, &mut rng).unwrap();
            assert_eq!(p.bits(), bits);
            assert!(is_probable_prime(&p, 20, &mut rng));
        }
    }

    #[test]
    fn test_generate_prime_rejects_one_bit() {
        let mut rng = StdRng::seed_from_u64(1);
        let result = MillerRabin::default().generate_prime(1, &mut rng);
        assert!(matches!(result, Err(RsaError::InvalidSecurityBits(1))));
    }

    #[test]
    fn test_rounds_clamped() {
        assert_eq!(MillerRabin::new(0).rounds(), 1);
        assert_eq!(MillerRabin::new(7).rounds(), 7);
        assert_eq!(MillerRabin::default().rounds(), 20);
    }

    #[test]
    fn test_generate_prime_is_reproducible() {
        let oracle = MillerRabin::new(8);
        let a = oracle.generate_prime(96, &mut StdRng::seed_from_u64(5)).unwrap();
        let b = oracle.generate_prime(96, &mut StdRng::seed_from_u64(5)).unwrap();
        assert_eq!(a, b);
    }
}
