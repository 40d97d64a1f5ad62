// RSA Key Generation
// Implements textbook RSA key pair generation (public and private keys)

use log::{debug, info};
use num_bigint::RandBigInt;
use num_traits::One;
use rand::RngCore;
use serde::{Deserialize, Serialize};

use super::bigint::{bit_length, ggt, mod_inverse, RsaBigInt};
use super::prime::{MillerRabin, PrimeOracle};
use crate::error::{Result, RsaError};

/// Smallest accepted security parameter
pub const MIN_SECURITY_BITS: u64 = 16;

/// Which half of a key pair a key is
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum KeyKind {
    Public,
    Private,
}

/// Common view of both halves of a key pair
pub trait RsaKey: Sized {
    const KIND: KeyKind;

    fn exponent(&self) -> &RsaBigInt;

    fn modulus(&self) -> &RsaBigInt;

    /// Bit length of the exponent
    fn bit_length(&self) -> u64;

    fn from_parts(exponent: RsaBigInt, modulus: RsaBigInt) -> Self;

    /// Bit length of the modulus
    fn modulus_bits(&self) -> u64 {
        bit_length(self.modulus())
    }
}

/// RSA Public Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPublicKey {
    pub e: RsaBigInt,       // Public exponent
    pub n: RsaBigInt,       // Modulus
    pub bit_length: u64,    // Bit length of e
}

/// RSA Private Key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaPrivateKey {
    pub d: RsaBigInt,       // Private exponent
    pub n: RsaBigInt,       // Modulus (same as public)
    pub bit_length: u64,    // Bit length of d
}

/// RSA Key Pair (both public and private keys)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RsaKeyPair {
    pub public_key: RsaPublicKey,
    pub private_key: RsaPrivateKey,
    pub security_bits: u64,
}

impl RsaKey for RsaPublicKey {
    const KIND: KeyKind = KeyKind::Public;

    fn exponent(&self) -> &RsaBigInt {
        &self.e
    }

    fn modulus(&self) -> &RsaBigInt {
        &self.n
    }

    fn bit_length(&self) -> u64 {
        self.bit_length
    }

    fn from_parts(e: RsaBigInt, n: RsaBigInt) -> Self {
        let bit_length = bit_length(&e);
        Self { e, n, bit_length }
    }
}

impl RsaKey for RsaPrivateKey {
    const KIND: KeyKind = KeyKind::Private;

    fn exponent(&self) -> &RsaBigInt {
        &self.d
    }

    fn modulus(&self) -> &RsaBigInt {
        &self.n
    }

    fn bit_length(&self) -> u64 {
        self.bit_length
    }

    fn from_parts(d: RsaBigInt, n: RsaBigInt) -> Self {
        let bit_length = bit_length(&d);
        Self { d, n, bit_length }
    }
}

/// Retry budget for the rejection sampling loops
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct KeyGenConfig {
    pub max_prime_attempts: u32,
    pub max_exponent_attempts: u32,
}

impl Default for KeyGenConfig {
    fn default() -> Self {
        Self {
            max_prime_attempts: 256,
            max_exponent_attempts: 1024,
        }
    }
}

impl KeyGenConfig {
    pub fn with_max_prime_attempts(mut self, attempts: u32) -> Self {
        self.max_prime_attempts = attempts.max(1);
        self
    }

    pub fn with_max_exponent_attempts(mut self, attempts: u32) -> Self {
        self.max_exponent_attempts = attempts.max(1);
        self
    }
}

/// Key pair generator over an arbitrary prime oracle
#[derive(Clone, Debug)]
pub struct KeyGenerator<O> {
    oracle: O,
    config: KeyGenConfig,
}

impl Default for KeyGenerator<MillerRabin> {
    fn default() -> Self {
        Self::new(MillerRabin::default())
    }
}

impl<O: PrimeOracle> KeyGenerator<O> {
    pub fn new(oracle: O) -> Self {
        Self {
            oracle,
            config: KeyGenConfig::default(),
        }
    }

    pub fn with_config(mut self, config: KeyGenConfig) -> Self {
        self.config = config;
        self
    }

    /// Generate a key pair whose modulus has more than `security_bits` bits
    pub fn generate<R: RngCore>(&self, security_bits: u64, rng: &mut R) -> Result<RsaKeyPair> {
        if security_bits < MIN_SECURITY_BITS {
            return Err(RsaError::InvalidSecurityBits(security_bits));
        }

        // Step 1: Sample p and q until n is long enough
        let (p, q, n) = self.sample_modulus(security_bits, rng)?;

        // Step 2: Compute φ(n) = (p-1)(q-1)
        let phi_n = (&p - 1u8) * (&q - 1u8);

        // Step 3: Pick e with gcd(e, φ(n)) = 1
        let e = self.sample_exponent(security_bits, &phi_n, rng)?;

        // Step 4: Compute d = e^(-1) mod φ(n)
        let d = mod_inverse(&e, &phi_n).ok_or(RsaError::KeyGenerationFailed {
            stage: "private exponent",
            attempts: 1,
        })?;

        info!(
            "generated {}-bit modulus (|e| = {} bits, |d| = {} bits)",
            bit_length(&n),
            bit_length(&e),
            bit_length(&d)
        );

        Ok(RsaKeyPair {
            public_key: RsaPublicKey::from_parts(e, n.clone()),
            private_key: RsaPrivateKey::from_parts(d, n),
            security_bits,
        })
    }

    fn sample_modulus<R: RngCore>(
        &self,
        security_bits: u64,
        rng: &mut R,
    ) -> Result<(RsaBigInt, RsaBigInt, RsaBigInt)> {
        let p_bits = security_bits / 2 + 1;
        // Ceiling so an odd parameter can still exceed security_bits
        let q_bits = security_bits - security_bits / 2;

        for attempt in 1..=self.config.max_prime_attempts {
            let p = self.oracle.generate_prime(p_bits, &mut *rng)?;
            let q = self.oracle.generate_prime(q_bits, &mut *rng)?;

            if p == q {
                debug!("attempt {}: p == q, resampling", attempt);
                continue;
            }

            let n = &p * &q;
            if bit_length(&n) > security_bits {
                debug!("modulus found after {} attempts", attempt);
                return Ok((p, q, n));
            }
            debug!("attempt {}: modulus has only {} bits", attempt, bit_length(&n));
        }

        Err(RsaError::KeyGenerationFailed {
            stage: "prime pair",
            attempts: self.config.max_prime_attempts,
        })
    }

    fn sample_exponent<R: RngCore>(
        &self,
        security_bits: u64,
        phi_n: &RsaBigInt,
        rng: &mut R,
    ) -> Result<RsaBigInt> {
        let forced = (RsaBigInt::one() << (security_bits - 1)) | RsaBigInt::one();

        for attempt in 1..=self.config.max_exponent_attempts {
            // Top bit fixes the length, bottom bit makes it odd
            let e = rng.gen_biguint(security_bits) | &forced;
            if &e < phi_n && ggt(&e, phi_n).is_one() {
                debug!("public exponent found after {} attempts", attempt);
                return Ok(e);
            }
        }

        Err(RsaError::KeyGenerationFailed {
            stage: "public exponent",
            attempts: self.config.max_exponent_attempts,
        })
    }
}

/// Generate a key pair with the default Miller-Rabin oracle and retry budget
pub fn generate_keys<R: RngCore>(security_bits: u64, rng: &mut R) -> Result<RsaKeyPair> {
    KeyGenerator::<MillerRabin>::default().generate(security_bits, rng)
}
