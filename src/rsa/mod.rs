// RSA Module - Main module file
// Exports all RSA-related functionality

pub mod bigint;
pub mod block;
pub mod cipher;
pub mod keygen;
pub mod keystore;
pub mod prime;

pub use bigint::{ggt, mod_inverse, mod_pow, RsaBigInt};
pub use block::{blocks_to_bytes, bytes_to_blocks, ciphertext_width, plaintext_width};
pub use cipher::{decrypt_block, decrypt_file, encrypt_block, encrypt_file, CipherSummary};
pub use keygen::{generate_keys, KeyGenConfig, KeyGenerator, RsaKey, RsaKeyPair, RsaPrivateKey, RsaPublicKey};
pub use keystore::{load_key, save_key};
pub use prime::{MillerRabin, PrimeOracle};
