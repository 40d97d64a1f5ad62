//! Textbook RSA key generation and block-wise file encryption.
//!
//! Not a production cryptographic library: there is no OAEP/PKCS#1 padding,
//! no authentication and no constant-time arithmetic.

pub mod error;
pub mod rsa;
pub mod util;

pub use error::{Result, RsaError};
