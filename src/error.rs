// Error types shared by key generation, the key store and the cipher

use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors produced by the RSA file cipher
#[derive(Debug, Error)]
pub enum RsaError {
    #[error("key file `{}` not found, generate a key pair first", .0.display())]
    KeyNotFound(PathBuf),

    #[error("key file `{}` is corrupt: {reason}", .path.display())]
    KeyFileCorrupt { path: PathBuf, reason: String },

    #[error("key generation failed: no usable {stage} after {attempts} attempts")]
    KeyGenerationFailed { stage: &'static str, attempts: u32 },

    #[error("plaintext block of {block_bits} bits does not fit below a {modulus_bits}-bit modulus")]
    BlockOverflow { block_bits: u64, modulus_bits: u64 },

    #[error("I/O error on `{}`: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid security parameter `{0}` bits")]
    InvalidSecurityBits(u64),

    #[error("modulus of {bits} bits is too small to carry data blocks")]
    ModulusTooSmall { bits: u64 },

    #[error("`{}` is both input and output", .0.display())]
    SameFile(PathBuf),

    #[error("ciphertext is corrupt: {0}")]
    CiphertextCorrupt(String),

    #[error("read failed: {0}")]
    Read(#[source] io::Error),

    #[error("write failed: {0}")]
    Write(#[source] io::Error),
}

impl RsaError {
    pub(crate) fn io(path: &Path, source: io::Error) -> Self {
        RsaError::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    pub(crate) fn corrupt_key(path: &Path, reason: impl Into<String>) -> Self {
        RsaError::KeyFileCorrupt {
            path: path.to_path_buf(),
            reason: reason.into(),
        }
    }

    /// Attach file paths to stream-level I/O errors.
    /// Read failures belong to `input`, write failures to `output`.
    pub fn at_paths(self, input: &Path, output: &Path) -> Self {
        match self {
            RsaError::Read(e) => RsaError::io(input, e),
            RsaError::Write(e) => RsaError::io(output, e),
            other => other,
        }
    }
}

/// Result type for RSA operations
pub type Result<T> = std::result::Result<T, RsaError>;
