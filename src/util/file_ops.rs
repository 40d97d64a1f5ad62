// File Operations for RSA Encryption/Decryption
// Key file locations, output naming and size formatting

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use crate::error::{Result, RsaError};

/// Suffix appended to encrypted files
pub const ENCRYPTED_SUFFIX: &str = "enc";

/// Suffix used for decrypted output when the input has no `.enc` suffix
pub const DECRYPTED_SUFFIX: &str = "dec";

/// Where the key pair lives on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct KeyPaths {
    pub dir: PathBuf,
    pub public_file: String,
    pub private_file: String,
}

impl Default for KeyPaths {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("."),
            public_file: "public_key.bin".to_string(),
            private_file: "private_key.bin".to_string(),
        }
    }
}

impl KeyPaths {
    pub fn in_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            ..Self::default()
        }
    }

    pub fn with_public_file(mut self, name: impl Into<String>) -> Self {
        self.public_file = name.into();
        self
    }

    pub fn with_private_file(mut self, name: impl Into<String>) -> Self {
        self.private_file = name.into();
        self
    }

    pub fn public_key_path(&self) -> PathBuf {
        self.dir.join(&self.public_file)
    }

    pub fn private_key_path(&self) -> PathBuf {
        self.dir.join(&self.private_file)
    }
}

fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(".");
    name.push(suffix);
    PathBuf::from(name)
}

/// `<file>` -> `<file>.enc`
pub fn encrypted_output_path(path: &Path) -> PathBuf {
    with_suffix(path, ENCRYPTED_SUFFIX)
}

/// Whether `path` ends in `.enc`
pub fn has_encrypted_suffix(path: &Path) -> bool {
    path.extension().map_or(false, |ext| ext == ENCRYPTED_SUFFIX)
}

/// `<file>.enc` -> `<file>`; anything else -> `<file>.dec`, never the input itself
pub fn decrypted_output_path(path: &Path) -> PathBuf {
    match path.file_stem() {
        Some(stem) if has_encrypted_suffix(path) && !stem.is_empty() => path.with_file_name(stem),
        _ => with_suffix(path, DECRYPTED_SUFFIX),
    }
}

/// Get file size in bytes
pub fn get_file_size(path: &Path) -> Result<u64> {
    let metadata = std::fs::metadata(path).map_err(|e| RsaError::io(path, e))?;
    Ok(metadata.len())
}

/// Format file size for display
pub fn format_file_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
