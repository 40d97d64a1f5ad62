// Key store
// Binary key files: bincode-encoded (kind, exponent, modulus, bit length)

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use log::{debug, info};
use num_traits::Zero;
use serde::{Deserialize, Serialize};

use super::bigint::{bit_length, RsaBigInt};
use super::keygen::{KeyKind, RsaKey, RsaKeyPair, RsaPrivateKey, RsaPublicKey};
use crate::error::{Result, RsaError};
use crate::util::file_ops::KeyPaths;

/// Current key file layout
pub const KEY_FILE_VERSION: u16 = 1;

/// On-disk form of a key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct KeyFile {
    version: u16,
    kind: KeyKind,
    exponent: RsaBigInt,
    modulus: RsaBigInt,
    bit_length: u64,
}

fn encode<K: RsaKey>(key: &K) -> std::result::Result<Vec<u8>, bincode::error::EncodeError> {
    let file = KeyFile {
        version: KEY_FILE_VERSION,
        kind: K::KIND,
        exponent: key.exponent().clone(),
        modulus: key.modulus().clone(),
        bit_length: key.bit_length(),
    };
    bincode::serde::encode_to_vec(&file, bincode::config::standard())
}

fn decode<K: RsaKey>(bytes: &[u8], path: &Path) -> Result<K> {
    let (file, read): (KeyFile, usize) =
        bincode::serde::decode_from_slice(bytes, bincode::config::standard())
            .map_err(|e| RsaError::corrupt_key(path, e.to_string()))?;

    if read != bytes.len() {
        return Err(RsaError::corrupt_key(
            path,
            format!("{} trailing bytes after the key", bytes.len() - read),
        ));
    }
    if file.version != KEY_FILE_VERSION {
        return Err(RsaError::corrupt_key(
            path,
            format!("unsupported key file version {}", file.version),
        ));
    }
    if file.kind != K::KIND {
        return Err(RsaError::corrupt_key(
            path,
            format!("expected a {:?} key, found a {:?} key", K::KIND, file.kind),
        ));
    }
    if file.modulus.is_zero() {
        return Err(RsaError::corrupt_key(path, "modulus is zero"));
    }
    if file.bit_length != bit_length(&file.exponent) {
        return Err(RsaError::corrupt_key(
            path,
            format!(
                "recorded bit length {} does not match the {}-bit exponent",
                file.bit_length,
                bit_length(&file.exponent)
            ),
        ));
    }

    Ok(K::from_parts(file.exponent, file.modulus))
}

/// Sibling path used while a key file is being written
fn staging_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

/// Serialize `key` to `path`, replacing any previous file
pub fn save_key<K: RsaKey>(key: &K, path: &Path) -> Result<()> {
    let bytes = encode(key).map_err(|e| RsaError::corrupt_key(path, e.to_string()))?;

    let staging = staging_path(path);
    fs::write(&staging, &bytes).map_err(|e| RsaError::io(&staging, e))?;
    if let Err(e) = fs::rename(&staging, path) {
        let _ = fs::remove_file(&staging);
        return Err(RsaError::io(path, e));
    }

    debug!("saved {:?} key ({} bytes) to {}", K::KIND, bytes.len(), path.display());
    Ok(())
}

/// Deserialize a key from `path`
pub fn load_key<K: RsaKey>(path: &Path) -> Result<K> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(RsaError::KeyNotFound(path.to_path_buf()));
        }
        Err(e) => return Err(RsaError::io(path, e)),
    };

    let key = decode(&bytes, path)?;
    debug!("loaded {:?} key from {}", K::KIND, path.display());
    Ok(key)
}

/// Persist both halves of a key pair
pub fn save_key_pair(pair: &RsaKeyPair, paths: &KeyPaths) -> Result<()> {
    if !paths.dir.as_os_str().is_empty() {
        fs::create_dir_all(&paths.dir).map_err(|e| RsaError::io(&paths.dir, e))?;
    }

    let private_path = paths.private_key_path();
    let public_path = paths.public_key_path();
    save_key(&pair.private_key, &private_path)?;
    save_key(&pair.public_key, &public_path)?;

    info!(
        "keys saved to {} and {}",
        private_path.display(),
        public_path.display()
    );
    Ok(())
}

pub fn load_public_key(paths: &KeyPaths) -> Result<RsaPublicKey> {
    load_key(&paths.public_key_path())
}

pub fn load_private_key(paths: &KeyPaths) -> Result<RsaPrivateKey> {
    load_key(&paths.private_key_path())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsa::bigint::from_u64;
    use crate::rsa::keygen::generate_keys;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rsa_filecrypt_keys_{}_{}", std::process::id(), name));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = temp_dir("roundtrip");
        let pair = generate_keys(128, &mut StdRng::seed_from_u64(1)).unwrap();

        let public_path = dir.join("public_key.bin");
        let private_path = dir.join("private_key.bin");
        save_key(&pair.public_key, &public_path).unwrap();
        save_key(&pair.private_key, &private_path).unwrap();

        let public: RsaPublicKey = load_key(&public_path).unwrap();
        let private: RsaPrivateKey = load_key(&private_path).unwrap();
        assert_eq!(public, pair.public_key);
        assert_eq!(private, pair.private_key);
        assert!(!staging_path(&public_path).exists());

        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_key_pair_paths() {
        let dir = temp_dir("pair").join("nested");
        let paths = KeyPaths::in_dir(&dir);
        let pair = generate_keys(64, &mut StdRng::seed_from_u64(2)).unwrap();

        save_key_pair(&pair, &paths).unwrap();
        assert_eq!(load_public_key(&paths).unwrap(), pair.public_key);
        assert_eq!(load_private_key(&paths).unwrap(), pair.private_key);

        // a new pair replaces the old files
        let next = generate_keys(64, &mut StdRng::seed_from_u64(3)).unwrap();
        save_key_pair(&next, &paths).unwrap();
        assert_eq!(load_public_key(&paths).unwrap(), next.public_key);

        fs::remove_dir_all(dir.parent().unwrap()).unwrap();
    }

    #[test]
    fn test_missing_key() {
        let dir = temp_dir("missing");
        let path = dir.join("nope.bin");
        match load_key::<RsaPublicKey>(&path) {
            Err(RsaError::KeyNotFound(p)) => assert_eq!(p, path),
            other => panic!("unexpected result: {other:?}"),
        }
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_corrupt_key() {
        let dir = temp_dir("corrupt");
        let path = dir.join("garbage.bin");
        fs::write(&path, b"definitely not a key").unwrap();
        assert!(matches!(
            load_key::<RsaPrivateKey>(&path),
            Err(RsaError::KeyFileCorrupt { .. })
        ));

        fs::write(&path, b"").unwrap();
        assert!(matches!(
            load_key::<RsaPrivateKey>(&path),
            Err(RsaError::KeyFileCorrupt { .. })
        ));
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_wrong_kind() {
        let dir = temp_dir("kind");
        let path = dir.join("public_key.bin");
        let key = RsaPublicKey::from_parts(from_u64(65537), from_u64(3233));
        save_key(&key, &path).unwrap();

        match load_key::<RsaPrivateKey>(&path) {
            Err(RsaError::KeyFileCorrupt { reason, .. }) => assert!(reason.contains("Private")),
            other => panic!("unexpected result: {other:?}"),
        }
        fs::remove_dir_all(dir).unwrap();
    }

    #[test]
    fn test_decode_rejects_inconsistent_fields() {
        let path = Path::new("inline.bin");
        let config = bincode::config::standard();

        let mut file = KeyFile {
            version: KEY_FILE_VERSION,
            kind: KeyKind::Public,
            exponent: from_u64(17),
            modulus: from_u64(3233),
            bit_length: 4,
        };
        let bytes = bincode::serde::encode_to_vec(&file, config).unwrap();
        assert!(matches!(
            decode::<RsaPublicKey>(&bytes, path),
            Err(RsaError::KeyFileCorrupt { .. })
        ));

        file.bit_length = 5;
        file.version = KEY_FILE_VERSION + 1;
        let bytes = bincode::serde::encode_to_vec(&file, config).unwrap();
        assert!(matches!(
            decode::<RsaPublicKey>(&bytes, path),
            Err(RsaError::KeyFileCorrupt { .. })
        ));

        file.version = KEY_FILE_VERSION;
        let mut bytes = bincode::serde::encode_to_vec(&file, config).unwrap();
        assert_eq!(decode::<RsaPublicKey>(&bytes, path).unwrap().bit_length, 5);

        bytes.push(0);
        assert!(matches!(
            decode::<RsaPublicKey>(&bytes, path),
            Err(RsaError::KeyFileCorrupt { .. })
        ));

        file.modulus = from_u64(0);
        let bytes = bincode::serde::encode_to_vec(&file, config).unwrap();
        match decode::<RsaPublicKey>(&bytes, path) {
            Err(RsaError::KeyFileCorrupt { reason, .. }) => assert!(reason.contains("modulus")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_failed_rename_removes_staging() {
        let dir = temp_dir("rename");
        // a directory in the way makes the final rename fail
        let path = dir.join("public_key.bin");
        fs::create_dir_all(&path).unwrap();
        let key = RsaPublicKey::from_parts(from_u64(65537), from_u64(3233));

        assert!(matches!(save_key(&key, &path), Err(RsaError::Io { .. })));
        assert!(!staging_path(&path).exists());
        assert!(path.is_dir());

        fs::remove_dir_all(dir).unwrap();
    }
}
