// RSA block cipher
// Textbook RSA applied block by block to streams and files

use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::Path;

use log::{debug, info, warn};

use super::bigint::{bit_length, mod_pow, RsaBigInt};
use super::block::{
    block_to_bytes, ciphertext_width, padded_blocks, plaintext_width, unpad, BlockWriter, Chunks,
};
use super::keygen::{RsaKey, RsaPrivateKey, RsaPublicKey};
use crate::error::{Result, RsaError};

/// Counters of a finished encrypt or decrypt pass
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CipherSummary {
    pub blocks: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// block^exponent mod modulus, shared by both directions
pub fn apply_key<K: RsaKey>(block: &RsaBigInt, key: &K) -> RsaBigInt {
    mod_pow(block, key.exponent(), key.modulus())
}

/// Encrypt a single plaintext block: m^e mod n
pub fn encrypt_block(m: &RsaBigInt, key: &RsaPublicKey) -> Result<RsaBigInt> {
    if m >= &key.n {
        return Err(RsaError::BlockOverflow {
            block_bits: bit_length(m),
            modulus_bits: key.modulus_bits(),
        });
    }
    Ok(apply_key(m, key))
}

/// Decrypt a single ciphertext block: c^d mod n
pub fn decrypt_block(c: &RsaBigInt, key: &RsaPrivateKey) -> Result<RsaBigInt> {
    if c >= &key.n {
        return Err(RsaError::CiphertextCorrupt(format!(
            "block of {} bits is not below the {}-bit modulus",
            bit_length(c),
            key.modulus_bits()
        )));
    }
    Ok(apply_key(c, key))
}

/// Reader that counts the bytes passing through
struct Counted<R> {
    inner: R,
    count: u64,
}

impl<R: Read> Read for Counted<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let len = self.inner.read(buf)?;
        self.count += len as u64;
        Ok(len)
    }
}

/// Plaintext and ciphertext widths for a key, rejecting moduli too small to carry data
fn block_widths<K: RsaKey>(key: &K) -> Result<(usize, usize)> {
    let plain = plaintext_width(key.modulus());
    if plain == 0 {
        return Err(RsaError::ModulusTooSmall {
            bits: key.modulus_bits(),
        });
    }
    Ok((plain, ciphertext_width(key.modulus())))
}

/// Encrypt everything `reader` yields into fixed-width ciphertext blocks on `writer`
pub fn encrypt_stream<R: Read, W: Write>(reader: R, writer: W, key: &RsaPublicKey) -> Result<CipherSummary> {
    let (plain_width, cipher_width) = block_widths(key)?;
    debug!("encrypting with {}-byte plaintext and {}-byte ciphertext blocks", plain_width, cipher_width);

    let mut reader = Counted { inner: reader, count: 0 };
    let mut out = BlockWriter::new(writer, cipher_width);
    let mut summary = CipherSummary::default();

    for block in padded_blocks(&mut reader, plain_width) {
        let m = block.map_err(RsaError::Read)?;
        let c = encrypt_block(&m, key)?;
        out.write_block(&c)?;
        summary.blocks += 1;
    }
    out.flush()?;

    summary.bytes_read = reader.count;
    summary.bytes_written = out.bytes_written();
    Ok(summary)
}

/// Decrypt fixed-width ciphertext blocks from `reader` and write the plaintext to `writer`
pub fn decrypt_stream<R: Read, W: Write>(reader: R, writer: W, key: &RsaPrivateKey) -> Result<CipherSummary> {
    let (plain_width, cipher_width) = block_widths(key)?;
    debug!("decrypting with {}-byte ciphertext and {}-byte plaintext blocks", cipher_width, plain_width);

    let mut out = BlockWriter::new(writer, plain_width);
    let mut summary = CipherSummary::default();
    // Held back one block, the last one still has its padding
    let mut pending: Option<Vec<u8>> = None;

    for chunk in Chunks::new(reader, cipher_width) {
        let chunk = chunk.map_err(RsaError::Read)?;
        summary.bytes_read += chunk.len() as u64;
        if chunk.len() != cipher_width {
            return Err(RsaError::CiphertextCorrupt(format!(
                "trailing {} bytes do not form a {}-byte block",
                chunk.len(),
                cipher_width
            )));
        }

        let m = decrypt_block(&RsaBigInt::from_bytes_be(&chunk), key)?;
        let plain = block_to_bytes(&m, plain_width).map_err(|_| {
            RsaError::CiphertextCorrupt("decrypted block exceeds the plaintext width".to_string())
        })?;
        summary.blocks += 1;

        if let Some(prev) = pending.replace(plain) {
            out.write_raw(&prev)?;
        }
    }

    if let Some(last) = pending {
        out.write_raw(&unpad(last)?)?;
    }
    out.flush()?;

    summary.bytes_written = out.bytes_written();
    Ok(summary)
}

/// True when both paths name the same file, following symlinks if both exist
fn same_file(input: &Path, output: &Path) -> bool {
    match (fs::canonicalize(input), fs::canonicalize(output)) {
        (Ok(a), Ok(b)) => a == b,
        _ => input == output,
    }
}

/// Run one pass from `input` into a freshly truncated `output`.
/// A failed pass removes the partial output; `output` must not be `input`.
fn process_file<F>(input: &Path, output: &Path, pass: F) -> Result<CipherSummary>
where
    F: FnOnce(BufReader<File>, &mut BufWriter<File>) -> Result<CipherSummary>,
{
    if same_file(input, output) {
        return Err(RsaError::SameFile(output.to_path_buf()));
    }

    let reader = File::open(input).map_err(|e| RsaError::io(input, e))?;
    let writer = File::create(output).map_err(|e| RsaError::io(output, e))?;
    let mut writer = BufWriter::new(writer);

    let result = pass(BufReader::new(reader), &mut writer).map_err(|e| e.at_paths(input, output));
    drop(writer);

    if result.is_err() {
        match fs::remove_file(output) {
            Ok(()) => warn!("removed partial output {}", output.display()),
            Err(e) => warn!("could not remove partial output {}: {}", output.display(), e),
        }
    }
    result
}

/// Encrypt the file at `input` into `output` with the public key
pub fn encrypt_file(input: &Path, output: &Path, key: &RsaPublicKey) -> Result<CipherSummary> {
    info!("encrypting {} -> {}", input.display(), output.display());
    let summary = process_file(input, output, |reader, writer| encrypt_stream(reader, writer, key))?;
    info!("wrote {} ciphertext blocks ({} bytes)", summary.blocks, summary.bytes_written);
    Ok(summary)
}

/// Decrypt the file at `input` into `output` with the private key
pub fn decrypt_file(input: &Path, output: &Path, key: &RsaPrivateKey) -> Result<CipherSummary> {
    info!("decrypting {} -> {}", input.display(), output.display());
    let summary = process_file(input, output, |reader, writer| decrypt_stream(reader, writer, key))?;
    info!("recovered {} bytes from {} blocks", summary.bytes_written, summary.blocks);
    Ok(summary)
}
