// Block codec
// Splits a byte stream into fixed-width big-endian integers and writes them back

use std::io::{self, ErrorKind, Read, Write};

use super::bigint::{bit_length, from_bytes, to_bytes, RsaBigInt};
use crate::error::{Result, RsaError};

/// First byte of the end-of-data padding (ISO/IEC 7816-4)
pub const PADDING_MARKER: u8 = 0x80;

/// Bytes per plaintext block: every value of this width is below `n`
pub fn plaintext_width(n: &RsaBigInt) -> usize {
    (bit_length(n).saturating_sub(1) / 8) as usize
}

/// Bytes per ciphertext block: wide enough for every value below `n`
pub fn ciphertext_width(n: &RsaBigInt) -> usize {
    ((bit_length(n) + 7) / 8) as usize
}

/// Fixed-size chunks of a reader; only the last chunk may be shorter
pub struct Chunks<R> {
    reader: R,
    width: usize,
    done: bool,
}

impl<R: Read> Chunks<R> {
    pub fn new(reader: R, width: usize) -> Self {
        Self {
            reader,
            width,
            done: width == 0,
        }
    }

    /// Fill `buf` as far as the reader allows, returns the number of bytes read
    fn fill(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.reader.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(len) => filled += len,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
        Ok(filled)
    }
}

impl<R: Read> Iterator for Chunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut buf = vec![0u8; self.width];
        match self.fill(&mut buf) {
            Ok(0) => {
                self.done = true;
                None
            }
            Ok(len) => {
                if len < self.width {
                    self.done = true;
                    buf.truncate(len);
                }
                Some(Ok(buf))
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Lazily read `reader` as big-endian integers of `width` bytes each
pub fn bytes_to_blocks<R: Read>(reader: R, width: usize) -> impl Iterator<Item = io::Result<RsaBigInt>> {
    Chunks::new(reader, width).map(|chunk| chunk.map(|bytes| from_bytes(&bytes)))
}

/// Encode a block as exactly `width` bytes, left-padded with zeros
pub fn block_to_bytes(block: &RsaBigInt, width: usize) -> Result<Vec<u8>> {
    let bytes = to_bytes(block);
    // to_bytes gives [0] for zero, which still has to fit into a zero-width block
    let significant = if bit_length(block) == 0 { 0 } else { bytes.len() };
    if significant > width {
        return Err(RsaError::BlockOverflow {
            block_bits: bit_length(block),
            modulus_bits: (width * 8) as u64,
        });
    }

    let mut out = vec![0u8; width];
    out[width - significant..].copy_from_slice(&bytes[bytes.len() - significant..]);
    Ok(out)
}

/// Inverse of `bytes_to_blocks`: every block as `width` big-endian bytes
pub fn blocks_to_bytes<'a, I>(blocks: I, width: usize) -> Result<Vec<u8>>
where
    I: IntoIterator<Item = &'a RsaBigInt>,
{
    let mut out = Vec::new();
    for block in blocks {
        out.extend_from_slice(&block_to_bytes(block, width)?);
    }
    Ok(out)
}

/// Streaming writer of fixed-width blocks
pub struct BlockWriter<W> {
    inner: W,
    width: usize,
    written: u64,
}

impl<W: Write> BlockWriter<W> {
    pub fn new(inner: W, width: usize) -> Self {
        Self {
            inner,
            width,
            written: 0,
        }
    }

    pub fn write_block(&mut self, block: &RsaBigInt) -> Result<()> {
        let bytes = block_to_bytes(block, self.width)?;
        self.write_raw(&bytes)
    }

    /// Write bytes that are already laid out as a block
    pub fn write_raw(&mut self, bytes: &[u8]) -> Result<()> {
        self.inner.write_all(bytes).map_err(RsaError::Write)?;
        self.written += bytes.len() as u64;
        Ok(())
    }

    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn flush(&mut self) -> Result<()> {
        self.inner.flush().map_err(RsaError::Write)
    }

    pub fn into_inner(self) -> W {
        self.inner
    }
}

/// Append the end-of-data marker and zero fill up to `width` bytes.
/// `chunk` must be shorter than `width`.
pub fn pad(mut chunk: Vec<u8>, width: usize) -> Vec<u8> {
    debug_assert!(chunk.len() < width);
    chunk.push(PADDING_MARKER);
    chunk.resize(width, 0);
    chunk
}

/// Strip the end-of-data padding from the final plaintext block
pub fn unpad(mut block: Vec<u8>) -> Result<Vec<u8>> {
    match block.iter().rposition(|&b| b != 0) {
        Some(pos) if block[pos] == PADDING_MARKER => {
            block.truncate(pos);
            Ok(block)
        }
        _ => Err(RsaError::CiphertextCorrupt(
            "final block carries no end-of-data marker".to_string(),
        )),
    }
}

/// Plaintext chunks of `width` bytes with the end-of-data padding applied.
///
/// An empty input yields nothing; any other input yields exactly one
/// padded block at the end, which may consist of padding only.
pub struct PaddedChunks<R> {
    chunks: Chunks<R>,
    width: usize,
    started: bool,
    finished: bool,
}

impl<R: Read> PaddedChunks<R> {
    pub fn new(reader: R, width: usize) -> Self {
        Self {
            chunks: Chunks::new(reader, width),
            width,
            started: false,
            finished: width == 0,
        }
    }
}

impl<R: Read> Iterator for PaddedChunks<R> {
    type Item = io::Result<Vec<u8>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        match self.chunks.next() {
            Some(Ok(chunk)) if chunk.len() == self.width => {
                self.started = true;
                Some(Ok(chunk))
            }
            Some(Ok(chunk)) => {
                self.finished = true;
                Some(Ok(pad(chunk, self.width)))
            }
            Some(Err(e)) => {
                self.finished = true;
                Some(Err(e))
            }
            None => {
                self.finished = true;
                if self.started {
                    Some(Ok(pad(Vec::new(), self.width)))
                } else {
                    None
                }
            }
        }
    }
}

/// Lazily read `reader` as padded plaintext blocks of `width` bytes each
pub fn padded_blocks<R: Read>(reader: R, width: usize) -> impl Iterator<Item = io::Result<RsaBigInt>> {
    PaddedChunks::new(reader, width).map(|chunk| chunk.map(|bytes| from_bytes(&bytes)))
}
