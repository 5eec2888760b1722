//! Streaming AES-256-CBC encryptor with PKCS7 padding.

use aes::Aes256;
use bytes::Bytes;
use cbc::cipher::block_padding::{Pkcs7, RawPadding};
use cbc::cipher::generic_array::GenericArray;
use cbc::cipher::{BlockEncryptMut, KeyIvInit};

use super::{AES_BLOCK_SIZE, KEY_SIZE};
use crate::error::TransferError;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;

/// Returns the ciphertext length for `plain_len` bytes of plaintext.
///
/// PKCS7 always adds between 1 and 16 bytes, so an empty source still
/// produces one block.
pub fn encrypted_len(plain_len: u64) -> u64 {
    let block = AES_BLOCK_SIZE as u64;
    (plain_len / block + 1) * block
}

/// Encrypts a blob chunk by chunk.
///
/// Only whole cipher blocks are emitted by [`update`](Self::update); a
/// trailing partial block is held until more data arrives or the stream is
/// finalized. After [`finalize`](Self::finalize) every call fails.
pub struct ChunkEncryptor {
    cipher: Aes256CbcEnc,
    pending: Vec<u8>,
    finalized: bool,
}

impl ChunkEncryptor {
    pub(crate) fn new(key: &[u8; KEY_SIZE], iv: &[u8; AES_BLOCK_SIZE]) -> Self {
        Self {
            cipher: Aes256CbcEnc::new(&(*key).into(), &(*iv).into()),
            pending: Vec::with_capacity(AES_BLOCK_SIZE),
            finalized: false,
        }
    }

    /// Encrypts `data` and returns every completed cipher block.
    pub fn update(&mut self, data: &[u8]) -> Result<Bytes, TransferError> {
        self.ensure_open()?;
        self.pending.extend_from_slice(data);

        let whole = self.pending.len() - self.pending.len() % AES_BLOCK_SIZE;
        let mut out: Vec<u8> = self.pending.drain(..whole).collect();
        self.encrypt_blocks(&mut out);
        Ok(Bytes::from(out))
    }

    /// Encrypts `data`, pads, and flushes the final block(s).
    pub fn finalize(&mut self, data: &[u8]) -> Result<Bytes, TransferError> {
        self.ensure_open()?;
        self.pending.extend_from_slice(data);
        self.finalized = true;

        let tail = self.pending.len() % AES_BLOCK_SIZE;
        let mut out = std::mem::take(&mut self.pending);
        let last_block = out.len() - tail;
        out.resize(last_block + AES_BLOCK_SIZE, 0);
        Pkcs7::raw_pad(&mut out[last_block..], tail);
        self.encrypt_blocks(&mut out);
        Ok(Bytes::from(out))
    }

    /// Returns true once the stream has been finalized.
    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    fn ensure_open(&self) -> Result<(), TransferError> {
        if self.finalized {
            return Err(TransferError::Encoding {
                message: "encryptor used after finalize",
            });
        }
        Ok(())
    }

    fn encrypt_blocks(&mut self, buf: &mut [u8]) {
        debug_assert_eq!(buf.len() % AES_BLOCK_SIZE, 0);
        for block in buf.chunks_exact_mut(AES_BLOCK_SIZE) {
            self.cipher
                .encrypt_block_mut(GenericArray::from_mut_slice(block));
        }
    }
}

impl std::fmt::Debug for ChunkEncryptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChunkEncryptor")
            .field("pending", &self.pending.len())
            .field("finalized", &self.finalized)
            .finish()
    }
}
