//! Key material for one encrypted blob.

use std::fmt;

use aes::Aes256;
use cbc::cipher::KeyIvInit;
use cbc::cipher::block_padding::Pkcs7;
use cbc::cipher::BlockDecryptMut;
use rand::RngCore;

use super::{AES_BLOCK_SIZE, ChunkEncryptor, KEY_SIZE};
use crate::error::TransferError;

type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// Content encryption key and initialization vector.
///
/// The key is never printed by `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct EncryptionContext {
    key: [u8; KEY_SIZE],
    iv: [u8; AES_BLOCK_SIZE],
}

impl EncryptionContext {
    /// Creates a context from an explicit key and IV.
    pub fn new(key: [u8; KEY_SIZE], iv: [u8; AES_BLOCK_SIZE]) -> Self {
        Self { key, iv }
    }

    /// Creates a context with a random key and IV.
    pub fn generate() -> Self {
        let mut rng = rand::thread_rng();
        let mut key = [0u8; KEY_SIZE];
        let mut iv = [0u8; AES_BLOCK_SIZE];
        rng.fill_bytes(&mut key);
        rng.fill_bytes(&mut iv);
        Self { key, iv }
    }

    /// Returns the content key.
    pub fn key(&self) -> &[u8; KEY_SIZE] {
        &self.key
    }

    /// Returns the initialization vector.
    pub fn iv(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.iv
    }

    /// Starts a new streaming encryptor at the beginning of a blob.
    pub fn encryptor(&self) -> ChunkEncryptor {
        ChunkEncryptor::new(&self.key, &self.iv)
    }

    /// Decrypts and unpads a complete blob.
    pub fn decrypt(&self, ciphertext: &[u8]) -> Result<Vec<u8>, TransferError> {
        if ciphertext.len() % AES_BLOCK_SIZE != 0 {
            return Err(TransferError::Encoding {
                message: "ciphertext is not a whole number of blocks",
            });
        }
        Aes256CbcDec::new(&self.key.into(), &self.iv.into())
            .decrypt_padded_vec_mut::<Pkcs7>(ciphertext)
            .map_err(|_| TransferError::Encoding {
                message: "invalid padding in decrypted data",
            })
    }
}

impl fmt::Debug for EncryptionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionContext")
            .field("key", &"<redacted>")
            .field("iv", &self.iv)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_random() {
        let a = EncryptionContext::generate();
        let b = EncryptionContext::generate();
        assert_ne!(a.key(), b.key());
        assert_ne!(a.iv(), b.iv());
    }

    #[test]
    fn test_debug_redacts_key() {
        let ctx = EncryptionContext::new([7u8; 32], [0u8; 16]);
        let s = format!("{:?}", ctx);
        assert!(s.contains("redacted"));
        assert!(!s.contains("7, 7"));
    }

    #[test]
    fn test_decrypt_rejects_partial_block() {
        let ctx = EncryptionContext::new([7u8; 32], [0u8; 16]);
        assert!(matches!(
            ctx.decrypt(&[0u8; 17]),
            Err(TransferError::Encoding { .. })
        ));
    }
}
