//! Block decryption for container sections.
//!
//! The three object sections are encrypted with Blowfish in ECB mode. The key
//! is selected by the 32-bit client id in the header; the table mapping ids to
//! keys is supplied by the caller through [`KeyProvider`].

use std::collections::HashMap;

use blowfish::Blowfish;
use blowfish::cipher::generic_array::GenericArray;
use blowfish::cipher::{BlockDecrypt, KeyInit};
use log::{debug, trace};

use crate::odb::types::error::{OdbError, Result};

/// Blowfish block size in bytes.
pub const BLOCK_SIZE: usize = 8;

/// Read-only lookup of per-client decryption keys.
///
/// Implementations must be safe to share between threads decoding different
/// containers.
pub trait KeyProvider {
    /// Returns the raw key for `client_id`, or `None` when the client is unknown.
    fn key_for(&self, client_id: i32) -> Option<&[u8]>;
}

/// A `HashMap`-backed [`KeyProvider`].
#[derive(Debug, Clone, Default)]
pub struct KeyTable {
    keys: HashMap<i32, Vec<u8>>,
}

impl KeyTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with_key(mut self, client_id: i32, key: impl Into<Vec<u8>>) -> Self {
        self.insert(client_id, key);
        self
    }

    pub fn insert(&mut self, client_id: i32, key: impl Into<Vec<u8>>) {
        self.keys.insert(client_id, key.into());
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

impl KeyProvider for KeyTable {
    fn key_for(&self, client_id: i32) -> Option<&[u8]> {
        self.keys.get(&client_id).map(Vec::as_slice)
    }
}

impl<P: KeyProvider + ?Sized> KeyProvider for &P {
    fn key_for(&self, client_id: i32) -> Option<&[u8]> {
        (**self).key_for(client_id)
    }
}

/// A Blowfish instance keyed for one client.
pub struct SectionCipher {
    cipher: Blowfish,
}

impl SectionCipher {
    /// Keys the cipher. Blowfish accepts keys of 4 to 56 bytes.
    pub fn new(client_id: i32, key: &[u8]) -> Result<Self> {
        let cipher: Blowfish = Blowfish::new_from_slice(key).map_err(|_| OdbError::InvalidKey {
            client_id,
            len: key.len(),
        })?;
        debug!("Keyed Blowfish for client {:#010x} ({} byte key)", client_id, key.len());
        Ok(Self { cipher })
    }

    /// Decrypts `data` in place, one independent 8-byte block at a time.
    ///
    /// # Errors
    /// [`OdbError::SizeMismatch`] if `data` is not block-aligned; nothing is
    /// decrypted in that case.
    pub fn decrypt_in_place(&self, data: &mut [u8]) -> Result<()> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(OdbError::SizeMismatch {
                context: "block cipher input",
                block_size: BLOCK_SIZE,
                found: data.len(),
            });
        }
        trace!("Blowfish ECB decrypting {} bytes", data.len());

        for block in data.chunks_exact_mut(BLOCK_SIZE) {
            self.cipher.decrypt_block(GenericArray::from_mut_slice(block));
        }
        Ok(())
    }
}

/// One-shot ECB decryption of `data` with `key`.
pub fn block_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let cipher = SectionCipher::new(0, key)?;
    let mut out = data.to_vec();
    cipher.decrypt_in_place(&mut out)?;
    Ok(out)
}
