//! MD5 helpers for the container hash block.
//!
//! The hash block holds two digests: one over the magic, header and meta
//! info text, one over the XOR-unmasked (but still encrypted) sections.

use md5::{Digest, Md5};

/// MD5 of a single buffer.
pub fn md5(data: &[u8]) -> [u8; 16] {
    Md5::digest(data).into()
}

/// Incremental MD5 over several non-contiguous parts.
#[derive(Default)]
pub struct DigestBuilder {
    hasher: Md5,
}

impl DigestBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, data: &[u8]) {
        self.hasher.update(data);
    }

    pub fn finish(self) -> [u8; 16] {
        self.hasher.finalize().into()
    }
}
