//! Reconstruction of the masked region that follows the fixed header.
//!
//! Every byte from the hash block on is XOR-masked by absolute file position.
//! The three object sections are additionally Blowfish-encrypted and, when
//! their attributes carry `0x100`, DEFLATE-compressed:
//!
//! ```text
//! raw → XOR(file position) → Blowfish ECB → inflate (if 0x100)
//! ```
//!
//! The hash block and the flash payload are XOR-only.

use log::{debug, trace};

use crate::odb::codec::compression;
use crate::odb::codec::crypto::SectionCipher;
use crate::odb::codec::digest::DigestBuilder;
use crate::odb::codec::xor;
use crate::odb::format::header::declared_len;
use crate::odb::types::error::{OdbError, Result};
use crate::odb::types::models::{HASH_BLOCK_SIZE, SectionInfo};

/// Cursor over the whole file that unmasks sections as it reads them.
pub struct SectionReader<'a> {
    file: &'a [u8],
    pos: usize,
    mask: Vec<u8>,
    cipher: Option<SectionCipher>,
    client_id: i32,
}

impl<'a> SectionReader<'a> {
    /// Starts reading at `pos`. `cipher` may be `None` when no key is known
    /// for `client_id`; decrypting a non-empty section then fails.
    pub fn new(
        file: &'a [u8],
        pos: usize,
        mask: Vec<u8>,
        cipher: Option<SectionCipher>,
        client_id: i32,
    ) -> Self {
        Self {
            file,
            pos,
            mask,
            cipher,
            client_id,
        }
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.file.len())
            .ok_or(OdbError::UnexpectedEndOfData {
                context,
                offset: self.pos,
            })?;
        let bytes = &self.file[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    /// Reads `len` unmasked bytes (the meta info text).
    pub fn read_plain(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        self.take(len, context)
    }

    /// Reads the 0x20-byte hash block: stored header MD5 followed by body MD5.
    ///
    /// Unlike every other section, the mask index is keyed from the cursor
    /// *after* the block.
    pub fn read_hash_block(&mut self) -> Result<[u8; HASH_BLOCK_SIZE]> {
        let raw = self.take(HASH_BLOCK_SIZE, "hash block")?;
        let mut block = [0u8; HASH_BLOCK_SIZE];
        block.copy_from_slice(raw);
        xor::xor_in_place(&mut block, self.pos, &self.mask);
        trace!("Hash block: {}", hex::encode(block));
        Ok(block)
    }

    /// Reads and fully reconstructs one object section.
    ///
    /// The XOR-only bytes are fed to `body_digest` (if any) before decryption.
    pub fn read_section(
        &mut self,
        info: SectionInfo,
        context: &'static str,
        body_digest: Option<&mut DigestBuilder>,
    ) -> Result<Vec<u8>> {
        let size = declared_len(info.size, context)?;
        let start = self.pos;
        let mut data = self.take(size, context)?.to_vec();
        xor::xor_in_place(&mut data, start, &self.mask);

        if let Some(digest) = body_digest {
            digest.update(&data);
        }

        if !data.is_empty() {
            let cipher = self
                .cipher
                .as_ref()
                .ok_or(OdbError::MissingClientKey(self.client_id))?;
            cipher.decrypt_in_place(&mut data)?;
        }

        if info.attributes.compressed() {
            data = compression::inflate(&data)?;
        }

        debug!(
            "Section {} at {:#x}: {} stored bytes, {} decoded bytes, attributes {}",
            context,
            start,
            size,
            data.len(),
            info.attributes
        );
        Ok(data)
    }

    /// Reads the XOR-only flash payload.
    pub fn read_flash(&mut self, size: i32) -> Result<Vec<u8>> {
        let size = declared_len(size, "flash payload size")?;
        let start = self.pos;
        let data = xor::xor_transform(self.take(size, "flash payload")?, start, &self.mask);
        debug!("Flash payload at {:#x}: {} bytes", start, data.len());
        Ok(data)
    }
}
