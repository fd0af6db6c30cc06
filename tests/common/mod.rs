#![allow(dead_code)]

use std::io::Write;

use blowfish::Blowfish;
use blowfish::cipher::generic_array::GenericArray;
use blowfish::cipher::{BlockEncrypt, KeyInit};
use flate2::Compression;
use flate2::write::DeflateEncoder;
use md5::{Digest, Md5};
use odb_reader::KeyTable;
use odb_reader::odb::codec::xor;
use odb_reader::odb::types::models::ODB_MAGIC;

pub const CLIENT_ID: i32 = 0x0000_2A17;
pub const KEY: &[u8] = b"odb-fixture-key";
pub const FORMAT_TAG: i32 = 0x10704;

/// Compact integers, no padding byte, no padding array, no long name.
pub const COMPACT_FLAGS: u32 = 0x20 | 0x10 | 0x04 | 0x40;
pub const COMPRESSED: u32 = 0x100;

pub fn keys() -> KeyTable {
    KeyTable::new().with_key(CLIENT_ID, KEY)
}

pub fn compact_u32(value: u32) -> Vec<u8> {
    let mut out = vec![(value & 0x7F) as u8];
    let mut rest = value >> 7;
    while rest != 0 {
        out.push((rest & 0x7F) as u8 | 0x80);
        rest >>= 7;
    }
    out.reverse();
    out
}

pub fn compact_i32(value: i32) -> Vec<u8> {
    let mut magnitude = value.unsigned_abs();
    let mut tail = Vec::new();
    while magnitude >= 0x40 {
        tail.push((magnitude & 0x7F) as u8);
        magnitude >>= 7;
    }
    let mut first = magnitude as u8;
    if value < 0 {
        first |= 0x40;
    }
    if !tail.is_empty() {
        first |= 0x80;
    }
    let mut out = vec![first];
    let last = tail.len().saturating_sub(1);
    for (i, group) in tail.iter().rev().enumerate() {
        out.push(if i == last { *group } else { *group | 0x80 });
    }
    out
}

/// Writes object-stream primitives the way the reader expects them for `flags`.
///
/// With a string pool attached, strings are written as offsets into it.
pub struct StreamWriter {
    buf: Vec<u8>,
    flags: u32,
    pool: Option<Vec<u8>>,
}

impl StreamWriter {
    pub fn new(flags: u32) -> Self {
        Self {
            buf: Vec::new(),
            flags,
            pool: None,
        }
    }

    pub fn with_pool(flags: u32) -> Self {
        Self {
            pool: Some(Vec::new()),
            ..Self::new(flags)
        }
    }

    fn compact(&self) -> bool {
        self.flags & 0x20 != 0
    }

    pub fn raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.buf.extend_from_slice(bytes);
        self
    }

    pub fn byte(&mut self, value: u8) -> &mut Self {
        self.buf.push(value);
        self
    }

    pub fn bool(&mut self, value: bool) -> &mut Self {
        self.byte(value as u8)
    }

    pub fn u32(&mut self, value: u32) -> &mut Self {
        if self.compact() {
            let bytes = compact_u32(value);
            self.raw(&bytes)
        } else {
            self.raw(&value.to_le_bytes())
        }
    }

    pub fn i32(&mut self, value: i32) -> &mut Self {
        if self.compact() {
            let bytes = compact_i32(value);
            self.raw(&bytes)
        } else {
            self.raw(&value.to_le_bytes())
        }
    }

    pub fn array(&mut self, values: &[u32]) -> &mut Self {
        let len = values.len() as u32;
        if self.compact() {
            self.u32(len);
        } else if len < 0xFF {
            self.byte(len as u8);
        } else {
            self.byte(0xFF).u32(len);
        }
        for value in values {
            self.u32(*value);
        }
        self
    }

    pub fn byte_field(&mut self, bytes: &[u8]) -> &mut Self {
        self.u32(bytes.len() as u32).raw(bytes)
    }

    pub fn string(&mut self, text: &str) -> &mut Self {
        match self.pool.as_mut() {
            Some(pool) => {
                let offset = pool.len() as u32;
                pool.extend_from_slice(text.as_bytes());
                pool.push(0);
                self.u32(offset)
            }
            None => {
                self.buf.extend_from_slice(text.as_bytes());
                self.byte(0)
            }
        }
    }

    /// Legacy padding byte, present while bit 4 is clear.
    pub fn padding(&mut self) -> &mut Self {
        if self.flags & 0x10 == 0 {
            self.byte(0xEE);
        }
        self
    }

    /// Padding byte, padding array and base value.
    pub fn base(&mut self, base_value: u32) -> &mut Self {
        self.padding();
        if self.flags & 0x04 == 0 {
            self.array(&[7, 7]);
        }
        self.u32(base_value)
    }

    /// Base fields plus name and long name, without text or description.
    pub fn named(&mut self, base_value: u32, name: &str) -> &mut Self {
        self.base(base_value).string(name);
        if self.flags & 0x40 == 0 {
            self.string(&format!("{} (long)", name));
        }
        self.bool(false).bool(false)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Drains the written bytes, keeping the string pool for the next object.
    pub fn take(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.buf)
    }

    pub fn bytes(&self) -> Vec<u8> {
        self.buf.clone()
    }

    pub fn pool(&self) -> Vec<u8> {
        self.pool.clone().unwrap_or_default()
    }
}

pub fn deflate_with_prefix(plain: &[u8]) -> Vec<u8> {
    let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(plain).expect("deflate write");
    let compressed = encoder.finish().expect("deflate finish");

    let mut out = (plain.len() as i32).to_le_bytes().to_vec();
    out.extend_from_slice(&[0x78, 0x9C]);
    out.extend_from_slice(&compressed);
    out
}

pub fn blowfish_encrypt(key: &[u8], data: &[u8]) -> Vec<u8> {
    assert_eq!(data.len() % 8, 0, "fixture input must be block aligned");
    let cipher: Blowfish = Blowfish::new_from_slice(key).expect("fixture key");
    let mut out = data.to_vec();
    for block in out.chunks_exact_mut(8) {
        cipher.encrypt_block(GenericArray::from_mut_slice(block));
    }
    out
}

#[derive(Clone)]
pub struct Section {
    pub plain: Vec<u8>,
    pub attributes: u32,
}

impl Section {
    pub fn empty() -> Self {
        Self {
            plain: Vec::new(),
            attributes: 0,
        }
    }

    pub fn new(plain: impl Into<Vec<u8>>, attributes: u32) -> Self {
        Self {
            plain: plain.into(),
            attributes,
        }
    }

    /// Compressed (if flagged), zero-padded to the block size and encrypted.
    fn stored(&self, key: &[u8]) -> Vec<u8> {
        if self.plain.is_empty() && self.attributes & COMPRESSED == 0 {
            return Vec::new();
        }
        let mut data = if self.attributes & COMPRESSED != 0 {
            deflate_with_prefix(&self.plain)
        } else {
            self.plain.clone()
        };
        while data.len() % 8 != 0 {
            data.push(0);
        }
        blowfish_encrypt(key, &data)
    }
}

/// Assembles a complete, valid container file.
#[derive(Clone)]
pub struct ContainerBuilder {
    pub format_tag: i32,
    pub header_size: i32,
    pub client_id: i32,
    pub key: Vec<u8>,
    pub xor_mask_size: i32,
    pub meta_info: Vec<u8>,
    pub object_count: i32,
    pub size_list: Section,
    pub binary: Section,
    pub strings: Section,
    pub flash: Vec<u8>,
    pub trailing: Vec<u8>,
    pub corrupt_header_digest: bool,
    pub corrupt_body_digest: bool,
}

impl Default for ContainerBuilder {
    fn default() -> Self {
        Self {
            format_tag: FORMAT_TAG,
            header_size: 0x44,
            client_id: CLIENT_ID,
            key: KEY.to_vec(),
            xor_mask_size: 0x1F3,
            meta_info: b"parent=fixture.odx;gen=1".to_vec(),
            object_count: 0,
            size_list: Section::empty(),
            binary: Section::empty(),
            strings: Section::empty(),
            flash: Vec::new(),
            trailing: Vec::new(),
            corrupt_header_digest: false,
            corrupt_body_digest: false,
        }
    }
}

impl ContainerBuilder {
    /// Compressed size list, binary and string sections holding `objects`.
    pub fn with_objects(mut self, flags: u32, objects: &[Vec<u8>], pool: Vec<u8>) -> Self {
        let mut sizes = StreamWriter::new(flags);
        let mut binary = Vec::new();
        for object in objects {
            sizes.u32(object.len() as u32);
            binary.extend_from_slice(object);
        }
        self.object_count = objects.len() as i32;
        self.size_list = Section::new(sizes.bytes(), flags | COMPRESSED);
        self.binary = Section::new(binary, flags | COMPRESSED);
        self.strings = Section::new(pool, COMPRESSED);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let size_list = self.size_list.stored(&self.key);
        let binary = self.binary.stored(&self.key);
        let strings = self.strings.stored(&self.key);

        let mut file = ODB_MAGIC.to_vec();
        let put = |file: &mut Vec<u8>, value: i32| file.extend_from_slice(&value.to_le_bytes());
        put(&mut file, self.header_size);
        put(&mut file, self.format_tag);
        put(&mut file, 0);
        put(&mut file, self.client_id);
        put(&mut file, self.xor_mask_size);
        put(&mut file, self.meta_info.len() as i32);
        put(&mut file, 0);
        put(&mut file, self.object_count);
        put(&mut file, size_list.len() as i32);
        put(&mut file, self.size_list.attributes as i32);
        put(&mut file, binary.len() as i32);
        put(&mut file, self.binary.attributes as i32);
        put(&mut file, strings.len() as i32);
        put(&mut file, self.strings.attributes as i32);
        file.extend_from_slice(&[0xEE; 8]);
        put(&mut file, self.flash.len() as i32);
        put(&mut file, self.meta_info.len() as i32);
        file.extend_from_slice(&self.meta_info);

        let mut header_md5: [u8; 16] = Md5::digest(&file).into();
        let mut body = Md5::new();
        body.update(&size_list);
        body.update(&binary);
        body.update(&strings);
        let mut body_md5: [u8; 16] = body.finalize().into();
        if self.corrupt_header_digest {
            header_md5[0] ^= 0xFF;
        }
        if self.corrupt_body_digest {
            body_md5[15] ^= 0xFF;
        }

        // Fixture files stay far below 64 KiB.
        let mask = xor::xor_mask_prefix(self.xor_mask_size.max(0) as usize, 0x1_0000);
        let mut hash_block = header_md5.to_vec();
        hash_block.extend_from_slice(&body_md5);
        let hash_end = file.len() + hash_block.len();
        xor::xor_in_place(&mut hash_block, hash_end, &mask);
        file.extend_from_slice(&hash_block);

        for section in [&size_list, &binary, &strings, &self.flash] {
            let start = file.len();
            file.extend_from_slice(&xor::xor_transform(section, start, &mask));
        }
        file.extend_from_slice(&self.trailing);
        file
    }
}

/// Flash payload with the given `(address, content)` segments.
pub fn flash_payload(version: u32, segments: &[(u32, &[u8])]) -> Vec<u8> {
    let mut out = version.to_le_bytes().to_vec();
    out.extend_from_slice(&(segments.len() as u32).to_le_bytes());
    for (address, content) in segments {
        out.extend_from_slice(&address.to_le_bytes());
        out.extend_from_slice(&(content.len() as u32).to_le_bytes());
    }
    for (_, content) in segments {
        out.extend_from_slice(content);
    }
    out
}
