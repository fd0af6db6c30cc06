//! Core data structures for ODB container components.
//!
//! This module defines the fundamental types used throughout the library:
//! - The fixed container header and its section descriptors
//! - The two version axes (format tag and optimization flags)
//! - Non-fatal advisories raised while loading a container

use std::fmt;

/// The ObjectDB magic found at offset 0 of every container.
pub const ODB_MAGIC: [u8; 16] = [
    0x52, 0x90, 0xD4, 0x30, 0x67, 0x14, 0x7E, 0x47, 0x81, 0xF2, 0x3C, 0x4B, 0x73, 0xF0, 0xF7, 0x37,
];

/// Value the header size field must carry (bytes following the field itself).
pub const HEADER_SIZE: i32 = 0x44;

/// Size of the XOR-only hash block following the meta info text.
pub const HASH_BLOCK_SIZE: usize = 0x20;

/// Magic + header size field + header + hash block.
pub const MINIMUM_FILE_SIZE: usize = ODB_MAGIC.len() + 4 + HEADER_SIZE as usize + HASH_BLOCK_SIZE;

/// Version indicator stored in the container header (e.g. `0x10704` in SMR-D/SMR-F).
///
/// Field presence throughout the object hierarchy is gated by comparing this
/// value against literal thresholds, so comparisons stay signed like the
/// on-disk field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FormatTag(pub i32);

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#07x}", self.0)
    }
}

/// Per-section optimization bitmask.
///
/// The attributes word of a section doubles as the optimization level of the
/// object stream decoded from it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OptimizationFlags(pub u32);

impl OptimizationFlags {
    /// Bit 2 set: objects omit the legacy padding array.
    pub const NO_PADDING_ARRAY: u32 = 1 << 2;
    /// Bit 4 set: objects omit the legacy padding byte.
    pub const NO_PADDING_BYTE: u32 = 1 << 4;
    /// Continuation-coded integers and lengths.
    pub const COMPACT_INTEGERS: u32 = 0x20;
    /// Bit 6 set: named objects carry no second name.
    pub const NO_LONG_NAME: u32 = 1 << 6;
    /// Section is DEFLATE-compressed after decryption.
    pub const COMPRESSED: u32 = 0x100;

    pub fn contains(self, bits: u32) -> bool {
        self.0 & bits == bits
    }

    pub fn compact_integers(self) -> bool {
        self.contains(Self::COMPACT_INTEGERS)
    }

    pub fn compressed(self) -> bool {
        self.contains(Self::COMPRESSED)
    }
}

impl fmt::Display for OptimizationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#06x}", self.0)
    }
}

/// Size and attributes of one of the three transformed sections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionInfo {
    pub size: i32,
    pub attributes: OptimizationFlags,
}

/// The fixed 0x44-byte header following the magic and the header size field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerHeader {
    pub format_tag: FormatTag,
    /// Diagnostic only; the hash block always follows the meta info text.
    pub hash_block_offset: i32,
    pub client_id: i32,
    pub xor_mask_size: i32,
    pub meta_info_block_size: i32,
    pub reserved: i32,
    /// Number of objects in the offset table.
    pub object_count: i32,
    pub size_list: SectionInfo,
    pub binary: SectionInfo,
    pub strings: SectionInfo,
    /// Typically `ee ee ee ee ee ee ee ee`; meaning unknown.
    pub uninitialized: [u8; 8],
    pub flash_size: i32,
    pub meta_info_size: i32,
}

/// Which half of the hash block a digest advisory refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DigestScope {
    /// Magic, header and meta info.
    Header,
    /// The three sections as stored, after XOR only.
    Body,
}

impl fmt::Display for DigestScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DigestScope::Header => write!(f, "header"),
            DigestScope::Body => write!(f, "body"),
        }
    }
}

/// A recoverable finding raised while loading a container.
///
/// Checksum reliability varies across format variants, so none of these
/// abort decoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Advisory {
    DigestMismatch {
        scope: DigestScope,
        stored: [u8; 16],
        computed: [u8; 16],
    },
    /// The cursor stopped short of the end of the file.
    TrailingData { cursor: usize, file_len: usize },
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Advisory::DigestMismatch {
                scope,
                stored,
                computed,
            } => write!(
                f,
                "{} MD5 mismatch: stored {}, computed {}",
                scope,
                hex::encode(stored),
                hex::encode(computed)
            ),
            Advisory::TrailingData { cursor, file_len } => write!(
                f,
                "cursor stopped at {:#x} of {:#x} bytes; {} trailing bytes skipped",
                cursor,
                file_len,
                file_len.saturating_sub(*cursor)
            ),
        }
    }
}
