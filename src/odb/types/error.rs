//! Custom error types for the odb-reader crate.

use std::io;

use thiserror::Error;

/// The primary error type for all operations in this crate.
#[derive(Debug, Error)]
pub enum OdbError {
    /// The input is too short to hold the magic, the fixed header and the hash block.
    #[error("Invalid ODB file size: {found} bytes, at least {minimum} required")]
    InvalidSize { minimum: usize, found: usize },

    /// The leading 16 bytes are not the ObjectDB magic.
    #[error("Incompatible ODB file: unrecognized magic {0}")]
    IncompatibleMagic(String),

    /// The header declares a size other than the one fixed layout this reader understands.
    #[error("Incompatible ODB header: expected size {expected:#x}, found {found:#x}")]
    IncompatibleHeaderSize { expected: i32, found: i32 },

    /// A read ran past the end of its buffer.
    #[error("Unexpected end of data while reading {context} at offset {offset:#x}")]
    UnexpectedEndOfData { context: &'static str, offset: usize },

    /// Block-cipher input that is not a whole number of blocks.
    #[error("Size mismatch for {context}: {found} bytes is not a multiple of {block_size}")]
    SizeMismatch {
        context: &'static str,
        block_size: usize,
        found: usize,
    },

    /// The inflated length disagrees with the length declared in the section prefix.
    #[error("Inflated section size mismatch: declared {declared} bytes, inflated {actual} bytes")]
    InflateSizeMismatch { declared: i64, actual: usize },

    /// A type id with no entry in the kind table.
    #[error("Unknown object type id {0:#x}")]
    UnknownObjectType(i32),

    /// An object index past the end of the offset table.
    #[error("Object index {index} out of range: container holds {count} objects")]
    ObjectIndexOutOfRange { index: usize, count: usize },

    /// An indirect string points outside the string table.
    #[error("String offset {offset:#x} is outside the string table ({len} bytes)")]
    StringOffsetOutOfRange { offset: u32, len: usize },

    /// A section needs block decryption but no key is known for the client.
    #[error("No decryption key available for client id {0:#010x}")]
    MissingClientKey(i32),

    /// The key provider returned a key the block cipher cannot use.
    #[error("Invalid block cipher key for client id {client_id:#010x}: {len} bytes")]
    InvalidKey { client_id: i32, len: usize },

    /// The DEFLATE stream itself is corrupt.
    #[error("Decompression failed: {0}")]
    DecompressionError(String),

    /// The file is structurally invalid in a way not covered by a more specific variant.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    /// A layout the format is known to have, but whose encoding has not been worked out.
    #[error("Unsupported layout: {0}")]
    Unsupported(&'static str),

    /// An error originating from I/O operations.
    #[error("I/O error: {0:?}")]
    Io(#[from] io::Error),
}

/// A convenience `Result` type alias using the crate's `OdbError` type.
pub type Result<T> = std::result::Result<T, OdbError>;
