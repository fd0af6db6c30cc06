//! # odb-reader
//!
//! A reader for ObjectDB containers (ODB, SMR-D and SMR-F files) used to
//! distribute ECU flashing metadata and embedded binary payloads.
//!
//! Containers are XOR-masked, Blowfish-encrypted and DEFLATE-compressed. The
//! object stream inside has no schema; its layout depends on the header's
//! format tag and on per-section optimization flags.
//!
//! **Note:** Decryption keys are supplied by the caller through a
//! [`KeyProvider`]; none are bundled.
pub mod odb;

// Re-export the main types for convenience
pub use odb::{
    Advisory, Container, DigestScope, FormatTag, KeyProvider, KeyTable, KindTable, LoadOptions,
    ObjectBody, ObjectKind, OdbError, OdbObject, OptimizationFlags, Result, load_container,
};
