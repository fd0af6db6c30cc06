//! Codec layer for the transforms applied to container sections.
//!
//! This module provides the pure data transformations used by the
//! container parser. None of them know about file layout.
//!
//! # Submodules
//!
//! - [`xor`][]: LCG mask generation and position-keyed XOR
//! - [`crypto`][]: Client key lookup and Blowfish ECB decryption
//! - [`compression`][]: Size-prefixed raw DEFLATE inflation
//! - [`digest`][]: MD5 helpers for the hash block

pub mod compression;
pub mod crypto;
pub mod digest;
pub mod xor;
