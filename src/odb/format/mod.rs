//! File format parsing layer for ODB containers.
//!
//! This module bridges between the raw file bytes and the high-level
//! [`Container`](crate::odb::container::Container).
//!
//! # Module Organization
//!
//! - [`header`]: Validates the magic and parses the fixed header
//! - [`sections`]: Walks the masked region and reconstructs each section
//! - [`strings`]: Splits the string section into records
//! - [`offsets`]: Rebuilds object offsets from the size list
//! - [`flash`]: Parses the segment layout of the flash payload
//!
//! # Architecture
//!
//! ```text
//! File Structure:
//! ┌─────────────────┐
//! │  Magic + Header │ ← header::parse()
//! ├─────────────────┤
//! │  Meta info text │
//! ├─────────────────┤
//! │  Hash block     │ ← SectionReader::read_hash_block()   (XOR)
//! ├─────────────────┤
//! │  Size list      │ ← SectionReader::read_section()      (XOR, Blowfish, inflate)
//! │  Binary         │
//! │  Strings        │
//! ├─────────────────┤
//! │  Flash payload  │ ← SectionReader::read_flash()        (XOR)
//! └─────────────────┘
//! ```

pub mod flash;
pub mod header;
pub mod offsets;
pub mod sections;
pub mod strings;
