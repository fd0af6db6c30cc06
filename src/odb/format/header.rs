//! Container magic and fixed header parsing.
//!
//! # Header Structure
//! ```text
//! 0x00 [16 bytes] Magic
//! 0x10 [i32]      Header size (always 0x44)
//! 0x14 [i32]      Format tag
//! 0x18 [i32]      Hash block offset (diagnostic)
//! 0x1C [i32]      Client id
//! 0x20 [i32]      XOR mask size
//! 0x24 [i32]      Meta info block size
//! 0x28 [i32]      Reserved
//! 0x2C [i32]      Object count
//! 0x30 [i32 × 2]  Size list section size / attributes
//! 0x38 [i32 × 2]  Binary section size / attributes
//! 0x40 [i32 × 2]  String section size / attributes
//! 0x48 [8 bytes]  Uninitialized marker
//! 0x50 [i32]      Flash payload size
//! 0x54 [i32]      Meta info size
//! ```
//! All integers are little-endian.

use std::io::{Cursor, Read};

use byteorder::{LittleEndian, ReadBytesExt};
use log::{debug, info, trace};

use crate::odb::types::error::{OdbError, Result};
use crate::odb::types::models::{
    ContainerHeader, FormatTag, HEADER_SIZE, MINIMUM_FILE_SIZE, ODB_MAGIC, OptimizationFlags,
    SectionInfo,
};

/// Parses the magic and fixed header from the start of `file`.
///
/// On success the cursor is positioned at the meta info text (offset 0x58).
///
/// # Errors
/// - [`OdbError::InvalidSize`] if the file cannot hold the magic, header and
///   hash block; checked before anything else is read
/// - [`OdbError::IncompatibleMagic`] if the magic does not match
/// - [`OdbError::IncompatibleHeaderSize`] if the header size is not 0x44
pub fn parse(cursor: &mut Cursor<&[u8]>) -> Result<ContainerHeader> {
    let file_len = cursor.get_ref().len();
    if file_len < MINIMUM_FILE_SIZE {
        return Err(OdbError::InvalidSize {
            minimum: MINIMUM_FILE_SIZE,
            found: file_len,
        });
    }

    let mut magic = [0u8; 16];
    cursor.read_exact(&mut magic)?;
    if magic != ODB_MAGIC {
        return Err(OdbError::IncompatibleMagic(hex::encode(magic)));
    }

    let header_size = cursor.read_i32::<LittleEndian>()?;
    if header_size != HEADER_SIZE {
        return Err(OdbError::IncompatibleHeaderSize {
            expected: HEADER_SIZE,
            found: header_size,
        });
    }

    let format_tag = FormatTag(cursor.read_i32::<LittleEndian>()?);
    let hash_block_offset = cursor.read_i32::<LittleEndian>()?;
    let client_id = cursor.read_i32::<LittleEndian>()?;
    let xor_mask_size = cursor.read_i32::<LittleEndian>()?;
    let meta_info_block_size = cursor.read_i32::<LittleEndian>()?;
    let reserved = cursor.read_i32::<LittleEndian>()?;
    let object_count = cursor.read_i32::<LittleEndian>()?;
    let size_list = read_section_info(cursor)?;
    let binary = read_section_info(cursor)?;
    let strings = read_section_info(cursor)?;
    let mut uninitialized = [0u8; 8];
    cursor.read_exact(&mut uninitialized)?;
    let flash_size = cursor.read_i32::<LittleEndian>()?;
    let meta_info_size = cursor.read_i32::<LittleEndian>()?;

    debug!(
        "Header: file size {:#x}, format tag {}, client id {:#010x}, XOR mask size {:#x}",
        file_len, format_tag, client_id, xor_mask_size
    );
    debug!(
        "Sections: size list {:#x}/{}, binary {:#x}/{}, strings {:#x}/{}, flash {:#x}",
        size_list.size,
        size_list.attributes,
        binary.size,
        binary.attributes,
        strings.size,
        strings.attributes,
        flash_size
    );
    trace!(
        "Header extras: hash block offset {:#x}, meta info block {:#x}, reserved {:#x}, uninitialized {}",
        hash_block_offset,
        meta_info_block_size,
        reserved,
        hex::encode(uninitialized)
    );
    info!(
        "ODB header parsed: format tag {}, {} objects",
        format_tag, object_count
    );

    Ok(ContainerHeader {
        format_tag,
        hash_block_offset,
        client_id,
        xor_mask_size,
        meta_info_block_size,
        reserved,
        object_count,
        size_list,
        binary,
        strings,
        uninitialized,
        flash_size,
        meta_info_size,
    })
}

fn read_section_info(cursor: &mut Cursor<&[u8]>) -> Result<SectionInfo> {
    let size = cursor.read_i32::<LittleEndian>()?;
    let attributes = OptimizationFlags(cursor.read_u32::<LittleEndian>()?);
    Ok(SectionInfo { size, attributes })
}

/// Converts a header-declared length to `usize`, rejecting negative values.
pub fn declared_len(value: i32, field: &str) -> Result<usize> {
    usize::try_from(value)
        .map_err(|_| OdbError::InvalidFormat(format!("negative {} in header: {}", field, value)))
}
