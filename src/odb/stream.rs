//! Cursor decoder for the object stream.
//!
//! The binary and size-list sections are a schema-free stream of primitive
//! values. Their encoding width depends on the section's optimization flags:
//!
//! | flag `0x20` | integers                 | array lengths                   |
//! |-------------|--------------------------|---------------------------------|
//! | clear       | 4 bytes little-endian    | 1 byte, `0xFF` escapes to a u32 |
//! | set         | continuation-coded, ≤ 5B | continuation-coded u32          |
//!
//! Strings are either inline NUL-terminated runs, or offsets into the shared
//! string table when one is bound.

use byteorder::{ByteOrder, LittleEndian};
use log::trace;

use crate::odb::objects::DbRef;
use crate::odb::types::error::{OdbError, Result};
use crate::odb::types::models::OptimizationFlags;

/// Escape value of a one-byte array length in fixed-width mode.
const ARRAY_LENGTH_ESCAPE: u8 = 0xFF;

/// Maximum bytes in a continuation-coded unsigned integer.
const MAX_VARINT_BYTES: usize = 5;

#[derive(Debug, Clone)]
pub struct OdbStream<'a> {
    data: &'a [u8],
    pos: usize,
    flags: OptimizationFlags,
    strings: Option<&'a [u8]>,
}

impl<'a> OdbStream<'a> {
    /// A stream over `data` with inline strings.
    pub fn new(data: &'a [u8], flags: OptimizationFlags) -> Self {
        Self {
            data,
            pos: 0,
            flags,
            strings: None,
        }
    }

    /// Binds a string table; subsequent [`read_string`](Self::read_string)
    /// calls read offsets into it instead of inline text.
    pub fn with_strings(mut self, strings: &'a [u8]) -> Self {
        self.strings = Some(strings);
        self
    }

    /// Moves the cursor to an absolute position.
    ///
    /// Positions past the end are accepted; the next read fails.
    pub fn seek(&mut self, pos: usize) {
        self.pos = pos;
    }

    pub fn position(&self) -> usize {
        self.pos
    }

    pub fn flags(&self) -> OptimizationFlags {
        self.flags
    }

    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.pos)
    }

    fn take(&mut self, len: usize, context: &'static str) -> Result<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(OdbError::UnexpectedEndOfData {
                context,
                offset: self.pos,
            })?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    pub fn read_byte(&mut self) -> Result<u8> {
        Ok(self.take(1, "byte")?[0])
    }

    /// One raw byte; any nonzero value is `true`.
    pub fn read_bool(&mut self) -> Result<bool> {
        Ok(self.read_byte()? != 0)
    }

    /// Reads an unsigned 32-bit integer.
    ///
    /// In compact mode each byte contributes its low 7 bits, most significant
    /// group first; a set top bit means another byte follows, up to 5 bytes.
    pub fn read_u32(&mut self) -> Result<u32> {
        if !self.flags.compact_integers() {
            return Ok(LittleEndian::read_u32(self.take(4, "u32")?));
        }

        let mut value = 0u32;
        for _ in 0..MAX_VARINT_BYTES {
            let byte = self.take(1, "variable u32")?[0];
            value = value.wrapping_mul(0x80).wrapping_add(u32::from(byte & 0x7F));
            if (byte as i8) >= 0 {
                break;
            }
        }
        Ok(value)
    }

    /// Reads a signed 32-bit integer.
    ///
    /// In compact mode the first byte holds a continuation bit (`0x80`), a
    /// sign bit (`0x40`) and the 6 most significant magnitude bits; up to 4
    /// further bytes follow as in [`read_u32`](Self::read_u32).
    pub fn read_i32(&mut self) -> Result<i32> {
        if !self.flags.compact_integers() {
            return Ok(LittleEndian::read_i32(self.take(4, "i32")?));
        }

        let first = self.take(1, "variable i32")?[0];
        let mut value = i32::from(first & 0x3F);
        if (first as i8) < 0 {
            for _ in 0..MAX_VARINT_BYTES - 1 {
                let byte = self.take(1, "variable i32")?[0];
                value = value.wrapping_mul(0x80).wrapping_add(i32::from(byte & 0x7F));
                if (byte as i8) >= 0 {
                    break;
                }
            }
        }
        if first & 0x40 != 0 {
            value = value.wrapping_neg();
        }
        Ok(value)
    }

    /// Reads a length-prefixed array of u32 values. Empty arrays are valid.
    pub fn read_array(&mut self) -> Result<Vec<u32>> {
        let len = if self.flags.compact_integers() {
            self.read_u32()?
        } else {
            match self.read_byte()? {
                ARRAY_LENGTH_ESCAPE => self.read_u32()?,
                short => u32::from(short),
            }
        };
        trace!("Array of {} elements at {:#x}", len, self.pos);

        // Each element is at least one byte, so the remainder bounds the allocation.
        let mut values = Vec::with_capacity((len as usize).min(self.remaining()));
        for _ in 0..len {
            values.push(self.read_u32()?);
        }
        Ok(values)
    }

    /// A u32 length followed by that many raw bytes.
    pub fn read_byte_field(&mut self) -> Result<Vec<u8>> {
        let len = self.read_u32()? as usize;
        Ok(self.take(len, "byte field")?.to_vec())
    }

    /// Reads a UTF-8 string, lossily decoded.
    ///
    /// With a bound string table the stream holds a u32 byte offset and the
    /// text runs from there to the next NUL. Without one the text is inline
    /// and the cursor moves past its terminator.
    pub fn read_string(&mut self) -> Result<String> {
        match self.strings {
            Some(table) => {
                let offset = self.read_u32()?;
                let start = offset as usize;
                if start >= table.len() {
                    return Err(OdbError::StringOffsetOutOfRange {
                        offset,
                        len: table.len(),
                    });
                }
                let len = table[start..].iter().position(|&b| b == 0).ok_or(
                    OdbError::UnexpectedEndOfData {
                        context: "string table record",
                        offset: start,
                    },
                )?;
                Ok(String::from_utf8_lossy(&table[start..start + len]).into_owned())
            }
            None => {
                let rest = self.data.get(self.pos..).unwrap_or_default();
                let len = rest.iter().position(|&b| b == 0).ok_or(
                    OdbError::UnexpectedEndOfData {
                        context: "inline string",
                        offset: self.pos,
                    },
                )?;
                let text = self.take(len + 1, "inline string")?;
                Ok(String::from_utf8_lossy(&text[..len]).into_owned())
            }
        }
    }

    /// Reads a bitfield-gated [`DbRef`].
    ///
    /// Field order after the bitfield byte: leading u32 (sign bit), string
    /// (`0x70`), string (bit 0), raw byte (bit 1), string (bit 2).
    pub fn read_db_ref(&mut self) -> Result<DbRef> {
        let bitfield = self.read_byte()?;
        let mut db_ref = DbRef {
            bitfield,
            ..DbRef::default()
        };

        if (bitfield as i8) < 0 {
            db_ref.leading = Some(self.read_u32()?);
        }
        if bitfield & DbRef::CLASS_MASK != 0 {
            db_ref.class_name = Some(self.read_string()?);
        }
        if bitfield & DbRef::HAS_NAME != 0 {
            db_ref.name = Some(self.read_string()?);
        }
        if bitfield & DbRef::HAS_BYTE != 0 {
            db_ref.extra = Some(self.read_byte()?);
        }
        if bitfield & DbRef::HAS_QUALIFIER != 0 {
            db_ref.qualifier = Some(self.read_string()?);
        }
        Ok(db_ref)
    }
}
