//! Segment layout of the SMR-F flash payload.
//!
//! ```text
//! [u32] Version
//! [u32] Segment count N
//! N × ([u32] start address, [u32] size)
//! N × segment bytes, in table order
//! ```
//! All integers are little-endian.

use std::fmt;

use byteorder::{ByteOrder, LittleEndian};
use log::debug;

use crate::odb::types::error::{OdbError, Result};

/// One contiguous memory segment of flash data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashSegment {
    pub address: u32,
    pub content: Vec<u8>,
}

impl FlashSegment {
    /// Address one past the segment's last byte, wrapping in the 32-bit
    /// address space.
    pub fn end_address(&self) -> u32 {
        self.address.wrapping_add(self.content.len() as u32)
    }
}

impl fmt::Display for FlashSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Segment_0x{:08X}_0x{:08X}", self.address, self.end_address())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashContent {
    pub version: u32,
    pub segments: Vec<FlashSegment>,
}

impl FlashContent {
    pub fn parse(payload: &[u8]) -> Result<Self> {
        let mut pos = 0usize;
        let version = LittleEndian::read_u32(take(payload, &mut pos, 4, "flash version")?);
        let count = LittleEndian::read_u32(take(payload, &mut pos, 4, "flash segment count")?) as usize;

        let mut table = Vec::with_capacity(count.min(payload.len() / 8));
        for _ in 0..count {
            let address = LittleEndian::read_u32(take(payload, &mut pos, 4, "flash segment address")?);
            let size = LittleEndian::read_u32(take(payload, &mut pos, 4, "flash segment size")?) as usize;
            table.push((address, size));
        }

        let mut segments = Vec::with_capacity(table.len());
        for (address, size) in table {
            let content = take(payload, &mut pos, size, "flash segment content")?.to_vec();
            segments.push(FlashSegment { address, content });
        }

        debug!(
            "Flash content version {:#x}: {} segments",
            version,
            segments.len()
        );
        Ok(Self { version, segments })
    }
}

fn take<'p>(payload: &'p [u8], pos: &mut usize, len: usize, context: &'static str) -> Result<&'p [u8]> {
    let end = pos
        .checked_add(len)
        .filter(|&end| end <= payload.len())
        .ok_or(OdbError::UnexpectedEndOfData {
            context,
            offset: *pos,
        })?;
    let bytes = &payload[*pos..end];
    *pos = end;
    Ok(bytes)
}
