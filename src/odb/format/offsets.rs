//! Object offset table reconstruction.
//!
//! The size-list section stores the byte size of every object in the binary
//! section, encoded with the size list's own optimization flags. Offsets are
//! the running sum: `offsets[0] = 0`, `offsets[k] = offsets[k-1] + size[k-1]`.

use log::{debug, trace};

use crate::odb::stream::OdbStream;
use crate::odb::types::error::Result;
use crate::odb::types::models::OptimizationFlags;

/// Cumulative object offsets into the binary section.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OffsetTable {
    offsets: Vec<u64>,
    /// One past the last object.
    end: u64,
}

impl OffsetTable {
    /// Reads exactly `declared_count` sizes from `size_list`.
    ///
    /// Bytes left over after the last size are ignored.
    pub fn build(
        size_list: &[u8],
        declared_count: usize,
        flags: OptimizationFlags,
    ) -> Result<Self> {
        let mut stream = OdbStream::new(size_list, flags);
        let mut offsets = Vec::with_capacity(declared_count.min(size_list.len()));
        let mut next = 0u64;
        for _ in 0..declared_count {
            offsets.push(next);
            next += u64::from(stream.read_u32()?);
        }

        if stream.remaining() > 0 {
            trace!("{} bytes left unread in size list", stream.remaining());
        }
        debug!(
            "Offset table built: {} objects spanning {:#x} bytes",
            offsets.len(),
            next
        );

        Ok(Self { offsets, end: next })
    }

    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<u64> {
        self.offsets.get(index).copied()
    }

    pub fn as_slice(&self) -> &[u64] {
        &self.offsets
    }

    /// Total size of all objects, i.e. the end of the last one.
    pub fn end(&self) -> u64 {
        self.end
    }
}
