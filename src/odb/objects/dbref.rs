//! Compact bitfield-gated reference record.

/// A reference to another database object.
///
/// Which fields are present is decided by the leading bitfield byte; see
/// [`OdbStream::read_db_ref`](crate::odb::stream::OdbStream::read_db_ref)
/// for the read order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DbRef {
    pub bitfield: u8,
    /// Present when the bitfield is negative as a signed byte.
    pub leading: Option<u32>,
    /// Present when any of `0x70` is set.
    pub class_name: Option<String>,
    /// Bit 0.
    pub name: Option<String>,
    /// Bit 1.
    pub extra: Option<u8>,
    /// Bit 2.
    pub qualifier: Option<String>,
}

impl DbRef {
    pub const CLASS_MASK: u8 = 0x70;
    pub const HAS_NAME: u8 = 0x01;
    pub const HAS_BYTE: u8 = 0x02;
    pub const HAS_QUALIFIER: u8 = 0x04;

    pub fn has_leading(&self) -> bool {
        (self.bitfield as i8) < 0
    }
}
