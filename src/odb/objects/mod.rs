//! Typed decoding of objects in the binary section.
//!
//! An object starts with an i32 type id. The id is looked up in a
//! [`KindTable`]; known kinds decode their full field sequence, unknown ids
//! produce an [`ObjectBody::Unknown`] placeholder holding only the base
//! fields.
//!
//! Field presence depends on the container's [`FormatTag`] and on the binary
//! section's [`OptimizationFlags`]; the rules live in [`gates`].

mod base;
mod dbref;
pub mod gates;
mod kinds;
mod parts;

use std::collections::HashMap;

use log::{trace, warn};

pub use base::{BaseFields, Decode, NamedFields};
pub use dbref::DbRef;
pub use kinds::{Category, DataBlock, ExternalFile, FlashClass, FlashData, FlashDataSource, VdxFlash};
pub use parts::{
    DataFile, DataFormat, Description, EncryptCompressMethod, ExternalDoc, Filter, Security,
    SecurityMethod, TargetAddrOffset, Text, VersionedValue,
};

use crate::odb::stream::OdbStream;
use crate::odb::types::error::{OdbError, Result};
use crate::odb::types::models::{FormatTag, OptimizationFlags};

/// Assumed type id of [`VdxFlash`] objects.
///
/// The value is not confirmed by any recorded layout; register the real id
/// with [`KindTable::with_kind`] when it differs.
pub const VDX_FLASH_TYPE_ID: i32 = 0x0C;
/// Assumed type id of [`ExternalFile`] objects; see [`VDX_FLASH_TYPE_ID`].
pub const EXTERNAL_FILE_TYPE_ID: i32 = 0x2B;

/// The top-level kinds a type id can resolve to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectKind {
    Category,
    VdxFlash,
    FlashClass,
    FlashData,
    DataBlock,
    ExternalFile,
}

/// Maps raw type ids to object kinds.
///
/// The default table holds only the assumed ids [`VDX_FLASH_TYPE_ID`] and
/// [`EXTERNAL_FILE_TYPE_ID`]. Callers that know the real ids of their files
/// register or override them with [`with_kind`](Self::with_kind).
#[derive(Debug, Clone)]
pub struct KindTable {
    kinds: HashMap<i32, ObjectKind>,
}

impl Default for KindTable {
    fn default() -> Self {
        Self::empty()
            .with_kind(VDX_FLASH_TYPE_ID, ObjectKind::VdxFlash)
            .with_kind(EXTERNAL_FILE_TYPE_ID, ObjectKind::ExternalFile)
    }
}

impl KindTable {
    pub fn empty() -> Self {
        Self {
            kinds: HashMap::new(),
        }
    }

    pub fn with_kind(mut self, type_id: i32, kind: ObjectKind) -> Self {
        self.kinds.insert(type_id, kind);
        self
    }

    pub fn lookup(&self, type_id: i32) -> Result<ObjectKind> {
        self.kinds
            .get(&type_id)
            .copied()
            .ok_or(OdbError::UnknownObjectType(type_id))
    }

    /// Decodes the object starting at `offset` in `binary`.
    ///
    /// Strings are read through `strings`. The call is pure: the same inputs
    /// always produce the same object, and nothing is cached.
    pub fn decode_at(
        &self,
        binary: &[u8],
        offset: usize,
        strings: &[u8],
        flags: OptimizationFlags,
        tag: FormatTag,
    ) -> Result<OdbObject> {
        let mut r = OdbStream::new(binary, flags).with_strings(strings);
        r.seek(offset);
        let type_id = r.read_i32()?;
        trace!("Object at {:#x}: type id {:#x}", offset, type_id);

        let body = match self.lookup(type_id) {
            Ok(kind) => decode_kind(kind, &mut r, tag)?,
            Err(OdbError::UnknownObjectType(id)) => {
                warn!(
                    "Unknown object type id {:#x} at {:#x}; decoding base fields only",
                    id, offset
                );
                ObjectBody::Unknown(BaseFields::decode(&mut r, tag)?)
            }
            Err(e) => return Err(e),
        };

        Ok(OdbObject {
            type_id,
            format_tag: tag,
            offset,
            body,
        })
    }
}

fn decode_kind(kind: ObjectKind, r: &mut OdbStream<'_>, tag: FormatTag) -> Result<ObjectBody> {
    Ok(match kind {
        ObjectKind::Category => ObjectBody::Category(Category::decode(r, tag)?),
        ObjectKind::VdxFlash => ObjectBody::VdxFlash(VdxFlash::decode(r, tag)?),
        ObjectKind::FlashClass => ObjectBody::FlashClass(FlashClass::decode(r, tag)?),
        ObjectKind::FlashData => ObjectBody::FlashData(FlashData::decode(r, tag)?),
        ObjectKind::DataBlock => ObjectBody::DataBlock(DataBlock::decode(r, tag)?),
        ObjectKind::ExternalFile => ObjectBody::ExternalFile(ExternalFile::decode(r, tag)?),
    })
}

/// [`KindTable::decode_at`] with the default table.
pub fn decode_at(
    binary: &[u8],
    offset: usize,
    strings: &[u8],
    flags: OptimizationFlags,
    tag: FormatTag,
) -> Result<OdbObject> {
    KindTable::default().decode_at(binary, offset, strings, flags, tag)
}

/// One decoded object. The format tag is fixed at construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OdbObject {
    pub type_id: i32,
    pub format_tag: FormatTag,
    /// Offset of the type id within the binary section.
    pub offset: usize,
    pub body: ObjectBody,
}

impl OdbObject {
    pub fn kind(&self) -> Option<ObjectKind> {
        match self.body {
            ObjectBody::Category(_) => Some(ObjectKind::Category),
            ObjectBody::VdxFlash(_) => Some(ObjectKind::VdxFlash),
            ObjectBody::FlashClass(_) => Some(ObjectKind::FlashClass),
            ObjectBody::FlashData(_) => Some(ObjectKind::FlashData),
            ObjectBody::DataBlock(_) => Some(ObjectKind::DataBlock),
            ObjectBody::ExternalFile(_) => Some(ObjectKind::ExternalFile),
            ObjectBody::Unknown(_) => None,
        }
    }

    /// The base fields every object starts with.
    pub fn base(&self) -> &BaseFields {
        match &self.body {
            ObjectBody::Category(c) => &c.named.base,
            ObjectBody::VdxFlash(v) => &v.category.named.base,
            ObjectBody::FlashClass(f) => &f.named.base,
            ObjectBody::FlashData(f) => &f.named.base,
            ObjectBody::DataBlock(d) => &d.named.base,
            ObjectBody::ExternalFile(e) => &e.base,
            ObjectBody::Unknown(base) => base,
        }
    }

    /// The named fields, for kinds that have them.
    pub fn named(&self) -> Option<&NamedFields> {
        match &self.body {
            ObjectBody::Category(c) => Some(&c.named),
            ObjectBody::VdxFlash(v) => Some(&v.category.named),
            ObjectBody::FlashClass(f) => Some(&f.named),
            ObjectBody::FlashData(f) => Some(&f.named),
            ObjectBody::DataBlock(d) => Some(&d.named),
            ObjectBody::ExternalFile(_) | ObjectBody::Unknown(_) => None,
        }
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self.body, ObjectBody::Unknown(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectBody {
    Category(Category),
    VdxFlash(VdxFlash),
    FlashClass(FlashClass),
    FlashData(FlashData),
    DataBlock(DataBlock),
    ExternalFile(ExternalFile),
    /// Type id not in the kind table; only the base fields were decoded.
    Unknown(BaseFields),
}
