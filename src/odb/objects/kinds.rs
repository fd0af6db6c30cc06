//! Top-level object kinds.
//!
//! Each kind decodes its ancestor's fields first, then its own, e.g.
//! `VdxFlash` = `Category` fields + own fields, `Category` = named fields +
//! own fields.

use log::trace;

use super::base::{BaseFields, Decode, NamedFields, gate};
use super::dbref::DbRef;
use super::gates;
use super::parts::{DataFile, DataFormat, EncryptCompressMethod, Filter, Security, TargetAddrOffset};
use crate::odb::stream::OdbStream;
use crate::odb::types::error::{OdbError, Result};
use crate::odb::types::models::FormatTag;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Category {
    pub named: NamedFields,
    pub category_name: String,
    pub signed_value: Option<i32>,
    pub value: u32,
    pub members: Vec<u32>,
    pub trailing: Option<Vec<u32>>,
}

impl Decode for Category {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        let named = NamedFields::decode(r, tag)?;
        let category_name = r.read_string()?;
        let signed_value = if gate(r, tag, gates::CATEGORY_SIGNED_VALUE) {
            Some(r.read_i32()?)
        } else {
            None
        };
        let value = r.read_u32()?;
        let members = r.read_array()?;
        let trailing = if gate(r, tag, gates::CATEGORY_TRAILING_ARRAY) {
            Some(r.read_array()?)
        } else {
            None
        };
        Ok(Self {
            named,
            category_name,
            signed_value,
            value,
            members,
            trailing,
        })
    }
}

/// Root flash object, a specialised [`Category`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct VdxFlash {
    pub category: Category,
    pub flash_name: String,
    pub first: Vec<u32>,
    pub second: Vec<u32>,
    pub trailing: Option<Vec<u32>>,
}

impl Decode for VdxFlash {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        let category = Category::decode(r, tag)?;
        let flash_name = r.read_string()?;
        let first = r.read_array()?;
        let second = r.read_array()?;
        let trailing = if gate(r, tag, gates::VDX_FLASH_TRAILING_ARRAY) {
            Some(r.read_array()?)
        } else {
            None
        };
        Ok(Self {
            category,
            flash_name,
            first,
            second,
            trailing,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FlashClass {
    pub named: NamedFields,
    pub class_name: String,
}

impl Decode for FlashClass {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        Ok(Self {
            named: NamedFields::decode(r, tag)?,
            class_name: r.read_string()?,
        })
    }
}

/// How a [`FlashData`] object locates its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FlashDataSource {
    /// Mode 1 from format `0x10201`: a value in the stream.
    Inline(u32),
    /// Mode 2: a data file.
    File(DataFile),
    /// Any other mode, or mode 1 before `0x10201`.
    None,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlashData {
    pub named: NamedFields,
    pub mode: i32,
    pub data_name: String,
    pub first_optional: Option<u32>,
    pub second_optional: Option<u32>,
    pub second_name: Option<String>,
    pub data_format: DataFormat,
    pub encrypt_compress_method: Option<EncryptCompressMethod>,
    pub source: FlashDataSource,
}

impl Decode for FlashData {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        let named = NamedFields::decode(r, tag)?;
        let mode = r.read_i32()?;
        let data_name = r.read_string()?;

        let (first_optional, second_optional) = if gate(r, tag, gates::FLASH_DATA_OPTIONAL_VALUES)
        {
            let first = if r.read_bool()? { Some(r.read_u32()?) } else { None };
            let second = if r.read_bool()? { Some(r.read_u32()?) } else { None };
            (first, second)
        } else {
            (None, None)
        };

        let second_name = if gate(r, tag, gates::FLASH_DATA_SECOND_STRING) {
            Some(r.read_string()?)
        } else {
            None
        };

        let data_format = DataFormat::decode(r, tag)?;
        let encrypt_compress_method = if r.read_bool()? {
            Some(EncryptCompressMethod::decode(r, tag)?)
        } else {
            None
        };

        let source = match mode {
            1 if gate(r, tag, gates::FLASH_DATA_MODE_VALUE) => FlashDataSource::Inline(r.read_u32()?),
            2 => FlashDataSource::File(DataFile::decode(r, tag)?),
            _ => FlashDataSource::None,
        };

        Ok(Self {
            named,
            mode,
            data_name,
            first_optional,
            second_optional,
            second_name,
            data_format,
            encrypt_compress_method,
            source,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataBlock {
    pub named: NamedFields,
    pub first_text: String,
    pub second_text: String,
    pub first: Vec<u32>,
    pub filters: Vec<Filter>,
    pub db_ref: DbRef,
    pub target_addr_offset: Option<TargetAddrOffset>,
    pub second: Vec<u32>,
    pub third: Vec<u32>,
    pub securities: Vec<Security>,
}

impl Decode for DataBlock {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        let named = NamedFields::decode(r, tag)?;
        let first_text = r.read_string()?;
        let second_text = r.read_string()?;

        if gate(r, tag, gates::DATA_BLOCK_BYTE_FIELD_FLAG) && r.read_bool()? {
            return Err(OdbError::Unsupported("data block with leading byte field"));
        }

        let first = r.read_array()?;
        let filter_count = r.read_u32()?;
        trace!("Data block '{}': {} filters", named.name, filter_count);
        let mut filters = Vec::new();
        for _ in 0..filter_count {
            filters.push(Filter::decode(r, tag)?);
        }

        let db_ref = r.read_db_ref()?;
        let target_addr_offset = if r.read_bool()? {
            Some(TargetAddrOffset::decode(r, tag)?)
        } else {
            None
        };

        let second = r.read_array()?;
        let third = r.read_array()?;
        let security_count = r.read_u32()?;
        let mut securities = Vec::new();
        for _ in 0..security_count {
            securities.push(Security::decode(r, tag)?);
        }

        if gate(r, tag, gates::DATA_BLOCK_AUDIENCE_FLAG) && r.read_bool()? {
            return Err(OdbError::Unsupported("data block audience"));
        }

        Ok(Self {
            named,
            first_text,
            second_text,
            first,
            filters,
            db_ref,
            target_addr_offset,
            second,
            third,
            securities,
        })
    }
}

/// A file embedded in the binary section (java code, library or flash data).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalFile {
    pub base: BaseFields,
    pub file_name: Option<String>,
    pub file_size: Option<u32>,
    /// Index of the object holding the file content.
    pub object_index: Option<u32>,
    /// 0 undefined, 1 java code, 2 library, 3 flash data.
    pub file_type: Option<i32>,
}

impl Decode for ExternalFile {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        let base = BaseFields::decode(r, tag)?;
        let file_name = if gate(r, tag, gates::EXTERNAL_FILE_NAME) {
            Some(r.read_string()?)
        } else {
            None
        };
        let file_size = if gate(r, tag, gates::EXTERNAL_FILE_SIZE) {
            Some(r.read_u32()?)
        } else {
            None
        };
        let object_index = if gate(r, tag, gates::EXTERNAL_FILE_OBJECT_INDEX) {
            Some(r.read_u32()?)
        } else {
            None
        };
        let file_type = if gate(r, tag, gates::EXTERNAL_FILE_TYPE) {
            Some(r.read_i32()?)
        } else {
            None
        };
        Ok(Self {
            base,
            file_name,
            file_size,
            object_index,
            file_type,
        })
    }
}
