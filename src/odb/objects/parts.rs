//! Sub-objects owned by the top-level kinds.
//!
//! None of these carry the base fields; each starts with the padding byte
//! only.

use log::trace;

use super::base::{Decode, gate, skip_padding_byte};
use super::gates;
use crate::odb::stream::OdbStream;
use crate::odb::types::error::{OdbError, Result};
use crate::odb::types::models::FormatTag;

/// A value stored as a byte field from format `0x10200` on and as a string before.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VersionedValue {
    Bytes(Vec<u8>),
    Text(String),
}

impl VersionedValue {
    fn read(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        if gate(r, tag, gates::BYTE_FIELD_VALUES) {
            Ok(VersionedValue::Bytes(r.read_byte_field()?))
        } else {
            Ok(VersionedValue::Text(r.read_string()?))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Text {
    pub text: String,
    pub second_text: String,
}

impl Decode for Text {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        Ok(Self {
            text: r.read_string()?,
            second_text: r.read_string()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Description {
    pub text: String,
    pub second_text: Option<String>,
    /// Number of (otherwise empty) inline entries between the strings and the documents.
    pub inline_entries: u32,
    pub external_docs: Vec<ExternalDoc>,
}

impl Decode for Description {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        let text = r.read_string()?;
        let second_text = if gate(r, tag, gates::DESCRIPTION_SECOND_STRING) {
            Some(r.read_string()?)
        } else {
            None
        };

        let inline_entries = r.read_u32()?;
        for _ in 0..inline_entries {
            skip_padding_byte(r, tag)?;
        }

        if !gate(r, tag, gates::DESCRIPTION_EXTERNAL_DOCS) {
            return Err(OdbError::Unsupported(
                "description sub-object below format tag 0x10500",
            ));
        }

        let doc_count = r.read_u32()?;
        let mut external_docs = Vec::new();
        for _ in 0..doc_count {
            external_docs.push(ExternalDoc::decode(r, tag)?);
        }

        Ok(Self {
            text,
            second_text,
            inline_entries,
            external_docs,
        })
    }
}

/// Document reference inside a [`Description`]. Its strings only exist
/// below format `0x104ff`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExternalDoc {
    pub first_text: Option<String>,
    pub second_text: Option<String>,
}

impl Decode for ExternalDoc {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        if gate(r, tag, gates::EXTERNAL_DOC_STRINGS) {
            Ok(Self {
                first_text: Some(r.read_string()?),
                second_text: Some(r.read_string()?),
            })
        } else {
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Filter {
    pub mode: i32,
    pub value: VersionedValue,
    /// Present in mode 1.
    pub second_value: Option<VersionedValue>,
    /// Present in mode 2.
    pub extra: Option<u32>,
}

impl Decode for Filter {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        let mode = r.read_i32()?;
        let value = VersionedValue::read(r, tag)?;
        let (second_value, extra) = match mode {
            1 => (Some(VersionedValue::read(r, tag)?), None),
            2 => (None, Some(r.read_u32()?)),
            _ => (None, None),
        };
        Ok(Self {
            mode,
            value,
            second_value,
            extra,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAddrOffset {
    pub mode: i32,
    /// Present in modes 1 and 2.
    pub value: Option<VersionedValue>,
}

impl Decode for TargetAddrOffset {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        let mode = r.read_i32()?;
        let value = match mode {
            1 | 2 => Some(VersionedValue::read(r, tag)?),
            _ => None,
        };
        Ok(Self { mode, value })
    }
}

/// One optional `(method, value)` pair of a [`Security`] record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecurityMethod {
    pub method: i32,
    pub value: String,
}

impl SecurityMethod {
    fn read_optional(r: &mut OdbStream<'_>) -> Result<Option<Self>> {
        if !r.read_bool()? {
            return Ok(None);
        }
        Ok(Some(Self {
            method: r.read_i32()?,
            value: r.read_string()?,
        }))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Security {
    pub security_method: Option<SecurityMethod>,
    pub fw_checksum: Option<SecurityMethod>,
    pub validity_for: Option<SecurityMethod>,
    pub fw_signature: Option<SecurityMethod>,
}

impl Decode for Security {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        Ok(Self {
            security_method: SecurityMethod::read_optional(r)?,
            fw_checksum: SecurityMethod::read_optional(r)?,
            validity_for: SecurityMethod::read_optional(r)?,
            fw_signature: SecurityMethod::read_optional(r)?,
        })
    }
}

/// Data format selections that survive normalization unchanged.
const DATA_FORMATS: &[(i32, &str)] = &[
    (0, "<Undefined>"),
    (1, "IntelHex"),
    (2, "MotorolaS"),
    (3, "Binary"),
    (8, "UserDefined"),
];

/// Legacy selections rewritten to `UserDefined` with an explicit name.
const LEGACY_DATA_FORMATS: &[(i32, &str)] = &[
    (4, "MotorolaSZipped"),
    (5, "IntelHexZipped"),
    (6, "SegmentedBinaryFromMot"),
    (7, "SegmentedBinaryFromIntel"),
];

const USER_DEFINED_FORMAT: i32 = 8;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataFormat {
    pub selection: i32,
    pub legacy_text: Option<String>,
    pub name: Option<String>,
}

impl DataFormat {
    /// Standard name of the current selection, if it has one.
    pub fn selection_name(&self) -> Option<&'static str> {
        DATA_FORMATS
            .iter()
            .find(|(id, _)| *id == self.selection)
            .map(|(_, name)| *name)
    }

    fn normalize(&mut self) {
        if DATA_FORMATS.iter().any(|(id, _)| *id == self.selection) {
            return;
        }
        match LEGACY_DATA_FORMATS.iter().find(|(id, _)| *id == self.selection) {
            Some((_, name)) => {
                trace!("Data format {} rewritten as user defined '{}'", self.selection, name);
                self.name = Some((*name).to_string());
                self.selection = USER_DEFINED_FORMAT;
            }
            None => self.selection = 0,
        }
    }
}

impl Decode for DataFormat {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        let selection = r.read_i32()?;
        let legacy_text = if gate(r, tag, gates::DATA_FORMAT_LEGACY_STRING) {
            Some(r.read_string()?)
        } else {
            None
        };
        let name = if gate(r, tag, gates::DATA_FORMAT_NAME) {
            Some(r.read_string()?)
        } else {
            None
        };

        let mut format = Self {
            selection,
            legacy_text,
            name,
        };
        if gate(r, tag, gates::DATA_FORMAT_NORMALIZE) {
            format.normalize();
        }
        Ok(format)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DataFile {
    pub flag: bool,
    pub file_name: String,
}

impl Decode for DataFile {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        Ok(Self {
            flag: r.read_bool()?,
            file_name: r.read_string()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EncryptCompressMethod {
    pub method: i32,
    pub value: String,
}

impl Decode for EncryptCompressMethod {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        Ok(Self {
            method: r.read_i32()?,
            value: r.read_string()?,
        })
    }
}
