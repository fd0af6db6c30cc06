//! Shared field prefixes.
//!
//! Every top-level kind starts with the base fields; named kinds follow them
//! with the named fields. Sub-objects only carry the padding byte.

use log::trace;

use super::gates::{self, Gate};
use super::parts::{Description, Text};
use crate::odb::stream::OdbStream;
use crate::odb::types::error::Result;
use crate::odb::types::models::FormatTag;

/// A value that decodes itself from the object stream.
///
/// `tag` is fixed for the whole decode call and handed down to every child.
pub trait Decode: Sized {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self>;
}

pub(crate) fn gate(r: &OdbStream<'_>, tag: FormatTag, gate: Gate) -> bool {
    gate.holds(tag, r.flags())
}

/// Consumes the legacy padding byte when optimization bit 4 is clear.
pub(crate) fn skip_padding_byte(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<()> {
    if gate(r, tag, gates::PADDING_BYTE) {
        let padding = r.read_byte()?;
        trace!("Padding byte {:#04x} at {:#x}", padding, r.position() - 1);
    }
    Ok(())
}

/// Base fields common to every top-level object.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BaseFields {
    pub base_value: u32,
}

impl Decode for BaseFields {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        skip_padding_byte(r, tag)?;
        if gate(r, tag, gates::PADDING_ARRAY) {
            let padding = r.read_array()?;
            trace!("Padding array of {} elements", padding.len());
        }
        let base_value = r.read_u32()?;
        Ok(Self { base_value })
    }
}

/// Fields of named objects, following the base fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NamedFields {
    pub base: BaseFields,
    pub name: String,
    /// Absent when optimization bit 6 is set.
    pub long_name: Option<String>,
    pub text: Option<Text>,
    pub description: Option<Description>,
}

impl Decode for NamedFields {
    fn decode(r: &mut OdbStream<'_>, tag: FormatTag) -> Result<Self> {
        let base = BaseFields::decode(r, tag)?;
        let name = r.read_string()?;
        let long_name = if gate(r, tag, gates::NAMED_LONG_NAME) {
            Some(r.read_string()?)
        } else {
            None
        };
        let text = if r.read_bool()? {
            Some(Text::decode(r, tag)?)
        } else {
            None
        };
        let description = if r.read_bool()? {
            Some(Description::decode(r, tag)?)
        } else {
            None
        };
        Ok(Self {
            base,
            name,
            long_name,
            text,
            description,
        })
    }
}
