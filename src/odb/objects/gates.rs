//! Field-presence rules for every object kind.
//!
//! The thresholds were observed empirically across format tags `0x10200`
//! to `0x10705`. Inclusive and exclusive edges differ between fields and must
//! stay exactly as listed.

use crate::odb::types::models::{FormatTag, OptimizationFlags};

/// Condition under which an optional field is present in the stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    /// `tag > n`
    TagAbove(i32),
    /// `tag >= n`
    TagAtLeast(i32),
    /// `tag < n`
    TagBelow(i32),
    /// `above < tag < below`
    TagWithin { above: i32, below: i32 },
    /// All of the given optimization bits are clear.
    FlagClear(u32),
}

impl Gate {
    pub fn holds(self, tag: FormatTag, flags: OptimizationFlags) -> bool {
        let tag = tag.0;
        match self {
            Gate::TagAbove(n) => tag > n,
            Gate::TagAtLeast(n) => tag >= n,
            Gate::TagBelow(n) => tag < n,
            Gate::TagWithin { above, below } => above < tag && tag < below,
            Gate::FlagClear(bits) => flags.0 & bits == 0,
        }
    }
}

// Shared prefixes
pub const PADDING_BYTE: Gate = Gate::FlagClear(OptimizationFlags::NO_PADDING_BYTE);
pub const PADDING_ARRAY: Gate = Gate::FlagClear(OptimizationFlags::NO_PADDING_ARRAY);
pub const NAMED_LONG_NAME: Gate = Gate::FlagClear(OptimizationFlags::NO_LONG_NAME);

// Category and VdxFlash
pub const CATEGORY_SIGNED_VALUE: Gate = Gate::TagAbove(0x10201);
pub const CATEGORY_TRAILING_ARRAY: Gate = Gate::TagAbove(0x104ff);
pub const VDX_FLASH_TRAILING_ARRAY: Gate = Gate::TagAbove(0x104ff);

// FlashData
pub const FLASH_DATA_OPTIONAL_VALUES: Gate = Gate::TagAbove(0x104ff);
pub const FLASH_DATA_SECOND_STRING: Gate = Gate::TagAbove(0x10702);
pub const FLASH_DATA_MODE_VALUE: Gate = Gate::TagAtLeast(0x10201);

// DataBlock
pub const DATA_BLOCK_BYTE_FIELD_FLAG: Gate = Gate::TagAbove(0x104ff);
pub const DATA_BLOCK_AUDIENCE_FLAG: Gate = Gate::TagAtLeast(0x10500);

// ExternalFile
pub const EXTERNAL_FILE_NAME: Gate = Gate::TagAtLeast(0x10600);
pub const EXTERNAL_FILE_SIZE: Gate = Gate::TagAtLeast(0x10601);
pub const EXTERNAL_FILE_OBJECT_INDEX: Gate = Gate::TagAtLeast(0x10600);
pub const EXTERNAL_FILE_TYPE: Gate = Gate::TagAtLeast(0x10602);

// Description and ExternalDoc
pub const DESCRIPTION_SECOND_STRING: Gate = Gate::TagAbove(0x10500);
pub const DESCRIPTION_EXTERNAL_DOCS: Gate = Gate::TagAtLeast(0x10500);
pub const EXTERNAL_DOC_STRINGS: Gate = Gate::TagBelow(0x104ff);

// Filter and TargetAddrOffset values: byte field from 0x10200, string before
pub const BYTE_FIELD_VALUES: Gate = Gate::TagAtLeast(0x10200);

// DataFormat
pub const DATA_FORMAT_LEGACY_STRING: Gate = Gate::TagBelow(0x10500);
pub const DATA_FORMAT_NAME: Gate = Gate::TagAbove(0x104ff);
pub const DATA_FORMAT_NORMALIZE: Gate = Gate::TagWithin {
    above: 0x104ff,
    below: 0x10705,
};
