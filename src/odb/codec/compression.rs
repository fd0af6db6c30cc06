//! Decompression of size-prefixed DEFLATE sections.
//!
//! Compressed sections carry a proprietary 6-byte prefix:
//! - 4 bytes: expected decompressed size (little-endian)
//! - 2 bytes: header tag (zlib-style, unused)
//!
//! followed by a raw DEFLATE stream.

use std::io::Read;

use byteorder::{ByteOrder, LittleEndian};
use flate2::read::DeflateDecoder;
use log::trace;

use crate::odb::types::error::{OdbError, Result};

/// Length of the size + tag prefix.
pub const INFLATE_PREFIX_LEN: usize = 6;

/// Inflates a prefixed section.
///
/// # Validation
/// The inflated length must equal the declared size exactly; output is never
/// truncated or padded to fit.
///
/// # Errors
/// - [`OdbError::UnexpectedEndOfData`] if the prefix is incomplete
/// - [`OdbError::DecompressionError`] if the DEFLATE stream is corrupt
/// - [`OdbError::InflateSizeMismatch`] if the lengths disagree
pub fn inflate(data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < INFLATE_PREFIX_LEN {
        return Err(OdbError::UnexpectedEndOfData {
            context: "inflate prefix",
            offset: data.len(),
        });
    }

    let declared = LittleEndian::read_i32(&data[0..4]);
    let header_tag = LittleEndian::read_u16(&data[4..6]);
    trace!(
        "Inflating {} bytes: declared size {}, header tag {:#06x}",
        data.len() - INFLATE_PREFIX_LEN,
        declared,
        header_tag
    );

    // Declared sizes are untrusted: the capacity hint follows the stored
    // length and inflation stops one byte past the declared size.
    let expected = declared.max(0) as u64;
    let mut output = Vec::with_capacity((expected as usize).min(data.len().saturating_mul(4)));
    let mut decoder = DeflateDecoder::new(&data[INFLATE_PREFIX_LEN..]).take(expected + 1);
    decoder.read_to_end(&mut output).map_err(|e| {
        OdbError::DecompressionError(format!("DEFLATE decompression failed: {}", e))
    })?;

    if declared < 0 || output.len() != declared as usize {
        return Err(OdbError::InflateSizeMismatch {
            declared: declared as i64,
            actual: output.len(),
        });
    }

    Ok(output)
}
