//! String section record splitting.
//!
//! The string section is a run of NUL-terminated records. A zero byte at
//! position `i` closes the record that started after the previous zero, so
//! consecutive zeros yield empty records. Bytes after the last zero do not
//! form a record.

use encoding_rs::Encoding;
use log::warn;

/// Splits the section into its terminated records (terminators excluded).
pub fn split_records(section: &[u8]) -> Vec<&[u8]> {
    let mut records: Vec<&[u8]> = section.split(|&b| b == 0).collect();
    // The final piece is either empty (section ends with NUL) or unterminated.
    records.pop();
    records
}

/// Decodes every record with `encoding`, replacing malformed sequences.
pub fn decode_records(section: &[u8], encoding: &'static Encoding) -> Vec<String> {
    split_records(section)
        .into_iter()
        .map(|record| {
            let (text, _) = encoding.decode_without_bom_handling(record);
            text.into_owned()
        })
        .collect()
}

/// Resolves an encoding label, falling back to UTF-8.
pub fn parse_encoding(label: &str) -> &'static Encoding {
    Encoding::for_label(label.trim().as_bytes()).unwrap_or_else(|| {
        warn!("Unknown string table encoding '{}', using UTF-8", label);
        encoding_rs::UTF_8
    })
}
