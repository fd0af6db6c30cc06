//! Position-keyed XOR masking.
//!
//! Every byte after the meta info text is XOR'd with a mask generated from a
//! linear congruential generator. The mask index is the byte's absolute
//! position in the file, so a section can only be unmasked with the cursor
//! position it was read from.

use log::trace;

const LCG_MULTIPLIER: u32 = 0x41C6_4E6D;
const LCG_INCREMENT: u32 = 0x3039;

/// Generates the XOR mask for a header-declared mask size.
///
/// # Algorithm
/// The generator is seeded with `size`. For each output byte:
/// `state = 0x41C64E6D * state + 0x3039 (mod 2^32)`, then emit `(state >> 16) & 0xFF`.
pub fn xor_mask(size: usize) -> Vec<u8> {
    xor_mask_prefix(size, size)
}

/// Generates at most the first `limit` bytes of the mask for `size`.
///
/// Positions below `limit` index the shortened mask exactly as they index
/// the full mask. Callers pass the highest position they will key, plus one.
pub fn xor_mask_prefix(size: usize, limit: usize) -> Vec<u8> {
    let len = size.min(limit);
    trace!("Generating {} of {} XOR mask bytes", len, size);

    let mut state = size as u32;
    (0..len)
        .map(|_| {
            state = state.wrapping_mul(LCG_MULTIPLIER).wrapping_add(LCG_INCREMENT);
            (state >> 16) as u8
        })
        .collect()
}

/// XORs `data` in place, starting at absolute file position `file_offset`.
///
/// Byte `i` is combined with `mask[(file_offset + i) % mask.len()]`.
/// An empty mask leaves the data unchanged.
pub fn xor_in_place(data: &mut [u8], file_offset: usize, mask: &[u8]) {
    if mask.is_empty() {
        return;
    }
    trace!(
        "XOR {} bytes at file offset {:#x} with {} byte mask",
        data.len(),
        file_offset,
        mask.len()
    );

    let mut index = file_offset % mask.len();
    for byte in data.iter_mut() {
        *byte ^= mask[index];
        index += 1;
        if index == mask.len() {
            index = 0;
        }
    }
}

/// Returns an XOR'd copy of `data`. Applying it twice with the same
/// offset and mask yields the input again.
pub fn xor_transform(data: &[u8], file_offset: usize, mask: &[u8]) -> Vec<u8> {
    let mut out = data.to_vec();
    xor_in_place(&mut out, file_offset, mask);
    out
}
