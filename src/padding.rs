//! Entry counting, the padded-size rule, and node decomposition.
//!
//! A payload of `n` bytes occupies `ceil(n / ENTRY_SIZE)` entries (chunks).
//! The chunk count is then rounded up so the payload can be decomposed into
//! power-of-two-sized nodes: the padding granularity is 1/16 of the next
//! power of two, which bounds both the padding overhead and the number of
//! nodes in the decomposition.

use crate::{
    constant::{ENTRY_SIZE, PAD_RATIO_BITS},
    types::SubmissionError,
};
use std::borrow::Cow;

/// Number of entries occupied by a payload of `byte_len` bytes. A trailing
/// partial entry counts as a full one.
pub fn chunk_count(byte_len: usize) -> usize {
    byte_len.div_ceil(ENTRY_SIZE)
}

/// Round a chunk count up to the protocol's padding granularity.
///
/// Returns `(padded_chunks, next_pow2)`. The granularity is
/// `next_pow2 >> PAD_RATIO_BITS` (at least 1), so a payload never pads by
/// more than 1/16 of the next power of two, and the padded count always
/// decomposes into at most `2^PAD_RATIO_BITS` nodes.
///
/// `padded_size(0)` is `(0, 1)`; callers reject empty payloads before
/// reaching here.
pub fn padded_size(chunks: usize) -> (usize, usize) {
    let next_pow2 = chunks.next_power_of_two();
    let min_chunk = std::cmp::max(1, next_pow2 >> PAD_RATIO_BITS);
    (chunks.div_ceil(min_chunk) * min_chunk, next_pow2)
}

/// Decompose a payload into node sizes: a strictly decreasing sequence of
/// powers of two summing exactly to the padded chunk count.
///
/// The search halves the candidate node size starting from the next power
/// of two and takes each size at most once, so the result has at most
/// `PAD_RATIO_BITS + 1` elements.
pub fn split_nodes(byte_len: usize) -> Result<Vec<usize>, SubmissionError> {
    if byte_len == 0 {
        return Err(SubmissionError::InvalidInput {
            message: "empty payload has no node decomposition",
        });
    }

    let chunks = chunk_count(byte_len);
    let (mut remaining, mut node_size) = padded_size(chunks);

    let mut nodes = Vec::new();
    while remaining > 0 {
        if node_size <= remaining {
            nodes.push(node_size);
            remaining -= node_size;
        }
        node_size >>= 1;
    }
    Ok(nodes)
}

/// Slice `data[start..end)`, extending past the payload tail with zeros.
/// Borrows when the range lies fully inside the payload.
pub(crate) fn padded_range(data: &[u8], start: usize, end: usize) -> Cow<'_, [u8]> {
    debug_assert!(start <= end);
    if end <= data.len() {
        Cow::Borrowed(&data[start..end])
    } else {
        let mut padded = data.get(start..).unwrap_or_default().to_vec();
        padded.resize(end - start, 0);
        Cow::Owned(padded)
    }
}
