//! Protocol constants that determine the shape of payload commitments.
//!
//! These are network-wide protocol parameters, not per-call configuration:
//! every client and every storage node must agree on them for roots and
//! proofs to be compatible.

/// Size of one entry in bytes. Entries are the atomic hashing unit of a
/// payload; payloads that do not divide evenly are zero-padded on the tail.
pub const ENTRY_SIZE: usize = 256;

/// Number of bits to represent `PORA_CHUNK_SIZE`.
pub const PORA_CHUNK_SIZE_BITS: usize = 10;

/// Number of entries in one PoRa chunk, the unit of both node batching and
/// upload segmentation. Always a power of two.
pub const PORA_CHUNK_SIZE: usize = 1 << PORA_CHUNK_SIZE_BITS;

/// Size of one upload segment in bytes (a full PoRa chunk of entries).
pub const SEGMENT_SIZE: usize = ENTRY_SIZE * PORA_CHUNK_SIZE;

/// Padding granularity shift: an unaligned chunk count rounds up to a
/// multiple of `next_pow2 >> PAD_RATIO_BITS`, bounding padding overhead to
/// 1/16 of the next power of two. See [`crate::padding::padded_size`].
pub const PAD_RATIO_BITS: usize = 4;

/// Domain prefix for hashing a raw entry into a leaf.
pub const LEAF_PREFIX: u8 = 0x00;

/// Domain prefix for hashing two child hashes into an internal node. The
/// leaf/node separation prevents second-preimage confusion between the two.
pub const NODE_PREFIX: u8 = 0x01;

/// Maximum supported tree height. 64 levels of zero-subtree padding hashes
/// cover any payload addressable with a 64-bit entry count.
pub const MAX_TREE_HEIGHT: usize = 64;
