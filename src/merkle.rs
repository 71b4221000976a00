//! Binary Merkle hash engine over fixed-size entries.
//!
//! One tree type serves both commitment shapes used by the protocol: leaves
//! may be raw 256-byte entries hashed at insertion time, or precomputed
//! 32-byte roots of lower trees (tree-of-trees composition). Leaf and
//! internal hashes are domain-separated to prevent second-preimage
//! confusion between the two.
//!
//! A layer with an odd node count pads with the zero-subtree hash of the
//! matching height, so a tree over `n` leaves commits to the same root as a
//! tree over the next power of two with all-zero entries appended. The
//! [`MerkleTree::leaf_height`] field selects where in the zero-hash chain a
//! leaf sits: 0 for entry-level leaves, `log2(PORA_CHUNK_SIZE)` for leaves
//! that are themselves roots of full PoRa chunks.

use crate::{
    constant::{ENTRY_SIZE, LEAF_PREFIX, MAX_TREE_HEIGHT, NODE_PREFIX},
    types::{DataRoot, SubmissionError},
};
use alloy_primitives::{keccak256, B256};
use once_cell::sync::{Lazy, OnceCell};
use serde::{Deserialize, Serialize};
use tracing::trace;

/// Zero-subtree hashes by height: `ZERO_HASHES[0]` is the leaf hash of an
/// all-zero entry and `ZERO_HASHES[h + 1] = parent(Z[h], Z[h])`.
static ZERO_HASHES: Lazy<[B256; MAX_TREE_HEIGHT]> = Lazy::new(|| {
    let mut list = [B256::ZERO; MAX_TREE_HEIGHT];
    list[0] = leaf_hash(&[0u8; ENTRY_SIZE]);
    for i in 1..MAX_TREE_HEIGHT {
        list[i] = parent_hash(&list[i - 1], &list[i - 1]);
    }
    list
});

/// Hash one raw entry into a leaf. Entries shorter than [`ENTRY_SIZE`] are
/// zero-padded on the tail before hashing, so trailing zero bytes within the
/// same entry never change the leaf hash.
///
/// # Panics
///
/// Panics if the entry exceeds [`ENTRY_SIZE`] bytes; callers slice payloads
/// at entry granularity.
pub fn leaf_hash(entry: &[u8]) -> B256 {
    assert!(
        entry.len() <= ENTRY_SIZE,
        "entry of {} bytes exceeds ENTRY_SIZE ({ENTRY_SIZE})",
        entry.len()
    );
    let mut buf = [0u8; 1 + ENTRY_SIZE];
    buf[0] = LEAF_PREFIX;
    buf[1..1 + entry.len()].copy_from_slice(entry);
    keccak256(buf)
}

/// Hash two child hashes into an internal node.
pub fn parent_hash(left: &B256, right: &B256) -> B256 {
    let mut buf = [0u8; 1 + 64];
    buf[0] = NODE_PREFIX;
    buf[1..33].copy_from_slice(left.as_slice());
    buf[33..65].copy_from_slice(right.as_slice());
    keccak256(buf)
}

/// Merkle root of `chunk` hashed entry by entry, zero-padding the final
/// entry if `chunk` is not entry-aligned.
///
/// Returns the all-zero 32-byte sentinel for an empty input; this is a
/// documented sentinel, not an error.
pub fn segment_root(chunk: &[u8]) -> DataRoot {
    if chunk.is_empty() {
        return B256::ZERO;
    }
    let mut tree = MerkleTree::new();
    for entry in chunk.chunks(ENTRY_SIZE) {
        tree.hash_entry(entry);
    }
    tree.root()
}

/// Binary Merkle tree with two leaf-insertion modes: raw entries hashed at
/// insertion time ([`MerkleTree::hash_entry`]) and precomputed leaf hashes
/// ([`MerkleTree::add_leaf`]).
///
/// The tree is built lazily: layers above the leaves are computed on the
/// first call to [`MerkleTree::root`] or [`MerkleTree::gen_proof`] and
/// cached; inserting another leaf invalidates the cache.
#[derive(Clone, Debug, Default)]
pub struct MerkleTree {
    /// Leaf hashes in insertion order.
    leaves: Vec<B256>,
    /// Height of one leaf's subtree in entry terms; selects the zero-hash
    /// used to pad incomplete layers.
    leaf_height: usize,
    /// All tree layers bottom-up, computed on demand. `layers[0]` is the
    /// leaf layer.
    layers: OnceCell<Vec<Vec<B256>>>,
}

impl MerkleTree {
    /// Create an empty tree over entry-level leaves.
    pub fn new() -> Self {
        Self::with_leaf_height(0)
    }

    /// Create an empty tree whose leaves each commit to a subtree of
    /// `2^leaf_height` entries.
    pub fn with_leaf_height(leaf_height: usize) -> Self {
        Self {
            leaves: Vec::new(),
            leaf_height,
            layers: OnceCell::new(),
        }
    }

    /// Append one raw entry as a leaf, hashing it at insertion time.
    /// Entries shorter than [`ENTRY_SIZE`] are zero-padded.
    pub fn hash_entry(&mut self, entry: &[u8]) {
        self.layers.take();
        self.leaves.push(leaf_hash(entry));
    }

    /// Append an already-computed 32-byte hash directly as a leaf. Used to
    /// build a tree of trees over lower-level roots.
    pub fn add_leaf(&mut self, hash: B256) {
        self.layers.take();
        self.leaves.push(hash);
    }

    /// Number of leaves added so far.
    pub fn leaves(&self) -> usize {
        self.leaves.len()
    }

    /// Zero-subtree hash padding an incomplete layer `height` levels above
    /// the leaves.
    fn padding_node(&self, height: usize) -> B256 {
        ZERO_HASHES[self.leaf_height + height]
    }

    /// All tree layers bottom-up, building and caching them on first use.
    fn built_layers(&self) -> &[Vec<B256>] {
        self.layers.get_or_init(|| {
            let mut layers = vec![self.leaves.clone()];
            while layers.last().is_some_and(|layer| layer.len() > 1) {
                let height = layers.len() - 1;
                let next = {
                    let current = layers.last().expect("layers is never empty");
                    let mut next = Vec::with_capacity(current.len().div_ceil(2));
                    for pair in current.chunks(2) {
                        next.push(if pair.len() == 2 {
                            parent_hash(&pair[0], &pair[1])
                        } else {
                            parent_hash(&pair[0], &self.padding_node(height))
                        });
                    }
                    next
                };
                layers.push(next);
            }
            layers
        })
    }

    /// Merkle root over all leaves added so far. A single-leaf tree's root
    /// is that leaf; an empty tree commits to the all-zero sentinel.
    pub fn root(&self) -> DataRoot {
        match self.leaves.len() {
            0 => B256::ZERO,
            1 => self.leaves[0],
            _ => {
                let layers = self.built_layers();
                layers[layers.len() - 1][0]
            }
        }
    }

    /// Sibling-hash path from leaf `index` to the root, sufficient for a
    /// third party holding only the root and the leaf value to verify
    /// membership.
    pub fn gen_proof(&self, index: usize) -> Result<Proof, SubmissionError> {
        if index >= self.leaves.len() {
            return Err(SubmissionError::ProofIndexOutOfRange {
                index,
                leaves: self.leaves.len(),
            });
        }

        let layers = self.built_layers();
        let mut lemma = Vec::with_capacity(layers.len() + 1);
        let mut path = Vec::with_capacity(layers.len().saturating_sub(1));
        let mut position = index;

        lemma.push(layers[0][position]);
        for (height, layer) in layers.iter().enumerate().take(layers.len() - 1) {
            trace!(height, position, "gen_proof step");
            if position % 2 == 0 {
                path.push(true);
                lemma.push(if position + 1 == layer.len() {
                    self.padding_node(height)
                } else {
                    layer[position + 1]
                });
            } else {
                path.push(false);
                lemma.push(layer[position - 1]);
            }
            position >>= 1;
        }
        lemma.push(layers[layers.len() - 1][0]);

        Ok(Proof { lemma, path })
    }
}

/// Merkle membership proof.
///
/// `lemma` holds the leaf, the sibling path bottom-up, and finally the
/// claimed root; `path[i] == true` means the running node is the left child
/// at level `i`. A single-leaf tree proves itself with `lemma = [leaf,
/// root]` and an empty path.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proof {
    lemma: Vec<B256>,
    path: Vec<bool>,
}

impl Proof {
    /// Assemble a proof from raw parts, e.g. when decoding an RPC request.
    pub fn new(lemma: Vec<B256>, path: Vec<bool>) -> Self {
        Self { lemma, path }
    }

    /// The leaf hash this proof commits to.
    pub fn leaf(&self) -> B256 {
        self.lemma.first().copied().unwrap_or(B256::ZERO)
    }

    /// The root this proof claims membership under.
    pub fn root(&self) -> B256 {
        self.lemma.last().copied().unwrap_or(B256::ZERO)
    }

    /// The leaf index encoded by the path bits.
    pub fn position(&self) -> usize {
        self.path
            .iter()
            .enumerate()
            .fold(0, |acc, (level, is_left)| {
                acc | (usize::from(!is_left) << level)
            })
    }

    /// Recompute the root from the leaf and sibling path and compare it to
    /// the claimed root.
    pub fn verify(&self) -> bool {
        if self.lemma.len() != self.path.len() + 2 {
            return false;
        }
        let mut acc = self.lemma[0];
        for (sibling, is_left) in self.lemma[1..self.lemma.len() - 1].iter().zip(&self.path) {
            acc = if *is_left {
                parent_hash(&acc, sibling)
            } else {
                parent_hash(sibling, &acc)
            };
        }
        acc == self.lemma[self.lemma.len() - 1]
    }
}
