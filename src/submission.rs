//! Node root construction and the on-chain submission descriptor.
//!
//! Each node of the decomposition commits to its entry range with a binary
//! Merkle tree. Nodes larger than one PoRa chunk are hashed in chunk-sized
//! batches that are combined in a tree of trees, so a node root and the
//! equivalent flat tree over its entries agree. The node roots are then
//! folded smallest-to-largest into the single data root published on chain.

use crate::{
    constant::{ENTRY_SIZE, PORA_CHUNK_SIZE, PORA_CHUNK_SIZE_BITS},
    merkle::{parent_hash, segment_root, MerkleTree},
    padding::{padded_range, split_nodes},
    types::{DataRoot, Submission, SubmissionError, SubmissionNode},
};
use alloy_primitives::B256;
use rayon::prelude::*;
use tracing::debug;

/// Merkle root of one decomposition node covering `node_chunks` entries
/// starting at entry `offset_chunks`, zero-extending past the payload tail.
fn node_root(data: &[u8], offset_chunks: usize, node_chunks: usize) -> DataRoot {
    let start = offset_chunks * ENTRY_SIZE;
    if node_chunks <= PORA_CHUNK_SIZE {
        return segment_root(&padded_range(data, start, start + node_chunks * ENTRY_SIZE));
    }

    // node_chunks is a power of two above the batch size, so batches divide
    // the node evenly.
    let batch_bytes = PORA_CHUNK_SIZE * ENTRY_SIZE;
    let batch_roots: Vec<B256> = (0..node_chunks / PORA_CHUNK_SIZE)
        .into_par_iter()
        .map(|batch| {
            let batch_start = start + batch * batch_bytes;
            segment_root(&padded_range(data, batch_start, batch_start + batch_bytes))
        })
        .collect();

    let mut tree = MerkleTree::with_leaf_height(PORA_CHUNK_SIZE_BITS);
    for root in batch_roots {
        tree.add_leaf(root);
    }
    tree.root()
}

/// Build the on-chain submission descriptor and the folded data root for a
/// payload.
///
/// The descriptor carries the true byte length and one `(root, height)`
/// pair per decomposition node, largest first. The data root folds the node
/// roots smallest-to-largest: starting from the last node's root, each
/// preceding node becomes the left child of the running hash.
///
/// # Errors
///
/// Returns [`SubmissionError::InvalidInput`] for an empty payload.
pub fn build_submission(data: &[u8]) -> Result<(Submission, DataRoot), SubmissionError> {
    let node_sizes = split_nodes(data.len())?;
    debug!(size = data.len(), nodes = ?node_sizes, "building submission");

    let mut nodes = Vec::with_capacity(node_sizes.len());
    let mut offset_chunks = 0;
    for chunks in node_sizes {
        nodes.push(SubmissionNode {
            root: node_root(data, offset_chunks, chunks),
            height: chunks.ilog2() as usize,
        });
        offset_chunks += chunks;
    }

    let mut data_root = nodes
        .last()
        .expect("split_nodes never returns an empty list")
        .root;
    for node in nodes.iter().rev().skip(1) {
        data_root = parent_hash(&node.root, &data_root);
    }

    Ok((
        Submission {
            size: data.len() as u64,
            nodes,
        },
        data_root,
    ))
}
