//! Boundary value types for on-chain submission and storage-node upload.
//!
//! All 32-byte roots are [`alloy_primitives::B256`] values; their serde form
//! is the `0x`-prefixed lowercase hex string required at the RPC boundary.
//! Segment payload bytes travel as base64 strings.

use crate::merkle::Proof;
use alloy_primitives::B256;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 32-byte Merkle root identifying a payload commitment.
pub type DataRoot = B256;

/// Unified error type for commitment and upload assembly.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    /// Zero-length or malformed payload passed where a non-empty payload is
    /// required. Empty payloads must be special-cased by callers as
    /// zero-entry submissions with no nodes.
    #[error("invalid input: {message}")]
    InvalidInput { message: &'static str },

    /// A computed segment offset exceeds the payload bounds while the loop
    /// bound still expects a slice. Defensive fault, always fatal to the
    /// call.
    #[error("segment offset {offset} exceeds payload length {len}")]
    SegmentRange { offset: usize, len: usize },

    /// Requested a proof for a leaf index past the end of the tree.
    #[error("leaf index out of bound: index={index} total_leaves={leaves}")]
    ProofIndexOutOfRange { index: usize, leaves: usize },
}

/// One node of a payload decomposition as it appears on chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmissionNode {
    /// Merkle root over the node's entry range.
    pub root: DataRoot,
    /// log2 of the node size in entries.
    pub height: usize,
}

/// The on-chain submission descriptor for one payload.
///
/// Nodes appear in decomposition order (largest first); their sizes are
/// strictly decreasing powers of two summing exactly to the padded chunk
/// count.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    /// True payload length in bytes, before entry and node padding.
    pub size: u64,
    /// Node roots and heights in decomposition order.
    pub nodes: Vec<SubmissionNode>,
}

impl Submission {
    /// Total number of entries covered by the node list, i.e. the padded
    /// chunk count of the payload.
    pub fn padded_chunks(&self) -> u64 {
        self.nodes.iter().map(|node| 1u64 << node.height).sum()
    }
}

/// Upload status of a file as reported by a storage node.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileInfo {
    /// Whether the storage node knows the file at all.
    pub exists: bool,
    /// Whether every expected segment has been received.
    pub finalized: bool,
    /// Number of segments received so far.
    pub uploaded_segments: u64,
}

/// One PoRa-chunk-sized slice of the padded payload, ready for upload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentWithProof {
    /// Root of the flat upload tree; identifies the payload on the storage
    /// node.
    pub root: DataRoot,
    /// Segment bytes, zero-padded up to the padded entry boundary. The
    /// final segment of a file may be shorter than a full PoRa chunk.
    #[serde(with = "base64_bytes")]
    pub data: Vec<u8>,
    /// 0-based segment index over PoRa-chunk-sized slices of the padded
    /// payload. Must match the segment's true position for the storage node
    /// to place it correctly.
    pub index: usize,
    /// Merkle path from this segment's root to the flat tree root.
    pub proof: Proof,
}

/// Serde adapter encoding byte payloads as standard base64 strings.
mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        STANDARD.encode(bytes).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD.decode(encoded).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::merkle::{leaf_hash, MerkleTree};
    use alloy_primitives::b256;

    /// Tests that a submission descriptor serializes to the on-chain wire
    /// shape: size as a uint and nodes as (0x-prefixed 64-hex-char root,
    /// uint height) pairs.
    #[test]
    fn submission_wire_format() {
        let submission = Submission {
            size: 512_000,
            nodes: vec![SubmissionNode {
                root: b256!("1111111111111111111111111111111111111111111111111111111111111111"),
                height: 11,
            }],
        };
        let json = serde_json::to_value(&submission).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "size": 512_000,
                "nodes": [{
                    "root": "0x1111111111111111111111111111111111111111111111111111111111111111",
                    "height": 11,
                }],
            })
        );

        let recovered: Submission = serde_json::from_value(json).unwrap();
        assert_eq!(recovered, submission);
    }

    /// Tests that segment payload bytes travel as base64 and the proof as
    /// hex lemma plus boolean path.
    #[test]
    fn segment_wire_format() {
        let mut tree = MerkleTree::new();
        tree.hash_entry(b"hello");
        tree.hash_entry(b"world");
        let segment = SegmentWithProof {
            root: tree.root(),
            data: b"hello".to_vec(),
            index: 0,
            proof: tree.gen_proof(0).unwrap(),
        };

        let json = serde_json::to_value(&segment).unwrap();
        assert_eq!(json["data"], "aGVsbG8=");
        assert_eq!(json["index"], 0);
        let root_str = json["root"].as_str().unwrap();
        assert!(root_str.starts_with("0x") && root_str.len() == 66);
        assert_eq!(json["proof"]["path"], serde_json::json!([true]));
        assert_eq!(
            json["proof"]["lemma"][0].as_str().unwrap(),
            format!("{}", leaf_hash(b"hello")).as_str()
        );

        let recovered: SegmentWithProof = serde_json::from_value(json).unwrap();
        assert_eq!(recovered, segment);
    }

    /// Tests that padded_chunks sums node sizes from their heights.
    #[test]
    fn submission_padded_chunks() {
        let node = |height| SubmissionNode {
            root: DataRoot::ZERO,
            height,
        };
        let submission = Submission {
            size: 0,
            nodes: vec![node(11), node(4), node(0)],
        };
        assert_eq!(submission.padded_chunks(), 2048 + 16 + 1);
    }
}
