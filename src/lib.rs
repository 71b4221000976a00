#![doc = include_str!("../README.md")]

pub mod constant;
pub mod merkle;
pub mod padding;
pub mod segment;
pub mod submission;
pub mod traits;
pub mod types;

pub mod mem_node;

pub use merkle::{leaf_hash, parent_hash, segment_root, MerkleTree, Proof};
pub use segment::{split_segments, upload_segments, UploadError};
pub use submission::build_submission;
pub use traits::{FlowSubmitter, StorageNode};
pub use types::{
    DataRoot, FileInfo, SegmentWithProof, Submission, SubmissionError, SubmissionNode,
};

pub use mem_node::MemStorageNode;
