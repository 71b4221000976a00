//! Collaborator seams for the blockchain node and the storage node.
//!
//! The crate computes commitments and segments; actually publishing a
//! submission and shipping segments are delegated through these traits so
//! the driver logic can run against an RPC client in production and an
//! in-memory node in tests.

use crate::types::{DataRoot, FileInfo, SegmentWithProof, Submission};
use std::fmt::Debug;

/// A storage node accepting segment uploads and reporting file status.
pub trait StorageNode {
    type Error: Debug + Send;

    /// Store one segment after validating its proof against the file root.
    fn upload_segment(&self, segment: &SegmentWithProof) -> Result<(), Self::Error>;

    /// Upload status of the file identified by `root`, or `None` if the
    /// node has never heard of it.
    fn file_info(&self, root: &DataRoot) -> Result<Option<FileInfo>, Self::Error>;
}

/// A blockchain client that publishes submission descriptors on chain.
pub trait FlowSubmitter {
    type Error: Debug + Send;

    /// Publish the descriptor and return the transaction hash.
    fn submit(&self, submission: &Submission) -> Result<alloy_primitives::B256, Self::Error>;
}
