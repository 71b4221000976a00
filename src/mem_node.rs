//! In-memory storage node used in tests and as a reference for the checks
//! a real node performs on incoming segments.

use crate::{
    constant::{ENTRY_SIZE, PORA_CHUNK_SIZE, SEGMENT_SIZE},
    merkle::segment_root,
    padding::{chunk_count, padded_size},
    traits::StorageNode,
    types::{DataRoot, FileInfo, SegmentWithProof},
};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MemNodeError {
    /// Segment for a root the node was never told about.
    #[error("unknown file root")]
    UnknownFile,

    /// Segment data empty, not entry-aligned, or longer than one segment.
    #[error("invalid segment size {0}")]
    InvalidSegmentSize(usize),

    /// Segment index past the file's expected segment count.
    #[error("segment index out of range: index={index} segments={segments}")]
    IndexOutOfRange { index: usize, segments: usize },

    /// Proof does not bind this segment's data to the file root at the
    /// claimed index.
    #[error("invalid segment proof")]
    InvalidProof,

    /// Every segment already received.
    #[error("file already finalized")]
    AlreadyFinalized,
}

#[derive(Debug)]
struct FileEntry {
    /// True payload length in bytes.
    size: usize,
    /// Received segments by index.
    segments: BTreeMap<usize, Vec<u8>>,
}

impl FileEntry {
    fn expected_segments(&self) -> usize {
        let (padded_chunks, _) = padded_size(chunk_count(self.size));
        padded_chunks.div_ceil(PORA_CHUNK_SIZE)
    }

    fn finalized(&self) -> bool {
        self.segments.len() == self.expected_segments()
    }
}

/// A storage node backed by process memory. Validates each incoming
/// segment the way a real node does: size bounds, index bounds, and a
/// proof binding the data to the announced file root at the claimed index.
#[derive(Debug, Default)]
pub struct MemStorageNode {
    files: RwLock<HashMap<DataRoot, FileEntry>>,
}

impl MemStorageNode {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce a file before its segments arrive. A real node learns the
    /// root and size from the on-chain submission log.
    pub fn register_file(&self, root: DataRoot, size: usize) {
        self.files
            .write()
            .expect("lock poisoned")
            .entry(root)
            .or_insert(FileEntry {
                size,
                segments: BTreeMap::new(),
            });
    }

    /// Reassemble a finalized file's payload, truncated to its true size.
    /// Returns `None` for unknown or unfinalized files.
    pub fn payload(&self, root: &DataRoot) -> Option<Vec<u8>> {
        let files = self.files.read().expect("lock poisoned");
        let file = files.get(root)?;
        if !file.finalized() {
            return None;
        }
        let mut data = Vec::with_capacity(file.size);
        for segment in file.segments.values() {
            data.extend_from_slice(segment);
        }
        data.truncate(file.size);
        Some(data)
    }
}

impl StorageNode for MemStorageNode {
    type Error = MemNodeError;

    fn upload_segment(&self, segment: &SegmentWithProof) -> Result<(), Self::Error> {
        if segment.data.is_empty()
            || segment.data.len() % ENTRY_SIZE != 0
            || segment.data.len() > SEGMENT_SIZE
        {
            return Err(MemNodeError::InvalidSegmentSize(segment.data.len()));
        }

        let mut files = self.files.write().expect("lock poisoned");
        let file = files.get_mut(&segment.root).ok_or(MemNodeError::UnknownFile)?;

        if file.finalized() {
            return Err(MemNodeError::AlreadyFinalized);
        }
        let segments = file.expected_segments();
        if segment.index >= segments {
            return Err(MemNodeError::IndexOutOfRange {
                index: segment.index,
                segments,
            });
        }

        let proof = &segment.proof;
        if proof.root() != segment.root
            || proof.leaf() != segment_root(&segment.data)
            || proof.position() != segment.index
            || !proof.verify()
        {
            return Err(MemNodeError::InvalidProof);
        }

        debug!(root = %segment.root, index = segment.index, "segment stored");
        file.segments.insert(segment.index, segment.data.clone());
        Ok(())
    }

    fn file_info(&self, root: &DataRoot) -> Result<Option<FileInfo>, Self::Error> {
        let files = self.files.read().expect("lock poisoned");
        Ok(files.get(root).map(|file| FileInfo {
            exists: true,
            finalized: file.finalized(),
            uploaded_segments: file.segments.len() as u64,
        }))
    }
}
