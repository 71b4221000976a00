//! The flat upload tree and the segment upload pipeline.
//!
//! Storage nodes address files by the root of a flat Merkle tree whose
//! leaves are the roots of consecutive PoRa-chunk-sized segments of the
//! padded payload. This root equals the on-chain data root exactly when the
//! padded chunk count is a power of two (a single-node decomposition);
//! multi-node payloads have distinct roots for the two trees.
//!
//! Segments carry their bytes zero-padded up to the padded entry boundary,
//! so the final segment of an unaligned payload may be shorter than a full
//! PoRa chunk but is never truncated below it.

use crate::{
    constant::{ENTRY_SIZE, PORA_CHUNK_SIZE, PORA_CHUNK_SIZE_BITS},
    merkle::{segment_root, MerkleTree},
    padding::{chunk_count, padded_range, padded_size},
    traits::StorageNode,
    types::{SegmentWithProof, SubmissionError},
};
use rayon::prelude::*;
use std::fmt::Debug;
use thiserror::Error;
use tracing::debug;

/// Failure while assembling or dispatching an upload.
#[derive(Error, Debug)]
pub enum UploadError<E: Debug + Send> {
    /// Segment or proof assembly failed before anything was sent.
    #[error(transparent)]
    Assemble(#[from] SubmissionError),

    /// The storage node rejected a segment. Segments before `index` were
    /// accepted; the caller may retry from `index`.
    #[error("storage node rejected segment {index}: {source:?}")]
    Dispatch { index: usize, source: E },
}

/// Build the flat upload tree: one leaf per PoRa-chunk-sized segment of the
/// padded payload. Leaves sit at chunk height, so an odd layer pads with
/// the root of an all-zero PoRa chunk rather than a zero-entry leaf hash.
///
/// A segment that begins past the end of the actual payload would be pure
/// padding; that can only happen when the padding rule outruns the data by
/// a full segment, and the loop refuses to fabricate it.
fn flat_tree(data: &[u8], padded_chunks: usize) -> Result<MerkleTree, SubmissionError> {
    let mut tree = MerkleTree::with_leaf_height(PORA_CHUNK_SIZE_BITS);
    for chunk_start in (0..padded_chunks).step_by(PORA_CHUNK_SIZE) {
        let start = chunk_start * ENTRY_SIZE;
        if start > data.len() {
            return Err(SubmissionError::SegmentRange {
                offset: start,
                len: data.len(),
            });
        }
        let end = std::cmp::min(chunk_start + PORA_CHUNK_SIZE, padded_chunks) * ENTRY_SIZE;
        tree.add_leaf(segment_root(&padded_range(data, start, end)));
    }
    Ok(tree)
}

/// Slice a payload into upload-ready segments, each carrying the flat tree
/// root, its index, and a membership proof.
///
/// # Errors
///
/// Returns [`SubmissionError::InvalidInput`] for an empty payload and
/// [`SubmissionError::SegmentRange`] if a segment would consist entirely of
/// padding.
pub fn split_segments(data: &[u8]) -> Result<Vec<SegmentWithProof>, SubmissionError> {
    if data.is_empty() {
        return Err(SubmissionError::InvalidInput {
            message: "empty payload has no segments",
        });
    }

    let (padded_chunks, _) = padded_size(chunk_count(data.len()));
    let tree = flat_tree(data, padded_chunks)?;
    let root = tree.root();
    let count = padded_chunks.div_ceil(PORA_CHUNK_SIZE);
    debug!(%root, segments = count, "splitting payload into segments");

    (0..count)
        .into_par_iter()
        .map(|index| {
            let chunk_start = index * PORA_CHUNK_SIZE;
            let start = chunk_start * ENTRY_SIZE;
            let end = std::cmp::min(chunk_start + PORA_CHUNK_SIZE, padded_chunks) * ENTRY_SIZE;
            Ok(SegmentWithProof {
                root,
                data: padded_range(data, start, end).into_owned(),
                index,
                proof: tree.gen_proof(index)?,
            })
        })
        .collect()
}

/// Split a payload into segments and dispatch them to a storage node in
/// index order. Returns the segments that were sent so callers can inspect
/// or resend them.
pub fn upload_segments<N: StorageNode>(
    node: &N,
    data: &[u8],
) -> Result<Vec<SegmentWithProof>, UploadError<N::Error>> {
    let segments = split_segments(data)?;
    for segment in &segments {
        node.upload_segment(segment)
            .map_err(|source| UploadError::Dispatch {
                index: segment.index,
                source,
            })?;
    }
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constant::SEGMENT_SIZE;
    use crate::submission::build_submission;

    #[test]
    fn empty_payload_is_rejected() {
        assert!(matches!(
            split_segments(&[]),
            Err(SubmissionError::InvalidInput { .. })
        ));
    }

    /// Tests single-segment payloads: one segment, index 0, a self-proving
    /// single-leaf tree, and data padded to the padded entry boundary.
    #[test]
    fn small_payload_single_segment() {
        let data = vec![0x11u8; 3 * ENTRY_SIZE + 10];
        let segments = split_segments(&data).unwrap();

        assert_eq!(segments.len(), 1);
        let segment = &segments[0];
        assert_eq!(segment.index, 0);
        // 4 padded chunks
        assert_eq!(segment.data.len(), 4 * ENTRY_SIZE);
        assert_eq!(&segment.data[..data.len()], &data[..]);
        assert!(segment.data[data.len()..].iter().all(|b| *b == 0));
        assert_eq!(segment.root, segment_root(&segment.data));
        assert!(segment.proof.verify());
        assert_eq!(segment.proof.root(), segment.root);
    }

    /// Tests segment coverage for a multi-segment payload whose final
    /// segment is shorter than a full PoRa chunk: 1500 chunks pad to 1536,
    /// so the second segment carries 512 entries.
    #[test]
    fn short_final_segment() {
        let data: Vec<u8> = (0..1500 * ENTRY_SIZE).map(|i| (i % 251) as u8).collect();
        let segments = split_segments(&data).unwrap();

        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].data.len(), SEGMENT_SIZE);
        assert_eq!(segments[1].data.len(), 512 * ENTRY_SIZE);

        for (i, segment) in segments.iter().enumerate() {
            assert_eq!(segment.index, i);
            assert!(segment.proof.verify());
            assert_eq!(segment.proof.position(), i);
            assert_eq!(segment.proof.leaf(), segment_root(&segment.data));
            assert_eq!(segment.proof.root(), segments[0].root);
        }

        // concatenated segment data is the zero-padded payload
        let mut joined = Vec::new();
        for segment in &segments {
            joined.extend_from_slice(&segment.data);
        }
        assert_eq!(&joined[..data.len()], &data[..]);
        assert!(joined[data.len()..].iter().all(|b| *b == 0));
    }

    /// Tests that the flat upload root matches the on-chain data root
    /// exactly for single-node decompositions and diverges for multi-node
    /// ones.
    #[test]
    fn flat_root_vs_data_root() {
        // 2000 chunks pad to 2048, a single node: roots agree
        let aligned = vec![0x11u8; 500 * 1024];
        let (_, data_root) = build_submission(&aligned).unwrap();
        assert_eq!(split_segments(&aligned).unwrap()[0].root, data_root);

        // 5 chunks decompose as [4, 1]: roots diverge
        let unaligned = vec![0x22u8; 5 * ENTRY_SIZE];
        let (_, data_root) = build_submission(&unaligned).unwrap();
        assert_ne!(split_segments(&unaligned).unwrap()[0].root, data_root);
    }

    /// Tests the sweep form of the same property: the two roots agree
    /// exactly when the padded chunk count is a power of two.
    #[test]
    fn roots_agree_iff_single_node() {
        for chunks in [1usize, 2, 3, 4, 5, 8, 15, 16, 17, 31, 32] {
            let data = vec![0x33u8; chunks * ENTRY_SIZE];
            let (submission, data_root) = build_submission(&data).unwrap();
            let flat_root = split_segments(&data).unwrap()[0].root;
            let single_node = submission.nodes.len() == 1;
            assert_eq!(flat_root == data_root, single_node, "chunks={chunks}");
            assert_eq!(
                single_node,
                (submission.padded_chunks() as usize).is_power_of_two(),
                "chunks={chunks}"
            );
        }
    }

    /// Tests the guard against all-padding segments: 16385 chunks pad to
    /// 18432, whose second-to-last segment starts past the payload tail.
    #[test]
    fn all_padding_segment_is_rejected() {
        let data = vec![1u8; 16385 * ENTRY_SIZE];
        assert!(matches!(
            split_segments(&data),
            Err(SubmissionError::SegmentRange { .. })
        ));
    }

    /// Tests layer padding of the flat upload tree at an odd segment
    /// count: 2049 chunks pad to 2304 (three segments), and the orphan
    /// third leaf must pair with the root of an all-zero PoRa chunk, not
    /// with a zero-entry leaf hash.
    #[test]
    fn odd_segment_count_pads_with_zero_chunk_root() {
        use crate::merkle::parent_hash;

        let data = vec![0x6du8; 2049 * ENTRY_SIZE];
        let segments = split_segments(&data).unwrap();
        assert_eq!(segments.len(), 3);
        assert_eq!(segments[2].data.len(), 256 * ENTRY_SIZE);

        let leaves: Vec<_> = segments.iter().map(|s| segment_root(&s.data)).collect();
        let zero_chunk_root = segment_root(&vec![0u8; SEGMENT_SIZE]);
        let expected = parent_hash(
            &parent_hash(&leaves[0], &leaves[1]),
            &parent_hash(&leaves[2], &zero_chunk_root),
        );
        assert_eq!(segments[0].root, expected);

        for segment in &segments {
            assert_eq!(segment.root, expected);
            assert!(segment.proof.verify());
            assert_eq!(segment.proof.root(), expected);
        }
    }

    /// Tests random payload lengths: segments tile the padded payload
    /// exactly and every proof verifies at its index.
    #[test]
    fn random_payloads_produce_valid_segments() {
        use rand::{rngs::StdRng, Rng, SeedableRng};

        let mut rng = StdRng::seed_from_u64(42);
        for _ in 0..16 {
            let len = rng.gen_range(1..=4 * SEGMENT_SIZE);
            let mut data = vec![0u8; len];
            rng.fill(&mut data[..]);

            let segments = split_segments(&data).unwrap();
            let (padded_chunks, _) = padded_size(chunk_count(len));
            let total: usize = segments.iter().map(|s| s.data.len()).sum();
            assert_eq!(total, padded_chunks * ENTRY_SIZE, "len={len}");

            for (i, segment) in segments.iter().enumerate() {
                assert_eq!(segment.index, i, "len={len}");
                assert_eq!(segment.proof.position(), i, "len={len}");
                assert!(segment.proof.verify(), "len={len} index={i}");
            }
        }
    }

    /// Tests the dispatch driver against a node that rejects a chosen
    /// index: earlier segments go through and the error reports the failed
    /// index.
    #[test]
    fn dispatch_stops_at_first_rejection() {
        use crate::traits::StorageNode;
        use std::sync::atomic::{AtomicUsize, Ordering};

        struct FlakyNode {
            reject_at: usize,
            accepted: AtomicUsize,
        }

        impl StorageNode for FlakyNode {
            type Error = &'static str;

            fn upload_segment(&self, segment: &SegmentWithProof) -> Result<(), Self::Error> {
                if segment.index == self.reject_at {
                    return Err("unavailable");
                }
                self.accepted.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }

            fn file_info(
                &self,
                _root: &crate::types::DataRoot,
            ) -> Result<Option<crate::types::FileInfo>, Self::Error> {
                Ok(None)
            }
        }

        let node = FlakyNode {
            reject_at: 1,
            accepted: AtomicUsize::new(0),
        };
        let data = vec![0x44u8; 1500 * ENTRY_SIZE];
        match upload_segments(&node, &data) {
            Err(UploadError::Dispatch { index: 1, source }) => assert_eq!(source, "unavailable"),
            other => panic!("expected dispatch failure, got {other:?}"),
        }
        assert_eq!(node.accepted.load(Ordering::SeqCst), 1);
    }
}
