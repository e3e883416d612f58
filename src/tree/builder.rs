//! Tree Construction
//!
//! Builds every level bottom-up and keeps them all, so proofs for any leaf
//! can be extracted later in O(log n) without rehashing.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};

use super::proof::{prove_leaf, Proof};
use super::MerkleError;
use crate::config::BuildConfig;
use crate::core::hash::{Digest, HashAlgorithm, MerkleHasher, Sha256Hasher};

/// Cooperative cancellation flag, checked between levels.
///
/// Clones share the same flag.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// A fresh, untripped token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Fully built tree: every level from leaves (index 0) to root (last).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Digest>>,
    algorithm: HashAlgorithm,
}

impl MerkleTree {
    /// Wrap levels that are already known to be consistent.
    pub(crate) fn from_levels(levels: Vec<Vec<Digest>>, algorithm: HashAlgorithm) -> Self {
        Self { levels, algorithm }
    }

    /// The root digest.
    pub fn root(&self) -> Digest {
        // A built tree always has a last level holding exactly one node.
        self.levels
            .last()
            .and_then(|level| level.first())
            .copied()
            .unwrap_or(Digest::ZERO)
    }

    /// Number of leaves.
    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    /// Number of levels, leaves and root included.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    /// All retained levels.
    pub fn levels(&self) -> &[Vec<Digest>] {
        &self.levels
    }

    /// Leaf digests in index order.
    pub fn leaves(&self) -> &[Digest] {
        self.levels.first().map_or(&[], Vec::as_slice)
    }

    /// Leaf at `index`, if any.
    pub fn leaf(&self, index: usize) -> Option<Digest> {
        self.leaves().get(index).copied()
    }

    /// Hash family the tree was built with.
    pub fn algorithm(&self) -> HashAlgorithm {
        self.algorithm
    }

    /// Sibling path for the leaf at `index`.
    pub fn prove(&self, index: usize) -> Result<Proof, MerkleError> {
        prove_leaf(&self.levels, index)
    }

    /// Consume the tree, returning its levels.
    pub fn into_levels(self) -> Vec<Vec<Digest>> {
        self.levels
    }
}

/// Configurable tree builder.
#[derive(Clone, Debug)]
pub struct TreeBuilder<H: MerkleHasher = Sha256Hasher> {
    hasher: H,
    parallel: bool,
    min_parallel_pairs: usize,
    cancel: Option<CancelToken>,
}

impl Default for TreeBuilder<Sha256Hasher> {
    fn default() -> Self {
        Self::new(Sha256Hasher)
    }
}

impl TreeBuilder<HashAlgorithm> {
    /// Builder configured from a [`BuildConfig`].
    pub fn from_config(config: &BuildConfig) -> Self {
        Self::new(config.hash)
            .parallel(config.parallel)
            .min_parallel_pairs(config.min_parallel_pairs)
    }
}

impl<H: MerkleHasher> TreeBuilder<H> {
    /// Sequential builder using `hasher`.
    pub fn new(hasher: H) -> Self {
        Self {
            hasher,
            parallel: false,
            min_parallel_pairs: BuildConfig::DEFAULT_MIN_PARALLEL_PAIRS,
            cancel: None,
        }
    }

    /// Hash each level on the rayon pool. Ignored unless the crate is built
    /// with the `parallel` feature.
    pub fn parallel(mut self, enabled: bool) -> Self {
        #[cfg(not(feature = "parallel"))]
        if enabled {
            tracing::warn!(
                "parallel hashing requested without the `parallel` feature; hashing sequentially"
            );
        }
        self.parallel = enabled;
        self
    }

    /// Levels with fewer pairs than this are hashed sequentially.
    pub fn min_parallel_pairs(mut self, pairs: usize) -> Self {
        self.min_parallel_pairs = pairs.max(1);
        self
    }

    /// Attach a cancellation token.
    pub fn cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = Some(token);
        self
    }

    /// The hasher leaves and nodes are combined with.
    pub fn hasher(&self) -> &H {
        &self.hasher
    }

    /// Whether parallel hashing was requested.
    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    /// Build the tree over `leaves`, in the given index order.
    ///
    /// All-or-nothing: on error (empty input, duplicate leaf, cancellation)
    /// no partial tree is returned.
    #[instrument(
        skip_all,
        fields(
            leaves = leaves.len(),
            hash = %self.hasher.algorithm(),
            parallel = self.is_parallel(),
            min_pairs = self.min_parallel_pairs,
        )
    )]
    pub fn build(&self, leaves: Vec<Digest>) -> Result<MerkleTree, MerkleError> {
        if leaves.is_empty() {
            return Err(MerkleError::EmptyInput);
        }
        self.check_cancelled(0)?;
        reject_duplicates(&leaves)?;

        let mut levels = vec![leaves];
        while let Some(current) = levels.last().filter(|level| level.len() > 1) {
            self.check_cancelled(levels.len())?;
            let next = self.hash_level(current);
            debug!(level = levels.len(), nodes = next.len(), "hashed level");
            levels.push(next);
        }

        let tree = MerkleTree::from_levels(levels, self.hasher.algorithm());
        info!(
            leaves = tree.leaf_count(),
            depth = tree.depth(),
            root = %tree.root(),
            "built distribution tree"
        );
        Ok(tree)
    }

    fn check_cancelled(&self, level: usize) -> Result<(), MerkleError> {
        match &self.cancel {
            Some(token) if token.is_cancelled() => Err(MerkleError::Cancelled { level }),
            _ => Ok(()),
        }
    }

    /// Hash one level into the next. Output index `i` is always the parent
    /// of inputs `2i` and `2i + 1`, whichever path computes it.
    fn hash_level(&self, current: &[Digest]) -> Vec<Digest> {
        #[cfg(feature = "parallel")]
        if self.parallel && current.len() / 2 >= self.min_parallel_pairs {
            use rayon::prelude::*;
            return current
                .par_chunks(2)
                .map(|pair| self.combine(pair))
                .collect();
        }

        current.chunks(2).map(|pair| self.combine(pair)).collect()
    }

    #[inline]
    fn combine(&self, pair: &[Digest]) -> Digest {
        match pair {
            [a, b] => self.hasher.hash_pair(a, b),
            // Unpaired last node: promoted unchanged.
            _ => pair[0],
        }
    }
}

/// Fail on the first bit-identical leaf, reporting both indices.
pub(super) fn reject_duplicates(leaves: &[Digest]) -> Result<(), MerkleError> {
    let mut seen: HashMap<&Digest, usize> = HashMap::with_capacity(leaves.len());
    for (index, leaf) in leaves.iter().enumerate() {
        if let Some(&first) = seen.get(leaf) {
            return Err(MerkleError::DuplicateLeaf {
                leaf: *leaf,
                first,
                second: index,
            });
        }
        seen.insert(leaf, index);
    }
    Ok(())
}

/// Build with SHA-256, returning the root and every level.
pub fn build(leaves: &[Digest]) -> Result<(Digest, Vec<Vec<Digest>>), MerkleError> {
    let tree = TreeBuilder::default().build(leaves.to_vec())?;
    Ok((tree.root(), tree.into_levels()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::hash::Keccak256Hasher;
    use std::sync::{mpsc, Mutex};

    fn leaves(n: usize) -> Vec<Digest> {
        (0..n)
            .map(|i| Sha256Hasher.hash_leaf(format!("leaf_{}", i).as_bytes()))
            .collect()
    }

    #[test]
    fn test_empty_input_rejected() {
        assert_eq!(build(&[]).unwrap_err(), MerkleError::EmptyInput);
    }

    #[test]
    fn test_single_leaf_is_root() {
        let l = leaves(1);
        let (root, levels) = build(&l).unwrap();
        assert_eq!(root, l[0]);
        assert_eq!(levels.len(), 1);
    }

    #[test]
    fn test_three_leaf_scenario() {
        let l = leaves(3);
        let (root, levels) = build(&l).unwrap();

        let n_ab = Sha256Hasher.hash_pair(&l[0], &l[1]);
        assert_eq!(levels[1], vec![n_ab, l[2]]);
        assert_eq!(root, Sha256Hasher.hash_pair(&n_ab, &l[2]));
    }

    #[test]
    fn test_level_sizes_are_ceil_half() {
        for n in 1..40 {
            let (_, levels) = build(&leaves(n)).unwrap();
            for pair in levels.windows(2) {
                assert_eq!(pair[1].len(), pair[0].len().div_ceil(2));
            }
            assert_eq!(levels.last().unwrap().len(), 1);
        }
    }

    #[test]
    fn test_odd_node_promoted_not_duplicated() {
        let l = leaves(5);
        let (_, levels) = build(&l).unwrap();
        // Level 1: [H(0,1), H(2,3), L4]
        assert_eq!(levels[1][2], l[4]);
        // Level 2: [H(H01, H23), L4]
        assert_eq!(levels[2][1], l[4]);
        assert_ne!(levels[1][2], Sha256Hasher.hash_pair(&l[4], &l[4]));
    }

    #[test]
    fn test_duplicate_leaf_rejected() {
        let mut l = leaves(4);
        l.push(l[1]);
        let err = build(&l).unwrap_err();
        assert_eq!(
            err,
            MerkleError::DuplicateLeaf {
                leaf: l[1],
                first: 1,
                second: 4
            }
        );
    }

    #[test]
    fn test_root_determinism() {
        let l = leaves(17);
        assert_eq!(build(&l).unwrap().0, build(&l).unwrap().0);
    }

    #[test]
    fn test_n_and_n_plus_one_differ() {
        let all = leaves(33);
        for n in 1..32 {
            let a = build(&all[..n]).unwrap().0;
            let b = build(&all[..n + 1]).unwrap().0;
            assert_ne!(a, b, "roots collided for n = {}", n);
        }
    }

    #[test]
    fn test_hasher_choice_changes_root() {
        let l = leaves(4);
        let sha = TreeBuilder::new(Sha256Hasher).build(l.clone()).unwrap();
        let keccak = TreeBuilder::new(Keccak256Hasher).build(l).unwrap();
        assert_ne!(sha.root(), keccak.root());
        assert_eq!(keccak.algorithm(), HashAlgorithm::Keccak256);
    }

    #[test]
    fn test_cancelled_build_returns_no_tree() {
        let token = CancelToken::new();
        token.cancel();
        let builder = TreeBuilder::default().cancel_token(token);
        let err = builder.build(leaves(8)).unwrap_err();
        assert_eq!(err, MerkleError::Cancelled { level: 0 });
    }

    /// Sha256 hasher that, on its first call, hands control to another
    /// thread and waits for it to trip the token.
    struct TripOnFirstHash {
        token: CancelToken,
        started: Mutex<Option<mpsc::Sender<()>>>,
    }

    impl MerkleHasher for TripOnFirstHash {
        fn hash_tagged(&self, tag: u8, parts: &[&[u8]]) -> Digest {
            let first = self.started.lock().unwrap().take();
            if let Some(tx) = first {
                tx.send(()).unwrap();
                while !self.token.is_cancelled() {
                    std::thread::yield_now();
                }
            }
            Sha256Hasher.hash_tagged(tag, parts)
        }

        fn algorithm(&self) -> HashAlgorithm {
            HashAlgorithm::Sha256
        }
    }

    #[test]
    fn test_cancelled_mid_build_from_another_thread() {
        let token = CancelToken::new();
        let (tx, rx) = mpsc::channel();
        let hasher = TripOnFirstHash {
            token: token.clone(),
            started: Mutex::new(Some(tx)),
        };
        let builder = TreeBuilder::new(hasher).cancel_token(token.clone());

        let canceller = std::thread::spawn(move || {
            rx.recv().unwrap();
            token.cancel();
        });
        let result = builder.build(leaves(1 << 12));
        canceller.join().unwrap();

        match result {
            Err(MerkleError::Cancelled { level }) => {
                assert!(level > 0);
                assert_eq!(level, 2);
            }
            other => panic!("expected cancellation, got {:?}", other.map(|t| t.root())),
        }
    }

    #[test]
    fn test_parallel_request_recorded_without_feature() {
        let builder = TreeBuilder::default().parallel(true);
        assert!(builder.is_parallel());
        let tree = builder.build(leaves(5)).unwrap();
        assert_eq!(tree.root(), TreeBuilder::default().build(leaves(5)).unwrap().root());
    }

    #[test]
    fn test_untripped_token_builds() {
        let token = CancelToken::new();
        let builder = TreeBuilder::default().cancel_token(token.clone());
        assert!(builder.build(leaves(8)).is_ok());
        assert!(!token.is_cancelled());
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let l = leaves(1000);
        let sequential = TreeBuilder::default().build(l.clone()).unwrap();
        let parallel = TreeBuilder::default()
            .parallel(true)
            .min_parallel_pairs(1)
            .build(l)
            .unwrap();
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn test_from_config() {
        let config = BuildConfig {
            hash: HashAlgorithm::Keccak256,
            ..BuildConfig::default()
        };
        let tree = TreeBuilder::from_config(&config).build(leaves(3)).unwrap();
        assert_eq!(tree.algorithm(), HashAlgorithm::Keccak256);
        assert_eq!(
            tree.root(),
            TreeBuilder::new(Keccak256Hasher).build(leaves(3)).unwrap().root()
        );
    }
}
