//! Build configuration.

use crate::core::hash::HashAlgorithm;

/// Tree construction settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BuildConfig {
    /// Hash family for leaves and internal nodes.
    pub hash: HashAlgorithm,
    /// Hash levels on the rayon pool (needs the `parallel` feature).
    pub parallel: bool,
    /// Smallest level, in pairs, worth handing to the pool.
    pub min_parallel_pairs: usize,
}

impl BuildConfig {
    /// Default parallel threshold.
    pub const DEFAULT_MIN_PARALLEL_PAIRS: usize = 1024;
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            hash: HashAlgorithm::Sha256,
            parallel: false,
            min_parallel_pairs: Self::DEFAULT_MIN_PARALLEL_PAIRS,
        }
    }
}

impl BuildConfig {
    /// Create config from environment variables.
    ///
    /// - `AIRDROP_HASH`: `sha256` or `keccak256`
    /// - `AIRDROP_PARALLEL`: `1` or `true`
    /// - `AIRDROP_MIN_PARALLEL_PAIRS`: positive integer
    ///
    /// Unset or unparseable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            hash: lookup("AIRDROP_HASH")
                .and_then(|v| v.parse().ok())
                .unwrap_or(defaults.hash),
            parallel: lookup("AIRDROP_PARALLEL")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(defaults.parallel),
            min_parallel_pairs: lookup("AIRDROP_MIN_PARALLEL_PAIRS")
                .and_then(|v| v.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.min_parallel_pairs),
        }
    }
}
