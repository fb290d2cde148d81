//! Deterministic seed hierarchy for the mock generators.
//!
//! A request seed is expanded into one sub-seed per entity via BLAKE3, so a
//! ticker's series depends only on `(seed, ticker)` and never on the order in
//! which tickers are generated or on how many are selected alongside it.

use rand::rngs::StdRng;
use rand::SeedableRng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedHierarchy {
    master_seed: u64,
}

impl SeedHierarchy {
    pub fn new(master_seed: u64) -> Self {
        Self { master_seed }
    }

    /// Derive the sub-seed for one entity.
    pub fn sub_seed(&self, entity: &str) -> u64 {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&self.master_seed.to_le_bytes());
        hasher.update(entity.as_bytes());
        let hash = hasher.finalize();
        let mut bytes = [0u8; 8];
        bytes.copy_from_slice(&hash.as_bytes()[..8]);
        u64::from_le_bytes(bytes)
    }

    /// Seeded generator for one entity.
    pub fn rng_for(&self, entity: &str) -> StdRng {
        StdRng::seed_from_u64(self.sub_seed(entity))
    }
}
