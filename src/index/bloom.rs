//! Bloom filter: soundness (no false negatives) over a fixed bit vector.

use crate::types::{DEFAULT_BLOOM_BITS, DEFAULT_BLOOM_HASHES};

/// Seeded polynomial hash, mod `num_bits`.
fn hash_with_seed(key: &[u8], seed: u64, num_bits: usize) -> usize {
    let mut h: u64 = seed;
    for &b in key {
        h = h.wrapping_mul(31).wrapping_add(b as u64);
    }
    (h % num_bits as u64) as usize
}

/// Fixed-size bloom filter with `k` independent seeded hashes.
pub struct BloomFilter {
    bits: Vec<bool>,
    num_hashes: usize,
}

impl BloomFilter {
    /// Create a filter with `num_bits` bits and `num_hashes` hash functions,
    /// substituting the defaults (10000 bits, 3 hashes) for zero arguments.
    pub fn new(num_bits: usize, num_hashes: usize) -> Self {
        let num_bits = if num_bits == 0 {
            DEFAULT_BLOOM_BITS
        } else {
            num_bits
        };
        let num_hashes = if num_hashes == 0 {
            DEFAULT_BLOOM_HASHES
        } else {
            num_hashes
        };
        Self {
            bits: vec![false; num_bits],
            num_hashes,
        }
    }

    pub fn num_bits(&self) -> usize {
        self.bits.len()
    }

    fn positions(&self, key: &[u8]) -> impl Iterator<Item = usize> + '_ {
        (0..self.num_hashes as u64).map(move |seed| hash_with_seed(key, seed, self.bits.len()))
    }

    pub fn insert(&mut self, key: &[u8]) {
        for pos in self.positions(key).collect::<Vec<_>>() {
            self.bits[pos] = true;
        }
    }

    /// `false` is a definitive negative; `true` may be a false positive.
    pub fn might_contain(&self, key: &[u8]) -> bool {
        self.positions(key).all(|pos| self.bits[pos])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;
    use std::collections::HashSet;

    /// `n` distinct random 16-byte keys, matching the scenario's key shape.
    fn random_distinct_keys(n: usize, rng: &mut impl Rng) -> Vec<[u8; 16]> {
        let mut seen = HashSet::new();
        while seen.len() < n {
            let mut key = [0u8; 16];
            rng.fill(&mut key);
            seen.insert(key);
        }
        seen.into_iter().collect()
    }

    #[test]
    fn inserted_keys_are_always_reported_present() {
        let mut rng = rand::thread_rng();
        let keys = random_distinct_keys(100, &mut rng);

        let mut filter = BloomFilter::new(10_000, 3);
        for key in &keys {
            filter.insert(key);
        }
        for key in &keys {
            assert!(filter.might_contain(key));
        }
    }

    #[test]
    fn false_positive_rate_stays_under_five_percent() {
        let mut rng = rand::thread_rng();
        let inserted: HashSet<[u8; 16]> = random_distinct_keys(100, &mut rng).into_iter().collect();

        let mut filter = BloomFilter::new(10_000, 3);
        for key in &inserted {
            filter.insert(key);
        }

        let mut false_positives = 0u32;
        let mut valid_trials = 0u32;
        while valid_trials < 10_000 {
            let mut key = [0u8; 16];
            rng.fill(&mut key);
            if inserted.contains(&key) {
                continue;
            }
            valid_trials += 1;
            if filter.might_contain(&key) {
                false_positives += 1;
            }
        }
        let rate = false_positives as f64 / valid_trials as f64;
        assert!(rate < 0.05, "false positive rate too high: {rate}");
    }

    #[test]
    fn zero_arguments_select_defaults() {
        let filter = BloomFilter::new(0, 0);
        assert_eq!(filter.num_bits(), DEFAULT_BLOOM_BITS);
        assert_eq!(filter.num_hashes, DEFAULT_BLOOM_HASHES);
    }
}
