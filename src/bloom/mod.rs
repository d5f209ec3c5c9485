use xxhash_rust::xxh3::xxh3_128;

use crate::error::{Error, Result};

/// Default target false positive rate for SSTable filters.
pub const DEFAULT_FALSE_POSITIVE_RATE: f64 = 0.01;

/// Probabilistic data structure: "is this key in the set?"
///
/// - If any bit is 0 → key is DEFINITELY NOT in the set
/// - If all bits are 1 → key is PROBABLY in the set (false positive possible)
///
/// Each SSTable carries one, so a point lookup can skip tables that
/// definitely don't hold the key without binary searching them.
///
/// Sizing:
///   bits_per_key = -1.44 * log2(false_positive_rate)
///   num_hashes = bits_per_key * ln(2)
///
///   1% FPR  → ~10 bits/key, 7 hashes
///   0.1% FPR → ~14 bits/key, 10 hashes
///
/// Hash trick: don't need k independent hash functions.
/// Use double hashing: h_i(key) = h1(key) + i * h2(key) (mod m)
/// where h1, h2 come from splitting a 128-bit hash into two 64-bit halves.
#[derive(Debug, Clone)]
pub struct BloomFilter {
    bits: Vec<u64>,
    num_hashes: u32,
    num_bits: u32,
}

pub(crate) fn validate_false_positive_rate(rate: f64) -> Result<()> {
    if rate > 0.0 && rate < 1.0 {
        Ok(())
    } else {
        Err(Error::InvalidConfiguration(format!(
            "bloom false positive rate must be in (0, 1), got {rate}"
        )))
    }
}

impl BloomFilter {
    /// Create a new bloom filter sized for `expected_items` at the given FPR.
    ///
    /// An `expected_items` of zero is sized as one. Fails if the rate is not
    /// in (0, 1), or with `ResourceExhaustion` if the bit array cannot be
    /// allocated.
    pub fn new(expected_items: usize, false_positive_rate: f64) -> Result<Self> {
        validate_false_positive_rate(false_positive_rate)?;
        let expected_items = expected_items.max(1);

        let bits_per_key = -1.44 * false_positive_rate.log2();
        let num_bits = ((expected_items as f64) * bits_per_key).ceil() as u32;
        let num_bits = num_bits.max(64);

        let num_hashes = (bits_per_key * 2.0f64.ln()).ceil() as u32;
        let num_hashes = num_hashes.max(1);

        // Bit array packed into u64 words
        let num_words = (num_bits as usize).div_ceil(64);
        let mut bits = Vec::new();
        bits.try_reserve_exact(num_words)?;
        bits.resize(num_words, 0u64);

        Ok(Self {
            bits,
            num_hashes,
            num_bits,
        })
    }

    /// Add a key to the bloom filter.
    pub fn insert(&mut self, key: &str) {
        let (h1, h2) = hash_key(key);
        for i in 0..self.num_hashes {
            let pos = self.position(h1, h2, i);
            self.bits[(pos / 64) as usize] |= 1 << (pos % 64);
        }
    }

    /// Check if a key MIGHT be in the set.
    /// false → definitely not here. true → probably here.
    pub fn may_contain(&self, key: &str) -> bool {
        let (h1, h2) = hash_key(key);
        (0..self.num_hashes).all(|i| {
            let pos = self.position(h1, h2, i);
            (self.bits[(pos / 64) as usize] >> (pos % 64)) & 1 == 1
        })
    }

    /// Get the number of hash functions used.
    pub fn num_hashes(&self) -> u32 {
        self.num_hashes
    }

    /// Get the total number of bits in the filter.
    pub fn num_bits(&self) -> u32 {
        self.num_bits
    }

    /// h_i = (h1 + i * h2) mod num_bits
    fn position(&self, h1: u64, h2: u64, i: u32) -> u32 {
        let i = i as u64;
        (h1.wrapping_add(i.wrapping_mul(h2)) % (self.num_bits as u64)) as u32
    }
}

/// Split one 128-bit hash into the two 64-bit halves used for double hashing.
fn hash_key(key: &str) -> (u64, u64) {
    let hash128 = xxh3_128(key.as_bytes());
    (hash128 as u64, (hash128 >> 64) as u64)
}
