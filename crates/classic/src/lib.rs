//! # ClassicFilter — a standard Bloom filter
//!
//! One [`bitset::BitBuckets`] of single-bit buckets, probed `k` times per key
//! by a double-hashing schedule derived from one 64-bit FNV-1a hash. No
//! false negatives: once a key has been added, `test` for that key always
//! returns `true`.
mod hash;

use bitset::BitBuckets;
use format::ClassicHeader;
use std::io::{self, Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;

const DEFAULT_FILL_RATIO: f64 = 0.5;

#[derive(Debug, Error)]
pub enum ClassicFilterError {
    #[error("illegal params: n and error_rate must be positive, error_rate <= 0.1")]
    InvalidOptions,

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("bitbuckets error: {0}")]
    BitBuckets(#[from] bitset::BitBucketsError),

    #[error("format error: {0}")]
    Format(#[from] format::FormatError),
}

/// Validated construction options for a `ClassicFilter`.
#[derive(Debug, Clone)]
pub struct FilterOptions {
    pub name: String,
    pub n: u64,
    pub error_rate: f64,
}

/// Computes the optimal bit capacity `m` for `n` items at false-positive
/// rate `p`, assuming the reference implementation's target fill ratio of 0.5.
pub fn optimal_m(n: u64, p: f64) -> u64 {
    let denom = (DEFAULT_FILL_RATIO.ln() * DEFAULT_FILL_RATIO.ln()) / p.ln().abs();
    (n as f64 / denom).ceil() as u64
}

/// Computes the optimal probe count `k` for false-positive rate `p`.
pub fn optimal_k(p: f64) -> u32 {
    (1.0 / p).log2().ceil() as u32
}

/// A standard Bloom filter over one packed bit array.
pub struct ClassicFilter {
    name: String,
    m: u64,
    k: u32,
    count: AtomicU64,
    buckets: BitBuckets,
}

impl ClassicFilter {
    /// Validates `options` and constructs a fresh, empty filter.
    pub fn new(options: FilterOptions) -> Result<Self, ClassicFilterError> {
        if options.n == 0 || options.error_rate <= 0.0 || options.error_rate > 0.1 {
            return Err(ClassicFilterError::InvalidOptions);
        }

        let m = optimal_m(options.n, options.error_rate).max(1);
        let k = optimal_k(options.error_rate).max(1);

        Ok(Self {
            name: options.name,
            m,
            k,
            count: AtomicU64::new(0),
            buckets: BitBuckets::new(m, 1)?,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bit capacity `m`.
    pub fn capacity(&self) -> u64 {
        self.m
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::SeqCst)
    }

    fn probe_indices(&self, key: &[u8]) -> impl Iterator<Item = u64> + '_ {
        let (lower, upper) = hash::hash_kernel(key);
        (0..self.k).map(move |i| {
            (lower as u64).wrapping_add((i as u64).wrapping_mul(upper as u64)) % self.m
        })
    }

    /// Marks all `k` positions for `key` and increments `count`.
    pub fn add(&self, key: &[u8]) {
        for idx in self.probe_indices(key) {
            self.buckets.set(idx, 1);
        }
        self.count.fetch_add(1, Ordering::SeqCst);
    }

    /// Returns `true` iff all `k` positions for `key` are set. `false` is
    /// always correct; `true` is a probabilistic assertion.
    pub fn test(&self, key: &[u8]) -> bool {
        self.probe_indices(key).all(|idx| self.buckets.get(idx) != 0)
    }

    /// Tests and adds in one pass, returning the pre-write verdict.
    pub fn test_and_add(&self, key: &[u8]) -> bool {
        let mut member = true;
        for idx in self.probe_indices(key) {
            if self.buckets.get(idx) == 0 {
                member = false;
            }
            self.buckets.set(idx, 1);
        }
        self.count.fetch_add(1, Ordering::SeqCst);
        member
    }

    /// Zeroes the buckets and resets `count`.
    pub fn reset(&self) {
        self.buckets.reset();
        self.count.store(0, Ordering::SeqCst);
    }

    /// Exact fill ratio: fraction of the `m` bits currently set.
    pub fn fill_ratio(&self) -> f64 {
        let sum: u64 = (0..self.m).map(|i| self.buckets.get(i) as u64).sum();
        sum as f64 / self.m as f64
    }

    /// Closed-form fill-ratio estimate assuming independent probes.
    pub fn estimated_fill_ratio(&self) -> f64 {
        1.0 - (-(self.count() as f64) * self.k as f64 / self.m as f64).exp()
    }

    /// Writes `ClassicHeader` followed by the BitBuckets payload.
    pub fn dump<W: Write>(&self, w: &mut W) -> Result<(), ClassicFilterError> {
        let header = ClassicHeader {
            name: self.name.clone(),
            m: self.m,
            k: self.k,
            count: self.count(),
        };
        header.write(w)?;
        self.buckets.dump(w)?;
        Ok(())
    }

    /// Reads a filter previously written by [`dump`](Self::dump).
    pub fn load<R: Read>(r: &mut R) -> Result<Self, ClassicFilterError> {
        let header = ClassicHeader::read(r)?;
        let buckets = BitBuckets::load(r)?;
        Ok(Self {
            name: header.name,
            m: header.m,
            k: header.k,
            count: AtomicU64::new(header.count),
            buckets,
        })
    }
}

#[cfg(test)]
mod tests;
