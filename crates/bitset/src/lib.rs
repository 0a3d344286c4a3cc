//! # BitBuckets — packed bit-addressable bucket array
//!
//! A contiguous byte buffer holding `count` fixed-width unsigned buckets,
//! each `bucket_size` bits wide (`1..=8`). This is the storage primitive
//! underneath [`classic`](../classic/index.html)'s single-bit buckets; a
//! wider `bucket_size` is kept available for counting-filter style buckets
//! even though the current callers only ever use `bucket_size = 1`.
//!
//! ## Bit addressing
//!
//! A cell occupies bits `[index*bucket_size, index*bucket_size +
//! bucket_size)` of `data`, packed little-endian within each byte (bit 0 is
//! the least significant bit of byte 0). When a cell straddles a byte
//! boundary the read/write recurses on the low fragment (the bits remaining
//! in the current byte) and the high fragment (the rest), OR-ing the high
//! fragment back in shifted up by the bits taken from the low byte.
//!
//! ## Wire format
//!
//! ```text
//! bucket_size: u8 | max: u8 | count: u64 BE | data_len: u64 BE | data: [u8; data_len]
//! ```
//!
//! This framing is part of the on-disk contract (see the `format` crate's
//! `DumpHeader`) and its field widths/endianness are fixed by that contract,
//! not left to implementation taste.
use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read, Write};
use std::sync::RwLock;
use thiserror::Error;

/// Errors raised while constructing or loading a [`BitBuckets`].
#[derive(Debug, Error)]
pub enum BitBucketsError {
    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("bucket_size {0} out of range [1, 8]")]
    InvalidBucketSize(u8),

    #[error("data_len mismatch: header says {expected}, needed {actual}")]
    LengthMismatch { expected: u64, actual: u64 },
}

/// A packed array of `bucket_size`-bit unsigned buckets.
///
/// `bucket_size` is fixed at construction and never changes. Mutations take
/// the internal write lock; reads take the read lock, so a cell that
/// straddles a byte boundary is always observed as a single atomic fragment
/// pair — never half-written.
pub struct BitBuckets {
    bucket_size: u8,
    max: u8,
    count: u64,
    data: RwLock<Vec<u8>>,
}

impl BitBuckets {
    /// Allocates a zeroed bucket array of `count` cells, `bucket_size` bits each.
    pub fn new(count: u64, bucket_size: u8) -> Result<Self, BitBucketsError> {
        if bucket_size == 0 || bucket_size > 8 {
            return Err(BitBucketsError::InvalidBucketSize(bucket_size));
        }
        let byte_len = Self::byte_len(count, bucket_size);
        Ok(Self {
            bucket_size,
            max: ((1u16 << bucket_size) - 1) as u8,
            count,
            data: RwLock::new(vec![0u8; byte_len as usize]),
        })
    }

    fn byte_len(count: u64, bucket_size: u8) -> u64 {
        (count * bucket_size as u64 + 7) / 8
    }

    /// Reads the value stored at `index`.
    pub fn get(&self, index: u64) -> u32 {
        let data = self.data.read().expect("bitbuckets lock poisoned");
        get_bits(&data, index * self.bucket_size as u64, self.bucket_size)
    }

    /// Writes `value` at `index`, clamping to `max_bucket_value()`.
    pub fn set(&self, index: u64, value: u32) {
        let value = value.min(self.max as u32);
        let mut data = self.data.write().expect("bitbuckets lock poisoned");
        set_bits(&mut data, index * self.bucket_size as u64, self.bucket_size, value);
    }

    /// Adds `delta` to the bucket at `index`, saturating to `[0, max]`.
    pub fn increment(&self, index: u64, delta: i32) {
        let mut data = self.data.write().expect("bitbuckets lock poisoned");
        let offset = index * self.bucket_size as u64;
        let current = get_bits(&data, offset, self.bucket_size) as i64;
        let updated = (current + delta as i64).clamp(0, self.max as i64);
        set_bits(&mut data, offset, self.bucket_size, updated as u32);
    }

    /// Zeroes every bucket; geometry (`bucket_size`, `count`) is unchanged.
    pub fn reset(&self) {
        let mut data = self.data.write().expect("bitbuckets lock poisoned");
        data.iter_mut().for_each(|b| *b = 0);
    }

    /// Largest value a single bucket can hold (`2^bucket_size - 1`).
    pub fn max_bucket_value(&self) -> u8 {
        self.max
    }

    /// Number of buckets.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Bits per bucket.
    pub fn bucket_size(&self) -> u8 {
        self.bucket_size
    }

    /// Serializes `bucket_size | max | count (BE) | data_len (BE) | data`.
    pub fn dump<W: Write>(&self, w: &mut W) -> io::Result<()> {
        let data = self.data.read().expect("bitbuckets lock poisoned");
        w.write_u8(self.bucket_size)?;
        w.write_u8(self.max)?;
        w.write_u64::<BigEndian>(self.count)?;
        w.write_u64::<BigEndian>(data.len() as u64)?;
        w.write_all(&data)?;
        Ok(())
    }

    /// Deserializes a `BitBuckets` from the wire format written by [`dump`](Self::dump).
    ///
    /// A mismatch between the declared `data_len` and the length implied by
    /// `count`/`bucket_size` is a fatal load error — the file is corrupt or
    /// was produced by an incompatible version.
    pub fn load<R: Read>(r: &mut R) -> Result<Self, BitBucketsError> {
        let bucket_size = r.read_u8()?;
        let max = r.read_u8()?;
        let count = r.read_u64::<BigEndian>()?;
        let data_len = r.read_u64::<BigEndian>()?;

        let expected_len = Self::byte_len(count, bucket_size);
        if data_len != expected_len {
            return Err(BitBucketsError::LengthMismatch {
                expected: expected_len,
                actual: data_len,
            });
        }

        let mut data = vec![0u8; data_len as usize];
        r.read_exact(&mut data)?;

        Ok(Self {
            bucket_size,
            max,
            count,
            data: RwLock::new(data),
        })
    }
}

/// Reads `length` (`<= 8`) bits starting at bit-offset `offset`.
fn get_bits(data: &[u8], offset: u64, length: u8) -> u32 {
    let byte_index = (offset / 8) as usize;
    let byte_offset = (offset % 8) as u8;
    if byte_offset + length > 8 {
        let rem = 8 - byte_offset;
        let low = get_bits(data, offset, rem);
        let high = get_bits(data, offset + rem as u64, length - rem);
        return low | (high << rem);
    }
    let mask: u32 = (1u32 << length) - 1;
    (data[byte_index] as u32 & (mask << byte_offset)) >> byte_offset
}

/// Writes the low `length` (`<= 8`) bits of `value` starting at bit-offset `offset`.
fn set_bits(data: &mut [u8], offset: u64, length: u8, value: u32) {
    let byte_index = (offset / 8) as usize;
    let byte_offset = (offset % 8) as u8;
    if byte_offset + length > 8 {
        let rem = 8 - byte_offset;
        set_bits(data, offset, rem, value);
        set_bits(data, offset + rem as u64, length - rem, value >> rem);
        return;
    }
    let mask: u32 = (1u32 << length) - 1;
    let cleared = data[byte_index] as u32 & !(mask << byte_offset);
    data[byte_index] = (cleared | ((value & mask) << byte_offset)) as u8;
}

#[cfg(test)]
mod tests;
