//! Distance spaces over opaque object payloads.
//!
//! A [`Space`] measures the distance between two payloads. The function may be
//! asymmetric and need not obey the triangle inequality; pruning treats it as
//! a black box. This module ships the three concrete spaces the surrogate
//! wrappers need:
//!
//! | Space | Payload encoding | Distance |
//! |-------|-----------------|----------|
//! | [`L2Space`] | `f32` little-endian | Euclidean |
//! | [`SpearmanRhoSpace`] | `i32` ranks, little-endian | sum of squared rank differences |
//! | [`BitHammingSpace`] | packed `u32` words, little-endian | popcount of XOR |
//!
//! Spaces for application data live outside the core; anything implementing
//! [`Space`] can drive a [`VpTree`](crate::vptree::VpTree).

use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::info;

use crate::error::{IndexError, Result};
use crate::object::{Dataset, Object};

/// A distance function over opaque payload bytes.
pub trait Space: Send + Sync {
    /// Short human-readable name, used in logs.
    fn name(&self) -> &'static str;

    /// Distance from `a` to `b`. May be asymmetric.
    fn distance(&self, a: &[u8], b: &[u8]) -> f32;
}

/// Euclidean distance over dense `f32` vectors.
#[derive(Debug, Clone, Copy, Default)]
pub struct L2Space;

impl L2Space {
    /// Encode an `f32` vector into an [`Object`] payload.
    pub fn create_obj_from_vector(&self, id: u32, label: i32, values: &[f32]) -> Object {
        Object::new(id, label, encode_f32(values))
    }

    /// Decode a payload produced by [`Self::create_obj_from_vector`].
    pub fn decode_vector(&self, payload: &[u8]) -> Vec<f32> {
        decode_f32(payload)
    }

    /// Read a dense dataset: one object per line, whitespace-separated
    /// components, ids assigned by line number.
    pub fn read_dataset(&self, path: impl AsRef<Path>) -> Result<Dataset> {
        let file = std::fs::File::open(path.as_ref())?;
        let reader = BufReader::new(file);

        let mut data = Dataset::new();
        let mut dim = 0usize;
        for (lineno, line) in reader.lines().enumerate() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let mut values = Vec::new();
            for tok in line.split_whitespace() {
                let v: f32 = tok.parse().map_err(|_| {
                    IndexError::InvalidConfiguration(format!(
                        "line {}: cannot parse '{}' as a number",
                        lineno + 1,
                        tok
                    ))
                })?;
                values.push(v);
            }
            if dim == 0 {
                dim = values.len();
            } else if values.len() != dim {
                return Err(IndexError::InvalidConfiguration(format!(
                    "line {}: {} components, expected {}",
                    lineno + 1,
                    values.len(),
                    dim
                )));
            }
            data.push(self.create_obj_from_vector(data.len() as u32, -1, &values));
        }
        info!(
            "read {} vectors of dimension {} from disk",
            data.len(),
            dim
        );
        Ok(data)
    }
}

impl Space for L2Space {
    fn name(&self) -> &'static str {
        "l2"
    }

    fn distance(&self, a: &[u8], b: &[u8]) -> f32 {
        let mut acc = 0.0f32;
        for (xa, xb) in a.chunks_exact(4).zip(b.chunks_exact(4)) {
            let x = f32::from_le_bytes([xa[0], xa[1], xa[2], xa[3]]);
            let y = f32::from_le_bytes([xb[0], xb[1], xb[2], xb[3]]);
            let d = x - y;
            acc += d * d;
        }
        acc.sqrt()
    }
}

/// Spearman's rho (squared rank difference) over permutation vectors.
///
/// Payloads are rank vectors of equal length; the distance between two
/// permutations is `sum_i (a_i - b_i)^2`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpearmanRhoSpace;

impl SpearmanRhoSpace {
    /// Encode a rank vector into an [`Object`] payload.
    pub fn create_obj_from_ranks(&self, id: u32, label: i32, ranks: &[i32]) -> Object {
        let mut payload = Vec::with_capacity(ranks.len() * 4);
        for r in ranks {
            payload.extend_from_slice(&r.to_le_bytes());
        }
        Object::new(id, label, payload)
    }
}

impl Space for SpearmanRhoSpace {
    fn name(&self) -> &'static str {
        "spearman_rho"
    }

    fn distance(&self, a: &[u8], b: &[u8]) -> f32 {
        let mut acc = 0i64;
        for (xa, xb) in a.chunks_exact(4).zip(b.chunks_exact(4)) {
            let x = i32::from_le_bytes([xa[0], xa[1], xa[2], xa[3]]) as i64;
            let y = i32::from_le_bytes([xb[0], xb[1], xb[2], xb[3]]) as i64;
            acc += (x - y) * (x - y);
        }
        acc as f32
    }
}

/// Hamming distance over bit vectors packed into `u32` words.
#[derive(Debug, Clone, Copy, Default)]
pub struct BitHammingSpace;

impl BitHammingSpace {
    /// Encode packed bit words into an [`Object`] payload.
    pub fn create_obj_from_words(&self, id: u32, label: i32, words: &[u32]) -> Object {
        let mut payload = Vec::with_capacity(words.len() * 4);
        for w in words {
            payload.extend_from_slice(&w.to_le_bytes());
        }
        Object::new(id, label, payload)
    }
}

impl Space for BitHammingSpace {
    fn name(&self) -> &'static str {
        "bit_hamming"
    }

    fn distance(&self, a: &[u8], b: &[u8]) -> f32 {
        let mut acc = 0u32;
        for (xa, xb) in a.chunks_exact(4).zip(b.chunks_exact(4)) {
            let x = u32::from_le_bytes([xa[0], xa[1], xa[2], xa[3]]);
            let y = u32::from_le_bytes([xb[0], xb[1], xb[2], xb[3]]);
            acc += (x ^ y).count_ones();
        }
        acc as f32
    }
}

/// Encode an `f32` query vector into the payload form dense spaces expect.
pub fn encode_query(values: &[f32]) -> Vec<u8> {
    encode_f32(values)
}

pub(crate) fn encode_f32(values: &[f32]) -> Vec<u8> {
    let mut payload = Vec::with_capacity(values.len() * 4);
    for v in values {
        payload.extend_from_slice(&v.to_le_bytes());
    }
    payload
}

pub(crate) fn decode_f32(payload: &[u8]) -> Vec<f32> {
    payload
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}
