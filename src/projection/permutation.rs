//! Permutation vectors and their binarized form.
//!
//! A fixed pivot set induces, for every object, a ranking of the pivots by
//! ascending distance. Objects close in the original space tend to rank the
//! pivots similarly, so rank vectors compared with Spearman's rho make a
//! cheap surrogate space. Binarization keeps one bit per pivot (rank below a
//! threshold or not) packed into `u32` words, for an even cheaper Hamming
//! surrogate.

use rand::rngs::StdRng;
use rand::seq::index::sample;
use smallvec::SmallVec;

use crate::error::{IndexError, Result};
use crate::object::Dataset;
use crate::space::Space;

/// Rank vector; pivot sets are small so this usually stays on the stack.
pub type RankVec = SmallVec<[i32; 32]>;

/// A fixed set of pivot payloads sampled from a dataset.
#[derive(Debug, Clone)]
pub struct PivotSet {
    pivots: Vec<Vec<u8>>,
}

impl PivotSet {
    /// Sample `num` pivots without replacement.
    pub fn select(data: &Dataset, num: usize, rng: &mut StdRng) -> Result<Self> {
        if num == 0 {
            return Err(IndexError::InvalidConfiguration(
                "numPivot must be at least 1".to_string(),
            ));
        }
        if num > data.len() {
            return Err(IndexError::InvalidConfiguration(format!(
                "numPivot {} exceeds dataset size {}",
                num,
                data.len()
            )));
        }
        let pivots = sample(rng, data.len(), num)
            .into_iter()
            .map(|pos| data.get(pos).payload().to_vec())
            .collect();
        Ok(Self { pivots })
    }

    /// Build from explicit pivot payloads, for callers that want a fixed set.
    pub fn from_payloads(pivots: Vec<Vec<u8>>) -> Result<Self> {
        if pivots.is_empty() {
            return Err(IndexError::InvalidConfiguration(
                "a pivot set cannot be empty".to_string(),
            ));
        }
        Ok(Self { pivots })
    }

    /// Number of pivots.
    pub fn len(&self) -> usize {
        self.pivots.len()
    }

    /// Whether the set is empty (never true for a constructed set).
    pub fn is_empty(&self) -> bool {
        self.pivots.is_empty()
    }

    /// Rank vector of `payload`: entry `i` is the rank of pivot `i` when
    /// pivots are ordered by ascending distance to the object. Ties break by
    /// pivot index, so the output is always a true permutation of `0..len`.
    pub fn permutation<S: Space>(&self, space: &S, payload: &[u8]) -> RankVec {
        let dists: SmallVec<[f32; 32]> = self
            .pivots
            .iter()
            .map(|p| space.distance(p, payload))
            .collect();

        let mut order: SmallVec<[u32; 32]> = (0..self.pivots.len() as u32).collect();
        order.sort_by(|&a, &b| {
            dists[a as usize]
                .total_cmp(&dists[b as usize])
                .then(a.cmp(&b))
        });

        let mut ranks: RankVec = smallvec::smallvec![0; self.pivots.len()];
        for (rank, &pivot_idx) in order.iter().enumerate() {
            ranks[pivot_idx as usize] = rank as i32;
        }
        ranks
    }
}

/// Pack a rank vector into bits: bit `i` is set iff `ranks[i] < threshold`.
/// Words are filled least-significant bit first, `(len + 31) / 32` words.
pub fn binarize(ranks: &[i32], threshold: usize) -> Vec<u32> {
    let word_qty = ranks.len().div_ceil(32);
    let mut words = vec![0u32; word_qty];
    for (i, &rank) in ranks.iter().enumerate() {
        if (rank as usize) < threshold {
            words[i / 32] |= 1 << (i % 32);
        }
    }
    words
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::L2Space;
    use rand::SeedableRng;

    fn line_dataset(n: usize) -> Dataset {
        let space = L2Space;
        (0..n)
            .map(|i| space.create_obj_from_vector(i as u32, -1, &[i as f32, 0.0]))
            .collect()
    }

    #[test]
    fn ranks_form_a_permutation() {
        let data = line_dataset(10);
        let mut rng = StdRng::seed_from_u64(3);
        let pivots = PivotSet::select(&data, 5, &mut rng).unwrap();

        let query = crate::space::encode_query(&[2.5, 0.0]);
        let mut ranks: Vec<i32> = pivots.permutation(&L2Space, &query).to_vec();
        ranks.sort_unstable();
        assert_eq!(ranks, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn permutation_is_stable_under_repeated_calls() {
        let data = line_dataset(20);
        let mut rng = StdRng::seed_from_u64(7);
        let pivots = PivotSet::select(&data, 8, &mut rng).unwrap();
        let query = crate::space::encode_query(&[4.2, 0.0]);
        assert_eq!(
            pivots.permutation(&L2Space, &query),
            pivots.permutation(&L2Space, &query)
        );
    }

    #[test]
    fn binarize_sets_min_threshold_len_bits() {
        let ranks = [3, 0, 2, 1, 4];
        for threshold in 0..=7 {
            let words = binarize(&ranks, threshold);
            let ones: u32 = words.iter().map(|w| w.count_ones()).sum();
            assert_eq!(ones as usize, threshold.min(ranks.len()));
        }
    }

    #[test]
    fn binarize_packs_by_pivot_index() {
        // Pivot 0 has rank 3, pivot 1 rank 0: with threshold 1 only bit 1 is set.
        let words = binarize(&[3, 0, 2, 1], 1);
        assert_eq!(words, vec![0b0010]);
    }

    #[test]
    fn oversized_pivot_request_is_rejected() {
        let data = line_dataset(3);
        let mut rng = StdRng::seed_from_u64(0);
        assert!(PivotSet::select(&data, 4, &mut rng).is_err());
    }
}
