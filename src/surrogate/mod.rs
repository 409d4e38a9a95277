//! Surrogate-space index wrappers.
//!
//! Each wrapper owns a [`Projection`](crate::projection::Projection) and a
//! [`VpTree`](crate::vptree::VpTree) built over the projected dataset.
//! Queries run in two stages: a cheap candidate search in the surrogate
//! space, then re-ranking of the candidates with the original distance. The
//! surrogate search is approximate; re-ranking restores precision for
//! whatever the candidate list caught.
//!
//! Candidate list sizing is shared across wrappers: either `knnAmp`
//! (candidates = `k * knnAmp`) or `dbScanFrac` (candidates = `ceil(frac * N)`),
//! never both.

mod perm_bin_vptree;
mod perm_vptree;
mod proj_vptree;

pub use perm_bin_vptree::BinaryPermutationVpTree;
pub use perm_vptree::PermutationVpTree;
pub use proj_vptree::ProjectionVpTree;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::info;

use crate::engine::KnnQueue;
use crate::error::{IndexError, Result};
use crate::object::Dataset;
use crate::params::ParamManager;
use crate::space::Space;

/// How many surrogate candidates to fetch per query.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct CandidateBudget {
    knn_amp: usize,
    db_scan_frac: f32,
}

impl CandidateBudget {
    /// Read `knnAmp` / `dbScanFrac`, enforcing mutual exclusion.
    pub(crate) fn from_manager(pm: &mut ParamManager) -> Result<Self> {
        if pm.has("dbScanFrac") && pm.has("knnAmp") {
            return Err(IndexError::InvalidConfiguration(
                "only one of dbScanFrac and knnAmp may be set".to_string(),
            ));
        }
        let knn_amp = pm.get_or("knnAmp", 0usize)?;
        let db_scan_frac = pm.get_or("dbScanFrac", 0.0f32)?;
        if !(0.0..=1.0).contains(&db_scan_frac) {
            return Err(IndexError::InvalidConfiguration(format!(
                "dbScanFrac must be in [0, 1], got {db_scan_frac}"
            )));
        }
        Ok(Self {
            knn_amp,
            db_scan_frac,
        })
    }

    pub(crate) fn with_default_frac(mut self, frac: f32) -> Self {
        if self.knn_amp == 0 && self.db_scan_frac == 0.0 {
            self.db_scan_frac = frac;
        }
        self
    }

    /// Candidate count for a k-NN query.
    pub(crate) fn knn_qty(&self, k: usize, n: usize) -> Result<usize> {
        let qty = if self.knn_amp > 0 {
            (k.saturating_mul(self.knn_amp)).min(n)
        } else {
            (self.db_scan_frac as f64 * n as f64).ceil() as usize
        };
        if qty == 0 {
            return Err(IndexError::InvalidConfiguration(
                "k-NN queries require knnAmp > 0 or a positive dbScanFrac".to_string(),
            ));
        }
        Ok(qty.min(n))
    }

    /// Candidate count for a range query; only `dbScanFrac` applies.
    pub(crate) fn range_qty(&self, n: usize) -> Result<usize> {
        let qty = (self.db_scan_frac as f64 * n as f64).ceil() as usize;
        if qty == 0 {
            return Err(IndexError::InvalidConfiguration(
                "range queries require a sufficiently large dbScanFrac".to_string(),
            ));
        }
        Ok(qty.min(n))
    }
}

/// Re-rank surrogate candidates with the original distance, keeping the k
/// best. Candidate entries carry the original dataset position; results carry
/// object ids. Returns the results and the number of distance evaluations.
pub(crate) fn rerank_knn<S: Space>(
    space: &S,
    data: &Dataset,
    query: &[u8],
    candidates: &[(f32, u32)],
    k: usize,
    eps: f32,
) -> (Vec<(f32, u32)>, u64) {
    let mut queue = KnnQueue::new(k, eps);
    for &(_, pos) in candidates {
        let d = space.distance(query, data.get(pos as usize).payload());
        queue.admit(d, pos);
    }
    let results = queue
        .into_sorted_vec()
        .into_iter()
        .map(|(d, pos)| (d, data.get(pos as usize).id()))
        .collect();
    (results, candidates.len() as u64)
}

/// Re-rank surrogate candidates, keeping those within `radius`.
pub(crate) fn rerank_range<S: Space>(
    space: &S,
    data: &Dataset,
    query: &[u8],
    candidates: &[(f32, u32)],
    radius: f32,
) -> (Vec<(f32, u32)>, u64) {
    let mut hits = Vec::new();
    for &(_, pos) in candidates {
        let d = space.distance(query, data.get(pos as usize).payload());
        if d <= radius {
            hits.push((d, data.get(pos as usize).id()));
        }
    }
    (hits, candidates.len() as u64)
}

/// Log the estimated intrinsic dimensionality of a projected dataset:
/// `mean^2 / (2 * variance)` over sampled pairwise distances.
pub(crate) fn report_intrinsic_dim<S: Space>(space: &S, data: &Dataset, what: &str) {
    const SAMPLE_PAIRS: usize = 1000;

    if data.len() < 2 {
        return;
    }
    let mut rng = StdRng::seed_from_u64(data.len() as u64);
    let mut sum = 0.0f64;
    let mut sum_sq = 0.0f64;
    let pairs = SAMPLE_PAIRS.min(data.len() * (data.len() - 1) / 2);
    for _ in 0..pairs {
        let a = rng.random_range(0..data.len());
        let mut b = rng.random_range(0..data.len());
        if a == b {
            b = (b + 1) % data.len();
        }
        let d = space.distance(data.get(a).payload(), data.get(b).payload()) as f64;
        sum += d;
        sum_sq += d * d;
    }
    let mean = sum / pairs as f64;
    let var = (sum_sq / pairs as f64 - mean * mean).max(0.0);
    if var > 1e-12 {
        info!(
            "{what}: estimated intrinsic dimensionality {:.2} (mean dist {:.4}, var {:.4})",
            mean * mean / (2.0 * var),
            mean,
            var
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::AnyParams;

    #[test]
    fn budget_rejects_both_keys() {
        let params = AnyParams::new(&[("dbScanFrac", "0.1"), ("knnAmp", "5")]);
        let mut pm = ParamManager::new(&params);
        assert!(CandidateBudget::from_manager(&mut pm).is_err());
    }

    #[test]
    fn knn_amp_scales_with_k_and_clamps_to_n() {
        let params = AnyParams::new(&[("knnAmp", "10")]);
        let mut pm = ParamManager::new(&params);
        let budget = CandidateBudget::from_manager(&mut pm).unwrap();
        assert_eq!(budget.knn_qty(3, 1000).unwrap(), 30);
        assert_eq!(budget.knn_qty(3, 20).unwrap(), 20);
    }

    #[test]
    fn db_scan_frac_rounds_up_and_never_drops_to_zero() {
        let params = AnyParams::new(&[("dbScanFrac", "0.001")]);
        let mut pm = ParamManager::new(&params);
        let budget = CandidateBudget::from_manager(&mut pm).unwrap();
        assert_eq!(budget.knn_qty(1, 100).unwrap(), 1);
        assert_eq!(budget.range_qty(100).unwrap(), 1);
    }

    #[test]
    fn unset_budget_is_an_error_at_query_time() {
        let mut pm = ParamManager::new(&AnyParams::empty());
        let budget = CandidateBudget::from_manager(&mut pm).unwrap();
        assert!(budget.knn_qty(5, 100).is_err());
        assert!(budget.range_qty(100).is_err());
    }

    #[test]
    fn range_ignores_knn_amp() {
        let params = AnyParams::new(&[("knnAmp", "4")]);
        let mut pm = ParamManager::new(&params);
        let budget = CandidateBudget::from_manager(&mut pm).unwrap();
        assert!(budget.range_qty(100).is_err());
    }
}
