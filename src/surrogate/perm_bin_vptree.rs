//! VP-tree over binarized permutations, searched with bit-Hamming distance.

use rand::Rng;
use tracing::info;

use crate::error::{IndexError, Result};
use crate::object::Dataset;
use crate::params::{AnyParams, ParamManager};
use crate::projection::{Projection, ProjectionConfig, ProjectionKind};
use crate::space::{BitHammingSpace, Space};
use crate::vptree::oracle::Pruner;
use crate::vptree::{pruner_from_manager, SearchStats, VpTree, VpTreeParams};

use super::{rerank_knn, rerank_range, report_intrinsic_dim, CandidateBudget};

/// A VP-tree over binarized permutation vectors.
///
/// Rank vectors are thresholded into one bit per pivot (`rank < binThreshold`)
/// and packed into `u32` words, `(numPivot + 31) / 32` words per object.
/// Hamming distance over the packed words is the cheapest surrogate in the
/// family; recall depends more heavily on the candidate list size than with
/// the full permutations.
pub struct BinaryPermutationVpTree<S: Space> {
    space: S,
    data: Dataset,
    projection: Projection,
    inner: VpTree<BitHammingSpace>,
    budget: CandidateBudget,
}

impl<S: Space> BinaryPermutationVpTree<S> {
    /// Select pivots, binarize the dataset's permutations, and build the
    /// surrogate tree.
    ///
    /// Recognized keys beyond the tree's own: `numPivot` (default 16),
    /// `binThreshold` (default 8), `dbScanFrac` (default 0.05) / `knnAmp`,
    /// `seed`.
    pub fn build(space: S, data: Dataset, params: &AnyParams) -> Result<Self> {
        if data.is_empty() {
            return Err(IndexError::EmptyDataset);
        }
        let mut pm = ParamManager::new(params);

        let num_pivot: usize = pm.get_or("numPivot", 16)?;
        let bin_threshold: usize = pm.get_or("binThreshold", 8)?;
        let budget = CandidateBudget::from_manager(&mut pm)?.with_default_frac(0.05);
        let seed: u64 = match pm.get_opt("seed")? {
            Some(s) => s,
            None => rand::rng().random(),
        };
        let mut tree_params = VpTreeParams::from_manager(&mut pm)?;
        tree_params.seed = Some(seed);
        let pruner = pruner_from_manager(&mut pm, &Pruner::default())?;
        pm.check_unclaimed()?;

        info!(
            "binary permutation vp-tree: numPivot={num_pivot} binThreshold={bin_threshold} binary entry size {} words, seed={seed}",
            num_pivot.div_ceil(32)
        );

        let config = ProjectionConfig {
            kind: ProjectionKind::BinaryPermutation,
            num_pivot,
            bin_threshold,
            seed,
            ..ProjectionConfig::default()
        };
        let projection = Projection::create(&space, &data, &config)?;

        let mut bin_data = Dataset::new();
        for (pos, obj) in data.iter().enumerate() {
            let projected = projection.project(&space, obj.payload());
            bin_data.push(projected.into_object(pos as u32, obj.label()));
        }
        report_intrinsic_dim(&BitHammingSpace, &bin_data, "set of binarized permutations");

        let inner = VpTree::with_options(BitHammingSpace, bin_data, tree_params, pruner)?;
        Ok(Self {
            space,
            data,
            projection,
            inner,
            budget,
        })
    }

    /// k nearest neighbors by the original distance, ascending.
    pub fn knn_query(&self, query: &[u8], k: usize, eps: f32) -> Result<Vec<(f32, u32)>> {
        self.knn_query_with_stats(query, k, eps).map(|(r, _)| r)
    }

    /// [`Self::knn_query`] plus combined surrogate + re-ranking accounting.
    pub fn knn_query_with_stats(
        &self,
        query: &[u8],
        k: usize,
        eps: f32,
    ) -> Result<(Vec<(f32, u32)>, SearchStats)> {
        let cand_qty = self.budget.knn_qty(k, self.data.len())?;
        let surrogate = self.project_query(query);
        let (candidates, mut stats) = self.inner.knn_query_with_stats(&surrogate, cand_qty, 0.0)?;
        let (results, rerank_comps) =
            rerank_knn(&self.space, &self.data, query, &candidates, k, eps);
        stats.dist_comps += rerank_comps;
        Ok((results, stats))
    }

    /// All objects within `radius` by the original distance. Requires
    /// `dbScanFrac`.
    pub fn range_query(&self, query: &[u8], radius: f32) -> Result<Vec<(f32, u32)>> {
        self.range_query_with_stats(query, radius).map(|(r, _)| r)
    }

    /// [`Self::range_query`] plus combined accounting.
    pub fn range_query_with_stats(
        &self,
        query: &[u8],
        radius: f32,
    ) -> Result<(Vec<(f32, u32)>, SearchStats)> {
        let cand_qty = self.budget.range_qty(self.data.len())?;
        let surrogate = self.project_query(query);
        let (candidates, mut stats) = self.inner.knn_query_with_stats(&surrogate, cand_qty, 0.0)?;
        let (results, rerank_comps) =
            rerank_range(&self.space, &self.data, query, &candidates, radius);
        stats.dist_comps += rerank_comps;
        Ok((results, stats))
    }

    /// Update `dbScanFrac` / `knnAmp` and the inner tree's pruner keys.
    pub fn set_query_time_params(&mut self, params: &AnyParams) -> Result<()> {
        let mut pm = ParamManager::new(params);
        if pm.has("dbScanFrac") || pm.has("knnAmp") {
            self.budget = CandidateBudget::from_manager(&mut pm)?;
        }
        let pruner = pruner_from_manager(&mut pm, self.inner.pruner())?;
        pm.check_unclaimed()?;
        self.inner.set_pruner(pruner);
        Ok(())
    }

    /// The original dataset.
    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    fn project_query(&self, query: &[u8]) -> Vec<u8> {
        self.projection.project(&self.space, query).into_payload()
    }

    pub(crate) fn inner_mut(&mut self) -> &mut VpTree<BitHammingSpace> {
        &mut self.inner
    }
}
