//! VP-tree over real-valued projections of the original space.

use std::str::FromStr;

use rand::Rng;
use tracing::info;

use crate::error::{IndexError, Result};
use crate::object::Dataset;
use crate::params::{AnyParams, ParamManager};
use crate::projection::{Projection, ProjectionConfig, ProjectionKind};
use crate::space::{encode_f32, L2Space, Space};
use crate::vptree::oracle::Pruner;
use crate::vptree::{pruner_from_manager, SearchStats, VpTree, VpTreeParams};

use super::{rerank_knn, rerank_range, report_intrinsic_dim, CandidateBudget};

/// A VP-tree built over dense-valued projections.
///
/// The projection kind comes from `projType`: `rand`, `rand_sparse`, `pca`,
/// `fastmap`, or `perm` (rank vectors embedded as real coordinates, so that
/// L2 over them approximates Spearman's rho). `perm_bin` produces bit
/// vectors, which no dense surrogate space can hold; use
/// [`BinaryPermutationVpTree`](super::BinaryPermutationVpTree) for those.
///
/// Most useful when the original distance is expensive or non-metric and the
/// data has usable vector structure.
pub struct ProjectionVpTree<S: Space> {
    space: S,
    data: Dataset,
    projection: Projection,
    inner: VpTree<L2Space>,
    budget: CandidateBudget,
}

impl<S: Space> ProjectionVpTree<S> {
    /// Build the projection and the surrogate tree.
    ///
    /// Recognized keys beyond the tree's own: `projType` (required),
    /// `projDim` (required), `intermDim`, `binThreshold`, `projSpaceType`
    /// (must name a dense vector space; only `l2` ships), `numPivot`,
    /// `dbScanFrac` / `knnAmp`, `seed`.
    pub fn build(space: S, data: Dataset, params: &AnyParams) -> Result<Self> {
        if data.is_empty() {
            return Err(IndexError::EmptyDataset);
        }
        let mut pm = ParamManager::new(params);

        let proj_type: String = pm.get_req("projType")?;
        let kind = ProjectionKind::from_str(&proj_type)?;
        if !kind.is_dense_valued() {
            return Err(IndexError::InvalidConfiguration(
                "projType perm_bin does not produce dense vectors; use the binary permutation index"
                    .to_string(),
            ));
        }
        let proj_dim: usize = pm.get_req("projDim")?;
        let interm_dim: usize = pm.get_or("intermDim", 0)?;
        let bin_threshold: usize = pm.get_or("binThreshold", 0)?;
        let num_pivot: usize = pm.get_or("numPivot", proj_dim)?;
        let proj_space_type: String = pm.get_or("projSpaceType", "l2".to_string())?;
        if proj_space_type != "l2" {
            return Err(IndexError::InvalidConfiguration(format!(
                "the projection space '{proj_space_type}' is not a dense vector space; expected l2"
            )));
        }

        let budget = CandidateBudget::from_manager(&mut pm)?;
        let seed: u64 = match pm.get_opt("seed")? {
            Some(s) => s,
            None => rand::rng().random(),
        };
        let mut tree_params = VpTreeParams::from_manager(&mut pm)?;
        tree_params.seed = Some(seed);
        let pruner = pruner_from_manager(&mut pm, &Pruner::default())?;
        pm.check_unclaimed()?;

        info!(
            "projection vp-tree: projType={} projDim={proj_dim} intermDim={interm_dim} projSpaceType={proj_space_type} seed={seed}",
            kind.as_str()
        );

        let config = ProjectionConfig {
            kind,
            proj_dim,
            interm_dim,
            bin_threshold,
            num_pivot,
            seed,
        };
        let projection = Projection::create(&space, &data, &config)?;

        let mut proj_data = Dataset::new();
        for (pos, obj) in data.iter().enumerate() {
            let values = projection.project(&space, obj.payload()).into_dense()?;
            proj_data.push(L2Space.create_obj_from_vector(pos as u32, obj.label(), &values));
        }
        report_intrinsic_dim(&L2Space, &proj_data, "set of projections");

        let inner = VpTree::with_options(L2Space, proj_data, tree_params, pruner)?;
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
        let surrogate = self.project_query(query)?;
        let (candidates, mut stats) = self.inner.knn_query_with_stats(&surrogate, cand_qty, 0.0)?;
        let (results, rerank_comps) =
            rerank_knn(&self.space, &self.data, query, &candidates, k, eps);
        stats.dist_comps += rerank_comps;
        Ok((results, stats))
    }

    /// All objects within `radius` by the original distance. Requires
    /// `dbScanFrac`; the result can only contain objects the surrogate
    /// candidate list caught.
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
        let surrogate = self.project_query(query)?;
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

    /// The projection in use.
    pub fn projection(&self) -> &Projection {
        &self.projection
    }

    fn project_query(&self, query: &[u8]) -> Result<Vec<u8>> {
        let values = self.projection.project(&self.space, query).into_dense()?;
        Ok(encode_f32(&values))
    }

    pub(crate) fn inner_mut(&mut self) -> &mut VpTree<L2Space> {
        &mut self.inner
    }
}
