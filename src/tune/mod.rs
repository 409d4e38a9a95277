//! Recall-driven auto-tuning of pruner parameters.
//!
//! The polynomial pruner's four scalars decide the speed/recall trade, and
//! good values depend on the dataset, the distance, and the query workload.
//! The tuner finds them empirically: it caches exact answers for a query
//! set, then walks the `(alphaLeft, alphaRight)` plane with a nested grid
//! search per exponent pair, scoring every configuration by measured recall
//! and an efficiency objective. The winner is the best-scoring configuration
//! that still meets the recall target.
//!
//! Tree shape does not depend on pruner parameters, so one built index is
//! re-scored under many configurations by swapping its pruner in place.
//!
//! # References
//!
//! - Boytsov & Naidan (2013): "Learning to prune in metric and non-metric
//!   spaces"

pub mod eval;

use std::time::Instant;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{error, info};

use crate::error::{IndexError, Result};
use crate::object::Dataset;
use crate::params::{AnyParams, ParamManager};
use crate::projection::gaussian;
use crate::space::Space;
use crate::vptree::oracle::{PolynomialPruner, Pruner};
use crate::vptree::SearchStats;

pub use eval::{exact_knn, recall, GoldStandard, OptimMetric};

/// Search kind the tuner optimizes for; exactly one per tuning run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TuneQuery {
    Knn { k: usize, eps: f32 },
    Range { radius: f32 },
}

/// Tuning budget and target.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TuneParams {
    /// Recall the winning configuration must reach, in (0, 1].
    pub desired_recall: f32,
    pub metric: OptimMetric,
    pub query: TuneQuery,
    /// Inclusive exponent lattice bounds.
    pub min_exp: u32,
    pub max_exp: u32,
    /// Grid levels evaluated per (exponent pair, restart) combination.
    pub max_iter: usize,
    /// Box-narrowing recursions per combination.
    pub max_rec_depth: usize,
    /// Each grid level evaluates `(2 * step_n + 1)^2` points.
    pub step_n: usize,
    /// Additional random restarts beyond the `(1, 1)` start.
    pub add_restart_qty: usize,
    /// Initial half-width factor of the grid box `[alpha/F, alpha*F]`.
    pub full_factor: f64,
    /// Gold-standard cache cap: at most this many queries are scored.
    pub max_cache_gs_qty: usize,
    /// RNG seed for the random restarts.
    pub seed: u64,
}

impl TuneParams {
    /// Defaults for a k-NN tuning run.
    pub fn for_knn(k: usize, desired_recall: f32) -> Self {
        Self {
            desired_recall,
            metric: OptimMetric::DistComps,
            query: TuneQuery::Knn { k, eps: 0.0 },
            min_exp: 1,
            max_exp: 1,
            max_iter: 10,
            max_rec_depth: 6,
            step_n: 2,
            add_restart_qty: 4,
            full_factor: 8.0,
            max_cache_gs_qty: 1000,
            seed: 0,
        }
    }

    /// Defaults for a range tuning run.
    pub fn for_range(radius: f32, desired_recall: f32) -> Self {
        Self {
            query: TuneQuery::Range { radius },
            ..Self::for_knn(0, desired_recall)
        }
    }

    /// Parse from a string map. `desiredRecall` and exactly one of `tuneK` /
    /// `tuneR` are required; the rest have the usual defaults (`metric`,
    /// `minExp`, `maxExp`, `maxIter`, `maxRecDepth`, `stepN`,
    /// `addRestartQty`, `fullFactor`, `maxCacheGSQty`, `seed`).
    pub fn from_params(params: &AnyParams) -> Result<Self> {
        let mut pm = ParamManager::new(params);

        let desired_recall: f32 = pm.get_req("desiredRecall")?;
        let metric: OptimMetric = pm.get_or("metric", OptimMetric::DistComps)?;

        let tune_k: Option<usize> = pm.get_opt("tuneK")?;
        let tune_r: Option<f32> = pm.get_opt("tuneR")?;
        let query = match (tune_k, tune_r) {
            (Some(k), None) => TuneQuery::Knn { k, eps: 0.0 },
            (None, Some(radius)) => TuneQuery::Range { radius },
            _ => {
                return Err(IndexError::InvalidConfiguration(
                    "specify exactly one of tuneK and tuneR".to_string(),
                ))
            }
        };

        let defaults = Self::for_knn(0, desired_recall);
        let this = Self {
            desired_recall,
            metric,
            query,
            min_exp: pm.get_or("minExp", defaults.min_exp)?,
            max_exp: pm.get_or("maxExp", defaults.max_exp)?,
            max_iter: pm.get_or("maxIter", defaults.max_iter)?,
            max_rec_depth: pm.get_or("maxRecDepth", defaults.max_rec_depth)?,
            step_n: pm.get_or("stepN", defaults.step_n)?,
            add_restart_qty: pm.get_or("addRestartQty", defaults.add_restart_qty)?,
            full_factor: pm.get_or("fullFactor", defaults.full_factor)?,
            max_cache_gs_qty: pm.get_or("maxCacheGSQty", defaults.max_cache_gs_qty)?,
            seed: pm.get_or("seed", defaults.seed)?,
        };
        pm.check_unclaimed()?;
        this.validate()?;
        Ok(this)
    }

    fn validate(&self) -> Result<()> {
        if !(self.desired_recall > 0.0 && self.desired_recall <= 1.0) {
            return Err(IndexError::InvalidConfiguration(format!(
                "desiredRecall must be in (0, 1], got {}",
                self.desired_recall
            )));
        }
        if self.max_exp == 0 {
            return Err(IndexError::InvalidConfiguration(
                "maxExp cannot be zero".to_string(),
            ));
        }
        if self.max_exp < self.min_exp {
            return Err(IndexError::InvalidConfiguration(format!(
                "maxExp {} cannot be smaller than minExp {}",
                self.max_exp, self.min_exp
            )));
        }
        if self.full_factor <= 1.0 {
            return Err(IndexError::InvalidConfiguration(format!(
                "fullFactor must exceed 1, got {}",
                self.full_factor
            )));
        }
        if self.step_n == 0 {
            return Err(IndexError::InvalidConfiguration(
                "stepN must be at least 1".to_string(),
            ));
        }
        if let TuneQuery::Knn { k, .. } = self.query {
            if k == 0 {
                return Err(IndexError::InvalidConfiguration(
                    "tuneK must be at least 1".to_string(),
                ));
            }
        }
        Ok(())
    }
}

/// A tuned pruner configuration with its measured quality.
#[derive(Debug, Clone, PartialEq)]
pub struct TunedParams {
    pub alpha_left: f64,
    pub exp_left: u32,
    pub alpha_right: f64,
    pub exp_right: u32,
    /// Recall measured on the tuning query set.
    pub recall: f32,
    /// Objective value (mean improvement over a linear scan).
    pub improvement: f64,
    /// The restart RNG seed the run used; re-running with it reproduces the
    /// result.
    pub seed: u64,
}

impl TunedParams {
    /// Render in the `alphaLeft=...,alphaRight=...,expLeft=...,expRight=...`
    /// form understood by the index parameter parsers.
    pub fn to_param_string(&self) -> String {
        format!(
            "alphaLeft={},alphaRight={},expLeft={},expRight={}",
            self.alpha_left, self.alpha_right, self.exp_left, self.exp_right
        )
    }

    /// The same as a parsed parameter map.
    pub fn to_params(&self) -> AnyParams {
        AnyParams::new(&[
            ("alphaLeft", &self.alpha_left.to_string()),
            ("alphaRight", &self.alpha_right.to_string()),
            ("expLeft", &self.exp_left.to_string()),
            ("expRight", &self.exp_right.to_string()),
        ])
    }

    /// The winning pruner.
    pub fn pruner(&self) -> Result<PolynomialPruner> {
        PolynomialPruner::new(
            self.alpha_left,
            self.exp_left,
            self.alpha_right,
            self.exp_right,
        )
    }

    /// Write the parameter string to a file, one line.
    pub fn write_to_file(&self, path: impl AsRef<std::path::Path>) -> Result<()> {
        std::fs::write(path, format!("{}\n", self.to_param_string()))?;
        Ok(())
    }
}

impl std::fmt::Display for TunedParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_param_string())
    }
}

/// An index whose pruner the tuner can re-parameterize in place.
pub trait TunableIndex {
    /// The dataset recall is measured against.
    fn dataset(&self) -> &Dataset;

    /// Swap pruner parameters without rebuilding.
    fn set_pruner_params(&mut self, pruner: PolynomialPruner);

    fn knn_query_with_stats(
        &self,
        query: &[u8],
        k: usize,
        eps: f32,
    ) -> Result<(Vec<(f32, u32)>, SearchStats)>;

    fn range_query_with_stats(
        &self,
        query: &[u8],
        radius: f32,
    ) -> Result<(Vec<(f32, u32)>, SearchStats)>;
}

impl<S: Space> TunableIndex for crate::vptree::VpTree<S> {
    fn dataset(&self) -> &Dataset {
        crate::vptree::VpTree::dataset(self)
    }

    fn set_pruner_params(&mut self, pruner: PolynomialPruner) {
        self.set_pruner(Pruner::Polynomial(pruner));
    }

    fn knn_query_with_stats(
        &self,
        query: &[u8],
        k: usize,
        eps: f32,
    ) -> Result<(Vec<(f32, u32)>, SearchStats)> {
        crate::vptree::VpTree::knn_query_with_stats(self, query, k, eps)
    }

    fn range_query_with_stats(
        &self,
        query: &[u8],
        radius: f32,
    ) -> Result<(Vec<(f32, u32)>, SearchStats)> {
        crate::vptree::VpTree::range_query_with_stats(self, query, radius)
    }
}

macro_rules! impl_tunable_for_wrapper {
    ($wrapper:ident) => {
        impl<S: Space> TunableIndex for crate::surrogate::$wrapper<S> {
            fn dataset(&self) -> &Dataset {
                crate::surrogate::$wrapper::dataset(self)
            }

            fn set_pruner_params(&mut self, pruner: PolynomialPruner) {
                self.inner_mut().set_pruner(Pruner::Polynomial(pruner));
            }

            fn knn_query_with_stats(
                &self,
                query: &[u8],
                k: usize,
                eps: f32,
            ) -> Result<(Vec<(f32, u32)>, SearchStats)> {
                crate::surrogate::$wrapper::knn_query_with_stats(self, query, k, eps)
            }

            fn range_query_with_stats(
                &self,
                query: &[u8],
                radius: f32,
            ) -> Result<(Vec<(f32, u32)>, SearchStats)> {
                crate::surrogate::$wrapper::range_query_with_stats(self, query, radius)
            }
        }
    };
}

impl_tunable_for_wrapper!(ProjectionVpTree);
impl_tunable_for_wrapper!(PermutationVpTree);
impl_tunable_for_wrapper!(BinaryPermutationVpTree);

/// Hold out `qty` objects from the tail of a dataset to serve as a
/// bootstrapped query set, removing them from the indexed data. Call before
/// building the index being tuned.
pub fn bootstrap_queries(data: &mut Dataset, qty: usize, seed: u64) -> Result<Vec<Vec<u8>>> {
    use rand::seq::index::sample;

    if qty == 0 {
        return Err(IndexError::InvalidConfiguration(
            "bootstrap query count must be at least 1".to_string(),
        ));
    }
    if qty >= data.len() {
        return Err(IndexError::InvalidConfiguration(format!(
            "cannot hold out {qty} queries from {} objects",
            data.len()
        )));
    }
    let mut rng = StdRng::seed_from_u64(seed);
    let mut picks: Vec<usize> = sample(&mut rng, data.len(), qty).into_iter().collect();
    // Remove from the back so earlier positions stay valid.
    picks.sort_unstable_by(|a, b| b.cmp(a));
    let mut queries: Vec<Vec<u8>> = picks
        .into_iter()
        .map(|pos| data.remove(pos).payload().to_vec())
        .collect();
    queries.reverse();
    Ok(queries)
}

/// One evaluated configuration.
#[derive(Debug, Clone, Copy)]
struct Scored {
    alpha_left: f64,
    alpha_right: f64,
    recall: f32,
    improvement: f64,
}

/// Ordering used everywhere: a configuration meeting the recall target beats
/// any that does not; among those meeting it, higher objective wins; among
/// those missing it, higher recall wins.
fn better(candidate: &Scored, incumbent: &Scored, desired_recall: f32) -> bool {
    let c_meets = candidate.recall >= desired_recall;
    let i_meets = incumbent.recall >= desired_recall;
    match (c_meets, i_meets) {
        (true, false) => true,
        (false, true) => false,
        (true, true) => candidate.improvement > incumbent.improvement,
        (false, false) => candidate.recall > incumbent.recall,
    }
}

/// Tune an index's pruner to reach `desired_recall` while maximizing the
/// efficiency objective. On success the index is left configured with the
/// winning parameters. On failure the best observed configuration is
/// attached to [`IndexError::TuningFailed`] and the index keeps it applied.
pub fn tune<I, S>(
    index: &mut I,
    space: &S,
    queries: &[Vec<u8>],
    tp: &TuneParams,
) -> Result<TunedParams>
where
    I: TunableIndex,
    S: Space,
{
    tp.validate()?;
    if queries.is_empty() {
        return Err(IndexError::InvalidConfiguration(
            "tuning requires a non-empty query set".to_string(),
        ));
    }

    let gold = match tp.query {
        TuneQuery::Knn { k, .. } => GoldStandard::compute_knn(
            space,
            index.dataset(),
            queries,
            k,
            tp.max_cache_gs_qty,
        ),
        TuneQuery::Range { radius } => GoldStandard::compute_range(
            space,
            index.dataset(),
            queries,
            radius,
            tp.max_cache_gs_qty,
        ),
    };
    info!(
        "tuning for {} over {} gold-standard queries (metric: {}, target recall {:.3}, seed {})",
        match tp.query {
            TuneQuery::Knn { k, .. } => format!("{k}-NN"),
            TuneQuery::Range { radius } => format!("range r={radius}"),
        },
        gold.len(),
        tp.metric.as_str(),
        tp.desired_recall,
        tp.seed
    );

    let mut rng = StdRng::seed_from_u64(tp.seed);
    let ln_factor = tp.full_factor.ln();
    let mut best: Option<(Scored, u32, u32)> = None;

    for exp_left in tp.min_exp..=tp.max_exp {
        for exp_right in tp.min_exp..=tp.max_exp {
            for restart in 0..=tp.add_restart_qty {
                let (start_left, start_right) = if restart == 0 {
                    (1.0, 1.0)
                } else {
                    let l = (gaussian(&mut rng) as f64 * ln_factor).exp();
                    let r = (gaussian(&mut rng) as f64 * ln_factor).exp();
                    info!("random starting point: alphaLeft={l:.4} alphaRight={r:.4}");
                    (l, r)
                };

                let local = grid_search(
                    index,
                    queries,
                    &gold,
                    tp,
                    exp_left,
                    exp_right,
                    start_left,
                    start_right,
                )?;

                let replace = match &best {
                    None => true,
                    Some((incumbent, _, _)) => better(&local, incumbent, tp.desired_recall),
                };
                if replace {
                    best = Some((local, exp_left, exp_right));
                }
            }
        }
    }

    // At least one configuration is always evaluated.
    let (scored, exp_left, exp_right) = best.ok_or_else(|| {
        IndexError::InvalidConfiguration("tuning evaluated no configurations".to_string())
    })?;
    let winner = TunedParams {
        alpha_left: scored.alpha_left,
        exp_left,
        alpha_right: scored.alpha_right,
        exp_right,
        recall: scored.recall,
        improvement: scored.improvement,
        seed: tp.seed,
    };
    index.set_pruner_params(winner.pruner()?);

    if winner.recall < tp.desired_recall {
        error!(
            "failed to reach recall {:.3}; best configuration {} got {:.3}",
            tp.desired_recall, winner, winner.recall
        );
        return Err(IndexError::TuningFailed { best: winner });
    }

    info!(
        "tuned parameters: {} (recall {:.3}, improvement {:.2})",
        winner, winner.recall, winner.improvement
    );
    Ok(winner)
}

/// Nested grid search over the `(alphaLeft, alphaRight)` box around a
/// starting point. Each level scores a geometric `(2*stepN+1)^2` grid over
/// `[alpha/F, alpha*F]^2`, re-centers on the level winner, and narrows
/// `F <- sqrt(F)`, up to `maxRecDepth` levels or `maxIter` levels total.
#[allow(clippy::too_many_arguments)]
fn grid_search<I: TunableIndex>(
    index: &mut I,
    queries: &[Vec<u8>],
    gold: &GoldStandard,
    tp: &TuneParams,
    exp_left: u32,
    exp_right: u32,
    start_left: f64,
    start_right: f64,
) -> Result<Scored> {
    let mut factor = tp.full_factor;
    let mut center = (start_left, start_right);
    let mut best: Option<Scored> = None;

    let levels = tp.max_rec_depth.min(tp.max_iter);
    for _ in 0..levels {
        let mut level_best: Option<Scored> = None;
        let steps = tp.step_n as i64;
        for i in -steps..=steps {
            for j in -steps..=steps {
                let alpha_left = center.0 * factor.powf(i as f64 / steps as f64);
                let alpha_right = center.1 * factor.powf(j as f64 / steps as f64);
                let scored = evaluate_config(
                    index,
                    queries,
                    gold,
                    tp,
                    alpha_left,
                    exp_left,
                    alpha_right,
                    exp_right,
                )?;

                if level_best
                    .as_ref()
                    .map_or(true, |incumbent| better(&scored, incumbent, tp.desired_recall))
                {
                    level_best = Some(scored);
                }
            }
        }

        // level_best is always set: the loop above runs at least 9 points.
        if let Some(level_winner) = level_best {
            center = (level_winner.alpha_left, level_winner.alpha_right);
            if best
                .as_ref()
                .map_or(true, |incumbent| better(&level_winner, incumbent, tp.desired_recall))
            {
                best = Some(level_winner);
            }
        }
        factor = factor.sqrt();
    }

    best.ok_or_else(|| {
        IndexError::InvalidConfiguration(
            "grid search ran zero levels; raise maxIter or maxRecDepth".to_string(),
        )
    })
}

#[allow(clippy::too_many_arguments)]
fn evaluate_config<I: TunableIndex>(
    index: &mut I,
    queries: &[Vec<u8>],
    gold: &GoldStandard,
    tp: &TuneParams,
    alpha_left: f64,
    exp_left: u32,
    alpha_right: f64,
    exp_right: u32,
) -> Result<Scored> {
    index.set_pruner_params(PolynomialPruner::new(
        alpha_left,
        exp_left,
        alpha_right,
        exp_right,
    )?);

    let n = index.dataset().len() as f64;
    let mut recall_sum = 0.0f64;
    let mut improvement_sum = 0.0f64;

    for (query_idx, query) in queries.iter().enumerate().take(gold.len()) {
        let started = Instant::now();
        let (results, stats) = match tp.query {
            TuneQuery::Knn { k, eps } => index.knn_query_with_stats(query, k, eps)?,
            TuneQuery::Range { radius } => index.range_query_with_stats(query, radius)?,
        };
        let elapsed = started.elapsed();

        recall_sum += eval::recall(&results, gold.answer(query_idx)) as f64;
        improvement_sum += match tp.metric {
            OptimMetric::DistComps => n / stats.dist_comps.max(1) as f64,
            OptimMetric::Time => {
                gold.linear_time(query_idx).as_secs_f64() / elapsed.as_secs_f64().max(1e-9)
            }
        };
    }

    let queries_qty = gold.len() as f64;
    Ok(Scored {
        alpha_left,
        alpha_right,
        recall: (recall_sum / queries_qty) as f32,
        improvement: improvement_sum / queries_qty,
    })
}
