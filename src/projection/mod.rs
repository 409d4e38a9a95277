//! Projections into surrogate vector spaces.
//!
//! Searching a non-metric or expensive space directly can be hopeless; the
//! surrogate wrappers instead embed every object into a cheap vector space,
//! search there, and re-rank the survivors with the true distance. This
//! module provides the embeddings:
//!
//! - **Random dense** — i.i.d. Gaussian matrix, the classic
//!   Johnson–Lindenstrauss projection.
//! - **Random sparse** — the same with roughly a third of the entries kept.
//! - **PCA** — top components of a dataset sample, found by power iteration.
//! - **FastMap** — pivot-pair coordinates usable in *any* space, since it
//!   consumes only distances.
//! - **Permutation / binary permutation** — pivot rank vectors, optionally
//!   thresholded into packed bit vectors.
//!
//! A projection is immutable after construction and projects deterministically.
//!
//! # References
//!
//! - Faloutsos & Lin (1995): "FastMap: A fast algorithm for indexing,
//!   data-mining and visualization of traditional and multimedia datasets"
//! - Chavez et al. (2008): "Effective proximity retrieval by ordering
//!   permutations"

pub mod permutation;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::{IndexError, Result};
use crate::object::{Dataset, Object};
use crate::space::{decode_f32, encode_f32, Space};
use permutation::{binarize, PivotSet, RankVec};

/// The kind of surrogate embedding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectionKind {
    RandomDense,
    RandomSparse,
    Pca,
    FastMap,
    Permutation,
    BinaryPermutation,
}

impl ProjectionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProjectionKind::RandomDense => "rand",
            ProjectionKind::RandomSparse => "rand_sparse",
            ProjectionKind::Pca => "pca",
            ProjectionKind::FastMap => "fastmap",
            ProjectionKind::Permutation => "perm",
            ProjectionKind::BinaryPermutation => "perm_bin",
        }
    }

    /// Whether the projection's output is a dense real-valued vector.
    pub fn is_dense_valued(&self) -> bool {
        !matches!(self, ProjectionKind::BinaryPermutation)
    }
}

impl std::str::FromStr for ProjectionKind {
    type Err = IndexError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rand" => Ok(ProjectionKind::RandomDense),
            "rand_sparse" => Ok(ProjectionKind::RandomSparse),
            "pca" => Ok(ProjectionKind::Pca),
            "fastmap" => Ok(ProjectionKind::FastMap),
            "perm" => Ok(ProjectionKind::Permutation),
            "perm_bin" => Ok(ProjectionKind::BinaryPermutation),
            other => Err(IndexError::InvalidConfiguration(format!(
                "unknown projType '{other}' (expected rand, rand_sparse, pca, fastmap, perm, or perm_bin)"
            ))),
        }
    }
}

/// Construction-time settings for a [`Projection`].
#[derive(Debug, Clone, Copy)]
pub struct ProjectionConfig {
    pub kind: ProjectionKind,
    /// Target dimensionality for dense kinds and FastMap.
    pub proj_dim: usize,
    /// Optional intermediate random projection for dense kinds; 0 disables.
    pub interm_dim: usize,
    /// Rank threshold for binary permutations.
    pub bin_threshold: usize,
    /// Pivot count for permutation kinds.
    pub num_pivot: usize,
    pub seed: u64,
}

impl Default for ProjectionConfig {
    fn default() -> Self {
        Self {
            kind: ProjectionKind::RandomDense,
            proj_dim: 16,
            interm_dim: 0,
            bin_threshold: 8,
            num_pivot: 16,
            seed: 0,
        }
    }
}

/// A projected vector, in whichever value domain the projection produces.
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectedVec {
    Dense(Vec<f32>),
    Ranks(RankVec),
    Bits(Vec<u32>),
}

impl ProjectedVec {
    /// Encode into the payload form the matching surrogate space expects.
    pub fn into_payload(self) -> Vec<u8> {
        match self {
            ProjectedVec::Dense(values) => encode_f32(&values),
            ProjectedVec::Ranks(ranks) => {
                let mut payload = Vec::with_capacity(ranks.len() * 4);
                for r in &ranks {
                    payload.extend_from_slice(&r.to_le_bytes());
                }
                payload
            }
            ProjectedVec::Bits(words) => {
                let mut payload = Vec::with_capacity(words.len() * 4);
                for w in &words {
                    payload.extend_from_slice(&w.to_le_bytes());
                }
                payload
            }
        }
    }

    /// Encode into an [`Object`] payload for the matching surrogate space.
    pub fn into_object(self, id: u32, label: i32) -> Object {
        Object::new(id, label, self.into_payload())
    }

    /// Coerce rank output to dense `f32` form; dense output passes through.
    /// Bit vectors cannot be embedded in a dense space.
    pub fn into_dense(self) -> Result<Vec<f32>> {
        match self {
            ProjectedVec::Dense(v) => Ok(v),
            ProjectedVec::Ranks(ranks) => Ok(ranks.iter().map(|&r| r as f32).collect()),
            ProjectedVec::Bits(_) => Err(IndexError::InvalidConfiguration(
                "binary permutations cannot be embedded in a dense vector space".to_string(),
            )),
        }
    }
}

/// A dense row-major matrix applied as `y = W x`.
#[derive(Debug, Clone)]
struct DenseMatrix {
    rows: usize,
    cols: usize,
    w: Vec<f32>,
}

impl DenseMatrix {
    fn gaussian(rows: usize, cols: usize, rng: &mut StdRng) -> Self {
        let w = (0..rows * cols).map(|_| gaussian(rng)).collect();
        Self { rows, cols, w }
    }

    fn apply(&self, x: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.rows];
        for (r, slot) in out.iter_mut().enumerate() {
            let row = &self.w[r * self.cols..(r + 1) * self.cols];
            *slot = row.iter().zip(x.iter()).map(|(w, v)| w * v).sum();
        }
        out
    }
}

/// A sparse projection matrix stored as per-row (column, weight) pairs.
#[derive(Debug, Clone)]
struct SparseMatrix {
    rows: usize,
    entries: Vec<Vec<(u32, f32)>>,
}

impl SparseMatrix {
    /// Gaussian entries kept with probability ~1/3; every row keeps at least
    /// one entry so no output coordinate is identically zero.
    fn gaussian(rows: usize, cols: usize, rng: &mut StdRng) -> Self {
        let mut entries = Vec::with_capacity(rows);
        for _ in 0..rows {
            let mut row: Vec<(u32, f32)> = Vec::new();
            for c in 0..cols as u32 {
                if rng.random_range(0..3u8) == 0 {
                    row.push((c, gaussian(rng)));
                }
            }
            if row.is_empty() {
                row.push((rng.random_range(0..cols as u32), gaussian(rng)));
            }
            entries.push(row);
        }
        Self { rows, entries }
    }

    fn apply(&self, x: &[f32]) -> Vec<f32> {
        let mut out = vec![0.0f32; self.rows];
        for (r, row) in self.entries.iter().enumerate() {
            out[r] = row.iter().map(|&(c, w)| w * x[c as usize]).sum();
        }
        out
    }
}

/// Mean and top principal components of a dataset sample.
#[derive(Debug, Clone)]
struct PcaBasis {
    mean: Vec<f32>,
    components: Vec<Vec<f32>>,
}

impl PcaBasis {
    fn apply(&self, x: &[f32]) -> Vec<f32> {
        let centered: Vec<f32> = x.iter().zip(self.mean.iter()).map(|(v, m)| v - m).collect();
        self.components
            .iter()
            .map(|c| c.iter().zip(centered.iter()).map(|(a, b)| a * b).sum())
            .collect()
    }
}

/// One FastMap axis: a pivot pair, the pivots' coordinates on earlier axes,
/// and their residual separation. `dab == 0` marks a degenerate axis whose
/// coordinate is always zero.
#[derive(Debug, Clone)]
struct FastMapAxis {
    pivot_a: Vec<u8>,
    pivot_b: Vec<u8>,
    coords_a: Vec<f32>,
    coords_b: Vec<f32>,
    dab: f32,
}

#[derive(Debug, Clone)]
enum ProjState {
    RandomDense {
        interm: Option<DenseMatrix>,
        matrix: DenseMatrix,
    },
    RandomSparse {
        interm: Option<DenseMatrix>,
        matrix: SparseMatrix,
    },
    Pca {
        interm: Option<DenseMatrix>,
        basis: PcaBasis,
    },
    FastMap {
        axes: Vec<FastMapAxis>,
    },
    Permutation {
        pivots: PivotSet,
    },
    BinaryPermutation {
        pivots: PivotSet,
        bin_threshold: usize,
    },
}

/// An immutable surrogate-space embedding.
#[derive(Debug, Clone)]
pub struct Projection {
    kind: ProjectionKind,
    state: ProjState,
}

impl Projection {
    /// Construct a projection over a dataset. Dense kinds require payloads
    /// that decode as equal-length `f32` vectors; FastMap and the permutation
    /// kinds work in any space since they consume only distances.
    pub fn create<S: Space>(space: &S, data: &Dataset, config: &ProjectionConfig) -> Result<Self> {
        if data.is_empty() {
            return Err(IndexError::EmptyDataset);
        }
        let mut rng = StdRng::seed_from_u64(config.seed);

        let state = match config.kind {
            ProjectionKind::RandomDense => {
                let (eff_dim, interm) = dense_setup(data, config, &mut rng)?;
                ProjState::RandomDense {
                    interm,
                    matrix: DenseMatrix::gaussian(require_dim(config.proj_dim)?, eff_dim, &mut rng),
                }
            }
            ProjectionKind::RandomSparse => {
                let (eff_dim, interm) = dense_setup(data, config, &mut rng)?;
                ProjState::RandomSparse {
                    interm,
                    matrix: SparseMatrix::gaussian(
                        require_dim(config.proj_dim)?,
                        eff_dim,
                        &mut rng,
                    ),
                }
            }
            ProjectionKind::Pca => {
                let (eff_dim, interm) = dense_setup(data, config, &mut rng)?;
                let basis = train_pca(
                    data,
                    interm.as_ref(),
                    eff_dim,
                    require_dim(config.proj_dim)?,
                    &mut rng,
                );
                ProjState::Pca { interm, basis }
            }
            ProjectionKind::FastMap => ProjState::FastMap {
                axes: train_fastmap(space, data, require_dim(config.proj_dim)?, &mut rng),
            },
            ProjectionKind::Permutation => ProjState::Permutation {
                pivots: PivotSet::select(data, config.num_pivot, &mut rng)?,
            },
            ProjectionKind::BinaryPermutation => {
                if config.bin_threshold == 0 {
                    return Err(IndexError::InvalidConfiguration(
                        "binThreshold must be at least 1".to_string(),
                    ));
                }
                ProjState::BinaryPermutation {
                    pivots: PivotSet::select(data, config.num_pivot, &mut rng)?,
                    bin_threshold: config.bin_threshold,
                }
            }
        };
        Ok(Self {
            kind: config.kind,
            state,
        })
    }

    /// Which embedding this is.
    pub fn kind(&self) -> ProjectionKind {
        self.kind
    }

    /// Project one payload. Deterministic for a given projection state.
    pub fn project<S: Space>(&self, space: &S, payload: &[u8]) -> ProjectedVec {
        match &self.state {
            ProjState::RandomDense { interm, matrix } => {
                ProjectedVec::Dense(matrix.apply(&dense_input(interm, payload)))
            }
            ProjState::RandomSparse { interm, matrix } => {
                ProjectedVec::Dense(matrix.apply(&dense_input(interm, payload)))
            }
            ProjState::Pca { interm, basis } => {
                ProjectedVec::Dense(basis.apply(&dense_input(interm, payload)))
            }
            ProjState::FastMap { axes } => {
                let mut coords = Vec::with_capacity(axes.len());
                for axis in axes {
                    coords.push(fastmap_coordinate(space, axis, payload, &coords));
                }
                ProjectedVec::Dense(coords)
            }
            ProjState::Permutation { pivots } => {
                ProjectedVec::Ranks(pivots.permutation(space, payload))
            }
            ProjState::BinaryPermutation {
                pivots,
                bin_threshold,
            } => {
                let ranks = pivots.permutation(space, payload);
                ProjectedVec::Bits(binarize(&ranks, *bin_threshold))
            }
        }
    }

    /// Output dimensionality (rank count for permutations, packed word count
    /// for binary permutations).
    pub fn target_dim(&self) -> usize {
        match &self.state {
            ProjState::RandomDense { matrix, .. } => matrix.rows,
            ProjState::RandomSparse { matrix, .. } => matrix.rows,
            ProjState::Pca { basis, .. } => basis.components.len(),
            ProjState::FastMap { axes } => axes.len(),
            ProjState::Permutation { pivots } => pivots.len(),
            ProjState::BinaryPermutation { pivots, .. } => pivots.len().div_ceil(32),
        }
    }
}

fn require_dim(dim: usize) -> Result<usize> {
    if dim == 0 {
        return Err(IndexError::InvalidConfiguration(
            "projDim must be at least 1".to_string(),
        ));
    }
    Ok(dim)
}

/// Source dimensionality checks shared by the dense kinds, plus the optional
/// intermediate random stage.
fn dense_setup(
    data: &Dataset,
    config: &ProjectionConfig,
    rng: &mut StdRng,
) -> Result<(usize, Option<DenseMatrix>)> {
    let payload = data.get(0).payload();
    if payload.is_empty() || payload.len() % 4 != 0 {
        return Err(IndexError::InvalidConfiguration(
            "dense projections require f32 vector payloads".to_string(),
        ));
    }
    let src_dim = payload.len() / 4;
    if data.iter().any(|obj| obj.payload().len() != payload.len()) {
        return Err(IndexError::InvalidConfiguration(
            "dense projections require equal-length payloads".to_string(),
        ));
    }
    if config.interm_dim > 0 {
        let interm = DenseMatrix::gaussian(config.interm_dim, src_dim, rng);
        Ok((config.interm_dim, Some(interm)))
    } else {
        Ok((src_dim, None))
    }
}

fn dense_input(interm: &Option<DenseMatrix>, payload: &[u8]) -> Vec<f32> {
    let x = decode_f32(payload);
    match interm {
        Some(m) => m.apply(&x),
        None => x,
    }
}

/// Power-iteration PCA over a sample of at most 2000 vectors.
fn train_pca(
    data: &Dataset,
    interm: Option<&DenseMatrix>,
    dim: usize,
    components_qty: usize,
    rng: &mut StdRng,
) -> PcaBasis {
    const MAX_SAMPLE: usize = 2000;
    const ITERATIONS: usize = 50;

    let sample_qty = data.len().min(MAX_SAMPLE);
    let picks = rand::seq::index::sample(rng, data.len(), sample_qty);
    let sample: Vec<Vec<f32>> = picks
        .into_iter()
        .map(|pos| {
            let x = decode_f32(data.get(pos).payload());
            match interm {
                Some(m) => m.apply(&x),
                None => x,
            }
        })
        .collect();

    let mut mean = vec![0.0f32; dim];
    for x in &sample {
        for (m, v) in mean.iter_mut().zip(x.iter()) {
            *m += v;
        }
    }
    for m in mean.iter_mut() {
        *m /= sample.len() as f32;
    }

    let centered: Vec<Vec<f32>> = sample
        .iter()
        .map(|x| x.iter().zip(mean.iter()).map(|(v, m)| v - m).collect())
        .collect();

    let mut components: Vec<Vec<f32>> = Vec::with_capacity(components_qty.min(dim));
    for _ in 0..components_qty.min(dim) {
        let mut v: Vec<f32> = (0..dim).map(|_| gaussian(rng)).collect();
        for _ in 0..ITERATIONS {
            // One covariance multiply: w = sum_i (x_i . v) x_i.
            let mut w = vec![0.0f32; dim];
            for x in &centered {
                let c: f32 = x.iter().zip(v.iter()).map(|(a, b)| a * b).sum();
                for (slot, xv) in w.iter_mut().zip(x.iter()) {
                    *slot += c * xv;
                }
            }
            // Deflate against already-found components.
            for comp in &components {
                let c: f32 = w.iter().zip(comp.iter()).map(|(a, b)| a * b).sum();
                for (slot, cv) in w.iter_mut().zip(comp.iter()) {
                    *slot -= c * cv;
                }
            }
            let norm: f32 = w.iter().map(|x| x * x).sum::<f32>().sqrt();
            if norm < 1e-12 {
                // Sample has no variance left along any new direction.
                w[components.len() % dim] = 1.0;
            } else {
                for slot in w.iter_mut() {
                    *slot /= norm;
                }
            }
            v = w;
        }
        components.push(v);
    }

    PcaBasis { mean, components }
}

/// Pick pivot pairs and record their coordinates on earlier axes.
fn train_fastmap<S: Space>(
    space: &S,
    data: &Dataset,
    dim: usize,
    rng: &mut StdRng,
) -> Vec<FastMapAxis> {
    const PAIR_ATTEMPTS: usize = 5;

    let mut axes: Vec<FastMapAxis> = Vec::with_capacity(dim);
    for _ in 0..dim {
        let mut chosen = None;
        for _ in 0..PAIR_ATTEMPTS {
            let a = rng.random_range(0..data.len());
            let b = rng.random_range(0..data.len());
            if a == b && data.len() > 1 {
                continue;
            }
            let pa = data.get(a).payload().to_vec();
            let pb = data.get(b).payload().to_vec();
            let coords_a = project_onto(space, &axes, &pa);
            let coords_b = project_onto(space, &axes, &pb);
            let raw = space.distance(&pa, &pb);
            let dab2 = residual_sq(raw, &coords_a, &coords_b);
            if dab2 > 1e-12 {
                chosen = Some(FastMapAxis {
                    pivot_a: pa,
                    pivot_b: pb,
                    coords_a,
                    coords_b,
                    dab: dab2.sqrt(),
                });
                break;
            }
        }
        match chosen {
            Some(axis) => axes.push(axis),
            // Degenerate axis: all sampled pairs coincide after earlier axes.
            None => axes.push(FastMapAxis {
                pivot_a: data.get(0).payload().to_vec(),
                pivot_b: data.get(0).payload().to_vec(),
                coords_a: vec![0.0; axes.len()],
                coords_b: vec![0.0; axes.len()],
                dab: 0.0,
            }),
        }
    }
    axes
}

fn project_onto<S: Space>(space: &S, axes: &[FastMapAxis], payload: &[u8]) -> Vec<f32> {
    let mut coords = Vec::with_capacity(axes.len());
    for axis in axes {
        coords.push(fastmap_coordinate(space, axis, payload, &coords));
    }
    coords
}

/// The FastMap recurrence: the coordinate on an axis uses distances with the
/// contributions of earlier axes subtracted.
fn fastmap_coordinate<S: Space>(
    space: &S,
    axis: &FastMapAxis,
    payload: &[u8],
    coords_so_far: &[f32],
) -> f32 {
    if axis.dab <= 0.0 {
        return 0.0;
    }
    let dax2 = residual_sq(
        space.distance(&axis.pivot_a, payload),
        &axis.coords_a,
        coords_so_far,
    );
    let dbx2 = residual_sq(
        space.distance(&axis.pivot_b, payload),
        &axis.coords_b,
        coords_so_far,
    );
    let dab2 = (axis.dab as f64) * (axis.dab as f64);
    ((dax2 as f64 + dab2 - dbx2 as f64) / (2.0 * axis.dab as f64)) as f32
}

/// Squared distance with earlier-axis contributions removed, clamped at zero
/// (non-metric distances can drive the raw recurrence negative).
fn residual_sq(raw: f32, coords_a: &[f32], coords_b: &[f32]) -> f32 {
    let mut acc = (raw as f64) * (raw as f64);
    for (a, b) in coords_a.iter().zip(coords_b.iter()) {
        let d = (*a as f64) - (*b as f64);
        acc -= d * d;
    }
    acc.max(0.0) as f32
}

/// Standard normal draw via Box–Muller.
pub(crate) fn gaussian(rng: &mut StdRng) -> f32 {
    let u1: f32 = rng.random::<f32>().max(1e-12);
    let u2: f32 = rng.random();
    (-2.0 * u1.ln()).sqrt() * (2.0 * std::f32::consts::PI * u2).cos()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::space::{encode_query, L2Space};

    fn cloud(n: usize, dim: usize, seed: u64) -> Dataset {
        let mut rng = StdRng::seed_from_u64(seed);
        let space = L2Space;
        (0..n)
            .map(|i| {
                let v: Vec<f32> = (0..dim).map(|_| rng.random::<f32>()).collect();
                space.create_obj_from_vector(i as u32, -1, &v)
            })
            .collect()
    }

    #[test]
    fn projection_is_stable() {
        let data = cloud(50, 8, 1);
        for kind in [
            ProjectionKind::RandomDense,
            ProjectionKind::RandomSparse,
            ProjectionKind::Pca,
            ProjectionKind::FastMap,
        ] {
            let config = ProjectionConfig {
                kind,
                proj_dim: 4,
                seed: 9,
                ..ProjectionConfig::default()
            };
            let proj = Projection::create(&L2Space, &data, &config).unwrap();
            let q = encode_query(&[0.3; 8]);
            assert_eq!(
                proj.project(&L2Space, &q),
                proj.project(&L2Space, &q),
                "{kind:?} must project deterministically"
            );
        }
    }

    #[test]
    fn dense_projection_has_target_dim() {
        let data = cloud(30, 10, 2);
        let config = ProjectionConfig {
            kind: ProjectionKind::RandomDense,
            proj_dim: 5,
            interm_dim: 7,
            seed: 3,
            ..ProjectionConfig::default()
        };
        let proj = Projection::create(&L2Space, &data, &config).unwrap();
        assert_eq!(proj.target_dim(), 5);
        match proj.project(&L2Space, &encode_query(&[0.1; 10])) {
            ProjectedVec::Dense(v) => assert_eq!(v.len(), 5),
            other => panic!("expected dense output, got {other:?}"),
        }
    }

    #[test]
    fn pca_first_component_tracks_dominant_direction() {
        // Points along the x axis with tiny noise elsewhere.
        let space = L2Space;
        let mut rng = StdRng::seed_from_u64(4);
        let data: Dataset = (0..200)
            .map(|i| {
                let x = i as f32 / 10.0;
                let noise: f32 = rng.random::<f32>() * 0.01;
                space.create_obj_from_vector(i as u32, -1, &[x, noise, noise])
            })
            .collect();
        let config = ProjectionConfig {
            kind: ProjectionKind::Pca,
            proj_dim: 1,
            seed: 5,
            ..ProjectionConfig::default()
        };
        let proj = Projection::create(&space, &data, &config).unwrap();

        let lo = proj.project(&space, &encode_query(&[0.0, 0.0, 0.0]));
        let hi = proj.project(&space, &encode_query(&[19.0, 0.0, 0.0]));
        let (ProjectedVec::Dense(lo), ProjectedVec::Dense(hi)) = (lo, hi) else {
            panic!("expected dense output");
        };
        // The extreme inputs must stay far apart after projection.
        assert!((lo[0] - hi[0]).abs() > 10.0);
    }

    #[test]
    fn fastmap_preserves_gross_geometry() {
        let space = L2Space;
        let data: Dataset = [[0.0f32, 0.0], [0.1, 0.0], [10.0, 10.0], [10.1, 10.0]]
            .iter()
            .enumerate()
            .map(|(i, v)| space.create_obj_from_vector(i as u32, -1, v))
            .collect();
        let config = ProjectionConfig {
            kind: ProjectionKind::FastMap,
            proj_dim: 2,
            seed: 8,
            ..ProjectionConfig::default()
        };
        let proj = Projection::create(&space, &data, &config).unwrap();

        let p = |v: &[f32]| match proj.project(&space, &encode_query(v)) {
            ProjectedVec::Dense(c) => c,
            other => panic!("expected dense output, got {other:?}"),
        };
        let l2 = |a: &[f32], b: &[f32]| -> f32 {
            a.iter()
                .zip(b.iter())
                .map(|(x, y)| (x - y) * (x - y))
                .sum::<f32>()
                .sqrt()
        };
        let near = l2(&p(&[0.0, 0.0]), &p(&[0.1, 0.0]));
        let far = l2(&p(&[0.0, 0.0]), &p(&[10.0, 10.0]));
        assert!(near < far, "near pair {near} should stay closer than {far}");
    }

    #[test]
    fn binary_permutation_bit_count_matches_threshold() {
        let data = cloud(40, 6, 6);
        let config = ProjectionConfig {
            kind: ProjectionKind::BinaryPermutation,
            num_pivot: 20,
            bin_threshold: 7,
            seed: 11,
            ..ProjectionConfig::default()
        };
        let proj = Projection::create(&L2Space, &data, &config).unwrap();
        match proj.project(&L2Space, &encode_query(&[0.5; 6])) {
            ProjectedVec::Bits(words) => {
                let ones: u32 = words.iter().map(|w| w.count_ones()).sum();
                assert_eq!(ones, 7);
            }
            other => panic!("expected bits, got {other:?}"),
        }
    }

    #[test]
    fn non_vector_payloads_rejected_for_dense_kinds() {
        let mut data = Dataset::new();
        data.push(Object::new(0, -1, vec![1, 2, 3])); // not a multiple of 4
        let config = ProjectionConfig {
            kind: ProjectionKind::RandomDense,
            proj_dim: 2,
            ..ProjectionConfig::default()
        };
        assert!(Projection::create(&L2Space, &data, &config).is_err());
    }
}
