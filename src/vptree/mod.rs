//! Vantage-point tree over a generic distance space.
//!
//! The tree recursively partitions objects by distance to a randomly chosen
//! pivot: objects within the median distance go left, the rest go right.
//! At query time a pruning oracle decides, from the query-to-pivot distance
//! and the current result radius, which subtrees can be skipped. With the
//! identity [`PolynomialPruner`](oracle::PolynomialPruner) and a metric
//! distance the search is exact; stretched or polynomial rules trade recall
//! for fewer distance computations, which is what makes the tree usable in
//! non-metric spaces.
//!
//! # Usage
//!
//! ```
//! use vantage::params::AnyParams;
//! use vantage::object::Dataset;
//! use vantage::space::L2Space;
//! use vantage::vptree::VpTree;
//!
//! # fn main() -> vantage::Result<()> {
//! let space = L2Space;
//! let mut data = Dataset::new();
//! for (i, v) in [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0]].iter().enumerate() {
//!     data.push(space.create_obj_from_vector(i as u32, -1, v));
//! }
//! let tree = VpTree::build(space, data, &AnyParams::new(&[("bucketSize", "1")]))?;
//!
//! let query = vantage::space::encode_query(&[0.1, 0.1]);
//! let hits = tree.knn_query(&query, 2, 0.0)?;
//! assert_eq!(hits[0].1, 0);
//! # Ok(())
//! # }
//! ```
//!
//! # References
//!
//! - Yianilos (1993): "Data structures and algorithms for nearest neighbor
//!   search in general metric spaces"
//! - Boytsov & Naidan (2013): "Learning to prune in metric and non-metric
//!   spaces"

pub mod oracle;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info};

use crate::engine::{Collector, KnnQueue, RangeCollector};
use crate::error::{IndexError, Result};
use crate::object::{Dataset, DistObjectPair};
use crate::params::{AnyParams, ParamManager};
use crate::space::Space;
use oracle::{PolynomialPruner, Pruner, VisitDecision};

/// Build-time parameters for a [`VpTree`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VpTreeParams {
    /// Leaf capacity: a node holding this many objects or fewer stays a leaf.
    pub bucket_size: usize,

    /// Concatenate leaf payloads into one contiguous buffer for scanning.
    pub chunk_bucket: bool,

    /// Build RNG seed; `None` draws one from entropy. Two builds with the
    /// same seed over the same dataset produce identical trees.
    pub seed: Option<u64>,
}

impl Default for VpTreeParams {
    fn default() -> Self {
        Self {
            bucket_size: 50,
            chunk_bucket: true,
            seed: None,
        }
    }
}

impl VpTreeParams {
    pub(crate) fn from_manager(pm: &mut ParamManager) -> Result<Self> {
        let defaults = Self::default();
        let bucket_size = pm.get_or("bucketSize", defaults.bucket_size)?;
        let chunk_bucket = pm.get_or("chunkBucket", defaults.chunk_bucket)?;
        let seed = pm.get_opt("seed")?;
        Ok(Self {
            bucket_size,
            chunk_bucket,
            seed,
        })
    }
}

/// Read the four pruner keys, falling back to the current pruner's values.
/// When none of the keys is present the current pruner is kept as-is, so
/// re-setting parameters to their current values is a no-op.
pub(crate) fn pruner_from_manager(pm: &mut ParamManager, current: &Pruner) -> Result<Pruner> {
    let any_key = ["alphaLeft", "expLeft", "alphaRight", "expRight"]
        .iter()
        .any(|k| pm.has(k));
    if !any_key {
        return Ok(*current);
    }
    let (dal, del, dar, der) = match current {
        Pruner::Polynomial(p) => (p.alpha_left(), p.exp_left(), p.alpha_right(), p.exp_right()),
        Pruner::TriangleIneq(t) => (t.alpha_left(), 1, t.alpha_right(), 1),
    };
    let alpha_left = pm.get_or("alphaLeft", dal)?;
    let exp_left = pm.get_or("expLeft", del)?;
    let alpha_right = pm.get_or("alphaRight", dar)?;
    let exp_right = pm.get_or("expRight", der)?;
    Ok(Pruner::Polynomial(PolynomialPruner::new(
        alpha_left,
        exp_left,
        alpha_right,
        exp_right,
    )?))
}

/// Per-query accounting.
#[derive(Debug, Clone, Copy, Default)]
pub struct SearchStats {
    /// Number of distance evaluations performed.
    pub dist_comps: u64,
}

/// Leaf payloads packed into one contiguous allocation, scanned linearly.
/// Only possible when every payload in the bucket has the same length.
#[derive(Debug)]
struct ChunkedBucket {
    payloads: Vec<u8>,
    stride: usize,
}

#[derive(Debug)]
enum Node {
    Internal {
        /// Dataset position of the pivot object.
        pivot: u32,
        /// Median of distances from the pivot to the node's other objects.
        median: f32,
        pruner: Pruner,
        left: Box<Node>,
        right: Box<Node>,
    },
    Leaf {
        /// Dataset positions of bucket members.
        bucket: Vec<u32>,
        chunk: Option<ChunkedBucket>,
    },
}

/// A vantage-point tree index over an owned dataset.
pub struct VpTree<S: Space> {
    space: S,
    data: Dataset,
    params: VpTreeParams,
    pruner: Pruner,
    root: Node,
}

impl<S: Space> VpTree<S> {
    /// Build from a string parameter map. Recognized keys: `bucketSize`,
    /// `chunkBucket`, `seed`, `alphaLeft`, `expLeft`, `alphaRight`,
    /// `expRight`. Unknown keys are an error.
    pub fn build(space: S, data: Dataset, params: &AnyParams) -> Result<Self> {
        let mut pm = ParamManager::new(params);
        let tree_params = VpTreeParams::from_manager(&mut pm)?;
        let pruner = pruner_from_manager(&mut pm, &Pruner::default())?;
        pm.check_unclaimed()?;
        Self::with_options(space, data, tree_params, pruner)
    }

    /// Build with typed options.
    pub fn with_options(
        space: S,
        data: Dataset,
        params: VpTreeParams,
        pruner: Pruner,
    ) -> Result<Self> {
        if data.is_empty() {
            error!("refusing to build a vp-tree over an empty dataset");
            return Err(IndexError::EmptyDataset);
        }
        if params.bucket_size == 0 {
            return Err(IndexError::InvalidConfiguration(
                "bucketSize must be at least 1".to_string(),
            ));
        }
        let seed = params.seed.unwrap_or_else(|| rand::rng().random());
        let mut rng = StdRng::seed_from_u64(seed);

        info!(
            "building vp-tree over {} objects in space {}: bucketSize={} chunkBucket={} seed={} pruner: {}",
            data.len(),
            space.name(),
            params.bucket_size,
            params.chunk_bucket,
            seed,
            pruner.describe()
        );

        let items: Vec<u32> = (0..data.len() as u32).collect();
        let root = build_node(&space, &data, items, &params, &pruner, &mut rng);
        Ok(Self {
            space,
            data,
            params,
            pruner,
            root,
        })
    }

    /// Replace pruner parameters on the built tree. Only the four pruner keys
    /// are accepted here; tree shape is unaffected.
    pub fn set_query_time_params(&mut self, params: &AnyParams) -> Result<()> {
        let mut pm = ParamManager::new(params);
        let pruner = pruner_from_manager(&mut pm, &self.pruner)?;
        pm.check_unclaimed()?;
        self.set_pruner(pruner);
        Ok(())
    }

    /// Replace the pruner at every internal node.
    pub fn set_pruner(&mut self, pruner: Pruner) {
        self.pruner = pruner;
        replace_pruner(&mut self.root, &pruner);
    }

    /// k nearest neighbors of `query`, ascending by distance. `eps >= 0`
    /// relaxes pruning for approximate search; `eps = 0` keeps the exact
    /// pruning radius.
    pub fn knn_query(&self, query: &[u8], k: usize, eps: f32) -> Result<Vec<(f32, u32)>> {
        self.knn_query_with_stats(query, k, eps).map(|(r, _)| r)
    }

    /// [`Self::knn_query`] plus per-query accounting.
    pub fn knn_query_with_stats(
        &self,
        query: &[u8],
        k: usize,
        eps: f32,
    ) -> Result<(Vec<(f32, u32)>, SearchStats)> {
        if k == 0 {
            return Err(IndexError::InvalidConfiguration(
                "k must be at least 1".to_string(),
            ));
        }
        if !(eps >= 0.0) {
            return Err(IndexError::InvalidConfiguration(format!(
                "eps must be non-negative, got {eps}"
            )));
        }
        let mut queue = KnnQueue::new(k, eps);
        let mut stats = SearchStats::default();
        self.search_node(&self.root, query, &mut queue, &mut stats);
        let results = queue
            .into_sorted_vec()
            .into_iter()
            .map(|(d, pos)| (d, self.data.get(pos as usize).id()))
            .collect();
        Ok((results, stats))
    }

    /// All objects within `radius` of `query`, in unspecified order.
    pub fn range_query(&self, query: &[u8], radius: f32) -> Result<Vec<(f32, u32)>> {
        self.range_query_with_stats(query, radius).map(|(r, _)| r)
    }

    /// [`Self::range_query`] plus per-query accounting.
    pub fn range_query_with_stats(
        &self,
        query: &[u8],
        radius: f32,
    ) -> Result<(Vec<(f32, u32)>, SearchStats)> {
        if !(radius >= 0.0) {
            return Err(IndexError::InvalidConfiguration(format!(
                "range radius must be non-negative, got {radius}"
            )));
        }
        let mut coll = RangeCollector::new(radius);
        let mut stats = SearchStats::default();
        self.search_node(&self.root, query, &mut coll, &mut stats);
        let results = coll
            .into_results()
            .into_iter()
            .map(|(d, pos)| (d, self.data.get(pos as usize).id()))
            .collect();
        Ok((results, stats))
    }

    /// The dataset this tree was built over.
    pub fn dataset(&self) -> &Dataset {
        &self.data
    }

    /// The space distances are measured in.
    pub fn space(&self) -> &S {
        &self.space
    }

    /// The current pruner template.
    pub fn pruner(&self) -> &Pruner {
        &self.pruner
    }

    /// Build-time parameters.
    pub fn params(&self) -> &VpTreeParams {
        &self.params
    }

    fn search_node<C: Collector>(&self, node: &Node, query: &[u8], coll: &mut C, stats: &mut SearchStats) {
        match node {
            Node::Leaf { bucket, chunk } => {
                if let Some(chunk) = chunk {
                    for (i, &pos) in bucket.iter().enumerate() {
                        let payload = &chunk.payloads[i * chunk.stride..(i + 1) * chunk.stride];
                        let d = self.space.distance(query, payload);
                        stats.dist_comps += 1;
                        coll.collect(d, pos);
                    }
                } else {
                    for &pos in bucket {
                        let d = self
                            .space
                            .distance(query, self.data.get(pos as usize).payload());
                        stats.dist_comps += 1;
                        coll.collect(d, pos);
                    }
                }
            }
            Node::Internal {
                pivot,
                median,
                pruner,
                left,
                right,
            } => {
                let dq = self
                    .space
                    .distance(query, self.data.get(*pivot as usize).payload());
                stats.dist_comps += 1;
                coll.collect(dq, *pivot);

                match pruner.classify(dq, coll.max_dist(), *median) {
                    VisitDecision::Left => self.search_node(left, query, coll, stats),
                    VisitDecision::Right => self.search_node(right, query, coll, stats),
                    VisitDecision::Both => {
                        // Descend into the side holding the query first so the
                        // result radius tightens before the far side is scanned.
                        if dq <= *median {
                            self.search_node(left, query, coll, stats);
                            self.search_node(right, query, coll, stats);
                        } else {
                            self.search_node(right, query, coll, stats);
                            self.search_node(left, query, coll, stats);
                        }
                    }
                }
            }
        }
    }
}

fn build_node<S: Space>(
    space: &S,
    data: &Dataset,
    mut items: Vec<u32>,
    params: &VpTreeParams,
    pruner: &Pruner,
    rng: &mut StdRng,
) -> Node {
    if items.len() <= params.bucket_size {
        return make_leaf(data, items, params);
    }

    let pivot_idx = rng.random_range(0..items.len());
    let pivot = items.swap_remove(pivot_idx);
    let pivot_payload = data.get(pivot as usize).payload();

    let mut dists: Vec<DistObjectPair> = items
        .iter()
        .map(|&pos| {
            (
                space.distance(pivot_payload, data.get(pos as usize).payload()),
                pos,
            )
        })
        .collect();

    // Median split via nth-element: everything before mid is <= the median
    // distance, everything from mid on is >= it, and the halves differ in
    // size by at most one. Objects exactly at the median may land on either
    // side, which is why the oracle visits both subtrees on equality.
    let mid = dists.len() / 2;
    dists.select_nth_unstable_by(mid, |a, b| a.0.total_cmp(&b.0));
    let median = dists[mid].0;

    let left_items: Vec<u32> = dists[..mid].iter().map(|&(_, pos)| pos).collect();
    let right_items: Vec<u32> = dists[mid..].iter().map(|&(_, pos)| pos).collect();

    let left = build_node(space, data, left_items, params, pruner, rng);
    let right = build_node(space, data, right_items, params, pruner, rng);

    Node::Internal {
        pivot,
        median,
        pruner: *pruner,
        left: Box::new(left),
        right: Box::new(right),
    }
}

fn make_leaf(data: &Dataset, items: Vec<u32>, params: &VpTreeParams) -> Node {
    let chunk = if params.chunk_bucket && !items.is_empty() {
        let stride = data.get(items[0] as usize).payload().len();
        let uniform = stride > 0
            && items
                .iter()
                .all(|&pos| data.get(pos as usize).payload().len() == stride);
        if uniform {
            let mut payloads = Vec::with_capacity(stride * items.len());
            for &pos in &items {
                payloads.extend_from_slice(data.get(pos as usize).payload());
            }
            Some(ChunkedBucket { payloads, stride })
        } else {
            None
        }
    } else {
        None
    };
    Node::Leaf {
        bucket: items,
        chunk,
    }
}

fn replace_pruner(node: &mut Node, pruner: &Pruner) {
    if let Node::Internal {
        pruner: node_pruner,
        left,
        right,
        ..
    } = node
    {
        *node_pruner = *pruner;
        replace_pruner(left, pruner);
        replace_pruner(right, pruner);
    }
}
