//! vantage: VP-tree approximate nearest-neighbor search for generic metric
//! and non-metric spaces.
//!
//! Given a dataset of opaque objects and a distance function — possibly
//! asymmetric, possibly violating the triangle inequality — vantage builds a
//! vantage-point tree and answers k-NN and range queries over it. Speed is
//! traded against recall through a tunable pruning oracle.
//!
//! # Components
//!
//! - **[`vptree`]**: the tree itself. Partitions by distance-to-pivot median,
//!   prunes subtrees with a polynomial oracle whose coefficients are either
//!   supplied or auto-tuned.
//! - **[`projection`]** + **[`surrogate`]**: embeddings into cheap vector
//!   spaces (random, PCA, FastMap, permutation, binarized permutation) and
//!   the wrapper indices that search the embedding, then re-rank candidates
//!   with the original distance.
//! - **[`tune`]**: recall-driven grid search over pruning parameters,
//!   scoring configurations against a cached gold standard.
//!
//! # Which Index Should I Use?
//!
//! | Situation | Recommendation |
//! |-----------|----------------|
//! | Metric or mildly non-metric distance, exactness optional | [`vptree::VpTree`] with tuned pruner |
//! | Expensive distance, vector-structured data | [`surrogate::ProjectionVpTree`] |
//! | High-dimensional or strongly non-metric distance | [`surrogate::PermutationVpTree`] |
//! | Same, with the tightest memory/speed budget | [`surrogate::BinaryPermutationVpTree`] |
//!
//! The tree with an identity pruner (`alpha = 1`, `exp = 1`) is exact in a
//! metric space; everything else here is probabilistic. Recall targets are
//! met empirically, by the tuner, not by proof — that is the price of
//! supporting distances with no triangle inequality to lean on.
//!
//! # Usage
//!
//! ```
//! use vantage::object::Dataset;
//! use vantage::params::AnyParams;
//! use vantage::space::{encode_query, L2Space};
//! use vantage::vptree::VpTree;
//!
//! # fn main() -> vantage::Result<()> {
//! let space = L2Space;
//! let mut data = Dataset::new();
//! for (i, v) in [[0.0f32, 0.0], [1.0, 0.0], [0.0, 1.0], [5.0, 5.0]].iter().enumerate() {
//!     data.push(space.create_obj_from_vector(i as u32, -1, v));
//! }
//!
//! let tree = VpTree::build(space, data, &AnyParams::new(&[("bucketSize", "2")]))?;
//! let results = tree.knn_query(&encode_query(&[0.2, 0.1]), 2, 0.0)?;
//! assert_eq!(results[0].1, 0);
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

pub mod engine;
pub mod error;
pub mod object;
pub mod params;
pub mod projection;
pub mod space;
pub mod surrogate;
pub mod tune;
pub mod vptree;

// Re-exports
pub use error::{IndexError, Result};
pub use object::{Dataset, Object};
pub use params::AnyParams;
pub use space::Space;
pub use surrogate::{BinaryPermutationVpTree, PermutationVpTree, ProjectionVpTree};
pub use tune::{tune, TunableIndex, TuneParams, TunedParams};
pub use vptree::VpTree;
