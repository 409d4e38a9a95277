//! Pruning oracles for the VP-tree.
//!
//! A classical metric-space VP-tree prunes a subtree when the query ball
//! cannot cross the median shell: `maxDist <= |M - d(q, pivot)|`. Stretching
//! that rule with a coefficient alpha trades recall for speed, and using
//! separate left/right coefficients handles asymmetric distances. The
//! polynomial rule generalizes one step further:
//!
//! ```text
//! prune right (visit left only)  when  maxDist < alphaL * (M - dq)^expL,  dq <= M
//! prune left  (visit right only) when  maxDist < alphaR * (dq - M)^expR,  dq >= M
//! ```
//!
//! With `alpha = 1`, `exp = 1` and a metric distance this reduces to the
//! classical exact rule.
//!
//! # References
//!
//! - Yianilos (1999): "Locally lifting the curse of dimensionality for
//!   nearest neighbor search"
//! - Chavez & Navarro (2003): "Probabilistic proximity search: Fighting the
//!   curse of dimensionality in metric spaces"
//! - Boytsov & Naidan (2013): "Learning to prune in metric and non-metric
//!   spaces"

use crate::error::{IndexError, Result};

/// Which subtrees of an internal node a query must visit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisitDecision {
    /// Visit the left subtree only.
    Left,
    /// Visit the right subtree only.
    Right,
    /// Visit both subtrees.
    Both,
}

/// The polynomial pruning rule: per-side stretch coefficients and integer
/// exponents. Immutable once constructed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PolynomialPruner {
    alpha_left: f64,
    exp_left: u32,
    alpha_right: f64,
    exp_right: u32,
}

impl Default for PolynomialPruner {
    /// The identity pruner: exact search under a metric distance.
    fn default() -> Self {
        Self {
            alpha_left: 1.0,
            exp_left: 1,
            alpha_right: 1.0,
            exp_right: 1,
        }
    }
}

impl PolynomialPruner {
    /// Validated constructor; alphas must be positive, exponents at least 1.
    pub fn new(alpha_left: f64, exp_left: u32, alpha_right: f64, exp_right: u32) -> Result<Self> {
        if !(alpha_left > 0.0) || !(alpha_right > 0.0) {
            return Err(IndexError::InvalidConfiguration(format!(
                "pruner alphas must be positive, got alphaLeft={alpha_left} alphaRight={alpha_right}"
            )));
        }
        if exp_left == 0 || exp_right == 0 {
            return Err(IndexError::InvalidConfiguration(
                "pruner exponents must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            alpha_left,
            exp_left,
            alpha_right,
            exp_right,
        })
    }

    pub fn alpha_left(&self) -> f64 {
        self.alpha_left
    }

    pub fn exp_left(&self) -> u32 {
        self.exp_left
    }

    pub fn alpha_right(&self) -> f64 {
        self.alpha_right
    }

    pub fn exp_right(&self) -> u32 {
        self.exp_right
    }

    /// Decide which subtrees a query with pruning radius `max_dist` must
    /// visit, given its distance `dq` to the pivot and the node median.
    ///
    /// The comparisons are strict: when `dq == median` objects at the median
    /// shell may sit in both subtrees, and even `max_dist == 0` must visit
    /// both (`0 < 0` is false). Arithmetic is carried out in `f64` so large
    /// exponents cannot overflow the distance scalar.
    #[inline]
    pub fn classify(&self, dq: f32, max_dist: f32, median: f32) -> VisitDecision {
        if dq <= median {
            let diff = (median - dq) as f64;
            if (max_dist as f64) < self.alpha_left * diff.powi(self.exp_left as i32) {
                return VisitDecision::Left;
            }
        }
        if dq >= median {
            let diff = (dq - median) as f64;
            if (max_dist as f64) < self.alpha_right * diff.powi(self.exp_right as i32) {
                return VisitDecision::Right;
            }
        }
        VisitDecision::Both
    }
}

/// The stretched triangle-inequality rule: the polynomial rule with both
/// exponents fixed at 1, kept as its own variant because it skips the pow.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriangleIneqPruner {
    alpha_left: f64,
    alpha_right: f64,
}

impl TriangleIneqPruner {
    /// Validated constructor; alphas must be positive.
    pub fn new(alpha_left: f64, alpha_right: f64) -> Result<Self> {
        if !(alpha_left > 0.0) || !(alpha_right > 0.0) {
            return Err(IndexError::InvalidConfiguration(format!(
                "pruner alphas must be positive, got alphaLeft={alpha_left} alphaRight={alpha_right}"
            )));
        }
        Ok(Self {
            alpha_left,
            alpha_right,
        })
    }

    pub fn alpha_left(&self) -> f64 {
        self.alpha_left
    }

    pub fn alpha_right(&self) -> f64 {
        self.alpha_right
    }

    #[inline]
    pub fn classify(&self, dq: f32, max_dist: f32, median: f32) -> VisitDecision {
        if (max_dist as f64) < self.alpha_left * (median as f64 - dq as f64) {
            return VisitDecision::Left;
        }
        if (max_dist as f64) < self.alpha_right * (dq as f64 - median as f64) {
            return VisitDecision::Right;
        }
        VisitDecision::Both
    }
}

/// The closed set of pruning oracles a tree node can carry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Pruner {
    Polynomial(PolynomialPruner),
    TriangleIneq(TriangleIneqPruner),
}

impl Default for Pruner {
    fn default() -> Self {
        Pruner::Polynomial(PolynomialPruner::default())
    }
}

impl Pruner {
    #[inline]
    pub fn classify(&self, dq: f32, max_dist: f32, median: f32) -> VisitDecision {
        match self {
            Pruner::Polynomial(p) => p.classify(dq, max_dist, median),
            Pruner::TriangleIneq(p) => p.classify(dq, max_dist, median),
        }
    }

    /// One-line description for logs.
    pub fn describe(&self) -> String {
        match self {
            Pruner::Polynomial(p) => format!(
                "polynomial alphaLeft={} expLeft={} alphaRight={} expRight={}",
                p.alpha_left, p.exp_left, p.alpha_right, p.exp_right
            ),
            Pruner::TriangleIneq(p) => format!(
                "triangle-inequality alphaLeft={} alphaRight={}",
                p.alpha_left, p.alpha_right
            ),
        }
    }
}
