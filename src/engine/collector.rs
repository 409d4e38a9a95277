//! The collector abstraction shared by k-NN and range search.

use super::KnnQueue;

/// Sink for candidates produced during a tree descent.
///
/// [`Collector::max_dist`] is the current pruning radius handed to the
/// oracle; [`Collector::collect`] decides whether a computed distance is
/// admitted. The tree owns distance evaluation so it can account for every
/// call.
pub(crate) trait Collector {
    fn max_dist(&self) -> f32;
    fn collect(&mut self, dist: f32, pos: u32);
}

impl Collector for KnnQueue {
    #[inline]
    fn max_dist(&self) -> f32 {
        KnnQueue::max_dist(self)
    }

    #[inline]
    fn collect(&mut self, dist: f32, pos: u32) {
        self.admit(dist, pos);
    }
}

/// Collects every candidate within a fixed radius.
#[derive(Debug, Clone)]
pub struct RangeCollector {
    radius: f32,
    hits: Vec<(f32, u32)>,
}

impl RangeCollector {
    /// Collector admitting distances `<= radius`.
    pub fn new(radius: f32) -> Self {
        Self {
            radius,
            hits: Vec::new(),
        }
    }

    /// Admitted (distance, position) pairs in visit order.
    pub fn into_results(self) -> Vec<(f32, u32)> {
        self.hits
    }
}

impl Collector for RangeCollector {
    #[inline]
    fn max_dist(&self) -> f32 {
        self.radius
    }

    #[inline]
    fn collect(&mut self, dist: f32, pos: u32) {
        if dist <= self.radius {
            self.hits.push((dist, pos));
        }
    }
}
