//! Bounded max-heap for k-nearest-neighbor candidates.

use std::collections::BinaryHeap;

/// A queue entry. Ordered by distance so the heap top is the worst of the
/// current k best.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Entry {
    dist: f32,
    pos: u32,
}

impl Eq for Entry {}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        // Max-heap by distance; total_cmp for IEEE 754 total ordering.
        self.dist.total_cmp(&other.dist)
    }
}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

/// Bounded max-heap of at most `k` (distance, position) candidates.
///
/// While unfilled, [`KnnQueue::max_dist`] is infinite; once `k` entries are
/// held, it reports the k-th best distance, optionally shrunk by the
/// approximation factor `eps` (pruning radius `top / (1 + eps)`). Admission
/// always compares against the unscaled top, so `eps` only makes pruning more
/// aggressive, never the result set larger.
#[derive(Debug, Clone)]
pub struct KnnQueue {
    k: usize,
    eps: f32,
    heap: BinaryHeap<Entry>,
}

impl KnnQueue {
    /// Queue holding at most `k` entries with approximation factor `eps >= 0`.
    pub fn new(k: usize, eps: f32) -> Self {
        Self {
            k,
            eps,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Current pruning radius.
    #[inline]
    pub fn max_dist(&self) -> f32 {
        if self.heap.len() == self.k {
            match self.heap.peek() {
                Some(top) => top.dist / (1.0 + self.eps),
                None => f32::INFINITY, // k == 0
            }
        } else {
            f32::INFINITY
        }
    }

    /// Offer a candidate; keeps it only if the queue is unfilled or the
    /// candidate beats the current k-th best.
    #[inline]
    pub fn admit(&mut self, dist: f32, pos: u32) {
        if self.heap.len() < self.k {
            self.heap.push(Entry { dist, pos });
        } else if let Some(top) = self.heap.peek() {
            if dist < top.dist {
                self.heap.pop();
                self.heap.push(Entry { dist, pos });
            }
        }
    }

    /// Number of candidates currently held.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Whether no candidate has been admitted yet.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drain into (distance, position) pairs in ascending distance order.
    pub fn into_sorted_vec(self) -> Vec<(f32, u32)> {
        let mut entries: Vec<Entry> = self.heap.into_vec();
        entries.sort_by(|a, b| a.dist.total_cmp(&b.dist));
        entries.into_iter().map(|e| (e.dist, e.pos)).collect()
    }
}
