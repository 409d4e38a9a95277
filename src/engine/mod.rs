//! Per-query result machinery: the bounded k-NN queue and the range
//! collector, unified behind a collector trait consumed by tree search.

mod collector;
mod knn_queue;

pub use collector::RangeCollector;
pub(crate) use collector::Collector;
pub use knn_queue::KnnQueue;
