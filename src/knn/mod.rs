//! A k-nearest-neighbor classifier on top of [`KdTree`](crate::kdtree::KdTree).
//!
//! Every training point is stored in the tree together with its class. A query is assigned to
//! the class that collects the most votes among its `k` nearest training points, optionally
//! correcting for class sizes and for how clearly the winner stands out from its closest
//! competitor.

#![warn(missing_docs)]

mod classifier;
mod params;
mod result;

pub use classifier::KnnClassifier;
pub use params::{
    KnnParams, ReliabilityMode, DEFAULT_BUCKET_SIZE, DEFAULT_E_MAX, DEFAULT_K,
};
pub use result::{ClassificationResult, PointInfo};
