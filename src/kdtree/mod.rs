//! A bucketed k-d tree for nearest-neighbor, radius, range and exact-match queries.
//!
//! Each internal node splits its elements at the median of the dimension with the largest
//! spread, and elements are only stored in leaves ("buckets"). Exact searches prune subtrees by
//! comparing the distance to a node's bounding box against the best distance found so far;
//! [`KdTree::search_best_bin_first`] trades exactness for a bounded number of visited leaves.

#![warn(missing_docs)]

mod best_bin_first;
mod bounds;
mod index;
mod neighbors;
mod node;
mod search;
mod traversal;

pub use bounds::Bounds;
pub use index::{KdTree, DEFAULT_BUCKET_SIZE};
pub use neighbors::Neighbor;
pub use node::Element;
pub use traversal::{NodeRef, PreOrder};

#[cfg(test)]
mod test;
