//! Approximate k-nearest-neighbor search after Beis and Lowe's best-bin-first strategy.
//!
//! The descent always follows the child on the key's side of the split. Every child it passes
//! over is remembered, together with its box, in a priority queue ordered by the smallest
//! possible distance between the key and that box. When a leaf has been scanned the search
//! resumes at the most promising remembered subtree. After a fixed number of leaves the search
//! stops and returns the best candidates found so far.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use tracing::trace;

use crate::distance::DistanceMetric;
use crate::error::Result;
use crate::kdtree::bounds::{Bounds, Half};
use crate::kdtree::neighbors::{KBest, Neighbor, Neighborhood};
use crate::kdtree::node::Node;
use crate::kdtree::search::finish_k_best;
use crate::kdtree::KdTree;
use crate::r#type::CoordNum;

/// A subtree passed over during descent, keyed by its lower distance bound.
struct Deferred<'a, N: CoordNum, D> {
    distance: f64,
    seq: usize,
    node: &'a Node<N, D>,
    bounds: Bounds<N>,
}

impl<N: CoordNum, D> PartialEq for Deferred<'_, N, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<N: CoordNum, D> Eq for Deferred<'_, N, D> {}

impl<N: CoordNum, D> Ord for Deferred<'_, N, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.seq.cmp(&other.seq))
    }
}

impl<N: CoordNum, D> PartialOrd for Deferred<'_, N, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<N: CoordNum, D, M: DistanceMetric<N>> KdTree<N, D, M> {
    /// Approximate `k` nearest neighbors of `key`, closest first.
    ///
    /// At most `emax` leaves are scanned once `k` candidates are known, so the result may miss
    /// some of the true nearest neighbors. The cap never applies before `k` candidates exist,
    /// and with `emax` at least the number of leaves the result equals
    /// [`search_k_nearest`](Self::search_k_nearest).
    pub fn search_best_bin_first(
        &self,
        k: usize,
        key: &[N],
        emax: usize,
    ) -> Result<Vec<Neighbor<'_, N, D>>> {
        self.check_k(k)?;
        if k == 0 {
            return Ok(Vec::new());
        }
        let (Some(root), Some(total_bounds)) = (self.root.as_deref(), self.total_bounds.as_ref())
        else {
            return Ok(Vec::new());
        };
        debug_assert_eq!(key.len(), self.dimensions());

        let metric = &self.metric;
        let max_visits = emax.min(self.num_leaves());
        let mut visits = 0;
        let mut seq = 0;
        let mut best = KBest::new(k);
        let mut queue = BinaryHeap::new();
        let mut bounds = total_bounds.clone();
        let mut current = Some(root);

        while let Some(node) = current {
            if best.is_full() && visits >= max_visits {
                trace!(visits, pending = queue.len(), "best-bin-first: leaf budget spent");
                break;
            }

            match node {
                Node::Internal {
                    split_dim,
                    partition,
                    left,
                    right,
                } => {
                    let (d, p) = (*split_dim, *partition);
                    let (near, far, near_half, far_half) = if key[d] <= p {
                        (&**left, &**right, Half::Left, Half::Right)
                    } else {
                        (&**right, &**left, Half::Right, Half::Left)
                    };

                    let far_bounds = bounds.clipped(d, p, far_half);
                    queue.push(Reverse(Deferred {
                        distance: far_bounds.min_distance(metric, key),
                        seq,
                        node: far,
                        bounds: far_bounds,
                    }));
                    seq += 1;

                    bounds.clip(d, p, near_half);
                    current = Some(near);
                }
                Node::Leaf { bucket } => {
                    for element in bucket {
                        best.consider(metric.distance(key, &element.point), element);
                    }
                    visits += 1;

                    if bounds.ball_within(metric, key, best.radius()) {
                        trace!(visits, "best-bin-first: ball within leaf bounds");
                        break;
                    }

                    current = match queue.pop() {
                        Some(Reverse(next)) if !(best.is_full() && next.distance >= best.radius()) => {
                            bounds = next.bounds;
                            Some(next.node)
                        }
                        Some(_) => {
                            trace!(visits, "best-bin-first: no pending bin can improve");
                            None
                        }
                        None => {
                            trace!(visits, "best-bin-first: queue exhausted");
                            None
                        }
                    };
                }
            }
        }

        finish_k_best(best, k)
    }
}
