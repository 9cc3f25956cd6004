//! Exact queries: nearest neighbors, radius, range and point lookups.

use geo_traits::CoordTrait;

use crate::distance::DistanceMetric;
use crate::error::{KdError, Result};
use crate::kdtree::bounds::{Bounds, Half};
use crate::kdtree::index::coord_to_vec;
use crate::kdtree::neighbors::{KBest, Nearest, Neighbor, Neighborhood, WithinRadius};
use crate::kdtree::node::{Element, Node};
use crate::kdtree::KdTree;
use crate::r#type::CoordNum;

impl<N: CoordNum, D, M: DistanceMetric<N>> KdTree<N, D, M> {
    /// The element closest to `key`, or `None` if the tree has not been built.
    ///
    /// Among elements at the same distance the first one found wins.
    pub fn search_nearest(&self, key: &[N]) -> Option<Neighbor<'_, N, D>> {
        let mut nearest = Nearest::new();
        self.ball_search(key, &mut nearest);
        nearest.best
    }

    /// The payload of the element closest to `key`.
    pub fn search_nearest_data(&self, key: &[N]) -> Option<&D> {
        self.search_nearest(key).map(|n| n.data())
    }

    /// [`search_nearest`](Self::search_nearest) for a key given as any [`CoordTrait`].
    pub fn search_nearest_coord(&self, coord: &impl CoordTrait<T = N>) -> Option<Neighbor<'_, N, D>> {
        self.search_nearest(&coord_to_vec(coord))
    }

    /// The `k` elements closest to `key`, closest first.
    ///
    /// Equal distances are ordered by the order in which the search found them.
    ///
    /// ```
    /// use kd_knn::kdtree::KdTree;
    ///
    /// let mut tree = KdTree::new();
    /// for (i, x) in [0.0, 1.0, 2.0, 3.0].into_iter().enumerate() {
    ///     tree.add(vec![x], i).unwrap();
    /// }
    /// tree.build(1).unwrap();
    ///
    /// let found = tree.search_k_nearest(2, &[2.9]).unwrap();
    /// let ids: Vec<usize> = found.iter().map(|n| *n.data()).collect();
    /// assert_eq!(ids, vec![3, 2]);
    /// ```
    pub fn search_k_nearest(&self, k: usize, key: &[N]) -> Result<Vec<Neighbor<'_, N, D>>> {
        self.check_k(k)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut best = KBest::new(k);
        self.ball_search(key, &mut best);
        finish_k_best(best, k)
    }

    /// Every element within `radius` of `key`, boundary included, in no particular order.
    pub fn search_within(&self, key: &[N], radius: f64) -> Vec<&Element<N, D>> {
        let mut within = WithinRadius::new(radius);
        self.ball_search(key, &mut within);
        within.found.into_iter().map(|n| n.element).collect()
    }

    /// Every element within `radius` of `key`, boundary included, closest first.
    pub fn search_within_sorted(&self, key: &[N], radius: f64) -> Vec<Neighbor<'_, N, D>> {
        let mut within = WithinRadius::new(radius);
        self.ball_search(key, &mut within);
        let mut found = within.found;
        found.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        found
    }

    /// Every element inside the box `[box_min, box_max]`, boundary included.
    pub fn search_range(&self, box_min: &[N], box_max: &[N]) -> Vec<&Element<N, D>> {
        let mut found = Vec::new();
        if let (Some(root), Some(bounds)) = (self.root.as_deref(), self.total_bounds.as_ref()) {
            debug_assert_eq!(box_min.len(), self.dimensions());
            debug_assert_eq!(box_max.len(), self.dimensions());
            let query = Bounds {
                min: box_min.to_vec(),
                max: box_max.to_vec(),
            };
            search_range(root, &query, &mut bounds.clone(), &mut found);
        }
        found
    }

    /// An element whose point equals `key`.
    ///
    /// Elements equal to a partition value can sit on both sides of a split, so this may visit
    /// both children; in the worst case the whole tree is scanned.
    pub fn search_exactly(&self, key: &[N]) -> Option<&Element<N, D>> {
        let mut found = Vec::new();
        if let Some(root) = self.root.as_deref() {
            search_exactly(root, key, &mut found, true);
        }
        found.into_iter().next()
    }

    /// Every element whose point equals `key`.
    pub fn search_exactly_all(&self, key: &[N]) -> Vec<&Element<N, D>> {
        let mut found = Vec::new();
        if let Some(root) = self.root.as_deref() {
            search_exactly(root, key, &mut found, false);
        }
        found
    }

    /// Fail the way k-nearest searches do for an empty tree or a `k` larger than the tree.
    pub(crate) fn check_k(&self, k: usize) -> Result<()> {
        if self.root.is_none() {
            return Err(KdError::EmptyTree);
        }
        if k > self.size() {
            return Err(KdError::NotEnoughElements {
                k,
                size: self.size(),
            });
        }
        Ok(())
    }

    fn ball_search<'a, H: Neighborhood<'a, N, D>>(&'a self, key: &[N], hood: &mut H) {
        if let (Some(root), Some(bounds)) = (self.root.as_deref(), self.total_bounds.as_ref()) {
            debug_assert_eq!(key.len(), self.dimensions());
            search_ball(root, key, &self.metric, &mut bounds.clone(), hood);
        }
    }
}

/// Turn a filled k-best heap into the result of a k-nearest search.
pub(crate) fn finish_k_best<'a, N: CoordNum, D>(
    best: KBest<'a, N, D>,
    k: usize,
) -> Result<Vec<Neighbor<'a, N, D>>> {
    // Only reachable when some distances are not finite.
    if !best.is_full() {
        return Err(KdError::NotEnoughElements {
            k,
            size: best.len(),
        });
    }
    Ok(best.into_sorted_vec())
}

/// Branch-and-bound descent shared by every ball query. `bounds` is the box of `node` and is
/// restored before returning. Returns `true` once the search ball is known to lie inside the
/// current box, which ends the whole search.
fn search_ball<'a, N, D, M, H>(
    node: &'a Node<N, D>,
    key: &[N],
    metric: &M,
    bounds: &mut Bounds<N>,
    hood: &mut H,
) -> bool
where
    N: CoordNum,
    M: DistanceMetric<N>,
    H: Neighborhood<'a, N, D>,
{
    match node {
        Node::Leaf { bucket } => {
            for element in bucket {
                hood.consider(metric.distance(key, &element.point), element);
            }
        }
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

            let previous = bounds.clip(d, p, near_half);
            let done = search_ball(near, key, metric, bounds, hood);
            bounds.restore(d, previous, near_half);
            if done {
                return true;
            }

            let previous = bounds.clip(d, p, far_half);
            let done = bounds.overlaps_ball(metric, key, hood.radius())
                && search_ball(far, key, metric, bounds, hood);
            bounds.restore(d, previous, far_half);
            if done {
                return true;
            }
        }
    }
    bounds.ball_within(metric, key, hood.radius())
}

fn search_range<'a, N: CoordNum, D>(
    node: &'a Node<N, D>,
    query: &Bounds<N>,
    bounds: &mut Bounds<N>,
    found: &mut Vec<&'a Element<N, D>>,
) -> bool {
    match node {
        Node::Leaf { bucket } => {
            found.extend(bucket.iter().filter(|e| query.contains_point(&e.point)));
        }
        Node::Internal {
            split_dim,
            partition,
            left,
            right,
        } => {
            let (d, p) = (*split_dim, *partition);

            if query.min[d] <= p {
                let previous = bounds.clip(d, p, Half::Left);
                let done = search_range(&**left, query, bounds, found);
                bounds.restore(d, previous, Half::Left);
                if done {
                    return true;
                }
            }

            if query.max[d] >= p {
                let previous = bounds.clip(d, p, Half::Right);
                let done = search_range(&**right, query, bounds, found);
                bounds.restore(d, previous, Half::Right);
                if done {
                    return true;
                }
            }
        }
    }
    bounds.surrounds_box(&query.min, &query.max)
}

/// Returns `true` if `first_only` is set and a match was found.
fn search_exactly<'a, N: CoordNum, D>(
    node: &'a Node<N, D>,
    key: &[N],
    found: &mut Vec<&'a Element<N, D>>,
    first_only: bool,
) -> bool {
    match node {
        Node::Leaf { bucket } => {
            for element in bucket.iter().filter(|e| e.point.as_slice() == key) {
                found.push(element);
                if first_only {
                    return true;
                }
            }
            false
        }
        Node::Internal {
            split_dim,
            partition,
            left,
            right,
        } => {
            let k = key[*split_dim];
            (k <= *partition && search_exactly(&**left, key, found, first_only))
                || (k >= *partition && search_exactly(&**right, key, found, first_only))
        }
    }
}
