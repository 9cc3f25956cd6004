//! Query results and the candidate collectors the searches fill.

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::kdtree::node::Element;
use crate::r#type::CoordNum;

/// An element found by a distance query, together with its distance to the key.
#[derive(Debug)]
pub struct Neighbor<'a, N: CoordNum, D> {
    /// The stored element.
    pub element: &'a Element<N, D>,
    /// Its distance to the query key, as reported by the tree's metric.
    pub distance: f64,
}

impl<N: CoordNum, D> Clone for Neighbor<'_, N, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<N: CoordNum, D> Copy for Neighbor<'_, N, D> {}

impl<'a, N: CoordNum, D> Neighbor<'a, N, D> {
    /// The coordinates of the element.
    #[inline]
    pub fn point(&self) -> &'a [N] {
        &self.element.point
    }

    /// The payload of the element.
    #[inline]
    pub fn data(&self) -> &'a D {
        &self.element.data
    }
}

/// Receives candidates during a ball search and decides how far the search must reach.
pub(crate) trait Neighborhood<'a, N: CoordNum, D> {
    /// The current search radius in distance space.
    fn radius(&self) -> f64;

    /// Offer an element at the given distance.
    fn consider(&mut self, distance: f64, element: &'a Element<N, D>);
}

/// The single closest element.
pub(crate) struct Nearest<'a, N: CoordNum, D> {
    pub(crate) best: Option<Neighbor<'a, N, D>>,
}

impl<N: CoordNum, D> Nearest<'_, N, D> {
    pub(crate) fn new() -> Self {
        Self { best: None }
    }
}

impl<'a, N: CoordNum, D> Neighborhood<'a, N, D> for Nearest<'a, N, D> {
    #[inline]
    fn radius(&self) -> f64 {
        self.best.map_or(f64::INFINITY, |n| n.distance)
    }

    #[inline]
    fn consider(&mut self, distance: f64, element: &'a Element<N, D>) {
        if distance < self.radius() {
            self.best = Some(Neighbor { element, distance });
        }
    }
}

/// Every element within a fixed radius, boundary included.
pub(crate) struct WithinRadius<'a, N: CoordNum, D> {
    pub(crate) radius: f64,
    pub(crate) found: Vec<Neighbor<'a, N, D>>,
}

impl<N: CoordNum, D> WithinRadius<'_, N, D> {
    pub(crate) fn new(radius: f64) -> Self {
        Self {
            radius,
            found: Vec::new(),
        }
    }
}

impl<'a, N: CoordNum, D> Neighborhood<'a, N, D> for WithinRadius<'a, N, D> {
    #[inline]
    fn radius(&self) -> f64 {
        self.radius
    }

    #[inline]
    fn consider(&mut self, distance: f64, element: &'a Element<N, D>) {
        if distance <= self.radius {
            self.found.push(Neighbor { element, distance });
        }
    }
}

/// A candidate in the k-best heap. Orders by distance, then by discovery order, so the heap top
/// is the current worst and equal distances keep the earlier find.
struct Candidate<'a, N: CoordNum, D> {
    distance: f64,
    seq: usize,
    element: &'a Element<N, D>,
}

impl<N: CoordNum, D> PartialEq for Candidate<'_, N, D> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<N: CoordNum, D> Eq for Candidate<'_, N, D> {}

impl<N: CoordNum, D> Ord for Candidate<'_, N, D> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.seq.cmp(&other.seq))
    }
}

impl<N: CoordNum, D> PartialOrd for Candidate<'_, N, D> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// The `k` closest elements seen so far, kept in a bounded max-heap.
pub(crate) struct KBest<'a, N: CoordNum, D> {
    k: usize,
    seq: usize,
    heap: BinaryHeap<Candidate<'a, N, D>>,
}

impl<'a, N: CoordNum, D> KBest<'a, N, D> {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            seq: 0,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    /// Whether `k` real candidates have been found.
    #[inline]
    pub(crate) fn is_full(&self) -> bool {
        self.heap.len() >= self.k
    }

    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    /// The results, closest first.
    pub(crate) fn into_sorted_vec(self) -> Vec<Neighbor<'a, N, D>> {
        self.heap
            .into_sorted_vec()
            .into_iter()
            .map(|c| Neighbor {
                element: c.element,
                distance: c.distance,
            })
            .collect()
    }
}

impl<'a, N: CoordNum, D> Neighborhood<'a, N, D> for KBest<'a, N, D> {
    /// The k-th best distance, or infinity while fewer than `k` candidates are known.
    #[inline]
    fn radius(&self) -> f64 {
        if self.is_full() {
            self.heap.peek().map_or(f64::INFINITY, |c| c.distance)
        } else {
            f64::INFINITY
        }
    }

    fn consider(&mut self, distance: f64, element: &'a Element<N, D>) {
        if self.k == 0 || !(distance < self.radius()) {
            return;
        }
        if self.is_full() {
            self.heap.pop();
        }
        self.heap.push(Candidate {
            distance,
            seq: self.seq,
            element,
        });
        self.seq += 1;
    }
}
