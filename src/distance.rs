//! Distance metrics for k-d tree queries.
//!
//! The tree never computes a full distance to a bounding box in one go. Instead it accumulates
//! per-dimension contributions and compares the partial sum against the current search radius,
//! bailing out as soon as the radius is exceeded. This only works for metrics of the Minkowski
//! family, where every dimension contributes a non-negative amount and the accumulated value can
//! only grow as more dimensions are considered. Implementations of [`DistanceMetric`] must uphold
//! that contract; a metric that violates it makes pruning drop valid results.

use crate::r#type::CoordNum;

/// A Minkowski-family distance between two points, split into per-dimension pieces.
///
/// Values live in two spaces:
///
/// - *accumulator space*: the running sum built by [`accumulate`](Self::accumulate), e.g. the sum
///   of squared differences for the Euclidean distance;
/// - *distance space*: what [`distance`](Self::distance) returns and what callers compare,
///   obtained from an accumulator through [`compute_distance`](Self::compute_distance).
///
/// [`acc_less_than`](Self::acc_less_than) and [`acc_greater_than`](Self::acc_greater_than)
/// compare an accumulator to a distance without finalizing the accumulator.
pub trait DistanceMetric<N: CoordNum> {
    /// The distance between two points of the same dimensionality.
    fn distance(&self, a: &[N], b: &[N]) -> f64 {
        debug_assert_eq!(a.len(), b.len());
        let mut acc = 0.0;
        for (&x, &y) in a.iter().zip(b) {
            self.accumulate_pair(x, y, &mut acc);
        }
        self.compute_distance(acc)
    }

    /// Add the contribution of one per-dimension difference to `acc`.
    fn accumulate(&self, diff: f64, acc: &mut f64);

    /// Add the contribution of the difference between two coordinates to `acc`.
    #[inline]
    fn accumulate_pair(&self, a: N, b: N, acc: &mut f64) {
        self.accumulate(a.as_f64() - b.as_f64(), acc);
    }

    /// Turn an accumulator into a value in distance space.
    fn compute_distance(&self, acc: f64) -> f64;

    /// The distance-space contribution of a single dimension.
    fn component(&self, a: N, b: N) -> f64;

    /// Whether the accumulator is already below the given distance.
    fn acc_less_than(&self, acc: f64, dist: f64) -> bool;

    /// Whether the accumulator already exceeds the given distance.
    fn acc_greater_than(&self, acc: f64, dist: f64) -> bool;
}

/// Squared Euclidean distance.
///
/// This is the default metric of the tree: it orders points exactly like the Euclidean distance
/// but never takes a square root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SquaredEuclidean;

impl<N: CoordNum> DistanceMetric<N> for SquaredEuclidean {
    #[inline]
    fn accumulate(&self, diff: f64, acc: &mut f64) {
        *acc += diff * diff;
    }

    #[inline]
    fn compute_distance(&self, acc: f64) -> f64 {
        acc
    }

    #[inline]
    fn component(&self, a: N, b: N) -> f64 {
        let d = b.as_f64() - a.as_f64();
        d * d
    }

    #[inline]
    fn acc_less_than(&self, acc: f64, dist: f64) -> bool {
        acc < dist
    }

    #[inline]
    fn acc_greater_than(&self, acc: f64, dist: f64) -> bool {
        acc > dist
    }
}

/// Euclidean (L2) distance.
///
/// Accumulates squared differences and takes the square root only when a distance is requested.
/// Comparisons in accumulator space square the threshold instead.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Euclidean;

impl<N: CoordNum> DistanceMetric<N> for Euclidean {
    #[inline]
    fn accumulate(&self, diff: f64, acc: &mut f64) {
        *acc += diff * diff;
    }

    #[inline]
    fn compute_distance(&self, acc: f64) -> f64 {
        acc.sqrt()
    }

    #[inline]
    fn component(&self, a: N, b: N) -> f64 {
        (b.as_f64() - a.as_f64()).abs()
    }

    #[inline]
    fn acc_less_than(&self, acc: f64, dist: f64) -> bool {
        acc < dist * dist
    }

    #[inline]
    fn acc_greater_than(&self, acc: f64, dist: f64) -> bool {
        acc > dist * dist
    }
}

/// City block (L1, Manhattan) distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CityBlock;

impl<N: CoordNum> DistanceMetric<N> for CityBlock {
    #[inline]
    fn accumulate(&self, diff: f64, acc: &mut f64) {
        *acc += diff.abs();
    }

    #[inline]
    fn compute_distance(&self, acc: f64) -> f64 {
        acc
    }

    #[inline]
    fn component(&self, a: N, b: N) -> f64 {
        (b.as_f64() - a.as_f64()).abs()
    }

    #[inline]
    fn acc_less_than(&self, acc: f64, dist: f64) -> bool {
        acc < dist
    }

    #[inline]
    fn acc_greater_than(&self, acc: f64, dist: f64) -> bool {
        acc > dist
    }
}
