//! Axis-aligned bounding boxes used while searching.

use crate::distance::DistanceMetric;
use crate::r#type::CoordNum;

/// Which half of a split a child covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Half {
    /// Values up to the partition; the box's upper bound is clipped.
    Left,
    /// Values from the partition on; the box's lower bound is clipped.
    Right,
}

/// An axis-aligned box given by its componentwise minimum and maximum corners.
#[derive(Debug, Clone, PartialEq)]
pub struct Bounds<N: CoordNum> {
    pub(crate) min: Vec<N>,
    pub(crate) max: Vec<N>,
}

impl<N: CoordNum> Bounds<N> {
    pub(crate) fn from_point(point: &[N]) -> Self {
        Self {
            min: point.to_vec(),
            max: point.to_vec(),
        }
    }

    /// Grow the box to contain `point`.
    pub(crate) fn extend(&mut self, point: &[N]) {
        for ((lo, hi), &v) in self.min.iter_mut().zip(self.max.iter_mut()).zip(point) {
            if v < *lo {
                *lo = v;
            }
            if v > *hi {
                *hi = v;
            }
        }
    }

    /// The lower corner.
    #[inline]
    pub fn min(&self) -> &[N] {
        &self.min
    }

    /// The upper corner.
    #[inline]
    pub fn max(&self) -> &[N] {
        &self.max
    }

    /// The number of dimensions.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.min.len()
    }

    /// Clip the box to one half of a split and return the bound it replaced.
    #[inline]
    pub(crate) fn clip(&mut self, dim: usize, partition: N, half: Half) -> N {
        match half {
            Half::Left => std::mem::replace(&mut self.max[dim], partition),
            Half::Right => std::mem::replace(&mut self.min[dim], partition),
        }
    }

    /// Undo a [`clip`](Self::clip).
    #[inline]
    pub(crate) fn restore(&mut self, dim: usize, previous: N, half: Half) {
        match half {
            Half::Left => self.max[dim] = previous,
            Half::Right => self.min[dim] = previous,
        }
    }

    /// The box of one half of a split, leaving `self` untouched.
    pub(crate) fn clipped(&self, dim: usize, partition: N, half: Half) -> Self {
        let mut out = self.clone();
        out.clip(dim, partition, half);
        out
    }

    /// Whether the ball of radius `dist` around `key` lies strictly inside the box.
    ///
    /// Once this holds for the best distance found so far, nothing outside the box can improve
    /// the result.
    pub(crate) fn ball_within<M: DistanceMetric<N>>(&self, metric: &M, key: &[N], dist: f64) -> bool {
        for (i, &k) in key.iter().enumerate() {
            let (lo, hi) = (self.min[i], self.max[i]);
            if k < lo || k > hi {
                return false;
            }
            if metric.component(k, lo) <= dist || metric.component(hi, k) <= dist {
                return false;
            }
        }
        true
    }

    /// Whether the ball of radius `dist` around `key` touches the box.
    pub(crate) fn overlaps_ball<M: DistanceMetric<N>>(
        &self,
        metric: &M,
        key: &[N],
        dist: f64,
    ) -> bool {
        let mut acc = 0.0;
        for (i, &k) in key.iter().enumerate() {
            if k < self.min[i] {
                metric.accumulate_pair(self.min[i], k, &mut acc);
            } else if k > self.max[i] {
                metric.accumulate_pair(k, self.max[i], &mut acc);
            } else {
                continue;
            }
            if metric.acc_greater_than(acc, dist) {
                return false;
            }
        }
        true
    }

    /// The distance from `key` to the closest point of the box, zero if `key` is inside.
    pub(crate) fn min_distance<M: DistanceMetric<N>>(&self, metric: &M, key: &[N]) -> f64 {
        let mut acc = 0.0;
        for (i, &k) in key.iter().enumerate() {
            if k > self.max[i] {
                metric.accumulate_pair(k, self.max[i], &mut acc);
            } else if k < self.min[i] {
                metric.accumulate_pair(k, self.min[i], &mut acc);
            }
        }
        metric.compute_distance(acc)
    }

    /// Whether `point` lies inside the box, boundary included.
    pub fn contains_point(&self, point: &[N]) -> bool {
        point
            .iter()
            .enumerate()
            .all(|(i, &v)| v >= self.min[i] && v <= self.max[i])
    }

    /// Whether the box `[box_min, box_max]` lies inside this box.
    pub fn contains_box(&self, box_min: &[N], box_max: &[N]) -> bool {
        (0..self.dimensions()).all(|i| box_min[i] >= self.min[i] && box_max[i] <= self.max[i])
    }

    /// Whether the box `[box_min, box_max]` lies inside this box without touching its faces.
    ///
    /// Elements equal to a partition value may sit on either side of the split, so only strict
    /// containment proves that no other node can hold a match.
    pub(crate) fn surrounds_box(&self, box_min: &[N], box_max: &[N]) -> bool {
        (0..self.dimensions()).all(|i| box_min[i] > self.min[i] && box_max[i] < self.max[i])
    }
}
