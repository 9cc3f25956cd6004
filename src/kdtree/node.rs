//! Tree storage and subdivision.

use std::cmp;
use std::cmp::Ordering;

use tinyvec::TinyVec;

use crate::r#type::CoordNum;

/// A point stored in the tree together with its payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Element<N: CoordNum, D> {
    pub(crate) point: Vec<N>,
    /// The payload attached to the point.
    pub data: D,
}

impl<N: CoordNum, D> Element<N, D> {
    pub(crate) fn new(point: Vec<N>, data: D) -> Self {
        Self { point, data }
    }

    /// The coordinates of this element.
    #[inline]
    pub fn point(&self) -> &[N] {
        &self.point
    }

    /// The payload of this element.
    #[inline]
    pub fn data(&self) -> &D {
        &self.data
    }
}

#[derive(Debug, Clone)]
pub(crate) enum Node<N: CoordNum, D> {
    Leaf {
        bucket: Vec<Element<N, D>>,
    },
    Internal {
        split_dim: usize,
        partition: N,
        left: Box<Node<N, D>>,
        right: Box<Node<N, D>>,
    },
}

/// Shape statistics collected while subdividing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct Shape {
    pub(crate) leaves: usize,
    pub(crate) levels: usize,
}

impl<N: CoordNum, D> Node<N, D> {
    /// Recursively split `elements` until every bucket holds at most `bucket_size` elements.
    ///
    /// `elements` must not be empty and `bucket_size` must be at least one.
    pub(crate) fn subdivide(elements: Vec<Element<N, D>>, bucket_size: usize) -> (Self, Shape) {
        debug_assert!(!elements.is_empty());
        debug_assert!(bucket_size > 0);

        if elements.len() <= bucket_size {
            return (Node::Leaf { bucket: elements }, Shape { leaves: 1, levels: 1 });
        }

        let split_dim = dim_with_highest_variance(&elements);
        let partition = lower_median(&elements, split_dim);
        let (left, right) = split_at_partition(elements, split_dim, partition);

        // Only NaN coordinates can defeat the median split.
        if left.is_empty() || right.is_empty() {
            let mut bucket = left;
            bucket.extend(right);
            return (Node::Leaf { bucket }, Shape { leaves: 1, levels: 1 });
        }

        let (left, left_shape) = Node::subdivide(left, bucket_size);
        let (right, right_shape) = Node::subdivide(right, bucket_size);

        let node = Node::Internal {
            split_dim,
            partition,
            left: Box::new(left),
            right: Box::new(right),
        };
        let shape = Shape {
            leaves: left_shape.leaves + right_shape.leaves,
            levels: 1 + cmp::max(left_shape.levels, right_shape.levels),
        };
        (node, shape)
    }

    /// Move every element of this subtree into `out`, in pre-order.
    pub(crate) fn drain_into(self, out: &mut Vec<Element<N, D>>) {
        match self {
            Node::Leaf { bucket } => out.extend(bucket),
            Node::Internal { left, right, .. } => {
                left.drain_into(out);
                right.drain_into(out);
            }
        }
    }

    pub(crate) fn for_each_element_mut(&mut self, f: &mut impl FnMut(&[N], &mut D)) {
        match self {
            Node::Leaf { bucket } => {
                for element in bucket.iter_mut() {
                    f(&element.point, &mut element.data);
                }
            }
            Node::Internal { left, right, .. } => {
                left.for_each_element_mut(f);
                right.for_each_element_mut(f);
            }
        }
    }
}

/// Compare two coordinates, treating incomparable values as equal.
#[inline]
pub(crate) fn cmp_coord<N: CoordNum>(a: &N, b: &N) -> Ordering {
    a.partial_cmp(b).unwrap_or(Ordering::Equal)
}

/// The dimension maximizing `sumsq - sum^2 / n`. The first dimension wins ties.
fn dim_with_highest_variance<N: CoordNum, D>(elements: &[Element<N, D>]) -> usize {
    let dims = elements[0].point.len();
    let n = elements.len() as f64;

    let mut sum: TinyVec<[f64; 8]> = TinyVec::new();
    let mut sum_sq: TinyVec<[f64; 8]> = TinyVec::new();
    sum.resize(dims, 0.0);
    sum_sq.resize(dims, 0.0);

    for element in elements {
        for (i, value) in element.point.iter().enumerate() {
            let v = value.as_f64();
            sum[i] += v;
            sum_sq[i] += v * v;
        }
    }

    let mut best_dim = 0;
    let mut best_score = f64::NEG_INFINITY;
    for i in 0..dims {
        let score = sum_sq[i] - sum[i] * sum[i] / n;
        if score > best_score {
            best_score = score;
            best_dim = i;
        }
    }
    best_dim
}

/// The value of rank `(n - 1) / 2` along `dim`.
fn lower_median<N: CoordNum, D>(elements: &[Element<N, D>], dim: usize) -> N {
    let mut values: Vec<N> = elements.iter().map(|e| e.point[dim]).collect();
    let k = (values.len() - 1) / 2;
    let right = values.len() - 1;
    select(&mut values, k, 0, right);
    values[k]
}

/// Split around `partition`: strictly smaller values go left, strictly larger values go right,
/// and values equal to the partition fill the left side up to `ceil(n / 2)` elements.
fn split_at_partition<N: CoordNum, D>(
    elements: Vec<Element<N, D>>,
    dim: usize,
    partition: N,
) -> (Vec<Element<N, D>>, Vec<Element<N, D>>) {
    let n = elements.len();
    let left_count = n - n / 2;

    let mut left = Vec::with_capacity(left_count);
    let mut right = Vec::with_capacity(n - left_count);
    let mut equal = Vec::new();

    for element in elements {
        match cmp_coord(&element.point[dim], &partition) {
            Ordering::Less => left.push(element),
            Ordering::Greater => right.push(element),
            Ordering::Equal => equal.push(element),
        }
    }

    let to_left = left_count.saturating_sub(left.len()).min(equal.len());
    let rest = equal.split_off(to_left);
    left.append(&mut equal);
    right.extend(rest);

    (left, right)
}

/// Floyd-Rivest selection: reorder `values[left..=right]` so that `values[k]` holds the value of
/// rank `k`, with nothing larger before it and nothing smaller after it.
fn select<N: CoordNum>(values: &mut [N], k: usize, mut left: usize, mut right: usize) {
    while right > left {
        if right - left > 600 {
            let n = (right - left + 1) as f64;
            let m = (k - left + 1) as f64;
            let z = f64::ln(n);
            let s = 0.5 * f64::exp((2.0 * z) / 3.0);
            let sd = 0.5
                * f64::sqrt((z * s * (n - s)) / n)
                * (if m - n / 2.0 < 0.0 { -1.0 } else { 1.0 });
            let new_left = cmp::max(left, f64::floor(k as f64 - (m * s) / n + sd) as usize);
            let new_right = cmp::min(
                right,
                f64::floor(k as f64 + ((n - m) * s) / n + sd) as usize,
            );
            select(values, k, new_left, new_right);
        }

        let t = values[k];
        let mut i = left;
        let mut j = right;

        values.swap(left, k);
        if values[right] > t {
            values.swap(left, right);
        }

        while i < j {
            values.swap(i, j);
            i += 1;
            j -= 1;
            while values[i] < t {
                i += 1;
            }
            while values[j] > t {
                j -= 1;
            }
        }

        if values[left] == t {
            values.swap(left, j);
        } else {
            j += 1;
            values.swap(j, right);
        }

        if j <= k {
            left = j + 1;
        }
        if k <= j {
            if j == 0 {
                break;
            }
            right = j - 1;
        }
    }
}
