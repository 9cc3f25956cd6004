use geo_traits::CoordTrait;
use tracing::debug;

use crate::distance::{DistanceMetric, SquaredEuclidean};
use crate::error::{KdError, Result};
use crate::kdtree::bounds::Bounds;
use crate::kdtree::node::{Element, Node};
use crate::r#type::CoordNum;

/// The bucket size used by [`KdTree::build_default`].
pub const DEFAULT_BUCKET_SIZE: usize = 1;

/// A bucketed k-d tree mapping points of `N` coordinates to payloads of type `D`.
///
/// Points are first buffered with [`add`](Self::add) and only become searchable after
/// [`build`](Self::build) or [`rebuild`](Self::rebuild). Distances are measured with `M`, the
/// squared Euclidean distance unless another metric is chosen with
/// [`with_metric`](Self::with_metric).
///
/// All queries take `&self` and keep their working state local to the call, so a built tree can
/// be searched from several threads at once.
///
/// ```
/// use kd_knn::kdtree::KdTree;
///
/// let mut tree = KdTree::new();
/// tree.add(vec![0.0, 0.0], "origin").unwrap();
/// tree.add(vec![5.0, 5.0], "far").unwrap();
/// tree.build(1).unwrap();
///
/// let nearest = tree.search_nearest(&[1.0, 1.0]).unwrap();
/// assert_eq!(*nearest.data(), "origin");
/// assert_eq!(nearest.distance, 2.0);
/// ```
#[derive(Debug, Clone)]
pub struct KdTree<N: CoordNum, D, M = SquaredEuclidean> {
    pub(crate) root: Option<Box<Node<N, D>>>,
    pending: Vec<Element<N, D>>,
    pub(crate) metric: M,
    pub(crate) total_bounds: Option<Bounds<N>>,
    dimensions: usize,
    num_elements: usize,
    num_leaves: usize,
    levels: usize,
}

impl<N: CoordNum, D> KdTree<N, D, SquaredEuclidean> {
    /// Create an empty tree using the squared Euclidean distance.
    pub fn new() -> Self {
        Self::with_metric(SquaredEuclidean)
    }
}

impl<N: CoordNum, D> Default for KdTree<N, D, SquaredEuclidean> {
    fn default() -> Self {
        Self::new()
    }
}

impl<N: CoordNum, D, M: DistanceMetric<N>> KdTree<N, D, M> {
    /// Create an empty tree measuring distances with `metric`.
    pub fn with_metric(metric: M) -> Self {
        Self {
            root: None,
            pending: Vec::new(),
            metric,
            total_bounds: None,
            dimensions: 0,
            num_elements: 0,
            num_leaves: 0,
            levels: 0,
        }
    }

    /// Buffer a point and its payload for the next [`build`](Self::build).
    ///
    /// The first point added to an empty tree fixes its dimensionality. Points of another
    /// dimensionality are rejected and leave the tree untouched.
    pub fn add(&mut self, point: Vec<N>, data: D) -> Result<()> {
        if point.is_empty() {
            return Err(KdError::EmptyPoint);
        }
        if self.dimensions == 0 {
            self.dimensions = point.len();
        } else if point.len() != self.dimensions {
            return Err(KdError::DimensionMismatch {
                expected: self.dimensions,
                found: point.len(),
            });
        }
        self.pending.push(Element::new(point, data));
        Ok(())
    }

    /// Buffer a point given as any [`CoordTrait`] implementation.
    pub fn add_coord(&mut self, coord: &impl CoordTrait<T = N>, data: D) -> Result<()> {
        self.add(coord_to_vec(coord), data)
    }

    /// Build the tree from every buffered point, replacing any previously built tree.
    ///
    /// Elements of the replaced tree are dropped; use [`rebuild`](Self::rebuild) to keep them.
    /// Fails without changing anything if `bucket_size` is zero or nothing was added.
    pub fn build(&mut self, bucket_size: usize) -> Result<()> {
        if bucket_size == 0 {
            return Err(KdError::InvalidBucketSize);
        }
        if self.pending.is_empty() {
            return Err(KdError::NoData);
        }

        let elements = std::mem::take(&mut self.pending);
        self.build_from(elements, bucket_size);
        Ok(())
    }

    /// [`build`](Self::build) with [`DEFAULT_BUCKET_SIZE`].
    pub fn build_default(&mut self) -> Result<()> {
        self.build(DEFAULT_BUCKET_SIZE)
    }

    /// Merge the elements of the current tree with the buffered points and build again.
    pub fn rebuild(&mut self, bucket_size: usize) -> Result<()> {
        if bucket_size == 0 {
            return Err(KdError::InvalidBucketSize);
        }
        let mut elements = Vec::with_capacity(self.num_elements + self.pending.len());
        if let Some(root) = self.root.take() {
            root.drain_into(&mut elements);
        }
        elements.append(&mut self.pending);
        if elements.is_empty() {
            return Err(KdError::NoData);
        }

        debug!(
            rebuilt = self.num_elements,
            added = elements.len() - self.num_elements,
            "rebuilding kd-tree"
        );
        self.build_from(elements, bucket_size);
        Ok(())
    }

    fn build_from(&mut self, elements: Vec<Element<N, D>>, bucket_size: usize) {
        let mut bounds = Bounds::from_point(&elements[0].point);
        for element in &elements[1..] {
            bounds.extend(&element.point);
        }

        let num_elements = elements.len();
        let (root, shape) = Node::subdivide(elements, bucket_size);

        self.root = Some(Box::new(root));
        self.total_bounds = Some(bounds);
        self.num_elements = num_elements;
        self.num_leaves = shape.leaves;
        self.levels = shape.levels;

        debug!(
            elements = num_elements,
            leaves = shape.leaves,
            levels = shape.levels,
            bucket_size,
            "built kd-tree"
        );
    }

    /// Drop every element, built or buffered, and forget the dimensionality.
    pub fn clear(&mut self) {
        self.root = None;
        self.pending.clear();
        self.total_bounds = None;
        self.dimensions = 0;
        self.num_elements = 0;
        self.num_leaves = 0;
        self.levels = 0;
    }

    /// The number of elements in the built tree.
    #[inline]
    pub fn size(&self) -> usize {
        self.num_elements
    }

    /// Whether the built tree holds no elements.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.root.is_none()
    }

    /// The number of points buffered since the last build.
    #[inline]
    pub fn num_added_elements(&self) -> usize {
        self.pending.len()
    }

    /// The number of leaves in the built tree.
    #[inline]
    pub fn num_leaves(&self) -> usize {
        self.num_leaves
    }

    /// The depth of the built tree. A tree made of a single leaf has one level.
    #[inline]
    pub fn levels(&self) -> usize {
        self.levels
    }

    /// The dimensionality fixed by the first added point, or zero for a fresh tree.
    #[inline]
    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    /// The componentwise minimum and maximum over all built elements.
    #[inline]
    pub fn total_bounds(&self) -> Option<&Bounds<N>> {
        self.total_bounds.as_ref()
    }

    /// The distance metric of this tree.
    #[inline]
    pub fn metric(&self) -> &M {
        &self.metric
    }

    /// Visit every built element, with mutable access to its payload.
    pub fn for_each_data_mut(&mut self, mut f: impl FnMut(&[N], &mut D)) {
        if let Some(root) = self.root.as_deref_mut() {
            root.for_each_element_mut(&mut f);
        }
    }
}

pub(crate) fn coord_to_vec<N: CoordNum>(coord: &impl CoordTrait<T = N>) -> Vec<N> {
    (0..coord.dim().size()).map(|i| coord.nth_or_panic(i)).collect()
}
