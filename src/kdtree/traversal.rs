//! Utilities to traverse the tree structure.

use crate::kdtree::bounds::{Bounds, Half};
use crate::kdtree::node::{Element, Node};
use crate::kdtree::KdTree;
use crate::r#type::CoordNum;

/// A borrowed view onto a node of a built tree, together with the box it covers.
///
/// The box of the root is the total bounds of the tree; each child's box is its parent's box
/// clipped at the parent's partition value.
#[derive(Debug, Clone)]
pub struct NodeRef<'a, N: CoordNum, D> {
    node: &'a Node<N, D>,
    bounds: Bounds<N>,
    depth: usize,
}

impl<'a, N: CoordNum, D> NodeRef<'a, N, D> {
    /// The box covered by this node.
    #[inline]
    pub fn bounds(&self) -> &Bounds<N> {
        &self.bounds
    }

    /// The depth of this node; the root is at depth zero.
    #[inline]
    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Returns `true` if this is a leaf node without children.
    #[inline]
    pub fn is_leaf(&self) -> bool {
        matches!(self.node, Node::Leaf { .. })
    }

    /// Returns `true` if this is an intermediate node with children.
    #[inline]
    pub fn is_parent(&self) -> bool {
        !self.is_leaf()
    }

    /// The elements stored in this node. Empty for intermediate nodes.
    pub fn bucket(&self) -> &'a [Element<N, D>] {
        match self.node {
            Node::Leaf { bucket } => bucket,
            Node::Internal { .. } => &[],
        }
    }

    /// The dimension the children of this node are split over.
    pub fn split_dim(&self) -> Option<usize> {
        match self.node {
            Node::Internal { split_dim, .. } => Some(*split_dim),
            Node::Leaf { .. } => None,
        }
    }

    /// The value separating the children of this node.
    pub fn partition(&self) -> Option<N> {
        match self.node {
            Node::Internal { partition, .. } => Some(*partition),
            Node::Leaf { .. } => None,
        }
    }

    /// The child holding values up to the partition.
    pub fn left_child(&self) -> Option<NodeRef<'a, N, D>> {
        self.child(Half::Left)
    }

    /// The child holding values from the partition on.
    pub fn right_child(&self) -> Option<NodeRef<'a, N, D>> {
        self.child(Half::Right)
    }

    fn child(&self, half: Half) -> Option<NodeRef<'a, N, D>> {
        match self.node {
            Node::Internal {
                split_dim,
                partition,
                left,
                right,
            } => {
                let node = match half {
                    Half::Left => &**left,
                    Half::Right => &**right,
                };
                Some(NodeRef {
                    node,
                    bounds: self.bounds.clipped(*split_dim, *partition, half),
                    depth: self.depth + 1,
                })
            }
            Node::Leaf { .. } => None,
        }
    }
}

/// Iterator over the nodes of a tree in pre-order: a node, then its left subtree, then its right
/// subtree.
#[derive(Debug)]
pub struct PreOrder<'a, N: CoordNum, D> {
    stack: Vec<NodeRef<'a, N, D>>,
}

impl<'a, N: CoordNum, D> Iterator for PreOrder<'a, N, D> {
    type Item = NodeRef<'a, N, D>;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        if let Some(right) = node.right_child() {
            self.stack.push(right);
        }
        if let Some(left) = node.left_child() {
            self.stack.push(left);
        }
        Some(node)
    }
}

impl<N: CoordNum, D, M> KdTree<N, D, M> {
    /// Access the root node of the built tree for manual traversal.
    pub fn root(&self) -> Option<NodeRef<'_, N, D>> {
        let node = self.root.as_deref()?;
        let bounds = self.total_bounds.clone()?;
        Some(NodeRef {
            node,
            bounds,
            depth: 0,
        })
    }

    /// Iterate over every node of the built tree in pre-order.
    pub fn pre_order(&self) -> PreOrder<'_, N, D> {
        PreOrder {
            stack: self.root().into_iter().collect(),
        }
    }
}
