use thiserror::Error;

/// Enum with all errors in this crate.
///
/// Every fallible operation either succeeds or returns one of these without having modified the
/// tree or classifier it was called on.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum KdError {
    /// A bucket size of zero can never hold a leaf.
    #[error("Bucket size must be at least 1.")]
    InvalidBucketSize,

    /// `build` or `rebuild` was called with nothing to index.
    #[error("No data added to the k-d tree.")]
    NoData,

    /// A query that needs at least one element was run on an empty tree.
    #[error("The k-d tree is empty.")]
    EmptyTree,

    /// Points must have at least one dimension.
    #[error("Points must have at least one coordinate.")]
    EmptyPoint,

    /// A point's dimensionality differs from the points already in the tree.
    #[error("Expected a point with {expected} dimensions, got {found}.")]
    DimensionMismatch {
        /// Dimensionality fixed by the first point added.
        expected: usize,
        /// Dimensionality of the rejected point.
        found: usize,
    },

    /// More neighbors were requested than the tree holds.
    #[error("Requested {k} neighbors but the tree only holds {size} elements.")]
    NotEnoughElements {
        /// Number of neighbors requested.
        k: usize,
        /// Number of elements in the tree.
        size: usize,
    },

    /// Two inputs that must describe the same rows have different lengths.
    #[error("Incompatible sizes: expected {expected} {what}, got {found}.")]
    SizeMismatch {
        /// What was being counted.
        what: &'static str,
        /// Number of feature rows.
        expected: usize,
        /// Number of entries actually given.
        found: usize,
    },

    /// Incremental object training after a batch `train` call.
    #[error("Cannot add objects to a classifier trained with a batch train call.")]
    MixedTraining,

    /// The classifier has no built data to classify against.
    #[error("The classifier has not been trained and built.")]
    NotTrained,

    /// A configuration value is outside its valid range.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
}

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, KdError>;
