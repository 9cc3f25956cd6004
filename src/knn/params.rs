use crate::error::{KdError, Result};

/// Number of neighbors consulted by default.
pub const DEFAULT_K: usize = 1;

/// Bucket size of the classifier's tree by default.
pub const DEFAULT_BUCKET_SIZE: usize = 5;

/// Leaf budget of best-bin-first searches by default.
pub const DEFAULT_E_MAX: usize = 100;

/// How the ratio between the distance to the closest point of another class and the distance
/// to the winner is turned into a vote weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReliabilityMode {
    /// `min(1, (r - 1) / (t - 1))`
    #[default]
    Linear,
    /// `1 - exp(-(r - 1) / t)`
    Exponential,
}

impl ReliabilityMode {
    /// The weight for distance ratio `ratio` and threshold `threshold`.
    pub fn weight(self, ratio: f64, threshold: f64) -> f64 {
        match self {
            ReliabilityMode::Linear => ((ratio - 1.0) / (threshold - 1.0)).min(1.0),
            ReliabilityMode::Exponential => 1.0 - (-(ratio - 1.0) / threshold).exp(),
        }
    }
}

/// Configuration of a [`KnnClassifier`](crate::knn::KnnClassifier).
#[derive(Debug, Clone, PartialEq)]
pub struct KnnParams {
    /// How many nearest neighbors vote.
    pub k: usize,

    /// Weight each vote by the inverse of its class size, so large classes do not dominate.
    pub normalize_data: bool,

    /// Turn the scores of a classification into a probability distribution.
    pub normalize_output: bool,

    /// Scale votes by how clearly the winner is separated from the closest other class.
    pub use_reliability_measure: bool,

    /// The reliability function used when [`use_reliability_measure`](Self::use_reliability_measure)
    /// is set.
    pub reliability_mode: ReliabilityMode,

    /// The distance ratio at which the linear reliability reaches one, or the decay constant of
    /// the exponential one.
    pub reliability_threshold: f64,

    /// Upper limit for the number of neighbors searched to find a point of another class.
    pub max_unreliable_neighborhood: usize,

    /// Use the approximate best-bin-first search instead of the exact one.
    pub best_bin_first: bool,

    /// Leaf budget of the best-bin-first search.
    pub e_max: usize,

    /// Bucket size of the underlying tree.
    pub bucket_size: usize,
}

impl Default for KnnParams {
    fn default() -> Self {
        Self {
            k: DEFAULT_K,
            normalize_data: true,
            normalize_output: true,
            use_reliability_measure: false,
            reliability_mode: ReliabilityMode::Linear,
            reliability_threshold: 10.0,
            max_unreliable_neighborhood: 20,
            best_bin_first: false,
            e_max: DEFAULT_E_MAX,
            bucket_size: DEFAULT_BUCKET_SIZE,
        }
    }
}

impl KnnParams {
    /// Set the number of voting neighbors.
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Enable or disable the class-size correction of votes.
    pub fn with_normalize_data(mut self, normalize_data: bool) -> Self {
        self.normalize_data = normalize_data;
        self
    }

    /// Enable or disable probability normalization of the output.
    pub fn with_normalize_output(mut self, normalize_output: bool) -> Self {
        self.normalize_output = normalize_output;
        self
    }

    /// Enable reliability weighting with the given function and threshold.
    pub fn with_reliability(mut self, mode: ReliabilityMode, threshold: f64) -> Self {
        self.use_reliability_measure = true;
        self.reliability_mode = mode;
        self.reliability_threshold = threshold;
        self
    }

    /// Set the largest neighborhood searched for a point of another class.
    pub fn with_max_unreliable_neighborhood(mut self, size: usize) -> Self {
        self.max_unreliable_neighborhood = size;
        self
    }

    /// Use the best-bin-first search, visiting at most `e_max` leaves.
    pub fn with_best_bin_first(mut self, e_max: usize) -> Self {
        self.best_bin_first = true;
        self.e_max = e_max;
        self
    }

    /// Set the bucket size of the tree.
    pub fn with_bucket_size(mut self, bucket_size: usize) -> Self {
        self.bucket_size = bucket_size;
        self
    }

    /// Check that the parameters describe a usable classifier.
    pub fn validate(&self) -> Result<()> {
        if self.k == 0 {
            return Err(KdError::InvalidParameter("k must be at least 1".to_string()));
        }
        if self.bucket_size == 0 {
            return Err(KdError::InvalidBucketSize);
        }
        if self.e_max == 0 {
            return Err(KdError::InvalidParameter(
                "e_max must be at least 1".to_string(),
            ));
        }
        if self.use_reliability_measure {
            match self.reliability_mode {
                ReliabilityMode::Linear if self.reliability_threshold <= 1.0 => {
                    return Err(KdError::InvalidParameter(format!(
                        "linear reliability threshold must exceed 1, got {}",
                        self.reliability_threshold
                    )));
                }
                ReliabilityMode::Exponential if self.reliability_threshold <= 0.0 => {
                    return Err(KdError::InvalidParameter(format!(
                        "exponential reliability threshold must be positive, got {}",
                        self.reliability_threshold
                    )));
                }
                _ => {}
            }
        }
        Ok(())
    }
}
