use std::collections::BTreeMap;

#[cfg(feature = "rayon")]
use rayon::iter::{IntoParallelRefIterator, ParallelIterator};
use tracing::{debug, warn};

use crate::error::{KdError, Result};
use crate::kdtree::{KdTree, Neighbor};
use crate::knn::params::KnnParams;
use crate::knn::result::{ClassificationResult, PointInfo};

/// Payload stored with every training point: internal class id and point id.
type Payload = (usize, i32);

/// How the classifier has been trained so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Training {
    Empty,
    Batch,
    Incremental,
}

/// A k-nearest-neighbor classifier backed by a [`KdTree`].
///
/// Training comes in two flavors that must not be mixed: [`train`](Self::train) replaces
/// everything the classifier knows with one labelled batch, while
/// [`train_object`](Self::train_object) and [`train_object_id`](Self::train_object_id) add one
/// object at a time and require a final [`build`](Self::build). Calling an object method after a
/// batch fails with [`KdError::MixedTraining`]; calling [`train`](Self::train) after object
/// training discards the objects.
///
/// Class ids given by the caller ("external" ids) are mapped to dense internal ids in the order
/// they are first seen. Results always report external ids.
///
/// ```
/// use kd_knn::knn::{KnnClassifier, KnnParams};
///
/// let mut knn = KnnClassifier::new(KnnParams::default()).unwrap();
/// let features = [[-1.0, -1.0], [1.0, 1.0], [-1.0, 1.0], [1.0, -1.0]];
/// knn.train(&features, &[0, 0, 1, 1]).unwrap();
///
/// let result = knn.classify(&[-0.9, -0.9]).unwrap();
/// assert_eq!(result.winner_id(), Some(0));
/// ```
#[derive(Debug, Clone)]
pub struct KnnClassifier {
    params: KnnParams,
    tree: KdTree<f64, Payload>,
    /// External to internal class id.
    id_map: BTreeMap<i32, usize>,
    /// Internal to external class id.
    class_ids: Vec<i32>,
    /// Number of training points per internal class id.
    class_sizes: Vec<usize>,
    min_points_per_class: usize,
    max_points_per_class: usize,
    training: Training,
}

impl KnnClassifier {
    /// Create an untrained classifier.
    pub fn new(params: KnnParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            tree: KdTree::new(),
            id_map: BTreeMap::new(),
            class_ids: Vec::new(),
            class_sizes: Vec::new(),
            min_points_per_class: 0,
            max_points_per_class: 0,
            training: Training::Empty,
        })
    }

    /// The parameters of this classifier.
    pub fn params(&self) -> &KnnParams {
        &self.params
    }

    /// Replace the parameters. Affects later classifications and builds.
    pub fn set_params(&mut self, params: KnnParams) -> Result<()> {
        params.validate()?;
        self.params = params;
        Ok(())
    }

    /// The tree holding the training points.
    pub fn tree(&self) -> &KdTree<f64, Payload> {
        &self.tree
    }

    /// The number of known classes.
    pub fn num_classes(&self) -> usize {
        self.class_ids.len()
    }

    /// The external id of an internal class id.
    pub fn class_id_of(&self, internal: usize) -> Option<i32> {
        self.class_ids.get(internal).copied()
    }

    /// The internal id of an external class id.
    pub fn internal_id_of(&self, class_id: i32) -> Option<usize> {
        self.id_map.get(&class_id).copied()
    }

    /// The smallest and largest number of training points of a class, as of the last build.
    pub fn points_per_class(&self) -> (usize, usize) {
        (self.min_points_per_class, self.max_points_per_class)
    }

    /// Forget every class and training point.
    pub fn clear(&mut self) {
        self.tree.clear();
        self.id_map.clear();
        self.class_ids.clear();
        self.class_sizes.clear();
        self.min_points_per_class = 0;
        self.max_points_per_class = 0;
        self.training = Training::Empty;
    }

    /// Train with one labelled batch. Row `i` of `features` belongs to class `ids[i]` and gets
    /// point id `i`.
    ///
    /// Everything learned before is discarded, including objects added with
    /// [`train_object`](Self::train_object). Fails without changing anything if the inputs do not
    /// line up.
    pub fn train<R: AsRef<[f64]>>(&mut self, features: &[R], ids: &[i32]) -> Result<()> {
        let point_ids: Vec<i32> = (0..features.len() as i32).collect();
        self.train_with_point_ids(features, ids, &point_ids)
    }

    /// [`train`](Self::train) with explicit point ids.
    pub fn train_with_point_ids<R: AsRef<[f64]>>(
        &mut self,
        features: &[R],
        ids: &[i32],
        point_ids: &[i32],
    ) -> Result<()> {
        check_len("class ids", features.len(), ids.len())?;
        check_len("point ids", features.len(), point_ids.len())?;
        check_rows(features, 0)?;

        if self.training == Training::Incremental {
            warn!(
                classes = self.num_classes(),
                "batch training discards objects trained one at a time"
            );
        }
        self.clear();

        for &id in ids {
            if !self.id_map.contains_key(&id) {
                self.id_map.insert(id, self.class_ids.len());
                self.class_ids.push(id);
            }
        }
        self.class_sizes = vec![0; self.class_ids.len()];

        for ((row, id), &point_id) in features.iter().zip(ids).zip(point_ids) {
            let internal = self.id_map[id];
            self.tree.add(row.as_ref().to_vec(), (internal, point_id))?;
            self.class_sizes[internal] += 1;
        }

        debug!(
            points = features.len(),
            classes = self.num_classes(),
            "trained knn classifier"
        );
        self.training = Training::Batch;
        self.build()
    }

    /// Add all rows of `features` as a new class and return its external id, one more than the
    /// largest id in use (zero for the first class). Point ids are the row indices.
    ///
    /// The object is only searchable after [`build`](Self::build).
    pub fn train_object<R: AsRef<[f64]>>(&mut self, features: &[R]) -> Result<i32> {
        let point_ids: Vec<i32> = (0..features.len() as i32).collect();
        self.train_object_with_point_ids(features, &point_ids)
    }

    /// [`train_object`](Self::train_object) with explicit point ids.
    pub fn train_object_with_point_ids<R: AsRef<[f64]>>(
        &mut self,
        features: &[R],
        point_ids: &[i32],
    ) -> Result<i32> {
        if self.training == Training::Batch {
            return Err(KdError::MixedTraining);
        }
        let id = match self.id_map.last_key_value() {
            Some((&largest, _)) => largest.checked_add(1).ok_or_else(|| {
                KdError::InvalidParameter("no class id left after i32::MAX".to_string())
            })?,
            None => 0,
        };
        self.train_object_id_with_point_ids(features, id, point_ids)?;
        Ok(id)
    }

    /// Add all rows of `features` to the class with external id `id`, creating the class if it is
    /// new. Point ids are the row indices.
    ///
    /// The object is only searchable after [`build`](Self::build).
    pub fn train_object_id<R: AsRef<[f64]>>(&mut self, features: &[R], id: i32) -> Result<()> {
        let point_ids: Vec<i32> = (0..features.len() as i32).collect();
        self.train_object_id_with_point_ids(features, id, &point_ids)
    }

    /// [`train_object_id`](Self::train_object_id) with explicit point ids.
    pub fn train_object_id_with_point_ids<R: AsRef<[f64]>>(
        &mut self,
        features: &[R],
        id: i32,
        point_ids: &[i32],
    ) -> Result<()> {
        if self.training == Training::Batch {
            return Err(KdError::MixedTraining);
        }
        check_len("point ids", features.len(), point_ids.len())?;
        check_rows(features, self.tree.dimensions())?;

        let internal = match self.id_map.get(&id) {
            Some(&internal) => internal,
            None => {
                let internal = self.class_ids.len();
                self.id_map.insert(id, internal);
                self.class_ids.push(id);
                self.class_sizes.push(0);
                internal
            }
        };

        for (row, &point_id) in features.iter().zip(point_ids) {
            self.tree.add(row.as_ref().to_vec(), (internal, point_id))?;
        }
        self.class_sizes[internal] += features.len();
        self.training = Training::Incremental;
        Ok(())
    }

    /// Make every trained point searchable and refresh the class statistics.
    pub fn build(&mut self) -> Result<()> {
        self.tree.rebuild(self.params.bucket_size)?;
        self.min_points_per_class = self.class_sizes.iter().copied().min().unwrap_or(0);
        self.max_points_per_class = self.class_sizes.iter().copied().max().unwrap_or(0);

        debug!(
            points = self.tree.size(),
            classes = self.num_classes(),
            leaves = self.tree.num_leaves(),
            levels = self.tree.levels(),
            "built knn classifier"
        );
        Ok(())
    }

    /// Classify one feature vector.
    pub fn classify(&self, feature: &[f64]) -> Result<ClassificationResult> {
        self.classify_with_points(feature).map(|(result, _)| result)
    }

    /// Classify one feature vector and also report the training points that were consulted,
    /// closest first.
    ///
    /// With reliability weighting enabled this includes the extra neighbors searched to find a
    /// point of another class.
    pub fn classify_with_points(
        &self,
        feature: &[f64],
    ) -> Result<(ClassificationResult, Vec<PointInfo<'_>>)> {
        let mut scores = self.empty_scores()?;
        let neighbors = self.vote(feature, &mut scores)?;
        let points = neighbors.iter().map(|n| self.point_info(n)).collect();
        Ok((self.finish(scores), points))
    }

    /// Classify an object made of several feature vectors by letting all of them vote together.
    pub fn classify_object<R: AsRef<[f64]>>(&self, features: &[R]) -> Result<ClassificationResult> {
        let mut scores = self.empty_scores()?;
        for row in features {
            self.vote(row.as_ref(), &mut scores)?;
        }
        Ok(self.finish(scores))
    }

    /// The raw vote scores of every row of `features`, indexed by internal class id.
    pub fn classify_rows<R: AsRef<[f64]> + Sync>(&self, features: &[R]) -> Result<Vec<Vec<f64>>> {
        self.empty_scores()?;

        let row_scores = |row: &R| -> Result<Vec<f64>> {
            let mut scores = vec![0.0; self.num_classes()];
            self.vote(row.as_ref(), &mut scores)?;
            Ok(scores)
        };

        #[cfg(feature = "rayon")]
        let rows = features.par_iter().map(row_scores).collect();

        #[cfg(not(feature = "rayon"))]
        let rows = features.iter().map(row_scores).collect();

        rows
    }

    /// The training point closest to `feature`, with its Euclidean distance.
    pub fn nearest(&self, feature: &[f64]) -> Result<PointInfo<'_>> {
        let neighbor = self.tree.search_nearest(feature).ok_or(KdError::NotTrained)?;
        let mut info = self.point_info(&neighbor);
        info.distance = info.distance.sqrt();
        Ok(info)
    }

    fn empty_scores(&self) -> Result<Vec<f64>> {
        if self.tree.is_empty() || self.class_ids.is_empty() {
            return Err(KdError::NotTrained);
        }
        Ok(vec![0.0; self.num_classes()])
    }

    /// Add the votes of the neighbors of `feature` to `scores` and return the neighbors searched.
    fn vote(&self, feature: &[f64], scores: &mut [f64]) -> Result<Vec<Neighbor<'_, f64, Payload>>> {
        let params = &self.params;
        let k = params.k.min(self.tree.size());

        if !params.use_reliability_measure {
            let neighbors = self.search(k, feature)?;
            for n in &neighbors {
                let class = n.data().0;
                scores[class] += self.vote_weight(class);
            }
            return Ok(neighbors);
        }

        // Search beyond k to find the closest point of a class other than the winner's.
        let extended = (self.max_points_per_class + 1)
            .min(params.max_unreliable_neighborhood)
            .max(params.k)
            .min(self.tree.size());
        let neighbors = self.search(extended, feature)?;
        let Some(first) = neighbors.first() else {
            return Ok(neighbors);
        };

        let winner_class = first.data().0;
        let winner_distance = first.distance;
        let next_other = neighbors
            .iter()
            .skip(1)
            .find(|n| n.data().0 != winner_class)
            .map(|n| n.distance);

        let reliability = match next_other {
            Some(other) if winner_distance > 0.0 => params
                .reliability_mode
                .weight(other / winner_distance, params.reliability_threshold),
            _ => 1.0,
        };

        for n in neighbors.iter().take(k) {
            let class = n.data().0;
            scores[class] += self.vote_weight(class) * reliability;
        }
        Ok(neighbors)
    }

    fn search(&self, k: usize, feature: &[f64]) -> Result<Vec<Neighbor<'_, f64, Payload>>> {
        if self.params.best_bin_first {
            self.tree.search_best_bin_first(k, feature, self.params.e_max)
        } else {
            self.tree.search_k_nearest(k, feature)
        }
    }

    fn vote_weight(&self, class: usize) -> f64 {
        if !self.params.normalize_data {
            return 1.0;
        }
        match self.class_sizes[class] {
            0 => 0.0,
            n => 1.0 / n as f64,
        }
    }

    fn finish(&self, scores: Vec<f64>) -> ClassificationResult {
        let mut result = ClassificationResult::new(&self.class_ids, scores);
        result.set_winner_at_max();
        if self.params.normalize_output {
            result.make_prob_distribution();
        }
        result
    }

    fn point_info<'a>(&self, neighbor: &Neighbor<'a, f64, Payload>) -> PointInfo<'a> {
        let (internal, point_id) = *neighbor.data();
        PointInfo {
            point: neighbor.point(),
            class_id: self.class_ids[internal],
            point_id,
            distance: neighbor.distance,
        }
    }
}

fn check_len(what: &'static str, expected: usize, found: usize) -> Result<()> {
    if expected != found {
        return Err(KdError::SizeMismatch {
            what,
            expected,
            found,
        });
    }
    Ok(())
}

/// Check that `features` is a non-empty set of rows of equal, non-zero length. `dimensions` of
/// zero accepts any length for the first row.
fn check_rows<R: AsRef<[f64]>>(features: &[R], dimensions: usize) -> Result<()> {
    let Some(first) = features.first() else {
        return Err(KdError::NoData);
    };
    let expected = match dimensions {
        0 => first.as_ref().len(),
        d => d,
    };
    for row in features {
        let found = row.as_ref().len();
        if found == 0 {
            return Err(KdError::EmptyPoint);
        }
        if found != expected {
            return Err(KdError::DimensionMismatch { expected, found });
        }
    }
    Ok(())
}
