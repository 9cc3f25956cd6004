/// Scores of a classification, one per known class.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassificationResult {
    entries: Vec<(i32, f64)>,
    winner: Option<usize>,
}

impl ClassificationResult {
    /// Pair `scores[i]` with external class id `class_ids[i]`.
    pub(crate) fn new(class_ids: &[i32], scores: Vec<f64>) -> Self {
        debug_assert_eq!(class_ids.len(), scores.len());
        Self {
            entries: class_ids.iter().copied().zip(scores).collect(),
            winner: None,
        }
    }

    /// The `(class id, score)` pairs.
    pub fn entries(&self) -> &[(i32, f64)] {
        &self.entries
    }

    /// The number of classes.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether there are no classes at all.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The score of the class with external id `class_id`.
    pub fn score_of(&self, class_id: i32) -> Option<f64> {
        self.entries
            .iter()
            .find(|(id, _)| *id == class_id)
            .map(|(_, score)| *score)
    }

    /// The position of the winning entry.
    pub fn winner(&self) -> Option<usize> {
        self.winner
    }

    /// The external id of the winning class.
    pub fn winner_id(&self) -> Option<i32> {
        self.winner.map(|i| self.entries[i].0)
    }

    /// Make the entry with the highest score the winner. The first one wins ties.
    pub fn set_winner_at_max(&mut self) {
        let mut winner: Option<usize> = None;
        for (i, (_, score)) in self.entries.iter().enumerate() {
            if winner.map_or(true, |w| *score > self.entries[w].1) {
                winner = Some(i);
            }
        }
        self.winner = winner;
    }

    /// Clip negative scores to zero and scale the scores to sum to one.
    ///
    /// Scores that sum to zero are left as they are.
    pub fn make_prob_distribution(&mut self) {
        for (_, score) in self.entries.iter_mut() {
            if *score < 0.0 {
                *score = 0.0;
            }
        }
        let sum: f64 = self.entries.iter().map(|(_, score)| score).sum();
        if sum > 0.0 {
            for (_, score) in self.entries.iter_mut() {
                *score /= sum;
            }
        }
    }
}

/// A training point found by a classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointInfo<'a> {
    /// The stored feature vector.
    pub point: &'a [f64],
    /// External id of the point's class.
    pub class_id: i32,
    /// Id given to the point at training time.
    pub point_id: i32,
    /// Distance between the query and the point.
    pub distance: f64,
}
