//! Request and response types exchanged with the hosting runtime.

use crate::common::error::ServeResult;

/// Class scores for a single image.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    /// Log probability per class, indexed by class id.
    pub scores: Vec<f32>,
}

impl Prediction {
    pub fn new(scores: Vec<f32>) -> Self {
        Self { scores }
    }

    pub fn num_classes(&self) -> usize {
        self.scores.len()
    }

    /// Index of the highest score. `None` when there are no scores.
    pub fn top_class(&self) -> Option<usize> {
        self.scores
            .iter()
            .enumerate()
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
            .map(|(idx, _)| idx)
    }

    /// Scores as a batch of one, the `[1, num_classes]` layout of the network output.
    pub fn to_batch(&self) -> Vec<Vec<f32>> {
        vec![self.scores.clone()]
    }
}

/// Reward signal sent back by the runtime for an earlier request.
#[derive(Clone, Copy, Debug, Default)]
pub struct Feedback<'a> {
    /// Payload of the original predict request.
    pub features: &'a [u8],
    pub feature_names: Option<&'a [String]>,
    pub reward: f64,
    pub truth: Option<&'a [f32]>,
}

/// Operations a hosting runtime invokes on a loaded model.
pub trait ServingComponent {
    fn predict(&self, payload: &[u8], feature_names: Option<&[String]>)
        -> ServeResult<Prediction>;

    fn send_feedback(&self, feedback: &Feedback<'_>) -> Vec<f32>;
}
