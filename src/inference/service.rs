//! The served model: checkpoint loaded once, then read-only predictions.

use std::path::{Path, PathBuf};
use std::time::Instant;

use burn::backend::ndarray::NdArrayDevice;
use burn::prelude::*;
use tracing::{debug, error, info, warn};

use crate::common::config::AppCfg;
use crate::common::error::{ServeCode, ServeError, ServeResult};
use crate::model::{checkpoint, InferenceBackend, Net, NetConfig};

use super::domain::{Feedback, Prediction, ServingComponent};
use super::preprocess::{self, ImageTensor};

/// Pre-trained classifier in inference-only mode.
///
/// A value only exists once its parameters are loaded; nothing mutates them
/// afterwards, so predictions depend on the request bytes alone.
#[derive(Debug)]
pub struct MnistModel {
    net: Net<InferenceBackend>,
    config: NetConfig,
    device: NdArrayDevice,
    checkpoint: PathBuf,
}

impl MnistModel {
    /// Load the checkpoint named by the process configuration
    /// (`MNIST_SERVE_CHECKPOINT`, `/storage/model.pkl` by default).
    pub fn new() -> ServeResult<Self> {
        Self::from_checkpoint(AppCfg::load().checkpoint_path)
    }

    /// Load the default architecture from `path`.
    pub fn from_checkpoint(path: impl AsRef<Path>) -> ServeResult<Self> {
        Self::load(path, NetConfig::new())
    }

    pub fn load(path: impl AsRef<Path>, config: NetConfig) -> ServeResult<Self> {
        let path = path.as_ref();
        let start = Instant::now();
        let device = NdArrayDevice::Cpu;
        info!(ev = "init", path = %path.display(), "initializing");

        match checkpoint::load_net::<InferenceBackend>(path, &config, &device) {
            Ok(net) => {
                info!(
                    ev = "init",
                    code = ServeCode::Ok as u32,
                    dur_ms = start.elapsed().as_millis() as u64,
                    "model ready"
                );
                Ok(Self {
                    net,
                    config,
                    device,
                    checkpoint: path.to_path_buf(),
                })
            }
            Err(err) => {
                error!(
                    ev = "init",
                    code = err.code() as u32,
                    dur_ms = start.elapsed().as_millis() as u64,
                    error = %err,
                    "model failed to load"
                );
                Err(err)
            }
        }
    }

    pub fn config(&self) -> &NetConfig {
        &self.config
    }

    pub fn checkpoint_path(&self) -> &Path {
        &self.checkpoint
    }

    /// Shape a decoded image must have, as `[channels, height, width]`.
    pub fn expected_input_shape(&self) -> [usize; 3] {
        self.config.input_shape()
    }

    /// Classify one encoded image.
    pub fn predict(
        &self,
        payload: &[u8],
        feature_names: Option<&[String]>,
    ) -> ServeResult<Prediction> {
        let start = Instant::now();
        debug!(ev = "predict", bytes = payload.len(), feature_names = ?feature_names);

        let result = self.classify(payload);
        let dur_ms = start.elapsed().as_millis() as u64;
        match &result {
            Ok(prediction) => info!(
                ev = "predict",
                code = ServeCode::Ok as u32,
                dur_ms,
                class = prediction.top_class(),
                "prediction served"
            ),
            Err(err) => warn!(
                ev = "predict",
                code = err.code() as u32,
                dur_ms,
                error = %err,
                "prediction rejected"
            ),
        }
        result
    }

    /// Accept a reward signal. Nothing is learned from it.
    pub fn send_feedback(&self, feedback: &Feedback<'_>) -> Vec<f32> {
        info!(
            ev = "send_feedback",
            code = ServeCode::Ok as u32,
            reward = feedback.reward,
            bytes = feedback.features.len(),
            feature_names = ?feedback.feature_names,
            has_truth = feedback.truth.is_some(),
            "send feedback called"
        );
        Vec::new()
    }

    fn classify(&self, payload: &[u8]) -> ServeResult<Prediction> {
        let image = preprocess::decode(payload)?;
        preprocess::ensure_size(&image, self.expected_input_shape())?;
        let input = preprocess::to_tensor(&image, self.config.in_channels)?;

        self.forward(input).map(Prediction::new)
    }

    fn forward(&self, input: ImageTensor) -> ServeResult<Vec<f32>> {
        let images = Tensor::<InferenceBackend, 3>::from_data(
            TensorData::new(input.data, input.shape),
            &self.device,
        )
        .unsqueeze::<4>();

        self.net
            .forward(images)
            .into_data()
            .to_vec::<f32>()
            .map_err(|err| ServeError::internal(format!("unreadable network output: {err:?}")))
    }
}

impl ServingComponent for MnistModel {
    fn predict(
        &self,
        payload: &[u8],
        feature_names: Option<&[String]>,
    ) -> ServeResult<Prediction> {
        MnistModel::predict(self, payload, feature_names)
    }

    fn send_feedback(&self, feedback: &Feedback<'_>) -> Vec<f32> {
        MnistModel::send_feedback(self, feedback)
    }
}
