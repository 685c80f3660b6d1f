//! Serving adapter for a pre-trained MNIST digit classifier.
//!
//! [`MnistModel`] loads a checkpoint once, then turns encoded image bytes into
//! per-class log probabilities. Hosts use it directly through
//! [`ServingComponent`], through the C ABI in [`api::ffi`], or through the
//! `mnist-serve` binary.
pub mod api;
pub mod common;
pub mod inference;
pub mod model;

#[cfg(test)]
pub(crate) mod test_utils;

pub use common::{AppCfg, ServeCode, ServeError, ServeResult};
pub use inference::{Feedback, MnistModel, Prediction, ServingComponent};
pub use model::{InferenceBackend, Net, NetConfig};
