//! Inference wrapper exposed to the hosting runtime.

pub mod domain;
pub mod preprocess;
pub mod service;

pub use domain::{Feedback, Prediction, ServingComponent};
pub use service::MnistModel;
