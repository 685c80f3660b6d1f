//! Network definition and checkpoint loading.

pub mod checkpoint;
pub mod net;

pub use checkpoint::CheckpointFormat;
pub use net::{Net, NetConfig};

/// Backend used for serving. It has no autodiff, so networks built on it run
/// in inference-only mode.
pub type InferenceBackend = burn::backend::NdArray<f32>;
