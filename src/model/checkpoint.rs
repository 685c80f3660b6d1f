//! Filesystem loader for trained network parameters.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::Path;

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder};
use burn_import::pytorch::{LoadArgs, PyTorchFileRecorder};

use crate::common::error::{ServeError, ServeResult};

use super::net::{Net, NetConfig, NetRecord};

/// On-disk encoding of a checkpoint, picked from the file extension.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CheckpointFormat {
    /// Named MessagePack record written by `burn` (`.mpk`).
    Burn,
    /// Pickled PyTorch `state_dict` (`.pkl`, `.pt`, `.pth`, ...).
    PyTorch,
}

impl CheckpointFormat {
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("mpk") => CheckpointFormat::Burn,
            _ => CheckpointFormat::PyTorch,
        }
    }
}

/// Build the network described by `config` and fill it from the checkpoint at `path`.
///
/// Parameters are mapped onto `device` whatever device they were saved from.
pub fn load_net<B: Backend>(
    path: &Path,
    config: &NetConfig,
    device: &B::Device,
) -> ServeResult<Net<B>> {
    if !path.is_file() {
        return Err(ServeError::CheckpointMissing {
            path: path.to_path_buf(),
        });
    }

    let record = read_record::<B>(path, device)?;
    let net = config.init::<B>(device);
    net.check_record(&record)
        .map_err(|reason| ServeError::incompatible(path, reason))?;

    Ok(net.load_record(record))
}

fn read_record<B: Backend>(path: &Path, device: &B::Device) -> ServeResult<NetRecord<B>> {
    // Record decoders can panic on malformed tensors instead of returning an error.
    let record = panic::catch_unwind(AssertUnwindSafe(|| decode_record::<B>(path, device)))
        .map_err(|payload| ServeError::incompatible(path, panic_reason(payload)))?;

    record.map_err(|err| ServeError::incompatible(path, err.to_string()))
}

fn decode_record<B: Backend>(
    path: &Path,
    device: &B::Device,
) -> Result<NetRecord<B>, burn::record::RecorderError> {
    match CheckpointFormat::from_path(path) {
        CheckpointFormat::Burn => Recorder::<B>::load(
            &NamedMpkFileRecorder::<FullPrecisionSettings>::new(),
            path.to_path_buf(),
            device,
        ),
        CheckpointFormat::PyTorch => Recorder::<B>::load(
            &PyTorchFileRecorder::<FullPrecisionSettings>::default(),
            LoadArgs::new(path.to_path_buf()),
            device,
        ),
    }
}

fn panic_reason(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(msg) => *msg,
        Err(payload) => payload
            .downcast_ref::<&str>()
            .map(|msg| (*msg).to_owned())
            .unwrap_or_else(|| "checkpoint decoder panicked".to_owned()),
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::*;
    use crate::common::ServeCode;
    use crate::inference::MnistModel;
    use crate::model::InferenceBackend;
    use crate::test_utils;

    #[test]
    fn format_follows_extension() {
        assert_eq!(
            CheckpointFormat::from_path(Path::new("/storage/model.pkl")),
            CheckpointFormat::PyTorch
        );
        assert_eq!(
            CheckpointFormat::from_path(Path::new("model.pth")),
            CheckpointFormat::PyTorch
        );
        assert_eq!(
            CheckpointFormat::from_path(Path::new("model.MPK")),
            CheckpointFormat::Burn
        );
        assert_eq!(
            CheckpointFormat::from_path(Path::new("model")),
            CheckpointFormat::PyTorch
        );
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.pkl");

        let err = load_net::<InferenceBackend>(&path, &NetConfig::new(), &Default::default())
            .unwrap_err();
        assert_eq!(err.code(), ServeCode::CheckpointMissing);
    }

    #[test]
    fn directory_is_not_a_checkpoint() {
        let dir = tempfile::tempdir().unwrap();

        let err = load_net::<InferenceBackend>(dir.path(), &NetConfig::new(), &Default::default())
            .unwrap_err();
        assert_eq!(err.code(), ServeCode::CheckpointMissing);
    }

    #[test]
    fn garbage_file_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.mpk");
        fs::write(&path, b"definitely not a checkpoint").unwrap();

        let err = load_net::<InferenceBackend>(&path, &NetConfig::new(), &Default::default())
            .unwrap_err();
        assert_eq!(err.code(), ServeCode::CheckpointIncompatible);
    }

    #[test]
    fn foreign_architecture_is_incompatible() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_utils::write_checkpoint(dir.path(), &NetConfig::new().with_hidden_size(64));

        let err = load_net::<InferenceBackend>(&path, &NetConfig::new(), &Default::default())
            .unwrap_err();
        assert_eq!(err.code(), ServeCode::CheckpointIncompatible);
        assert!(err.to_string().contains("fc1.weight"), "{err}");
    }

    #[test]
    fn saved_network_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = test_utils::write_checkpoint(dir.path(), &NetConfig::new());

        let net = load_net::<InferenceBackend>(&path, &NetConfig::new(), &Default::default());
        assert!(net.is_ok());
    }

    #[test]
    fn pytorch_state_dict_serves_predictions() {
        let path = test_utils::fixture("small_net.pkl");
        let model = MnistModel::load(&path, test_utils::small_config()).unwrap();

        let prediction = model.predict(&test_utils::gray_png(6, 6, 0), None).unwrap();
        assert_eq!(prediction.num_classes(), 10);
        assert!(prediction.scores.iter().all(|s| s.is_finite()));

        let expected: Vec<f64> = serde_json::from_str(
            &fs::read_to_string(test_utils::fixture("small_net_expected.json")).unwrap(),
        )
        .unwrap();
        for (class, (got, want)) in prediction.scores.iter().zip(&expected).enumerate() {
            assert!(
                (f64::from(*got) - want).abs() < 1e-4,
                "class {class}: got {got}, want {want}"
            );
        }
    }

    #[test]
    fn pytorch_state_dict_with_wrong_fc1_shape_is_incompatible() {
        let path = test_utils::fixture("small_net_bad_fc1.pkl");

        let err =
            load_net::<InferenceBackend>(&path, &test_utils::small_config(), &Default::default())
                .unwrap_err();
        assert_eq!(err.code(), ServeCode::CheckpointIncompatible);
        assert!(err.to_string().contains("fc1.weight"), "{err}");
    }

    #[test]
    fn pytorch_state_dict_missing_a_tensor_is_incompatible() {
        let path = test_utils::fixture("small_net_no_fc2.pkl");

        let err =
            load_net::<InferenceBackend>(&path, &test_utils::small_config(), &Default::default())
                .unwrap_err();
        assert_eq!(err.code(), ServeCode::CheckpointIncompatible);
    }
}
