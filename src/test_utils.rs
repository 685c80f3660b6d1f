use std::io::{self, Cursor, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use burn::prelude::*;
use burn::record::{FullPrecisionSettings, NamedMpkFileRecorder};
use image::{DynamicImage, GrayImage, ImageFormat, Luma, Rgb, RgbImage};
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::EnvFilter;

use crate::common::log;
use crate::model::{InferenceBackend, NetConfig};

/// Committed test data, regenerated by `testdata/export_weights.py`.
pub(crate) fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("testdata").join(name)
}

/// Architecture of the `testdata/small_net*.pkl` state dicts.
pub(crate) fn small_config() -> NetConfig {
    NetConfig::new().with_image_size(6).with_hidden_size(8)
}

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<'a> MakeWriter<'a> for Captured {
    type Writer = Captured;

    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Run `f` with the JSON log subscriber writing into a buffer; return the log text.
pub(crate) fn capture_logs<R>(f: impl FnOnce() -> R) -> (R, String) {
    let captured = Captured::default();
    let subscriber = log::subscriber(EnvFilter::new("debug"), captured.clone());
    let result = tracing::subscriber::with_default(subscriber, f);
    let text = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
    (result, text)
}

/// Write a freshly initialized network into `dir` and return the checkpoint path.
pub(crate) fn write_checkpoint(dir: &Path, config: &NetConfig) -> PathBuf {
    let stem = dir.join("model");
    config
        .init::<InferenceBackend>(&Default::default())
        .save_file(stem.clone(), &NamedMpkFileRecorder::<FullPrecisionSettings>::new())
        .unwrap();
    stem.with_extension("mpk")
}

/// PNG-encoded grayscale image with a deterministic pattern.
pub(crate) fn gray_png(width: u32, height: u32, seed: u8) -> Vec<u8> {
    let image = GrayImage::from_fn(width, height, |x, y| {
        Luma([((x * 7 + y * 13) as u8).wrapping_add(seed)])
    });
    encode(DynamicImage::ImageLuma8(image))
}

/// PNG-encoded RGB image with a deterministic pattern.
pub(crate) fn rgb_png(width: u32, height: u32) -> Vec<u8> {
    let image = RgbImage::from_fn(width, height, |x, y| {
        Rgb([(x * 9) as u8, (y * 9) as u8, ((x + y) * 4) as u8])
    });
    encode(DynamicImage::ImageRgb8(image))
}

fn encode(image: DynamicImage) -> Vec<u8> {
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}
