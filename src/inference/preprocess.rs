//! Conversion of encoded image payloads into network input.

use image::DynamicImage;

use crate::common::error::{ServeError, ServeResult};

/// Channel-major `[channels, height, width]` pixel data scaled to `[0, 1]`.
#[derive(Clone, Debug, PartialEq)]
pub struct ImageTensor {
    pub data: Vec<f32>,
    pub shape: [usize; 3],
}

/// Decode raw bytes in any format the `image` crate recognises.
pub fn decode(bytes: &[u8]) -> ServeResult<DynamicImage> {
    Ok(image::load_from_memory(bytes)?)
}

/// Reject images whose height or width differ from `expected` before any
/// pixel conversion happens. The channel count is reported as expected since
/// [`to_tensor`] converts colour spaces.
pub fn ensure_size(image: &DynamicImage, expected: [usize; 3]) -> ServeResult<()> {
    let actual = [expected[0], image.height() as usize, image.width() as usize];
    if actual != expected {
        return Err(ServeError::InputShape { expected, actual });
    }
    Ok(())
}

/// Convert `image` to `channels` planes: 1 uses luminance, 3 uses RGB.
pub fn to_tensor(image: &DynamicImage, channels: usize) -> ServeResult<ImageTensor> {
    let shape = [channels, image.height() as usize, image.width() as usize];
    let data = match channels {
        1 => image.to_luma32f().into_raw(),
        3 => planar(&image.to_rgb32f().into_raw(), 3),
        other => {
            return Err(ServeError::invalid(format!(
                "networks with {other} input channels are not supported"
            )))
        }
    };

    Ok(ImageTensor { data, shape })
}

fn planar(interleaved: &[f32], channels: usize) -> Vec<f32> {
    let pixels = interleaved.len() / channels;
    let mut out = vec![0.0; interleaved.len()];
    for (idx, pixel) in interleaved.chunks_exact(channels).enumerate() {
        for (channel, value) in pixel.iter().enumerate() {
            out[channel * pixels + idx] = *value;
        }
    }
    out
}
