//! Image normalisation: raw upload bytes → engine-ready tensor.
//!
//! The engine's receptive geometry is fixed, so every input — photo, scan,
//! rendered PDF page — is decoded to 3-channel colour, resized to the exact
//! square target with a smooth filter, and normalised per channel so that
//! all tensors share the same statistical distribution regardless of source
//! characteristics. No I/O happens here.

use crate::config::{ServiceConfig, IMAGENET_MEAN, IMAGENET_STD};
use crate::engine::{Device, PixelTensor, Precision};
use crate::error::OcrError;
use image::imageops::FilterType;
use ndarray::Array4;

/// Everything `normalize` needs, captured once per request.
#[derive(Debug, Clone)]
pub struct NormalizeOptions {
    pub target_size: u32,
    pub mean: [f32; 3],
    pub std: [f32; 3],
    pub precision: Precision,
}

impl NormalizeOptions {
    /// Derive options from the service config and the device the engine
    /// landed on.
    pub fn from_config(config: &ServiceConfig, device: Device) -> Self {
        Self {
            target_size: config.target_size,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            precision: device.precision(),
        }
    }
}

/// Decode `bytes` and produce the `[1, 3, S, S]` tensor the engine expects.
///
/// Fails with [`OcrError::Decode`] on malformed or unsupported image bytes.
/// `resize_exact` with Catmull-Rom (bicubic-class) interpolation: the model
/// requires exact dimensions, and a smooth filter keeps small glyphs legible
/// after downscaling.
pub fn normalize(bytes: &[u8], opts: &NormalizeOptions) -> Result<PixelTensor, OcrError> {
    let decoded = image::load_from_memory(bytes).map_err(|e| OcrError::Decode {
        detail: e.to_string(),
    })?;

    let size = opts.target_size;
    let rgb = decoded
        .resize_exact(size, size, FilterType::CatmullRom)
        .to_rgb8();

    let (width, height) = rgb.dimensions();
    let plane = (width * height) as usize;
    let mut data = vec![0.0f32; 3 * plane];

    // (px / 255 − mean) / std per channel, planar CHW layout.
    for (x, y, pixel) in rgb.enumerate_pixels() {
        let idx = (y * width + x) as usize;
        for c in 0..3 {
            data[c * plane + idx] = (pixel[c] as f32 / 255.0 - opts.mean[c]) / opts.std[c];
        }
    }

    let data = Array4::from_shape_vec((1, 3, height as usize, width as usize), data)
        .map_err(|e| OcrError::Internal(format!("tensor shape: {e}")))?;

    Ok(PixelTensor {
        data,
        precision: opts.precision,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::io::Cursor;

    fn png_bytes(width: u32, height: u32, colour: [u8; 3]) -> Vec<u8> {
        let img = RgbImage::from_pixel(width, height, Rgb(colour));
        let mut buf = Vec::new();
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
            .unwrap();
        buf
    }

    fn opts(size: u32) -> NormalizeOptions {
        NormalizeOptions {
            target_size: size,
            mean: IMAGENET_MEAN,
            std: IMAGENET_STD,
            precision: Precision::Full,
        }
    }

    #[test]
    fn output_shape_is_fixed_regardless_of_input_size() {
        for (w, h) in [(10, 10), (640, 480), (31, 977)] {
            let tensor = normalize(&png_bytes(w, h, [8, 120, 250]), &opts(448)).unwrap();
            assert_eq!(tensor.shape(), [1, 3, 448, 448]);
        }
    }

    #[test]
    fn channels_are_normalised_with_imagenet_statistics() {
        // A uniform mid-grey image: every position in channel c must equal
        // (128/255 − mean[c]) / std[c].
        let tensor = normalize(&png_bytes(16, 16, [128, 128, 128]), &opts(32)).unwrap();
        for c in 0..3 {
            let expected = (128.0 / 255.0 - IMAGENET_MEAN[c]) / IMAGENET_STD[c];
            let got = tensor.data[[0, c, 7, 7]];
            assert!(
                (got - expected).abs() < 1e-5,
                "channel {c}: got {got}, expected {expected}"
            );
        }
    }

    #[test]
    fn malformed_bytes_fail_with_decode_error() {
        let err = normalize(b"definitely not an image", &opts(448)).unwrap_err();
        assert!(matches!(err, OcrError::Decode { .. }));
    }
}
