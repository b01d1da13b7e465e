//! Image-to-tensor preprocessing.

use burn::prelude::*;
use image::{imageops::FilterType, DynamicImage};

use histolens_core::{INPUT_SIZE, NORMALIZE_MEAN, NORMALIZE_STD};

/// The deterministic inference-time transform.
///
/// Converts any RGB-convertible image to a normalized `(1, 3, H, W)` float
/// tensor: non-aspect-preserving bilinear resize to the network input size,
/// pixel scaling to `[0, 1]`, then per-channel standardization with fixed
/// ImageNet statistics. A pure function of the input image; the augmented
/// training-time variant does not exist in this workspace.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    size: usize,
    mean: [f32; 3],
    std: [f32; 3],
}

impl Default for Preprocessor {
    fn default() -> Self {
        Self {
            size: INPUT_SIZE,
            mean: NORMALIZE_MEAN,
            std: NORMALIZE_STD,
        }
    }
}

impl Preprocessor {
    /// Create a preprocessor with the standard input size and statistics.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the square input size (used by reduced test fixtures).
    #[must_use]
    pub fn with_size(mut self, size: usize) -> Self {
        self.size = size;
        self
    }

    /// Side length of the produced tensor's spatial dimensions.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Transform an image into a `(1, 3, size, size)` normalized tensor.
    pub fn process<B: Backend>(&self, image: &DynamicImage, device: &B::Device) -> Tensor<B, 4> {
        let side = self.size;
        let resized = image
            .resize_exact(side as u32, side as u32, FilterType::Triangle)
            .to_rgb8();

        let plane = side * side;
        let mut buffer = vec![0.0f32; 3 * plane];
        for (x, y, pixel) in resized.enumerate_pixels() {
            let idx = y as usize * side + x as usize;
            for c in 0..3 {
                let value = f32::from(pixel[c]) / 255.0;
                buffer[c * plane + idx] = (value - self.mean[c]) / self.std[c];
            }
        }

        Tensor::<B, 1>::from_floats(buffer.as_slice(), device).reshape([1, 3, side, side])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use image::RgbImage;

    type TestBackend = NdArray;

    #[test]
    fn test_output_shape() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 70, image::Rgb([0, 0, 0])));
        let device = Default::default();
        let tensor = Preprocessor::new().process::<TestBackend>(&img, &device);
        assert_eq!(tensor.dims(), [1, 3, 224, 224]);
    }

    #[test]
    fn test_uniform_gray_normalization() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(
            16,
            16,
            image::Rgb([128, 128, 128]),
        ));
        let device = Default::default();
        let tensor = Preprocessor::new()
            .with_size(8)
            .process::<TestBackend>(&img, &device);

        let values: Vec<f32> = tensor.into_data().to_vec().unwrap();
        let plane = 8 * 8;
        for c in 0..3 {
            let expected = (128.0 / 255.0 - NORMALIZE_MEAN[c]) / NORMALIZE_STD[c];
            for &v in &values[c * plane..(c + 1) * plane] {
                assert!(
                    (v - expected).abs() < 1e-5,
                    "channel {c}: got {v}, expected {expected}"
                );
            }
        }
    }

    #[test]
    fn test_deterministic() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(30, 20, |x, y| {
            image::Rgb([(x * 7 % 256) as u8, (y * 11 % 256) as u8, ((x + y) % 256) as u8])
        }));
        let device = Default::default();
        let pre = Preprocessor::new().with_size(16);

        let a: Vec<f32> = pre
            .process::<TestBackend>(&img, &device)
            .into_data()
            .to_vec()
            .unwrap();
        let b: Vec<f32> = pre
            .process::<TestBackend>(&img, &device)
            .into_data()
            .to_vec()
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_grayscale_input_converted() {
        let gray = image::GrayImage::from_pixel(12, 12, image::Luma([200]));
        let img = DynamicImage::ImageLuma8(gray);
        let device = Default::default();
        let tensor = Preprocessor::new()
            .with_size(4)
            .process::<TestBackend>(&img, &device);
        assert_eq!(tensor.dims(), [1, 3, 4, 4]);
    }
}
