//! Heatmap compositing onto the source image.

use image::{imageops::FilterType, DynamicImage, Rgb, RgbImage};

use histolens_core::Cam;

use crate::colormap::jet;

/// Blend weight of the heatmap over the original image.
pub const DEFAULT_ALPHA: f32 = 0.4;

/// Composite a normalized CAM onto the original image.
///
/// The original is resized (bilinear) to the CAM's resolution, each CAM value
/// is mapped through the jet gradient, and the two are alpha-blended as
/// `(1 - alpha) * original + alpha * heatmap` with channels clamped to
/// `[0, 255]` and rounded. The output resolution always equals the CAM's,
/// regardless of the input image's native size.
#[must_use]
pub fn overlay(cam: &Cam, original: &DynamicImage, alpha: f32) -> RgbImage {
    let width = cam.width() as u32;
    let height = cam.height() as u32;
    let base = original
        .resize_exact(width, height, FilterType::Triangle)
        .to_rgb8();

    let mut out = RgbImage::new(width, height);
    for y in 0..height {
        for x in 0..width {
            let heat = jet(cam.value(x as usize, y as usize));
            let src = base.get_pixel(x, y);
            let mut blended = [0u8; 3];
            for c in 0..3 {
                let value = (1.0 - alpha) * f32::from(src[c]) + alpha * f32::from(heat[c]);
                blended[c] = value.clamp(0.0, 255.0).round() as u8;
            }
            out.put_pixel(x, y, Rgb(blended));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_cam(side: usize) -> Cam {
        let n = side * side;
        let data: Vec<f32> = (0..n).map(|i| i as f32 / (n - 1) as f32).collect();
        Cam::new(side, side, data).unwrap()
    }

    #[test]
    fn test_output_resolution_matches_cam() {
        let cam = Cam::zeros(224, 224);

        let tiny = DynamicImage::ImageRgb8(RgbImage::from_pixel(50, 50, Rgb([90, 90, 90])));
        let out = overlay(&cam, &tiny, DEFAULT_ALPHA);
        assert_eq!((out.width(), out.height()), (224, 224));

        let huge = DynamicImage::ImageRgb8(RgbImage::from_pixel(4000, 3000, Rgb([90, 90, 90])));
        let out = overlay(&cam, &huge, DEFAULT_ALPHA);
        assert_eq!((out.width(), out.height()), (224, 224));
    }

    #[test]
    fn test_blend_formula_on_known_pixels() {
        // Flat CAM at 0: heat color is jet(0) = (0, 0, 128).
        let cam = Cam::zeros(2, 2);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([100, 100, 100])));
        let out = overlay(&cam, &img, 0.4);

        let px = out.get_pixel(0, 0);
        let heat = jet(0.0);
        for c in 0..3 {
            let expected = (0.6 * 100.0 + 0.4 * f32::from(heat[c])).round() as u8;
            assert_eq!(px[c], expected);
        }
    }

    #[test]
    fn test_alpha_zero_reproduces_original() {
        let cam = ramp_cam(4);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(4, 4, Rgb([37, 121, 250])));
        let out = overlay(&cam, &img, 0.0);
        for px in out.pixels() {
            assert_eq!(px.0, [37, 121, 250]);
        }
    }

    #[test]
    fn test_alpha_one_is_pure_heatmap() {
        let cam = ramp_cam(3);
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(3, 3, Rgb([200, 10, 60])));
        let out = overlay(&cam, &img, 1.0);
        for (x, y, px) in out.enumerate_pixels() {
            assert_eq!(px.0, jet(cam.value(x as usize, y as usize)));
        }
    }
}
