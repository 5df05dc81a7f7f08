use super::types::Matte;
use crate::error::Result;
use image::{imageops, GrayImage, Luma, Rgb, RgbImage};
use ndarray::Array4;

/// ImageNet channel statistics expected by U2Net-family models
const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Preprocessor for converting RGB images to model input tensors
pub struct Preprocessor {
    target_width: u32,
    target_height: u32,
}

impl Preprocessor {
    pub fn new(target_width: u32, target_height: u32) -> Self {
        Self {
            target_width,
            target_height,
        }
    }

    /// Preprocess an RGB image into a normalized NCHW tensor
    ///
    /// Steps:
    /// 1. Resize to target dimensions
    /// 2. Scale by the brightest channel value so the frame spans [0, 1]
    /// 3. Standardize each channel with ImageNet mean/std
    /// 4. Transpose from HWC to NCHW format
    ///
    /// Returns: Array4<f32> with shape [1, 3, height, width]
    pub fn preprocess(&self, image: &RgbImage) -> Array4<f32> {
        let _span = tracing::debug_span!("preprocess").entered();

        let resized = if image.dimensions() != (self.target_width, self.target_height) {
            imageops::resize(
                image,
                self.target_width,
                self.target_height,
                imageops::FilterType::Lanczos3,
            )
        } else {
            image.clone()
        };

        let peak = resized
            .as_raw()
            .iter()
            .copied()
            .max()
            .map_or(1.0, |v| f32::from(v).max(1e-6));

        let (width, height) = resized.dimensions();
        let mut tensor = Array4::<f32>::zeros((1, 3, height as usize, width as usize));

        for (x, y, pixel) in resized.enumerate_pixels() {
            for c in 0..3 {
                let v = f32::from(pixel[c]) / peak;
                tensor[[0, c, y as usize, x as usize]] = (v - MEAN[c]) / STD[c];
            }
        }

        tensor
    }

    /// Postprocess a raw model prediction into a matte at frame resolution
    ///
    /// The prediction is min-max normalized to [0, 1], quantized to 8 bits and
    /// resized to `target_width` x `target_height`.
    pub fn postprocess_matte(
        prediction: &[f32],
        matte_width: u32,
        matte_height: u32,
        target_width: u32,
        target_height: u32,
    ) -> Result<Matte> {
        let _span = tracing::debug_span!("postprocess").entered();

        let (lo, hi) = prediction
            .iter()
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
                (lo.min(v), hi.max(v))
            });
        let range = hi - lo;

        let normalized: Vec<f32> = prediction
            .iter()
            .map(|&v| if range > f32::EPSILON { (v - lo) / range } else { 0.0 })
            .collect();

        let matte = Matte::new(matte_width, matte_height, normalized)?;
        if matte.dimensions() == (target_width, target_height) {
            return Ok(matte);
        }

        let gray = Self::matte_to_gray(&matte);
        let resized = imageops::resize(
            &gray,
            target_width,
            target_height,
            imageops::FilterType::Lanczos3,
        );

        let values = resized.pixels().map(|p| f32::from(p[0]) / 255.0).collect();
        Matte::new(target_width, target_height, values)
    }

    fn matte_to_gray(matte: &Matte) -> GrayImage {
        let (width, height) = matte.dimensions();
        GrayImage::from_fn(width, height, |x, y| Luma([quantize(matte.get(x, y))]))
    }

    /// Convert matte to grayscale RGB image for visualization
    pub fn matte_to_rgb(matte: &Matte) -> RgbImage {
        let (width, height) = matte.dimensions();
        RgbImage::from_fn(width, height, |x, y| {
            let value = quantize(matte.get(x, y));
            Rgb([value, value, value])
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn quantize(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tensor_shape() {
        let img = RgbImage::new(100, 60);
        let tensor = Preprocessor::new(32, 32).preprocess(&img);
        assert_eq!(tensor.shape(), &[1, 3, 32, 32]);
    }

    #[test]
    fn test_white_frame_normalization() {
        let img = RgbImage::from_pixel(8, 8, Rgb([255, 255, 255]));
        let tensor = Preprocessor::new(8, 8).preprocess(&img);

        for c in 0..3 {
            let expected = (1.0 - MEAN[c]) / STD[c];
            assert!((tensor[[0, c, 4, 4]] - expected).abs() < 1e-4);
        }
    }

    #[test]
    fn test_postprocess_min_max_normalizes() {
        let matte = Preprocessor::postprocess_matte(&[2.0, 4.0, 6.0, 4.0], 2, 2, 2, 2).unwrap();
        assert_eq!(matte.values(), &[0.0, 0.5, 1.0, 0.5]);
    }

    #[test]
    fn test_postprocess_flat_prediction_is_background() {
        let matte = Preprocessor::postprocess_matte(&[3.0; 4], 2, 2, 2, 2).unwrap();
        assert!(matte.values().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_postprocess_resizes_to_frame() {
        let prediction = vec![0.0, 1.0, 0.0, 1.0];
        let matte = Preprocessor::postprocess_matte(&prediction, 2, 2, 40, 30).unwrap();
        assert_eq!(matte.dimensions(), (40, 30));
    }

    #[test]
    fn test_matte_to_rgb() {
        let rgb = Preprocessor::matte_to_rgb(&Matte::filled(2, 2, 1.0));
        assert!(rgb.pixels().all(|p| p.0 == [255, 255, 255]));
    }
}
