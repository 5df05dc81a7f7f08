use crate::error::{Error, Result};
use image::{Rgba, RgbImage, RgbaImage};

/// Alpha matte: grayscale values where 0.0 = background, 1.0 = foreground
/// Dimensions match the input frame dimensions
#[derive(Debug, Clone, PartialEq)]
pub struct Matte {
    width: u32,
    height: u32,
    values: Vec<f32>,
}

impl Matte {
    /// Build a matte from row-major values.
    ///
    /// Values are clamped to [0, 1]; NaN is treated as background.
    pub fn new(width: u32, height: u32, values: Vec<f32>) -> Result<Self> {
        let expected = width as usize * height as usize;
        if values.len() != expected {
            return Err(Error::segmentation(format!(
                "matte has {} values, expected {} for {}x{}",
                values.len(),
                expected,
                width,
                height
            )));
        }

        let values = values
            .into_iter()
            .map(|v| if v.is_nan() { 0.0 } else { v.clamp(0.0, 1.0) })
            .collect();

        Ok(Self {
            width,
            height,
            values,
        })
    }

    /// A matte with the same value at every pixel.
    pub fn filled(width: u32, height: u32, value: f32) -> Self {
        let value = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
        Self {
            width,
            height,
            values: vec![value; width as usize * height as usize],
        }
    }

    /// Recover the matte stored in an image's alpha channel.
    pub fn from_alpha(image: &RgbaImage) -> Self {
        let (width, height) = image.dimensions();
        Self {
            width,
            height,
            values: image.pixels().map(|p| f32::from(p[3]) / 255.0).collect(),
        }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.values[(y * self.width + x) as usize]
    }

    /// Append this matte to `frame` as its alpha channel.
    ///
    /// Colour channels are copied unchanged. Caller guarantees equal dimensions.
    pub fn attach_to(&self, frame: &RgbImage) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let rgb = frame.get_pixel(x, y);
            Rgba([rgb[0], rgb[1], rgb[2], to_alpha_byte(self.get(x, y))])
        })
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn to_alpha_byte(value: f32) -> u8 {
    (value * 255.0).round().clamp(0.0, 255.0) as u8
}

/// Trait for segmentation models
/// Allows swapping between different backends (U2Net, test stubs, remote services)
///
/// Backends are stateless from the caller's view: each call sees one frame.
pub trait SegmentationModel {
    /// Process a frame and return an alpha matte
    ///
    /// # Arguments
    /// * `frame` - Input RGB frame
    ///
    /// # Returns
    /// * Alpha matte with values 0.0-1.0, same dimensions as `frame`
    fn segment(&mut self, frame: &RgbImage) -> Result<Matte>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        let err = Matte::new(2, 2, vec![0.5; 3]).unwrap_err();
        assert!(matches!(err, Error::Segmentation { .. }));
    }

    #[test]
    fn test_new_clamps_values() {
        let matte = Matte::new(2, 1, vec![-0.2, 1.4]).unwrap();
        assert_eq!(matte.values(), &[0.0, 1.0]);
    }

    #[test]
    fn test_nan_becomes_background() {
        let matte = Matte::new(1, 1, vec![f32::NAN]).unwrap();
        assert_eq!(matte.get(0, 0), 0.0);
    }

    #[test]
    fn test_attach_keeps_colour_and_sets_alpha() {
        let frame = RgbImage::from_pixel(3, 2, image::Rgb([10, 20, 30]));
        let rgba = Matte::filled(3, 2, 0.5).attach_to(&frame);

        assert_eq!(rgba.dimensions(), (3, 2));
        for p in rgba.pixels() {
            assert_eq!(p.0, [10, 20, 30, 128]);
        }
    }

    #[test]
    fn test_alpha_round_trip_at_boundaries() {
        let frame = RgbImage::new(2, 2);
        let matte = Matte::new(2, 2, vec![0.0, 1.0, 1.0, 0.0]).unwrap();
        let recovered = Matte::from_alpha(&matte.attach_to(&frame));
        assert_eq!(recovered, matte);
    }
}
