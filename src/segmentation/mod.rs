//! Foreground segmentation behind a stable contract.
//!
//! Backends implement [`SegmentationModel`] and only produce a [`Matte`].
//! [`Segmenter`] is what the pipelines call: it validates the input, checks
//! that the backend honoured the frame size, and appends the matte as an
//! alpha channel.

mod preprocess;
mod u2net;
pub mod types;

pub use preprocess::Preprocessor;
pub use types::{Matte, SegmentationModel};
pub use u2net::U2Net;

use crate::error::{Error, Result};
use image::{RgbImage, RgbaImage};
use std::path::Path;

/// Create a default segmentation model (U2Net)
pub fn create_default_model<P: AsRef<Path>>(model_path: P) -> Result<Box<dyn SegmentationModel>> {
    let model = U2Net::new(model_path)?;
    Ok(Box::new(model))
}

/// Adapter turning a colour image into an image with a foreground alpha channel.
pub struct Segmenter {
    model: Box<dyn SegmentationModel>,
}

impl Segmenter {
    pub fn new(model: Box<dyn SegmentationModel>) -> Self {
        Self { model }
    }

    /// Segment `image`, returning it with the matte appended as alpha.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Segmentation`] for an empty image, a backend failure,
    /// or a matte whose size differs from the input.
    pub fn segment(&mut self, image: &RgbImage) -> Result<RgbaImage> {
        let (width, height) = image.dimensions();
        if width == 0 || height == 0 {
            return Err(Error::segmentation(format!(
                "cannot segment an empty {width}x{height} image"
            )));
        }

        let matte = self.model.segment(image)?;
        if matte.dimensions() != (width, height) {
            let (mw, mh) = matte.dimensions();
            return Err(Error::segmentation(format!(
                "model returned a {mw}x{mh} matte for a {width}x{height} image"
            )));
        }

        Ok(matte.attach_to(image))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    struct Fixed {
        value: f32,
        size: Option<(u32, u32)>,
    }

    impl SegmentationModel for Fixed {
        fn segment(&mut self, frame: &RgbImage) -> Result<Matte> {
            let (w, h) = self.size.unwrap_or_else(|| frame.dimensions());
            Ok(Matte::filled(w, h, self.value))
        }
    }

    struct Broken;

    impl SegmentationModel for Broken {
        fn segment(&mut self, _frame: &RgbImage) -> Result<Matte> {
            Err(Error::segmentation("model exploded"))
        }
    }

    #[test]
    fn test_segment_appends_alpha() {
        let mut segmenter = Segmenter::new(Box::new(Fixed {
            value: 1.0,
            size: None,
        }));
        let image = RgbImage::from_pixel(5, 3, Rgb([1, 2, 3]));

        let out = segmenter.segment(&image).unwrap();
        assert_eq!(out.dimensions(), (5, 3));
        assert!(out.pixels().all(|p| p.0 == [1, 2, 3, 255]));
    }

    #[test]
    fn test_empty_image_is_segmentation_failure() {
        let mut segmenter = Segmenter::new(Box::new(Fixed {
            value: 1.0,
            size: None,
        }));
        let err = segmenter.segment(&RgbImage::new(0, 7)).unwrap_err();
        assert!(matches!(err, Error::Segmentation { .. }));
    }

    #[test]
    fn test_wrong_matte_size_is_segmentation_failure() {
        let mut segmenter = Segmenter::new(Box::new(Fixed {
            value: 1.0,
            size: Some((2, 2)),
        }));
        let err = segmenter.segment(&RgbImage::new(3, 3)).unwrap_err();
        assert!(matches!(err, Error::Segmentation { .. }));
    }

    #[test]
    fn test_backend_error_propagates() {
        let mut segmenter = Segmenter::new(Box::new(Broken));
        let err = segmenter.segment(&RgbImage::new(3, 3)).unwrap_err();
        assert!(err.to_string().contains("model exploded"));
    }
}
