use super::preprocess::Preprocessor;
use super::types::{Matte, SegmentationModel};
use crate::error::{Error, Result};
use image::RgbImage;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Tensor;
use std::path::Path;

/// Native input resolution of the U2Net salient-object models
const INPUT_SIZE: u32 = 320;

/// U2Net salient-object segmentation model
///
/// Stateless: every frame is segmented independently.
pub struct U2Net {
    session: Session,
    preprocessor: Preprocessor,
}

impl U2Net {
    /// Create a new U2Net model from an ONNX file
    ///
    /// # Arguments
    /// * `model_path` - Path to the ONNX model file (`u2net.onnx`, `u2netp.onnx`, ...)
    pub fn new<P: AsRef<Path>>(model_path: P) -> Result<Self> {
        let path = model_path.as_ref();
        let load_err = |reason: String| Error::ModelLoad {
            path: path.to_path_buf(),
            reason,
        };

        tracing::info!("Loading U2Net model from {}", path.display());

        let session = Session::builder()
            .map_err(|e| load_err(e.to_string()))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| load_err(e.to_string()))?
            .with_intra_threads(4)
            .map_err(|e| load_err(e.to_string()))?
            .commit_from_file(path)
            .map_err(|e| load_err(e.to_string()))?;

        tracing::info!("U2Net model loaded successfully");

        Ok(Self {
            session,
            preprocessor: Preprocessor::new(INPUT_SIZE, INPUT_SIZE),
        })
    }
}

impl SegmentationModel for U2Net {
    fn segment(&mut self, frame: &RgbImage) -> Result<Matte> {
        let _span = tracing::debug_span!("u2net_segment").entered();

        let input = self.preprocessor.preprocess(frame);
        let input = Tensor::from_array(input).map_err(|e| Error::segmentation(e.to_string()))?;

        let _infer_span = tracing::debug_span!("inference").entered();
        let outputs = self
            .session
            .run(ort::inputs![input])
            .map_err(|e| Error::segmentation(format!("inference failed: {e}")))?;
        drop(_infer_span);

        // First output is the fused saliency map, shape [1, 1, H, W]
        let (shape, prediction) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| Error::segmentation(e.to_string()))?;

        let dims: Vec<i64> = shape.iter().copied().collect();
        let (matte_width, matte_height) = matte_dims(&dims)?;

        // Only channel 0 of the first batch item is the matte
        let plane = matte_width as usize * matte_height as usize;
        let prediction = prediction
            .get(..plane)
            .ok_or_else(|| Error::segmentation("model output shorter than its shape"))?;

        let (frame_width, frame_height) = frame.dimensions();
        Preprocessor::postprocess_matte(
            prediction,
            matte_width,
            matte_height,
            frame_width,
            frame_height,
        )
    }
}

/// Width and height of the matte plane from the trailing `[.., H, W]` output dims.
fn matte_dims(dims: &[i64]) -> Result<(u32, u32)> {
    let bad_shape = || Error::segmentation(format!("unexpected output shape {dims:?}"));
    let [.., h, w] = dims else {
        return Err(bad_shape());
    };
    let height = u32::try_from(*h).map_err(|_| bad_shape())?;
    let width = u32::try_from(*w).map_err(|_| bad_shape())?;
    if width == 0 || height == 0 {
        return Err(bad_shape());
    }
    Ok((width, height))
}
