use super::CaptureSource;
use crate::error::{Error, Result};
use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

pub struct WebcamCapture {
    camera: Camera,
    width: u32,
    height: u32,
}

impl WebcamCapture {
    /// Open camera `device_index` and start streaming.
    ///
    /// The camera picks the closest supported resolution to `width` x `height`;
    /// [`CaptureSource::resolution`] reports what was actually negotiated.
    pub fn new(device_index: u32, width: u32, height: u32) -> Result<Self> {
        tracing::info!(
            "Initializing webcam {} at {}x{}",
            device_index,
            width,
            height
        );

        let unavailable = |reason: String| Error::SourceUnavailable { reason };

        let index = CameraIndex::Index(device_index);
        let requested = RequestedFormat::new::<RgbFormat>(
            RequestedFormatType::HighestResolution(Resolution::new(width, height)),
        );

        let mut camera = Camera::new(index, requested)
            .map_err(|e| unavailable(format!("failed to open camera {device_index}: {e}")))?;

        camera
            .open_stream()
            .map_err(|e| unavailable(format!("failed to open camera stream: {e}")))?;

        let negotiated = camera.resolution();
        tracing::info!(
            "Webcam initialized at {}x{}",
            negotiated.width(),
            negotiated.height()
        );

        Ok(Self {
            camera,
            width: negotiated.width(),
            height: negotiated.height(),
        })
    }
}

impl CaptureSource for WebcamCapture {
    fn capture_frame(&mut self) -> Result<Option<RgbImage>> {
        let frame = self.camera.frame().map_err(|e| Error::Capture {
            reason: format!("failed to capture frame: {e}"),
        })?;

        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| Error::Capture {
                reason: format!("failed to decode frame: {e}"),
            })?;

        Ok(Some(decoded))
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn release(&mut self) -> Result<()> {
        tracing::info!("Releasing webcam");
        self.camera.stop_stream().map_err(|e| Error::Capture {
            reason: format!("failed to stop camera stream: {e}"),
        })
    }
}
