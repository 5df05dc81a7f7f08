mod v4l_capture;

pub use v4l_capture::WebcamCapture;

use crate::error::Result;
use image::RgbImage;

/// Trait for camera capture sources
pub trait CaptureSource {
    /// Capture a single frame, blocking until one is available
    ///
    /// Returns `Ok(None)` at end of stream and an error on device loss.
    fn capture_frame(&mut self) -> Result<Option<RgbImage>>;

    /// Get the resolution of captured frames
    fn resolution(&self) -> (u32, u32);

    /// Give the device back. Called once when the live session ends.
    fn release(&mut self) -> Result<()> {
        Ok(())
    }
}
