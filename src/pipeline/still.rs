//! Single-image background removal and replacement.

use std::path::{Path, PathBuf};

use image::{RgbImage, RgbaImage};

use crate::composite::{composite, Background, Fit};
use crate::error::{Error, Result};
use crate::io::{load_image, save_rgb, save_rgba, DEFAULT_JPEG_QUALITY};
use crate::segmentation::Segmenter;

/// Configuration for the still-image pipeline.
#[derive(Debug, Clone)]
pub struct StillConfig {
    /// How a replacement background is scaled to the input's size.
    pub fit: Fit,

    /// Output JPEG quality (1-100) for flattened output.
    pub jpeg_quality: u8,
}

impl Default for StillConfig {
    fn default() -> Self {
        Self {
            fit: Fit::Stretch,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }
}

impl StillConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::invalid_parameter(
                "jpeg_quality",
                "must be between 1 and 100",
            ));
        }

        Ok(())
    }
}

/// What to do with the segmented image.
#[derive(Debug, Clone)]
pub enum StillMode {
    /// Keep the cut-out with its alpha channel.
    Extract,
    /// Flatten onto an in-memory background.
    Replace(Background),
    /// Flatten onto a background image loaded after segmentation.
    ReplaceFile(PathBuf),
}

/// Load, segment, optionally flatten, then save one image.
pub struct StillPipeline {
    segmenter: Segmenter,
    config: StillConfig,
}

impl StillPipeline {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(segmenter: Segmenter, config: StillConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { segmenter, config })
    }

    /// Remove the background, keeping transparency.
    pub fn remove_background<P, Q>(&mut self, input: P, output: Q) -> Result<PathBuf>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        self.run(input, &StillMode::Extract, output)
    }

    /// Replace the background with the image at `background`, stretched or
    /// cropped to the input's size per [`StillConfig::fit`].
    pub fn replace_background<P, B, Q>(&mut self, input: P, background: B, output: Q) -> Result<PathBuf>
    where
        P: AsRef<Path>,
        B: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let mode = StillMode::ReplaceFile(background.as_ref().to_path_buf());
        self.run(input, &mode, output)
    }

    /// Run the pipeline end to end and return the path actually written.
    ///
    /// Nothing is written unless every earlier step succeeded.
    ///
    /// # Errors
    ///
    /// [`Error::Load`] for an unreadable input or background,
    /// [`Error::Segmentation`] if the model fails,
    /// [`Error::DimensionMismatch`] if the background could not be matched to the input,
    /// [`Error::Persist`] if the output cannot be written.
    pub fn run<P, Q>(&mut self, input: P, mode: &StillMode, output: Q) -> Result<PathBuf>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let input = input.as_ref();
        let output = output.as_ref();
        let _span = tracing::info_span!("still", input = %input.display()).entered();

        let image = load_image(input)?;
        let (width, height) = image.dimensions();
        tracing::debug!("Loaded {}x{} input", width, height);

        let foreground = self.segmenter.segment(&image)?;
        drop(image);
        tracing::debug!("Segmentation complete");

        let written = match mode {
            StillMode::Extract => save_rgba(&foreground, output)?,
            StillMode::Replace(background) => {
                let flat = self.flatten(&foreground, background)?;
                save_rgb(&flat, output, self.config.jpeg_quality)?
            }
            StillMode::ReplaceFile(path) => {
                let background = Background::Image(load_image(path)?);
                let flat = self.flatten(&foreground, &background)?;
                save_rgb(&flat, output, self.config.jpeg_quality)?
            }
        };

        tracing::info!("Output saved at: {}", written.display());
        Ok(written)
    }

    fn flatten(&self, foreground: &RgbaImage, background: &Background) -> Result<RgbImage> {
        let (width, height) = foreground.dimensions();
        let backdrop = background.render(width, height, self.config.fit);
        composite(foreground, &backdrop)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(StillConfig::default().validate().is_ok());
    }

    #[test]
    fn test_quality_out_of_range() {
        for quality in [0, 101] {
            let config = StillConfig {
                jpeg_quality: quality,
                ..StillConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(Error::InvalidParameter { .. })
            ));
        }
    }
}
