//! Real-time capture → segment → display loop.

use std::ops::{Deref, DerefMut};
use std::time::{Duration, Instant};

use image::RgbImage;

use super::stop::StopSignal;
use crate::capture::CaptureSource;
use crate::composite::{composite, Background, Fit};
use crate::error::{Error, Result};
use crate::output::OutputSink;
use crate::segmentation::{Matte, Preprocessor, Segmenter};

/// What the display sink is shown for each frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DisplayMode {
    /// The foreground flattened onto the display background.
    #[default]
    Composite,
    /// The matte itself as a grayscale silhouette.
    Matte,
}

/// Configuration for the live pipeline.
#[derive(Debug, Clone)]
pub struct LiveConfig {
    /// Background shown behind the foreground.
    pub background: Background,

    /// How an image background is scaled to the frame.
    pub fit: Fit,

    pub display: DisplayMode,

    /// Upper bound on the loop rate. `None` runs as fast as segmentation allows.
    pub target_fps: Option<u32>,

    /// Stop after this many captured frames.
    pub max_frames: Option<u64>,

    /// Log timing statistics every N displayed frames. 0 disables.
    pub stats_interval: u64,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            background: Background::default(),
            fit: Fit::Stretch,
            display: DisplayMode::Composite,
            target_fps: Some(30),
            max_frames: None,
            stats_interval: 30,
        }
    }
}

impl LiveConfig {
    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any parameter is out of valid range.
    pub fn validate(&self) -> Result<()> {
        if self.target_fps == Some(0) {
            return Err(Error::invalid_parameter(
                "target_fps",
                "must be greater than 0",
            ));
        }

        if self.max_frames == Some(0) {
            return Err(Error::invalid_parameter(
                "max_frames",
                "must be greater than 0",
            ));
        }

        Ok(())
    }
}

/// Why a live session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LiveExit {
    /// The stop signal was raised.
    Stopped,
    /// `max_frames` frames were captured.
    FrameLimit,
    /// The source reported end of stream.
    EndOfStream,
    /// Capture failed; the session ended without crashing.
    DeviceLost(String),
}

/// Counters reported when a live session ends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiveSummary {
    pub frames_captured: u64,
    pub frames_displayed: u64,
    pub frames_skipped: u64,
    pub exit: LiveExit,
}

/// Releases the wrapped source exactly once, on whatever path leaves the loop.
struct SourceGuard<C: CaptureSource> {
    source: C,
}

impl<C: CaptureSource> Deref for SourceGuard<C> {
    type Target = C;

    fn deref(&self) -> &C {
        &self.source
    }
}

impl<C: CaptureSource> DerefMut for SourceGuard<C> {
    fn deref_mut(&mut self) -> &mut C {
        &mut self.source
    }
}

impl<C: CaptureSource> Drop for SourceGuard<C> {
    fn drop(&mut self) {
        if let Err(e) = self.source.release() {
            tracing::warn!("Failed to release frame source: {e}");
        }
    }
}

/// Display background rendered at the current frame size.
///
/// Re-rendered only when the frame size changes.
struct Backdrop<'a> {
    background: &'a Background,
    fit: Fit,
    rendered: Option<RgbImage>,
}

impl<'a> Backdrop<'a> {
    fn new(background: &'a Background, fit: Fit) -> Self {
        Self {
            background,
            fit,
            rendered: None,
        }
    }

    fn at_size(&mut self, width: u32, height: u32) -> &RgbImage {
        let stale = self
            .rendered
            .as_ref()
            .map_or(true, |img| img.dimensions() != (width, height));
        if stale {
            tracing::debug!("Rendering display background at {}x{}", width, height);
            self.rendered = None;
        }

        let (background, fit) = (self.background, self.fit);
        self.rendered
            .get_or_insert_with(|| background.render(width, height, fit))
    }
}

/// Accumulated stage time, each averaged over the frames that reached it.
#[derive(Default)]
struct Timings {
    capture: Duration,
    captured: u32,
    segment: Duration,
    segmented: u32,
    output: Duration,
    shown: u32,
}

impl Timings {
    fn record_capture(&mut self, elapsed: Duration) {
        self.capture += elapsed;
        self.captured += 1;
    }

    /// Failed segmentations count too: they still cost the frame budget.
    fn record_segment(&mut self, elapsed: Duration) {
        self.segment += elapsed;
        self.segmented += 1;
    }

    fn record_output(&mut self, elapsed: Duration) {
        self.output += elapsed;
        self.shown += 1;
    }

    /// Mean milliseconds per frame for capture, segment and output.
    fn averages(&self) -> (f64, f64, f64) {
        let mean = |total: Duration, count: u32| {
            if count == 0 {
                0.0
            } else {
                total.as_secs_f64() * 1000.0 / f64::from(count)
            }
        };
        (
            mean(self.capture, self.captured),
            mean(self.segment, self.segmented),
            mean(self.output, self.shown),
        )
    }

    fn log(&self, frames: u64) {
        let (capture_ms, segment_ms, output_ms) = self.averages();
        let total_ms = capture_ms + segment_ms + output_ms;

        tracing::info!(
            "Frame {}: capture={:.1}ms, segment={:.1}ms, output={:.1}ms, total={:.1}ms, fps={:.1}",
            frames,
            capture_ms,
            segment_ms,
            output_ms,
            total_ms,
            1000.0 / total_ms
        );
    }
}

/// Drives one live session at a time.
pub struct LivePipeline {
    segmenter: Segmenter,
    config: LiveConfig,
}

impl LivePipeline {
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(segmenter: Segmenter, config: LiveConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { segmenter, config })
    }

    /// Run a session until stopped, the source ends, or the device is lost.
    ///
    /// `open_source` is called once; the source it returns is released exactly
    /// once on every exit path. Frames that fail segmentation are skipped.
    ///
    /// # Errors
    ///
    /// [`Error::SourceUnavailable`] if the source cannot be opened (the loop is
    /// never entered), or the sink's error if a frame cannot be displayed.
    pub fn run<C, O, F>(
        &mut self,
        open_source: F,
        sink: &mut O,
        stop: &StopSignal,
    ) -> Result<LiveSummary>
    where
        C: CaptureSource,
        O: OutputSink,
        F: FnOnce() -> Result<C>,
    {
        let source = open_source().map_err(|e| match e {
            Error::SourceUnavailable { .. } => e,
            other => Error::SourceUnavailable {
                reason: other.to_string(),
            },
        })?;
        let mut source = SourceGuard { source };

        let (width, height) = source.resolution();
        let (out_width, out_height) = sink.resolution();
        tracing::info!(
            "Starting live loop: source {}x{}, display {}x{}, mode {:?}",
            width,
            height,
            out_width,
            out_height,
            self.config.display
        );

        let frame_duration = self
            .config
            .target_fps
            .map(|fps| Duration::from_secs_f64(1.0 / f64::from(fps)));
        let mut backdrop = Backdrop::new(&self.config.background, self.config.fit);
        let mut timings = Timings::default();
        let mut captured = 0u64;
        let mut displayed = 0u64;
        let mut skipped = 0u64;

        let exit = loop {
            if stop.is_stopped() {
                break LiveExit::Stopped;
            }
            if self.config.max_frames.is_some_and(|limit| captured >= limit) {
                break LiveExit::FrameLimit;
            }

            let loop_start = Instant::now();

            let frame = match source.capture_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break LiveExit::EndOfStream,
                Err(e) => {
                    tracing::warn!("Capture failed, ending session: {e}");
                    break LiveExit::DeviceLost(e.to_string());
                }
            };
            captured += 1;
            timings.record_capture(loop_start.elapsed());

            let segment_start = Instant::now();
            let segmented = self.segmenter.segment(&frame);
            drop(frame);
            timings.record_segment(segment_start.elapsed());

            match segmented {
                Ok(foreground) => {
                    let output_start = Instant::now();
                    let shown = match self.config.display {
                        DisplayMode::Composite => {
                            let (w, h) = foreground.dimensions();
                            composite(&foreground, backdrop.at_size(w, h))?
                        }
                        DisplayMode::Matte => {
                            Preprocessor::matte_to_rgb(&Matte::from_alpha(&foreground))
                        }
                    };
                    sink.write_frame(&shown)?;
                    timings.record_output(output_start.elapsed());
                    displayed += 1;

                    if self.config.stats_interval > 0 && displayed % self.config.stats_interval == 0
                    {
                        timings.log(displayed);
                    }
                }
                Err(e) => {
                    tracing::warn!("Skipping frame {}: {e}", captured);
                    skipped += 1;
                }
            }

            if let Some(frame_duration) = frame_duration {
                let elapsed = loop_start.elapsed();
                if elapsed < frame_duration {
                    std::thread::sleep(frame_duration - elapsed);
                }
            }
        };

        drop(source);

        let summary = LiveSummary {
            frames_captured: captured,
            frames_displayed: displayed,
            frames_skipped: skipped,
            exit,
        };
        tracing::info!(
            "Live session ended ({:?}): {} captured, {} displayed, {} skipped",
            summary.exit,
            summary.frames_captured,
            summary.frames_displayed,
            summary.frames_skipped
        );

        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(LiveConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_fps_rejected() {
        let config = LiveConfig {
            target_fps: Some(0),
            ..LiveConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(Error::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_backdrop_rerenders_on_size_change() {
        let background = Background::checkerboard(2);
        let mut backdrop = Backdrop::new(&background, Fit::Stretch);

        assert_eq!(backdrop.at_size(4, 4).dimensions(), (4, 4));
        assert_eq!(backdrop.at_size(4, 4).dimensions(), (4, 4));
        assert_eq!(backdrop.at_size(6, 2).dimensions(), (6, 2));
    }

    #[test]
    fn test_timings_average_each_stage_over_its_own_frames() {
        let mut timings = Timings::default();
        for _ in 0..4 {
            timings.record_capture(Duration::from_millis(2));
            timings.record_segment(Duration::from_millis(10));
        }
        // Two of the four frames failed segmentation and were never shown
        timings.record_output(Duration::from_millis(6));
        timings.record_output(Duration::from_millis(6));

        let (capture, segment, output) = timings.averages();
        assert!((capture - 2.0).abs() < 1e-9);
        assert!((segment - 10.0).abs() < 1e-9);
        assert!((output - 6.0).abs() < 1e-9);
    }

    #[test]
    fn test_timings_empty_stage_averages_zero() {
        assert_eq!(Timings::default().averages(), (0.0, 0.0, 0.0));
    }
}
