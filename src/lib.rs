//! # cutout
//!
//! Background removal and replacement for still images and live camera feeds.
//!
//! A segmentation model scores every pixel as foreground or background; the
//! resulting matte becomes an alpha channel that is either kept (extraction)
//! or used to flatten the foreground onto a new background (replacement).
//!
//! ## Example
//!
//! ```no_run
//! use cutout::{create_default_model, Segmenter, StillConfig, StillPipeline};
//!
//! # fn main() -> cutout::Result<()> {
//! let model = create_default_model("u2net.onnx")?;
//! let mut pipeline = StillPipeline::new(Segmenter::new(model), StillConfig::default())?;
//!
//! pipeline.replace_background("portrait.jpg", "beach.jpg", "portrait-beach.png")?;
//! # Ok(())
//! # }
//! ```

pub mod capture;
pub mod composite;
pub mod error;
pub mod io;
pub mod output;
pub mod pipeline;
pub mod segmentation;

pub use composite::{composite, Background, Fit};
pub use error::{Error, Result};
pub use pipeline::{
    DisplayMode, LiveConfig, LiveExit, LivePipeline, LiveSummary, StillConfig, StillMode,
    StillPipeline, StopSignal,
};
pub use segmentation::{create_default_model, Matte, SegmentationModel, Segmenter};
