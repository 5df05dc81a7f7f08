//! Still-image and live background removal pipelines.

mod live;
mod still;
mod stop;

pub use live::{DisplayMode, LiveConfig, LiveExit, LivePipeline, LiveSummary};
pub use still::{StillConfig, StillMode, StillPipeline};
pub use stop::StopSignal;
