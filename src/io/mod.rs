//! Image file loading and saving.

mod load;
mod save;

pub use load::load_image;
pub use save::{save_rgb, save_rgba};

/// Default JPEG quality for flattened output.
pub const DEFAULT_JPEG_QUALITY: u8 = 95;
