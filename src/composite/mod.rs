//! Alpha compositing and the backgrounds it flattens onto.

mod alpha;
mod background;

pub use alpha::{blend_channel, composite};
pub use background::{Background, Fit};
