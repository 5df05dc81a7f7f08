use crate::error::{Error, Result};
use crate::io::load_image;
use image::{imageops, Rgb, RgbImage};

/// How an image background is scaled onto a frame of a different size.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Fit {
    /// Scale to the exact frame size, ignoring aspect ratio.
    #[default]
    Stretch,
    /// Scale preserving aspect ratio until the frame is covered, then centre-crop.
    Cover,
}

/// A replacement or display background.
#[derive(Debug, Clone)]
pub enum Background {
    Solid(Rgb<u8>),
    Checkerboard {
        cell: u32,
        light: Rgb<u8>,
        dark: Rgb<u8>,
    },
    Image(RgbImage),
}

impl Default for Background {
    fn default() -> Self {
        Self::checkerboard(16)
    }
}

impl Background {
    /// Grey checkerboard, the usual "transparent" look.
    pub fn checkerboard(cell: u32) -> Self {
        Self::Checkerboard {
            cell: cell.max(1),
            light: Rgb([204, 204, 204]),
            dark: Rgb([153, 153, 153]),
        }
    }

    /// Parse a background description.
    ///
    /// Accepts `checker`, `checker:<cell>`, `#rrggbb`, or a path to an image file.
    pub fn parse(desc: &str) -> Result<Self> {
        let desc = desc.trim();

        if desc == "checker" {
            return Ok(Self::default());
        }
        if let Some(cell) = desc.strip_prefix("checker:") {
            let cell: u32 = cell.parse().map_err(|_| {
                Error::invalid_parameter("background", format!("bad checker cell size {cell:?}"))
            })?;
            if cell == 0 {
                return Err(Error::invalid_parameter(
                    "background",
                    "checker cell size must be greater than 0",
                ));
            }
            return Ok(Self::checkerboard(cell));
        }
        if let Some(hex) = desc.strip_prefix('#') {
            return parse_hex(hex).map(Self::Solid);
        }

        load_image(desc).map(Self::Image)
    }

    /// Render this background at exactly `width` x `height`.
    pub fn render(&self, width: u32, height: u32, fit: Fit) -> RgbImage {
        let _span = tracing::debug_span!("render_background", width, height).entered();

        match self {
            Self::Solid(color) => RgbImage::from_pixel(width, height, *color),
            Self::Checkerboard { cell, light, dark } => {
                let cell = (*cell).max(1);
                RgbImage::from_fn(width, height, |x, y| {
                    if (x / cell + y / cell) % 2 == 0 {
                        *light
                    } else {
                        *dark
                    }
                })
            }
            Self::Image(image) => fit_image(image, width, height, fit),
        }
    }
}

fn fit_image(image: &RgbImage, width: u32, height: u32, fit: Fit) -> RgbImage {
    if image.dimensions() == (width, height) {
        return image.clone();
    }
    if image.width() == 0 || image.height() == 0 {
        return RgbImage::new(width, height);
    }

    match fit {
        Fit::Stretch => imageops::resize(image, width, height, imageops::FilterType::Lanczos3),
        Fit::Cover => {
            let (src_w, src_h) = image.dimensions();
            let scale = f64::max(
                f64::from(width) / f64::from(src_w),
                f64::from(height) / f64::from(src_h),
            );
            let scaled_w = scaled_len(src_w, scale).max(width);
            let scaled_h = scaled_len(src_h, scale).max(height);

            let scaled = imageops::resize(image, scaled_w, scaled_h, imageops::FilterType::Lanczos3);
            let x = (scaled_w - width) / 2;
            let y = (scaled_h - height) / 2;
            imageops::crop_imm(&scaled, x, y, width, height).to_image()
        }
    }
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn scaled_len(len: u32, scale: f64) -> u32 {
    (f64::from(len) * scale).ceil() as u32
}

fn parse_hex(hex: &str) -> Result<Rgb<u8>> {
    let bad = || Error::invalid_parameter("background", format!("bad colour #{hex}"));
    if hex.len() != 6 || !hex.is_ascii() {
        return Err(bad());
    }

    let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| bad());
    Ok(Rgb([channel(0)?, channel(2)?, channel(4)?]))
}
