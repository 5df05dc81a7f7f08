use crate::error::{Error, Result};
use image::{Rgb, RgbImage, RgbaImage};

/// Flatten `foreground` over `background` using the foreground's alpha.
///
/// Straight alpha-over per colour channel:
/// `out = round(fg * a + bg * (1 - a))` with `a = alpha / 255`.
/// No gamma handling and no feathering; alpha 0 and 255 reproduce the
/// background and foreground exactly.
///
/// # Errors
///
/// Returns [`Error::DimensionMismatch`] when the images differ in size.
/// Resizing the background is the caller's job.
pub fn composite(foreground: &RgbaImage, background: &RgbImage) -> Result<RgbImage> {
    let _span = tracing::debug_span!("composite").entered();

    if foreground.dimensions() != background.dimensions() {
        return Err(Error::DimensionMismatch {
            expected: foreground.dimensions(),
            actual: background.dimensions(),
        });
    }

    let (width, height) = foreground.dimensions();
    let mut out = RgbImage::new(width, height);

    for ((fg, bg), dst) in foreground
        .pixels()
        .zip(background.pixels())
        .zip(out.pixels_mut())
    {
        let a = f32::from(fg[3]) / 255.0;
        *dst = Rgb([
            blend_channel(fg[0], bg[0], a),
            blend_channel(fg[1], bg[1], a),
            blend_channel(fg[2], bg[2], a),
        ]);
    }

    Ok(out)
}

/// Blend one channel value; `alpha` is the foreground weight in [0, 1].
#[inline]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn blend_channel(fg: u8, bg: u8, alpha: f32) -> u8 {
    let alpha = alpha.clamp(0.0, 1.0);
    let value = f32::from(fg) * alpha + f32::from(bg) * (1.0 - alpha);
    value.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn gradient_rgba(width: u32, height: u32, alpha: u8) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x * 40) as u8, (y * 50) as u8, ((x + y) * 17) as u8, alpha])
        })
    }

    fn gradient_rgb(width: u32, height: u32) -> RgbImage {
        RgbImage::from_fn(width, height, |x, y| {
            Rgb([255 - (x * 30) as u8, (x * y * 9) as u8, 200 - (y * 20) as u8])
        })
    }

    #[test]
    fn test_blend_channel_hand_computed() {
        assert_eq!(blend_channel(200, 0, 0.5), 100);
        assert_eq!(blend_channel(100, 0, 0.5), 50);
        assert_eq!(blend_channel(50, 0, 0.5), 25);
        assert_eq!(blend_channel(0, 255, 0.25), 191);
    }

    #[test]
    fn test_blend_channel_clamps_alpha() {
        assert_eq!(blend_channel(10, 90, 2.0), 10);
        assert_eq!(blend_channel(10, 90, -1.0), 90);
    }

    #[test]
    fn test_half_alpha_pixel() {
        let fg = RgbaImage::from_pixel(1, 1, Rgba([200, 100, 50, 128]));
        let bg = RgbImage::from_pixel(1, 1, Rgb([0, 0, 0]));

        let out = composite(&fg, &bg).unwrap();
        assert_eq!(out.get_pixel(0, 0).0, [100, 50, 25]);
    }

    #[test]
    fn test_opaque_foreground_wins() {
        let fg = gradient_rgba(6, 5, 255);
        let bg = gradient_rgb(6, 5);

        let out = composite(&fg, &bg).unwrap();
        for (o, f) in out.pixels().zip(fg.pixels()) {
            assert_eq!(o.0, [f[0], f[1], f[2]]);
        }
    }

    #[test]
    fn test_transparent_foreground_shows_background() {
        let fg = gradient_rgba(6, 5, 0);
        let bg = gradient_rgb(6, 5);

        assert_eq!(composite(&fg, &bg).unwrap(), bg);
    }

    #[test]
    fn test_output_dimensions_match_inputs() {
        let fg = gradient_rgba(7, 3, 90);
        let bg = gradient_rgb(7, 3);

        assert_eq!(composite(&fg, &bg).unwrap().dimensions(), (7, 3));
    }

    #[test]
    fn test_dimension_mismatch_is_rejected() {
        let fg = gradient_rgba(4, 4, 255);
        for (w, h) in [(4, 5), (5, 4), (3, 3), (8, 8)] {
            let err = composite(&fg, &gradient_rgb(w, h)).unwrap_err();
            match err {
                Error::DimensionMismatch { expected, actual } => {
                    assert_eq!(expected, (4, 4));
                    assert_eq!(actual, (w, h));
                }
                other => panic!("expected DimensionMismatch, got {other:?}"),
            }
        }
    }
}
