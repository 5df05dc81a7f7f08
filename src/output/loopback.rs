use super::OutputSink;
use crate::error::{Error, Result};
use image::RgbImage;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use v4l::video::Output;
use v4l::{Device, FourCC, Format};

pub struct V4L2Output {
    // Held open so the negotiated format stays in effect
    _device: Device,
    file: File,
    width: u32,
    height: u32,
}

impl V4L2Output {
    pub fn new<P: AsRef<Path>>(device_path: P, width: u32, height: u32) -> Result<Self> {
        let path = device_path.as_ref();
        tracing::info!(
            "Opening v4l2loopback device at {} ({}x{})",
            path.display(),
            width,
            height
        );

        let display_err = |reason: String| Error::Display { reason };
        check_frame_size(width, height)?;

        let device = Device::with_path(path).map_err(|e| {
            display_err(format!(
                "failed to open v4l2loopback device at {}: {e}",
                path.display()
            ))
        })?;

        let format = Format::new(width, height, FourCC::new(b"YUYV"));
        let applied = Output::set_format(&device, &format)
            .map_err(|e| display_err(format!("failed to set output format: {e}")))?;
        tracing::debug!("v4l2loopback format: {}", applied);
        check_frame_size(applied.width, applied.height)?;

        // v4l2loopback accepts raw frame data written to the device file
        let file = File::options().write(true).open(path).map_err(|e| {
            display_err(format!(
                "failed to open v4l2loopback device at {} for writing: {e}",
                path.display()
            ))
        })?;

        tracing::info!("v4l2loopback device opened successfully");

        Ok(Self {
            _device: device,
            file,
            width: applied.width,
            height: applied.height,
        })
    }

    /// Convert RGB frame to YUV422 (YUYV) format
    /// v4l2loopback typically expects YUYV format
    ///
    /// Width must be even; [`check_frame_size`] guarantees that for every
    /// frame this sink writes.
    fn rgb_to_yuyv(rgb_image: &RgbImage) -> Vec<u8> {
        let (width, height) = rgb_image.dimensions();
        debug_assert!(width % 2 == 0, "YUYV needs an even width, got {width}");
        let mut yuyv = Vec::with_capacity(width as usize * height as usize * 2);

        for y in 0..height {
            for x in (0..width - width % 2).step_by(2) {
                let pixel1 = rgb_image.get_pixel(x, y);
                let pixel2 = rgb_image.get_pixel(x + 1, y);

                let (y1, u1, v1) = rgb_to_yuv(pixel1[0], pixel1[1], pixel1[2]);
                let (y2, u2, v2) = rgb_to_yuv(pixel2[0], pixel2[1], pixel2[2]);

                // Chroma is shared by the pixel pair
                let u = ((u16::from(u1) + u16::from(u2)) / 2) as u8;
                let v = ((u16::from(v1) + u16::from(v2)) / 2) as u8;

                yuyv.extend_from_slice(&[y1, u, y2, v]);
            }
        }

        yuyv
    }
}

/// YUYV packs two pixels per four bytes, so a row needs an even, non-zero width.
fn check_frame_size(width: u32, height: u32) -> Result<()> {
    if width == 0 || height == 0 || width % 2 != 0 {
        return Err(Error::Display {
            reason: format!("YUYV output needs a non-zero even width, got {width}x{height}"),
        });
    }
    Ok(())
}

/// Convert RGB to YUV color space
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn rgb_to_yuv(r: u8, g: u8, b: u8) -> (u8, u8, u8) {
    let r = f32::from(r);
    let g = f32::from(g);
    let b = f32::from(b);

    let y = (0.299 * r + 0.587 * g + 0.114 * b).clamp(0.0, 255.0) as u8;
    let u = ((-0.147 * r - 0.289 * g + 0.436 * b) + 128.0).clamp(0.0, 255.0) as u8;
    let v = ((0.615 * r - 0.515 * g - 0.100 * b) + 128.0).clamp(0.0, 255.0) as u8;

    (y, u, v)
}

impl OutputSink for V4L2Output {
    fn write_frame(&mut self, frame: &RgbImage) -> Result<()> {
        let resized;
        let frame = if frame.dimensions() != (self.width, self.height) {
            resized = image::imageops::resize(
                frame,
                self.width,
                self.height,
                image::imageops::FilterType::Triangle,
            );
            &resized
        } else {
            frame
        };

        let yuyv_data = Self::rgb_to_yuyv(frame);

        self.file.write_all(&yuyv_data).map_err(|e| Error::Display {
            reason: format!("failed to write frame to v4l2loopback device: {e}"),
        })
    }

    fn resolution(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}
