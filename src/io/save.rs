//! Image saving.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use image::codecs::jpeg::JpegEncoder;
use image::{DynamicImage, ImageFormat, RgbImage, RgbaImage};
use tempfile::NamedTempFile;

use crate::error::{Error, Result};

/// Save an image that keeps its alpha channel.
///
/// JPEG cannot carry alpha, so a `.jpg`/`.jpeg` destination is rewritten to
/// `.png`. A path without an extension also gets `.png`.
///
/// Returns the path actually written.
///
/// # Errors
///
/// Returns [`Error::Persist`] if the image cannot be encoded or written.
pub fn save_rgba<P: AsRef<Path>>(image: &RgbaImage, path: P) -> Result<PathBuf> {
    let requested = path.as_ref();
    let path = if requested.extension().is_none() {
        requested.with_extension("png")
    } else if matches!(ImageFormat::from_path(requested), Ok(ImageFormat::Jpeg)) {
        let coerced = requested.with_extension("png");
        tracing::warn!(
            "JPEG has no alpha channel; writing {} instead of {}",
            coerced.display(),
            requested.display()
        );
        coerced
    } else {
        requested.to_path_buf()
    };

    write_image(&DynamicImage::ImageRgba8(image.clone()), &path, 100)?;
    Ok(path)
}

/// Save a flattened RGB image.
///
/// `quality` (1-100) applies to JPEG output only. A path without an
/// extension gets `.png`.
///
/// Returns the path actually written.
///
/// # Errors
///
/// Returns [`Error::Persist`] if the image cannot be encoded or written.
pub fn save_rgb<P: AsRef<Path>>(image: &RgbImage, path: P, quality: u8) -> Result<PathBuf> {
    let requested = path.as_ref();
    let path = if requested.extension().is_none() {
        requested.with_extension("png")
    } else {
        requested.to_path_buf()
    };

    write_image(&DynamicImage::ImageRgb8(image.clone()), &path, quality)?;
    Ok(path)
}

/// Encode fully in memory, then replace `path` atomically.
fn write_image(image: &DynamicImage, path: &Path, quality: u8) -> Result<()> {
    let _span = tracing::debug_span!("save_image", path = %path.display()).entered();

    let persist_err = |reason: String| Error::Persist {
        path: path.to_path_buf(),
        reason,
    };

    let format = ImageFormat::from_path(path).map_err(|e| persist_err(e.to_string()))?;

    let mut encoded = Cursor::new(Vec::new());
    match format {
        ImageFormat::Jpeg => {
            let encoder = JpegEncoder::new_with_quality(&mut encoded, quality);
            image
                .write_with_encoder(encoder)
                .map_err(|e| persist_err(e.to_string()))?;
        }
        _ => {
            image
                .write_to(&mut encoded, format)
                .map_err(|e| persist_err(e.to_string()))?;
        }
    }

    replace_file(path, &encoded.into_inner()).map_err(persist_err)?;

    tracing::debug!("Wrote {:?} image", format);
    Ok(())
}

/// Write `bytes` to a temporary file next to `path`, then rename it over `path`.
///
/// On failure the destination is untouched and the temporary file is removed.
fn replace_file(path: &Path, bytes: &[u8]) -> std::result::Result<(), String> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| e.to_string())?;
    tmp.write_all(bytes).map_err(|e| e.to_string())?;
    tmp.as_file().sync_all().map_err(|e| e.to_string())?;
    tmp.persist(path).map_err(|e| e.error.to_string())?;

    Ok(())
}
