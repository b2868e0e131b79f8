//! Enregistrement des images JPEG (200 DPI)

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::jpeg::{JpegEncoder, PixelDensity};
use image::{ImageFormat, RgbImage};
use tracing::debug;

use crate::error::{AppError, Result};

/// Résolution enregistrée dans l'en-tête JFIF
pub const IMAGE_DPI: u16 = 200;

const JPEG_QUALITY: u8 = 90;

fn image_error(e: image::ImageError) -> AppError {
    AppError::external("image encoder", e)
}

/// Enregistre une image RGB en JPEG à 200 DPI
pub fn write_jpeg(image: &RgbImage, path: &Path) -> Result<()> {
    let file = BufWriter::new(File::create(path)?);

    let mut encoder = JpegEncoder::new_with_quality(file, JPEG_QUALITY);
    encoder.set_pixel_density(PixelDensity::dpi(IMAGE_DPI));
    encoder.encode_image(image).map_err(image_error)?;

    debug!(
        path = %path.display(),
        width = image.width(),
        height = image.height(),
        "JPEG written"
    );
    Ok(())
}

/// Convertit une capture PNG (éventuellement RGBA) en JPEG RGB
pub fn png_to_jpeg(png: &[u8], path: &Path) -> Result<()> {
    let image = image::load_from_memory_with_format(png, ImageFormat::Png)
        .map_err(image_error)?
        .to_rgb8();
    write_jpeg(&image, path)
}
